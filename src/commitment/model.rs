//! Commitment preimages and their Poseidon hash

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SdkError};
use crate::field::{pack_erc_address, parse_scalar, poseidon_hash, reduce};
use crate::types::{from_hex32, to_hex32};

/// Preimage fields as they travel over the wire: decimal or 0x-hex strings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPreimage {
    pub erc_address: String,
    pub token_id: String,
    pub value: String,
    pub zkp_public_key: Vec<String>,
    pub salt: String,
}

/// The five scalars a commitment hides
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitmentPreimage {
    pub erc_address: U256,
    pub token_id: U256,
    pub value: U256,
    pub zkp_public_key: [U256; 2],
    pub salt: U256,
}

impl CommitmentPreimage {
    pub fn new(
        erc_address: U256,
        token_id: U256,
        value: U256,
        zkp_public_key: [U256; 2],
        salt: U256,
    ) -> Self {
        Self {
            erc_address,
            token_id,
            value,
            zkp_public_key,
            salt,
        }
    }

    /// Parse a wire preimage. Every scalar must be a non-negative integer.
    pub fn parse(raw: &RawPreimage) -> Result<Self> {
        if raw.zkp_public_key.len() != 2 {
            return Err(SdkError::MalformedPreimage(format!(
                "zkpPublicKey must have 2 halves, got {}",
                raw.zkp_public_key.len()
            )));
        }

        Ok(Self {
            erc_address: parse_scalar(&raw.erc_address)?,
            token_id: parse_scalar(&raw.token_id)?,
            value: parse_scalar(&raw.value)?,
            zkp_public_key: [
                parse_scalar(&raw.zkp_public_key[0])?,
                parse_scalar(&raw.zkp_public_key[1])?,
            ],
            salt: parse_scalar(&raw.salt)?,
        })
    }

    /// Same preimage with value, key halves and salt reduced into the field
    pub fn canonical(&self) -> Self {
        Self {
            erc_address: self.erc_address,
            token_id: self.token_id,
            value: reduce(self.value),
            zkp_public_key: [
                reduce(self.zkp_public_key[0]),
                reduce(self.zkp_public_key[1]),
            ],
            salt: reduce(self.salt),
        }
    }

    /// Hex encoding, every field padded to 32 bytes
    pub fn to_raw(&self) -> RawPreimage {
        RawPreimage {
            erc_address: to_hex32(&self.erc_address),
            token_id: to_hex32(&self.token_id),
            value: to_hex32(&self.value),
            zkp_public_key: self.zkp_public_key.iter().map(to_hex32).collect(),
            salt: to_hex32(&self.salt),
        }
    }

    /// The six Poseidon inputs, in circuit order
    fn hash_inputs(&self) -> Result<[U256; 6]> {
        let (packed_erc_address, token_id_remainder) =
            pack_erc_address(self.erc_address, self.token_id)?;
        Ok([
            packed_erc_address,
            token_id_remainder,
            reduce(self.value),
            reduce(self.zkp_public_key[0]),
            reduce(self.zkp_public_key[1]),
            reduce(self.salt),
        ])
    }
}

/// A preimage bound to its hash
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commitment {
    preimage: CommitmentPreimage,
    hash: U256,
}

impl Commitment {
    /// Hash a preimage. The stored preimage is the canonical one.
    pub fn compute(preimage: CommitmentPreimage) -> Result<Self> {
        let canonical = preimage.canonical();
        let hash = poseidon_hash(&canonical.hash_inputs()?)?;
        Ok(Self {
            preimage: canonical,
            hash,
        })
    }

    /// Parse and hash a wire preimage
    pub fn from_raw(raw: &RawPreimage) -> Result<Self> {
        Self::compute(CommitmentPreimage::parse(raw)?)
    }

    pub fn preimage(&self) -> &CommitmentPreimage {
        &self.preimage
    }

    pub fn hash(&self) -> U256 {
        self.hash
    }

    pub fn hash_hex(&self) -> String {
        to_hex32(&self.hash)
    }

    pub fn serialize(&self) -> SerializedCommitment {
        SerializedCommitment {
            preimage: self.preimage.to_raw(),
            hash: self.hash_hex(),
        }
    }
}

/// Hex form of a commitment, suitable for HTTP transport and export files
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedCommitment {
    pub preimage: RawPreimage,
    pub hash: String,
}

impl SerializedCommitment {
    /// Rebuild the commitment, checking the carried hash against the preimage
    pub fn deserialize(&self) -> Result<Commitment> {
        let commitment = Commitment::from_raw(&self.preimage)?;
        let expected = from_hex32(&self.hash)?;
        if commitment.hash() != expected {
            return Err(SdkError::CommitmentMismatch {
                expected: self.hash.clone(),
                computed: commitment.hash_hex(),
            });
        }
        Ok(commitment)
    }
}
