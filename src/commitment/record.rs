//! Commitment records as persisted by the prover/coordinator

use serde::{Deserialize, Serialize};

use super::model::{Commitment, RawPreimage};
use crate::error::{Result, SdkError};
use crate::types::from_hex32;

/// Where a commitment sits in its nullification lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NullifierStatus {
    Unspent,
    PendingNullification,
    /// Nullifier landed on-chain at this block
    NullifiedOnChain(u64),
}

/// Full commitment record, mirrors the coordinator's database document
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCommitment {
    #[serde(rename = "_id")]
    pub id: String,
    pub compressed_zkp_public_key: String,
    pub preimage: RawPreimage,
    #[serde(default)]
    pub is_deposited: bool,
    #[serde(default = "not_yet")]
    pub is_on_chain: i64,
    #[serde(default)]
    pub is_pending_nullification: bool,
    #[serde(default)]
    pub is_nullified: bool,
    #[serde(default = "not_yet")]
    pub is_nullified_on_chain: i64,
    #[serde(default)]
    pub nullifier: String,
    #[serde(default = "not_yet")]
    pub block_number: i64,
}

fn not_yet() -> i64 {
    -1
}

impl StoredCommitment {
    pub fn nullifier_status(&self) -> NullifierStatus {
        if self.is_nullified_on_chain >= 0 {
            NullifierStatus::NullifiedOnChain(self.is_nullified_on_chain as u64)
        } else if self.is_pending_nullification || self.is_nullified {
            NullifierStatus::PendingNullification
        } else {
            NullifierStatus::Unspent
        }
    }

    /// Only an on-chain nullification takes a commitment out of circulation
    pub fn is_spendable(&self) -> bool {
        self.is_nullified_on_chain < 0
    }

    /// Rebuild the commitment locally and check it against the record id
    pub fn to_commitment(&self) -> Result<Commitment> {
        let commitment = Commitment::from_raw(&self.preimage)?;
        if commitment.hash() != from_hex32(&self.id)? {
            return Err(SdkError::CommitmentMismatch {
                expected: self.id.clone(),
                computed: commitment.hash_hex(),
            });
        }
        Ok(commitment)
    }

    pub fn to_unspent(&self) -> UnspentCommitment {
        UnspentCommitment {
            compressed_zkp_public_key: self.compressed_zkp_public_key.clone(),
            erc_address: self.preimage.erc_address.clone(),
            balance: self.preimage.value.clone(),
            token_id: self.preimage.token_id.clone(),
            hash: self.id.clone(),
        }
    }
}

/// Summary the coordinator returns when listing spendable commitments
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnspentCommitment {
    pub compressed_zkp_public_key: String,
    pub erc_address: String,
    pub balance: String,
    pub token_id: String,
    pub hash: String,
}

/// Keep the records that can still be spent, summarised
pub fn filter_spendable(records: &[StoredCommitment]) -> Vec<UnspentCommitment> {
    records
        .iter()
        .filter(|record| record.is_spendable())
        .map(StoredCommitment::to_unspent)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commitment::model::CommitmentPreimage;
    use alloy::primitives::U256;

    fn record(is_nullified_on_chain: i64, pending: bool) -> StoredCommitment {
        let preimage = CommitmentPreimage::new(
            U256::from(0xabcdu64),
            U256::ZERO,
            U256::from(50u64),
            [U256::from(1u64), U256::from(2u64)],
            U256::from(77u64),
        );
        let commitment = Commitment::compute(preimage).unwrap();
        let serialized = commitment.serialize();

        StoredCommitment {
            id: serialized.hash,
            compressed_zkp_public_key: "0xfeed".to_string(),
            preimage: serialized.preimage,
            is_deposited: true,
            is_on_chain: 12,
            is_pending_nullification: pending,
            is_nullified: false,
            is_nullified_on_chain,
            nullifier: "0x00".to_string(),
            block_number: 12,
        }
    }

    #[test]
    fn test_nullifier_lifecycle() {
        assert_eq!(record(-1, false).nullifier_status(), NullifierStatus::Unspent);
        assert_eq!(
            record(-1, true).nullifier_status(),
            NullifierStatus::PendingNullification
        );
        assert_eq!(
            record(40, true).nullifier_status(),
            NullifierStatus::NullifiedOnChain(40)
        );
    }

    #[test]
    fn test_pending_nullification_still_spendable() {
        assert!(record(-1, true).is_spendable());
        assert!(!record(0, false).is_spendable());
    }

    #[test]
    fn test_filter_spendable() {
        let records = vec![record(-1, false), record(3, false), record(-1, true)];
        let unspent = filter_spendable(&records);
        assert_eq!(unspent.len(), 2);
        assert_eq!(unspent[0].hash, records[0].id);
    }

    #[test]
    fn test_to_commitment_checks_id() {
        let good = record(-1, false);
        assert_eq!(good.to_commitment().unwrap().hash_hex(), good.id);

        let mut bad = record(-1, false);
        bad.id = format!("0x{}", "11".repeat(32));
        assert!(matches!(
            bad.to_commitment(),
            Err(SdkError::CommitmentMismatch { .. })
        ));
    }

    #[test]
    fn test_deserialize_coordinator_document() {
        let json = r#"{
            "_id": "0x01",
            "compressedZkpPublicKey": "0x02",
            "preimage": {
                "ercAddress": "0x03",
                "tokenId": "0x00",
                "value": "0x0a",
                "zkpPublicKey": ["0x04", "0x05"],
                "salt": "0x06"
            },
            "isDeposited": true,
            "isOnChain": 7,
            "isPendingNullification": false,
            "isNullified": false,
            "isNullifiedOnChain": -1,
            "nullifier": "0x08",
            "blockNumber": 7
        }"#;
        let stored: StoredCommitment = serde_json::from_str(json).unwrap();
        assert_eq!(stored.id, "0x01");
        assert_eq!(stored.preimage.zkp_public_key.len(), 2);
        assert!(stored.is_spendable());

        let round: StoredCommitment =
            serde_json::from_str(&serde_json::to_string(&stored).unwrap()).unwrap();
        assert_eq!(round, stored);
    }

    #[test]
    fn test_missing_flags_default_to_unspent() {
        let json = r#"{
            "_id": "0x01",
            "compressedZkpPublicKey": "0x02",
            "preimage": {
                "ercAddress": "0x03",
                "tokenId": "0x00",
                "value": "0x0a",
                "zkpPublicKey": ["0x04", "0x05"],
                "salt": "0x06"
            }
        }"#;
        let stored: StoredCommitment = serde_json::from_str(json).unwrap();
        assert_eq!(stored.nullifier_status(), NullifierStatus::Unspent);
        assert_eq!(stored.block_number, -1);
    }
}
