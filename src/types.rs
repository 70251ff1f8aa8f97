//! Core types used throughout shieldlink

use alloy::primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// L2 transaction hash as reported by the prover/coordinator
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct L2TxHash(pub String);

impl fmt::Display for L2TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for L2TxHash {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Identifiers handed back to the caller once an operation reaches `Returned`
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHashes {
    /// Base ledger hash, present when the operation had an on-chain leg
    pub tx_hash_l1: Option<B256>,
    /// Off-chain ledger hash, absent only for withdrawal finalisation
    pub tx_hash_l2: Option<L2TxHash>,
}

/// Token standards understood by the prover/coordinator
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErcStandard {
    ERC20,
    ERC721,
    ERC1155,
}

impl fmt::Display for ErcStandard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErcStandard::ERC20 => "ERC20",
            ErcStandard::ERC721 => "ERC721",
            ErcStandard::ERC1155 => "ERC1155",
        };
        write!(f, "{}", name)
    }
}

/// Token an operation acts on
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub contract_address: Address,
    pub erc_standard: ErcStandard,
}

impl Token {
    pub fn new(contract_address: Address, erc_standard: ErcStandard) -> Self {
        Self {
            contract_address,
            erc_standard,
        }
    }
}

/// Encode a scalar as 0x-prefixed, 32-byte, zero-padded hex
pub fn to_hex32(value: &U256) -> String {
    format!("0x{}", hex::encode(value.to_be_bytes::<32>()))
}

/// Decode 0x-prefixed (or bare) hex of at most 32 bytes into a scalar
pub fn from_hex32(hex_str: &str) -> Result<U256, hex::FromHexError> {
    let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    let padded = if stripped.len() % 2 == 1 {
        format!("0{}", stripped)
    } else {
        stripped.to_string()
    };
    let bytes = hex::decode(padded)?;
    if bytes.len() > 32 {
        return Err(hex::FromHexError::InvalidStringLength);
    }
    Ok(U256::from_be_slice(&bytes))
}
