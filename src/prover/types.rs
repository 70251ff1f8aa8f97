//! Prover/coordinator request and response bodies (JSON, camelCase)

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ErcStandard, L2TxHash};

/// Zero-knowledge key set derived by the prover from a mnemonic
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkpKeys {
    pub root_key: String,
    pub nullifier_key: String,
    pub zkp_private_key: String,
    pub zkp_public_key: Vec<String>,
    /// The account's L2 address
    pub compressed_zkp_public_key: String,
}

// Secret halves never reach a log line
impl fmt::Debug for ZkpKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ZkpKeys")
            .field("root_key", &"<redacted>")
            .field("nullifier_key", &"<redacted>")
            .field("zkp_private_key", &"<redacted>")
            .field("zkp_public_key", &self.zkp_public_key)
            .field("compressed_zkp_public_key", &self.compressed_zkp_public_key)
            .finish()
    }
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateKeysRequest<'a> {
    pub mnemonic: &'a str,
    pub address_index: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingViewingKeyRequest {
    pub zkp_private_keys: Vec<String>,
    pub nullifier_keys: Vec<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ContractAddressResponse {
    pub address: String,
}

/// L2 transaction as echoed back by the coordinator
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct L2Transaction {
    pub transaction_hash: L2TxHash,
    pub value: String,
    pub fee: String,
    pub transaction_type: String,
    pub token_type: String,
    pub token_id: String,
    pub erc_address: String,
    pub recipient_address: String,
    pub commitments: Vec<String>,
    pub nullifiers: Vec<String>,
    pub commitment_fee: Vec<String>,
    pub nullifiers_fee: Vec<String>,
    pub compressed_secrets: Vec<String>,
    pub historic_root_block_number_l2: Vec<String>,
    pub historic_root_block_number_l2_fee: Vec<String>,
    pub proof: Vec<String>,
}

/// Response of every transaction-building endpoint
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    /// Unsigned base ledger calldata, present for on-chain operations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_data_to_sign: Option<String>,
    /// Absent only for withdrawal finalisation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction: Option<L2Transaction>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest {
    pub erc_address: String,
    pub token_type: ErcStandard,
    pub root_key: String,
    pub value: String,
    pub token_id: String,
    pub fee: String,
    pub provided_commitments_fee: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipientData {
    pub recipient_compressed_zkp_public_keys: Vec<String>,
    pub values: Vec<String>,
}

impl RecipientData {
    pub fn single(recipient: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            recipient_compressed_zkp_public_keys: vec![recipient.into()],
            values: vec![value.into()],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub erc_address: String,
    pub root_key: String,
    pub recipient_data: RecipientData,
    pub token_id: String,
    pub fee: String,
    pub offchain: bool,
    pub provided_commitments: Vec<String>,
    pub provided_commitments_fee: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regulator_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atomic_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atomic_timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawRequest {
    pub erc_address: String,
    pub token_type: ErcStandard,
    pub root_key: String,
    pub recipient_address: String,
    pub value: String,
    pub token_id: String,
    pub fee: String,
    pub offchain: bool,
    pub provided_commitments: Vec<String>,
    pub provided_commitments_fee: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinaliseWithdrawalRequest {
    pub transaction_hash: L2TxHash,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokeniseRequest {
    pub erc_address: String,
    pub root_key: String,
    pub value: String,
    pub token_id: String,
    pub fee: String,
    pub provided_commitments_fee: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnRequest {
    pub erc_address: String,
    pub root_key: String,
    pub value: String,
    pub token_id: String,
    pub fee: String,
    pub provided_commitments: Vec<String>,
    pub provided_commitments_fee: Vec<String>,
}

/// A token consumed or produced by a transform transfer
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformToken {
    pub id: String,
    pub address: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment_hash: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformTransferRequest {
    pub root_key: String,
    pub input_tokens: Vec<TransformToken>,
    pub output_tokens: Vec<TransformToken>,
    pub recipient_compressed_zkp_public_key: String,
    pub fee: String,
    pub provided_commitments: Vec<String>,
    pub provided_commitments_fee: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regulator_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atomic_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atomic_timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salt: Option<String>,
}

/// Balance entry for one token id
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BalancePerTokenId {
    pub balance: serde_json::Number,
    pub token_id: String,
}

/// Balance for one token address: a plain amount for fungible tokens, a
/// per-token-id list otherwise
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BalancePerAddress {
    Amount(serde_json::Number),
    PerTokenId(Vec<BalancePerTokenId>),
}

/// Balances keyed by token contract address
pub type Balance = HashMap<String, BalancePerAddress>;

/// Settled L2 transaction summary
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionInfo {
    pub block_number: String,
    #[serde(rename = "blockNumberL2")]
    pub block_number_l2: String,
    pub transaction_hash: String,
    #[serde(rename = "transactionHashL1")]
    pub transaction_hash_l1: String,
}
