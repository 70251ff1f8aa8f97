//! Base ledger RPC seam

use alloy::primitives::{Address, B256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::error::Result;

/// Outcome of a mined base ledger transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub success: bool,
}

/// The subset of base ledger RPC the signer and broadcast queue rely on.
///
/// Implementations map transport failures to `SdkError::RpcUnavailable`.
#[async_trait]
pub trait BaseLedgerRpc: Send + Sync {
    /// `net_listening`
    async fn is_listening(&self) -> Result<bool>;

    /// `eth_gasPrice`, in wei
    async fn gas_price(&self) -> Result<u128>;

    /// `eth_estimateGas`
    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64>;

    /// `eth_getTransactionCount` against the pending block
    async fn pending_transaction_count(&self, address: Address) -> Result<u64>;

    /// `eth_sendRawTransaction`
    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256>;

    /// `eth_getTransactionReceipt`, `None` while the transaction is unmined
    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<LedgerReceipt>>;

    /// Timestamp of the latest block, in seconds
    async fn latest_block_timestamp(&self) -> Result<u64>;
}

/// Signs and submits on the caller's behalf when no local key is held
#[async_trait]
pub trait ExternalWallet: Send + Sync {
    /// Hand over an unsigned draft. Returns the pending transaction hash.
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256>;
}
