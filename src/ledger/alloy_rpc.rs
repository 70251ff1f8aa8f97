//! alloy-backed base ledger RPC

use alloy::eips::BlockNumberOrTag;
use alloy::primitives::{Address, B256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use super::rpc::{BaseLedgerRpc, ExternalWallet, LedgerReceipt};
use crate::error::{Result, SdkError};

fn unavailable<E: std::fmt::Display>(e: E) -> SdkError {
    SdkError::RpcUnavailable(e.to_string())
}

/// HTTP JSON-RPC connection to the base ledger
#[derive(Clone)]
pub struct AlloyLedgerRpc {
    provider: DynProvider,
}

impl AlloyLedgerRpc {
    pub fn connect(rpc_url: &str) -> Result<Self> {
        let url = rpc_url.parse().map_err(|e| {
            SdkError::InvalidConfig(format!("invalid ledger RPC URL {}: {}", rpc_url, e))
        })?;
        let provider = DynProvider::new(ProviderBuilder::new().connect_http(url));
        Ok(Self { provider })
    }

    /// Accounts managed by the node, used when no local key is configured
    pub async fn accounts(&self) -> Result<Vec<Address>> {
        self.provider.get_accounts().await.map_err(unavailable)
    }

    pub async fn chain_id(&self) -> Result<u64> {
        self.provider.get_chain_id().await.map_err(unavailable)
    }
}

#[async_trait]
impl BaseLedgerRpc for AlloyLedgerRpc {
    async fn is_listening(&self) -> Result<bool> {
        self.provider
            .raw_request::<_, bool>("net_listening".into(), ())
            .await
            .map_err(unavailable)
    }

    async fn gas_price(&self) -> Result<u128> {
        self.provider.get_gas_price().await.map_err(unavailable)
    }

    async fn estimate_gas(&self, tx: &TransactionRequest) -> Result<u64> {
        self.provider
            .estimate_gas(tx.clone())
            .await
            .map_err(unavailable)
    }

    async fn pending_transaction_count(&self, address: Address) -> Result<u64> {
        self.provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(unavailable)
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256> {
        let pending = self
            .provider
            .send_raw_transaction(raw)
            .await
            .map_err(unavailable)?;
        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<LedgerReceipt>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(unavailable)?;

        Ok(receipt.map(|r| LedgerReceipt {
            tx_hash: r.transaction_hash,
            block_number: r.block_number,
            success: r.status(),
        }))
    }

    async fn latest_block_timestamp(&self) -> Result<u64> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .map_err(unavailable)?
            .ok_or_else(|| SdkError::RpcUnavailable("latest block not found".to_string()))?;
        Ok(block.header.timestamp)
    }
}

#[async_trait]
impl ExternalWallet for AlloyLedgerRpc {
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(unavailable)?;
        Ok(*pending.tx_hash())
    }
}
