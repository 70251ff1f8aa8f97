//! Nonce-safe base ledger transaction signing
//!
//! Each account owns one `NonceSafeSigner`. The cached nonce lives behind an
//! async mutex that is held from the gas price query until the transaction
//! is signed, so concurrent callers on the same account always leave with
//! distinct, strictly increasing nonces.

use std::sync::Arc;

use alloy::eips::eip2718::Encodable2718;
use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::rpc::{BaseLedgerRpc, ExternalWallet};
use crate::error::{Result, SdkError};

/// A base ledger transaction ready for the broadcast queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignedTransaction {
    /// Signed with a local key, not yet submitted
    Local {
        nonce: u64,
        tx_hash: B256,
        raw: Bytes,
    },
    /// Handed to an external wallet, which submitted it already
    Delegated { nonce: u64, tx_hash: B256 },
}

impl SignedTransaction {
    pub fn nonce(&self) -> u64 {
        match self {
            SignedTransaction::Local { nonce, .. } | SignedTransaction::Delegated { nonce, .. } => {
                *nonce
            }
        }
    }

    pub fn tx_hash(&self) -> B256 {
        match self {
            SignedTransaction::Local { tx_hash, .. }
            | SignedTransaction::Delegated { tx_hash, .. } => *tx_hash,
        }
    }
}

/// Who produces the signature
#[derive(Clone)]
pub enum SigningAuthority {
    Local(EthereumWallet),
    External(Arc<dyn ExternalWallet>),
}

impl std::fmt::Debug for SigningAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SigningAuthority::Local(_) => write!(f, "Local"),
            SigningAuthority::External(_) => write!(f, "External"),
        }
    }
}

/// Per-account nonce bookkeeping
#[derive(Debug, Default)]
struct SignerState {
    cached_nonce: Option<u64>,
}

impl SignerState {
    /// Reserve the next nonce given the ledger's pending count
    fn reserve(&mut self, pending_count: u64) -> u64 {
        let nonce = self
            .cached_nonce
            .map_or(pending_count, |cached| cached.max(pending_count));
        self.cached_nonce = Some(nonce + 1);
        nonce
    }
}

pub struct NonceSafeSigner {
    address: Address,
    chain_id: u64,
    rpc: Arc<dyn BaseLedgerRpc>,
    authority: SigningAuthority,
    state: Mutex<SignerState>,
}

impl NonceSafeSigner {
    /// Sign locally with a hex private key
    pub fn with_private_key(
        private_key: &str,
        chain_id: u64,
        rpc: Arc<dyn BaseLedgerRpc>,
    ) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .trim()
            .parse()
            .map_err(|e| SdkError::InvalidPrivateKey(format!("{}", e)))?;
        let address = signer.address();

        Ok(Self {
            address,
            chain_id,
            rpc,
            authority: SigningAuthority::Local(EthereumWallet::from(signer)),
            state: Mutex::new(SignerState::default()),
        })
    }

    /// Delegate signing and submission to an external wallet
    pub fn with_external_wallet(
        address: Address,
        chain_id: u64,
        rpc: Arc<dyn BaseLedgerRpc>,
        wallet: Arc<dyn ExternalWallet>,
    ) -> Self {
        Self {
            address,
            chain_id,
            rpc,
            authority: SigningAuthority::External(wallet),
            state: Mutex::new(SignerState::default()),
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    pub fn authority(&self) -> &SigningAuthority {
        &self.authority
    }

    /// Next nonce this signer would hand out, if one has been reserved yet
    pub async fn cached_nonce(&self) -> Option<u64> {
        self.state.lock().await.cached_nonce
    }

    /// Build, price, nonce and sign one transaction.
    ///
    /// Errors before the nonce is reserved are `RpcUnavailable` and leave the
    /// cached nonce untouched. Errors after it are `Signing`, and the nonce
    /// stays consumed.
    pub async fn sign(
        &self,
        recipient: Address,
        payload: Bytes,
        value: U256,
    ) -> Result<SignedTransaction> {
        if !self.rpc.is_listening().await? {
            return Err(SdkError::RpcUnavailable(
                "base ledger node is not listening".to_string(),
            ));
        }

        let mut state = self.state.lock().await;

        let gas_price = self.rpc.gas_price().await?;
        let mut tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(recipient)
            .with_input(payload)
            .with_value(value)
            .with_gas_price(gas_price);
        debug!("Draft transaction to {} at gas price {}", recipient, gas_price);

        let gas = self.rpc.estimate_gas(&tx).await?;
        tx.set_gas_limit(gas);

        let pending_count = self.rpc.pending_transaction_count(self.address).await?;
        let nonce = state.reserve(pending_count);
        tx.set_nonce(nonce);
        debug!(
            "Reserved nonce {} for {} (pending count {})",
            nonce, self.address, pending_count
        );

        let signed = match &self.authority {
            SigningAuthority::Local(wallet) => {
                tx.set_chain_id(self.chain_id);
                let envelope = tx.build(wallet).await.map_err(|e| {
                    warn!("Signing failed with nonce {} reserved: {}", nonce, e);
                    SdkError::Signing {
                        nonce,
                        reason: e.to_string(),
                    }
                })?;
                SignedTransaction::Local {
                    nonce,
                    tx_hash: *envelope.tx_hash(),
                    raw: Bytes::from(envelope.encoded_2718()),
                }
            }
            SigningAuthority::External(wallet) => {
                let tx_hash = wallet.send_transaction(tx).await.map_err(|e| {
                    warn!("External wallet rejected nonce {}: {}", nonce, e);
                    SdkError::Signing {
                        nonce,
                        reason: e.to_string(),
                    }
                })?;
                SignedTransaction::Delegated { nonce, tx_hash }
            }
        };

        info!("Signed transaction {} with nonce {}", signed.tx_hash(), nonce);
        Ok(signed)
    }
}
