//! Account session: one user's keys, signer and broadcast queue

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use alloy::primitives::Address;
use bip39::Mnemonic;
use tracing::{debug, info, warn};

use crate::atomic::AtomicLockCoordinator;
use crate::commitment::{StoredCommitment, UnspentCommitment};
use crate::config::SdkConfig;
use crate::error::{Result, SdkError};
use crate::ledger::{AlloyLedgerRpc, BaseLedgerRpc, BroadcastEvent, BroadcastQueue, NonceSafeSigner};
use crate::orchestrator::{
    AtomicLegParams, AtomicTransferReceipt, BurnParams, DepositParams, TokeniseParams,
    TransactionOrchestrator, TransferParams, TransformTransferParams, WithdrawParams,
};
use crate::prover::{Balance, HttpProverClient, ProverClient, TransactionInfo, ZkpKeys};
use crate::telemetry::redact;
use crate::types::{L2TxHash, TransactionHashes};

const MNEMONIC_WORDS: usize = 12;
const ZKP_ADDRESS_INDEX: u32 = 0;

/// Validate a configured mnemonic or create a fresh one
fn resolve_mnemonic(configured: Option<&str>) -> Result<String> {
    match configured {
        Some(phrase) => {
            let mnemonic = Mnemonic::parse(phrase)
                .map_err(|e| SdkError::InvalidMnemonic(e.to_string()))?;
            Ok(mnemonic.to_string())
        }
        None => {
            let mnemonic = Mnemonic::generate(MNEMONIC_WORDS)
                .map_err(|e| SdkError::InvalidMnemonic(e.to_string()))?;
            info!("No mnemonic configured, generated a new one");
            Ok(mnemonic.to_string())
        }
    }
}

pub struct Account {
    prover: Arc<dyn ProverClient>,
    rpc: Arc<dyn BaseLedgerRpc>,
    signer: Arc<NonceSafeSigner>,
    queue: Arc<BroadcastQueue>,
    orchestrator: TransactionOrchestrator,
    mnemonic: String,
    keys: ZkpKeys,
    shield_address: Address,
}

impl Account {
    /// Connect to the prover and base ledger named in `config`
    pub async fn connect(config: SdkConfig) -> Result<Self> {
        config.validate()?;
        let prover = Arc::new(HttpProverClient::from_config(&config));
        let rpc = Arc::new(AlloyLedgerRpc::connect(&config.ledger_rpc_url)?);

        let signer = match &config.ethereum_private_key {
            Some(key) => {
                debug!("Signing locally with key {}", redact(key));
                NonceSafeSigner::with_private_key(key, config.chain_id, rpc.clone())?
            }
            None => {
                let address = rpc.accounts().await?.into_iter().next().ok_or_else(|| {
                    SdkError::InvalidConfig(
                        "no private key configured and the node manages no accounts".to_string(),
                    )
                })?;
                info!("Delegating signing to node-managed account {}", address);
                NonceSafeSigner::with_external_wallet(
                    address,
                    config.chain_id,
                    rpc.clone(),
                    rpc.clone(),
                )
            }
        };

        Self::connect_with(config, prover, rpc, signer).await
    }

    /// Assemble a session from already built collaborators
    pub async fn connect_with(
        config: SdkConfig,
        prover: Arc<dyn ProverClient>,
        rpc: Arc<dyn BaseLedgerRpc>,
        signer: NonceSafeSigner,
    ) -> Result<Self> {
        config.validate()?;

        let shield_address = prover
            .contract_address(&config.shield_contract_name)
            .await?;
        debug!(
            "{} contract at {}",
            config.shield_contract_name, shield_address
        );

        let mnemonic = resolve_mnemonic(config.nightfall_mnemonic.as_deref())?;
        let keys = prover
            .generate_zkp_keys(&mnemonic, ZKP_ADDRESS_INDEX)
            .await?;
        prover.subscribe_incoming_viewing_keys(&keys).await?;

        let signer = Arc::new(signer);
        let queue = Arc::new(BroadcastQueue::start(rpc.clone(), config.broadcast.clone()));
        let orchestrator = TransactionOrchestrator::new(
            prover.clone(),
            rpc.clone(),
            signer.clone(),
            queue.clone(),
            AtomicLockCoordinator::new(&config.lock),
            shield_address,
            keys.clone(),
        );

        info!(
            "Account {} connected, L2 address {}",
            signer.address(),
            keys.compressed_zkp_public_key
        );

        Ok(Self {
            prover,
            rpc,
            signer,
            queue,
            orchestrator,
            mnemonic,
            keys,
            shield_address,
        })
    }

    /// Base ledger address
    pub fn address(&self) -> Address {
        self.signer.address()
    }

    /// L2 address (compressed zkp public key)
    pub fn nightfall_address(&self) -> &str {
        &self.keys.compressed_zkp_public_key
    }

    /// The session's mnemonic, needed to recover a generated one
    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn keys(&self) -> &ZkpKeys {
        &self.keys
    }

    pub fn shield_address(&self) -> Address {
        self.shield_address
    }

    pub fn orchestrator(&self) -> &TransactionOrchestrator {
        &self.orchestrator
    }

    pub async fn is_client_alive(&self) -> bool {
        match self.prover.health_check().await {
            Ok(alive) => alive,
            Err(e) => {
                warn!("Client health check failed: {}", e);
                false
            }
        }
    }

    pub async fn is_ledger_alive(&self) -> bool {
        match self.rpc.is_listening().await {
            Ok(listening) => listening,
            Err(e) => {
                warn!("Base ledger liveness check failed: {}", e);
                false
            }
        }
    }

    pub async fn deposit(&self, params: DepositParams) -> Result<TransactionHashes> {
        self.orchestrator.deposit(params).await
    }

    pub async fn transfer(&self, params: TransferParams) -> Result<TransactionHashes> {
        self.orchestrator.transfer(params).await
    }

    pub async fn withdraw(&self, params: WithdrawParams) -> Result<TransactionHashes> {
        self.orchestrator.withdraw(params).await
    }

    pub async fn finalise_withdrawal(
        &self,
        withdraw_tx_hash: &L2TxHash,
    ) -> Result<TransactionHashes> {
        self.orchestrator.finalise_withdrawal(withdraw_tx_hash).await
    }

    pub async fn tokenise(&self, params: TokeniseParams) -> Result<TransactionHashes> {
        self.orchestrator.tokenise(params).await
    }

    pub async fn burn(&self, params: BurnParams) -> Result<TransactionHashes> {
        self.orchestrator.burn(params).await
    }

    pub async fn transform_transfer(
        &self,
        params: TransformTransferParams,
    ) -> Result<TransactionHashes> {
        self.orchestrator.transform_transfer(params).await
    }

    pub async fn atomic_transfer(
        &self,
        legs: Vec<AtomicLegParams>,
    ) -> Result<AtomicTransferReceipt> {
        self.orchestrator.atomic_transfer(legs).await
    }

    /// Settled L2 balances, optionally limited to some token addresses
    pub async fn check_balances(&self, erc_list: &[String]) -> Result<Balance> {
        self.prover
            .balances(&self.keys.compressed_zkp_public_key, erc_list)
            .await
    }

    pub async fn check_pending_deposits(&self, erc_list: &[String]) -> Result<Option<Balance>> {
        self.prover
            .pending_deposits(&self.keys.compressed_zkp_public_key, erc_list)
            .await
    }

    pub async fn check_pending_spent(&self, erc_list: &[String]) -> Result<Option<Balance>> {
        self.prover
            .pending_spent(&self.keys.compressed_zkp_public_key, erc_list)
            .await
    }

    pub async fn unspent_commitments(
        &self,
        erc_list: &[String],
    ) -> Result<HashMap<String, Vec<UnspentCommitment>>> {
        self.prover
            .unspent_commitments(&self.keys.compressed_zkp_public_key, erc_list)
            .await
    }

    pub async fn transactions_info(&self, hashes: &[String]) -> Result<Vec<TransactionInfo>> {
        self.prover.transactions_info(hashes).await
    }

    /// Write every commitment owned by `compressed_zkp_public_keys` to a JSON
    /// file. Returns how many were written; nothing is written when none
    /// exist.
    pub async fn export_commitments(
        &self,
        compressed_zkp_public_keys: &[String],
        path: impl AsRef<Path>,
    ) -> Result<usize> {
        let commitments = self
            .prover
            .commitments_by_compressed_keys(compressed_zkp_public_keys)
            .await?;
        if commitments.is_empty() {
            warn!("No commitments found for the given compressed zkp public keys");
            return Ok(0);
        }

        let json = serde_json::to_vec(&commitments)?;
        tokio::fs::write(path.as_ref(), json).await?;
        info!(
            "Exported {} commitments to {}",
            commitments.len(),
            path.as_ref().display()
        );
        Ok(commitments.len())
    }

    /// Load commitments exported by `export_commitments` and save them in the
    /// prover's store. Every commitment must belong to this account and hash
    /// to its recorded id.
    pub async fn import_commitments(&self, path: impl AsRef<Path>) -> Result<String> {
        let contents = tokio::fs::read(path.as_ref()).await?;
        let commitments: Vec<StoredCommitment> = serde_json::from_slice(&contents)?;

        for commitment in &commitments {
            if commitment.compressed_zkp_public_key != self.keys.compressed_zkp_public_key {
                return Err(SdkError::InvalidRequest(format!(
                    "commitment {} belongs to {}, not to this account",
                    commitment.id, commitment.compressed_zkp_public_key
                )));
            }
            commitment.to_commitment()?;
        }

        let message = self.prover.save_commitments(&commitments).await?;
        info!("{}", message);
        Ok(message)
    }

    /// Next broadcast outcome, if one is ready
    pub async fn poll_broadcast_event(&self) -> Option<BroadcastEvent> {
        self.queue.poll_events().await
    }

    /// Base ledger transactions queued but not yet mined or failed
    pub fn pending_broadcasts(&self) -> usize {
        self.queue.pending()
    }

    /// End the session. Waits for every queued base ledger transaction to be
    /// processed first.
    pub async fn close(&self) {
        debug!(
            "Closing account {} with {} queued transactions",
            self.signer.address(),
            self.queue.pending()
        );
        self.queue.shutdown().await;
    }
}
