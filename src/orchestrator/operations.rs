//! Transaction orchestration
//!
//! Every operation asks the prover to build it, signs the returned base
//! ledger calldata when the operation has an on-chain leg, hands the signed
//! transaction to the broadcast queue and returns without waiting for it to
//! be mined.

use std::sync::Arc;

use alloy::primitives::{Address, Bytes, U256};
use tracing::{debug, info, warn};

use super::state::{OperationKind, OperationSession};
use crate::atomic::{AtomicLockCoordinator, AtomicLockSet, LockLeg};
use crate::commitment::CommitmentPreimage;
use crate::error::{Result, SdkError};
use crate::field::{parse_scalar, random_salt};
use crate::ledger::{BaseLedgerRpc, BroadcastQueue, NonceSafeSigner};
use crate::prover::{
    BurnRequest, DepositRequest, ProverClient, RecipientData, TokeniseRequest,
    TransactionResponse, TransferRequest, TransformToken, TransformTransferRequest,
    WithdrawRequest, ZkpKeys,
};
use crate::types::{to_hex32, L2TxHash, Token, TransactionHashes};

const DEFAULT_TOKEN_ID: &str = "0x00";
const DEFAULT_FEE: &str = "0";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DepositParams {
    pub token: Token,
    pub value: String,
    pub token_id: String,
    pub fee: String,
    pub provided_commitments_fee: Vec<String>,
    pub salt: Option<String>,
}

impl DepositParams {
    pub fn new(token: Token, value: impl Into<String>) -> Self {
        Self {
            token,
            value: value.into(),
            token_id: DEFAULT_TOKEN_ID.to_string(),
            fee: DEFAULT_FEE.to_string(),
            provided_commitments_fee: Vec::new(),
            salt: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferParams {
    pub token: Token,
    /// Recipient's compressed zkp public key
    pub recipient: String,
    pub value: String,
    pub token_id: String,
    pub fee: String,
    pub offchain: bool,
    pub provided_commitments: Vec<String>,
    pub provided_commitments_fee: Vec<String>,
    pub regulator_url: Option<String>,
    pub salt: Option<String>,
}

impl TransferParams {
    pub fn new(token: Token, recipient: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            token,
            recipient: recipient.into(),
            value: value.into(),
            token_id: DEFAULT_TOKEN_ID.to_string(),
            fee: DEFAULT_FEE.to_string(),
            offchain: false,
            provided_commitments: Vec::new(),
            provided_commitments_fee: Vec::new(),
            regulator_url: None,
            salt: None,
        }
    }

    pub fn offchain(mut self, offchain: bool) -> Self {
        self.offchain = offchain;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WithdrawParams {
    pub token: Token,
    pub recipient_address: Address,
    pub value: String,
    pub token_id: String,
    pub fee: String,
    pub offchain: bool,
    pub provided_commitments: Vec<String>,
    pub provided_commitments_fee: Vec<String>,
}

impl WithdrawParams {
    pub fn new(token: Token, recipient_address: Address, value: impl Into<String>) -> Self {
        Self {
            token,
            recipient_address,
            value: value.into(),
            token_id: DEFAULT_TOKEN_ID.to_string(),
            fee: DEFAULT_FEE.to_string(),
            offchain: false,
            provided_commitments: Vec::new(),
            provided_commitments_fee: Vec::new(),
        }
    }
}

/// Mint an L2-only token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokeniseParams {
    /// L2 token address, see `field::random_l2_token_address`
    pub token_address: String,
    pub value: String,
    pub token_id: String,
    pub fee: String,
    pub provided_commitments_fee: Vec<String>,
    pub salt: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurnParams {
    pub token_address: String,
    pub value: String,
    pub token_id: String,
    pub fee: String,
    pub provided_commitments: Vec<String>,
    pub provided_commitments_fee: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformTransferParams {
    pub input_tokens: Vec<TransformToken>,
    pub output_tokens: Vec<TransformToken>,
    pub recipient: String,
    pub fee: String,
    pub provided_commitments: Vec<String>,
    pub provided_commitments_fee: Vec<String>,
    pub regulator_url: Option<String>,
    pub salt: Option<String>,
    /// Hash-lock shared with the other legs of an atomic group
    pub atomic_hash: Option<String>,
    pub atomic_timestamp: Option<u64>,
}

impl TransformTransferParams {
    pub fn new(
        input_tokens: Vec<TransformToken>,
        output_tokens: Vec<TransformToken>,
        recipient: impl Into<String>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            recipient: recipient.into(),
            fee: DEFAULT_FEE.to_string(),
            provided_commitments: Vec::new(),
            provided_commitments_fee: Vec::new(),
            regulator_url: None,
            salt: None,
            atomic_hash: None,
            atomic_timestamp: None,
        }
    }

    /// Bind this transform to leg `index` of an atomic lock set
    pub fn with_lock(mut self, lock: &AtomicLockSet, index: usize) -> Result<Self> {
        let salt = lock.leg_salt(index).ok_or_else(|| {
            SdkError::InvalidRequest(format!(
                "lock has {} legs, no leg {}",
                lock.legs().len(),
                index
            ))
        })?;
        self.salt = Some(to_hex32(&salt));
        self.atomic_hash = Some(lock.lock_hex());
        self.atomic_timestamp = Some(lock.expiry_timestamp());
        Ok(self)
    }
}

/// One leg of an atomic group
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomicLegParams {
    pub transfer: TransferParams,
    /// Recipient's uncompressed zkp public key, needed to predict the output
    /// commitment
    pub recipient_public_key: [U256; 2],
}

/// Outcome of an atomic group submission
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomicTransferReceipt {
    pub lock: AtomicLockSet,
    /// Per-leg identifiers, in leg order
    pub legs: Vec<TransactionHashes>,
}

pub struct TransactionOrchestrator {
    prover: Arc<dyn ProverClient>,
    rpc: Arc<dyn BaseLedgerRpc>,
    signer: Arc<NonceSafeSigner>,
    queue: Arc<BroadcastQueue>,
    locks: AtomicLockCoordinator,
    shield_address: Address,
    keys: ZkpKeys,
}

impl TransactionOrchestrator {
    pub fn new(
        prover: Arc<dyn ProverClient>,
        rpc: Arc<dyn BaseLedgerRpc>,
        signer: Arc<NonceSafeSigner>,
        queue: Arc<BroadcastQueue>,
        locks: AtomicLockCoordinator,
        shield_address: Address,
        keys: ZkpKeys,
    ) -> Self {
        Self {
            prover,
            rpc,
            signer,
            queue,
            locks,
            shield_address,
            keys,
        }
    }

    pub fn shield_address(&self) -> Address {
        self.shield_address
    }

    pub fn keys(&self) -> &ZkpKeys {
        &self.keys
    }

    /// Drive a built operation to `Returned`
    async fn complete(
        &self,
        kind: OperationKind,
        offchain: bool,
        response: TransactionResponse,
    ) -> Result<TransactionHashes> {
        let tx_hash_l2 = response.transaction.map(|tx| tx.transaction_hash);
        let mut session = OperationSession::built(kind, offchain, tx_hash_l2);
        debug!("{} built", kind.endpoint());

        if session.needs_signature() {
            let payload = response
                .tx_data_to_sign
                .ok_or_else(|| SdkError::MissingOnChainPayload(kind.endpoint().to_string()))?;
            let payload = Bytes::from(hex::decode(payload.trim_start_matches("0x"))?);

            let signed = self
                .signer
                .sign(self.shield_address, payload, U256::ZERO)
                .await?;
            session.mark_signed(signed.tx_hash())?;

            self.queue.enqueue(signed).await;
            session.mark_enqueued()?;
        }

        let hashes = session.finish()?;
        info!(
            "{} returned (L1 {:?}, L2 {:?})",
            kind.endpoint(),
            hashes.tx_hash_l1,
            hashes.tx_hash_l2
        );
        Ok(hashes)
    }

    pub async fn deposit(&self, params: DepositParams) -> Result<TransactionHashes> {
        let request = DepositRequest {
            erc_address: params.token.contract_address.to_string(),
            token_type: params.token.erc_standard,
            root_key: self.keys.root_key.clone(),
            value: params.value,
            token_id: params.token_id,
            fee: params.fee,
            provided_commitments_fee: params.provided_commitments_fee,
            salt: params.salt,
        };
        let response = self.prover.deposit(&request).await?;
        self.complete(OperationKind::Deposit, false, response).await
    }

    pub async fn transfer(&self, params: TransferParams) -> Result<TransactionHashes> {
        self.transfer_with_lock(params, None, None).await
    }

    async fn transfer_with_lock(
        &self,
        params: TransferParams,
        atomic_hash: Option<String>,
        atomic_timestamp: Option<u64>,
    ) -> Result<TransactionHashes> {
        let offchain = params.offchain;
        let request = TransferRequest {
            erc_address: params.token.contract_address.to_string(),
            root_key: self.keys.root_key.clone(),
            recipient_data: RecipientData::single(params.recipient, params.value),
            token_id: params.token_id,
            fee: params.fee,
            offchain,
            provided_commitments: params.provided_commitments,
            provided_commitments_fee: params.provided_commitments_fee,
            regulator_url: params.regulator_url,
            atomic_hash,
            atomic_timestamp,
            salt: params.salt,
        };
        let response = self.prover.transfer(&request).await?;
        self.complete(OperationKind::Transfer, offchain, response)
            .await
    }

    pub async fn withdraw(&self, params: WithdrawParams) -> Result<TransactionHashes> {
        let offchain = params.offchain;
        let request = WithdrawRequest {
            erc_address: params.token.contract_address.to_string(),
            token_type: params.token.erc_standard,
            root_key: self.keys.root_key.clone(),
            recipient_address: params.recipient_address.to_string(),
            value: params.value,
            token_id: params.token_id,
            fee: params.fee,
            offchain,
            provided_commitments: params.provided_commitments,
            provided_commitments_fee: params.provided_commitments_fee,
        };
        let response = self.prover.withdraw(&request).await?;
        self.complete(OperationKind::Withdraw, offchain, response)
            .await
    }

    /// Finalise a withdrawal once its challenge period is over. Only the base
    /// ledger hash comes back.
    pub async fn finalise_withdrawal(
        &self,
        withdraw_tx_hash: &L2TxHash,
    ) -> Result<TransactionHashes> {
        let response = self.prover.finalise_withdrawal(withdraw_tx_hash).await?;
        self.complete(OperationKind::FinaliseWithdrawal, false, response)
            .await
    }

    pub async fn tokenise(&self, params: TokeniseParams) -> Result<TransactionHashes> {
        let request = TokeniseRequest {
            erc_address: params.token_address,
            root_key: self.keys.root_key.clone(),
            value: params.value,
            token_id: params.token_id,
            fee: params.fee,
            provided_commitments_fee: params.provided_commitments_fee,
            salt: params.salt,
        };
        let response = self.prover.tokenise(&request).await?;
        self.complete(OperationKind::Tokenise, false, response).await
    }

    pub async fn burn(&self, params: BurnParams) -> Result<TransactionHashes> {
        let request = BurnRequest {
            erc_address: params.token_address,
            root_key: self.keys.root_key.clone(),
            value: params.value,
            token_id: params.token_id,
            fee: params.fee,
            provided_commitments: params.provided_commitments,
            provided_commitments_fee: params.provided_commitments_fee,
        };
        let response = self.prover.burn(&request).await?;
        self.complete(OperationKind::Burn, false, response).await
    }

    pub async fn transform_transfer(
        &self,
        params: TransformTransferParams,
    ) -> Result<TransactionHashes> {
        let request = TransformTransferRequest {
            root_key: self.keys.root_key.clone(),
            input_tokens: params.input_tokens,
            output_tokens: params.output_tokens,
            recipient_compressed_zkp_public_key: params.recipient,
            fee: params.fee,
            provided_commitments: params.provided_commitments,
            provided_commitments_fee: params.provided_commitments_fee,
            regulator_url: params.regulator_url,
            atomic_hash: params.atomic_hash,
            atomic_timestamp: params.atomic_timestamp,
            salt: params.salt,
        };
        let response = self.prover.transform_transfer(&request).await?;
        self.complete(OperationKind::TransformTransfer, false, response)
            .await
    }

    /// Submit several transfers bound by one hash-lock.
    ///
    /// The lock is built from the commitments each leg will create, so every
    /// leg is sent with the salt the lock settled on. Legs go out in order; a
    /// failure part way through leaves the earlier legs with the coordinator
    /// until the lock expires.
    pub async fn atomic_transfer(
        &self,
        legs: Vec<AtomicLegParams>,
    ) -> Result<AtomicTransferReceipt> {
        let block_timestamp = self.rpc.latest_block_timestamp().await?;

        let lock_legs = legs
            .iter()
            .map(|leg| {
                let transfer = &leg.transfer;
                let salt = match &transfer.salt {
                    Some(raw) => parse_scalar(raw)?,
                    None => random_salt()?,
                };
                let preimage = CommitmentPreimage::new(
                    U256::from_be_slice(transfer.token.contract_address.as_slice()),
                    parse_scalar(&transfer.token_id)?,
                    parse_scalar(&transfer.value)?,
                    leg.recipient_public_key,
                    salt,
                );
                LockLeg::from_preimage(preimage, transfer.recipient.clone())
            })
            .collect::<Result<Vec<_>>>()?;

        let lock = self.locks.build_lock(lock_legs, block_timestamp)?;
        let atomic_hash = lock.lock_hex();
        debug!(
            "Atomic group of {} legs locked at {}",
            legs.len(),
            atomic_hash
        );

        let mut receipts = Vec::with_capacity(legs.len());
        for (index, leg) in legs.into_iter().enumerate() {
            let mut params = leg.transfer;
            params.salt = lock.leg_salt(index).map(|salt| to_hex32(&salt));

            match self
                .transfer_with_lock(
                    params,
                    Some(atomic_hash.clone()),
                    Some(lock.expiry_timestamp()),
                )
                .await
            {
                Ok(hashes) => receipts.push(hashes),
                Err(e) => {
                    warn!(
                        "Atomic leg {} failed after {} legs were submitted: {}",
                        index,
                        receipts.len(),
                        e
                    );
                    return Err(e);
                }
            }
        }

        info!(
            "Atomic group {} submitted, expires at {}",
            atomic_hash,
            lock.expiry_timestamp()
        );
        Ok(AtomicTransferReceipt {
            lock,
            legs: receipts,
        })
    }
}
