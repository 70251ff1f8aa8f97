//! In-crate mocks for the base ledger, external wallet and prover seams

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use alloy::primitives::{keccak256, Address, Bytes, B256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;

use crate::commitment::{StoredCommitment, UnspentCommitment};
use crate::error::{Result, SdkError};
use crate::ledger::{BaseLedgerRpc, ExternalWallet, LedgerReceipt};
use crate::prover::{
    Balance, BurnRequest, DepositRequest, L2Transaction, ProverClient, TokeniseRequest,
    TransactionInfo, TransactionResponse, TransferRequest, TransformTransferRequest,
    WithdrawRequest, ZkpKeys,
};
use crate::types::L2TxHash;

/// Well-known development key (first hardhat/anvil account)
pub const TEST_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const TEST_CHAIN_ID: u64 = 1337;
pub const TEST_BLOCK_TIMESTAMP: u64 = 1_700_000_000;
pub const TEST_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

pub fn test_shield_address() -> Address {
    Address::repeat_byte(0x5f)
}

pub fn test_keys() -> ZkpKeys {
    ZkpKeys {
        root_key: "0x0a".to_string(),
        nullifier_key: "0x0b".to_string(),
        zkp_private_key: "0x0c".to_string(),
        zkp_public_key: vec!["0x01".to_string(), "0x02".to_string()],
        compressed_zkp_public_key: "0xpkd".to_string(),
    }
}

pub struct MockLedgerRpc {
    pub listening: AtomicBool,
    pub fail_gas_price: AtomicBool,
    pub pending_count: AtomicU64,
    pub block_timestamp: AtomicU64,
    pub gas_estimate: u64,
    submitted: Mutex<Vec<Bytes>>,
    rejected: Mutex<HashSet<Bytes>>,
    reverted: Mutex<HashSet<B256>>,
    withheld: Mutex<HashSet<B256>>,
    receipt_polls: AtomicUsize,
}

impl MockLedgerRpc {
    pub fn new() -> Self {
        Self {
            listening: AtomicBool::new(true),
            fail_gas_price: AtomicBool::new(false),
            pending_count: AtomicU64::new(0),
            block_timestamp: AtomicU64::new(TEST_BLOCK_TIMESTAMP),
            gas_estimate: 210_000,
            submitted: Mutex::new(Vec::new()),
            rejected: Mutex::new(HashSet::new()),
            reverted: Mutex::new(HashSet::new()),
            withheld: Mutex::new(HashSet::new()),
            receipt_polls: AtomicUsize::new(0),
        }
    }

    /// Raw transactions accepted by `send_raw_transaction`, in order
    pub fn submitted(&self) -> Vec<Bytes> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn reject_raw(&self, raw: Bytes) {
        self.rejected.lock().unwrap().insert(raw);
    }

    pub fn revert(&self, tx_hash: B256) {
        self.reverted.lock().unwrap().insert(tx_hash);
    }

    pub fn withhold_receipt(&self, tx_hash: B256) {
        self.withheld.lock().unwrap().insert(tx_hash);
    }

    pub fn receipt_polls(&self) -> usize {
        self.receipt_polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BaseLedgerRpc for MockLedgerRpc {
    async fn is_listening(&self) -> Result<bool> {
        Ok(self.listening.load(Ordering::SeqCst))
    }

    async fn gas_price(&self) -> Result<u128> {
        if self.fail_gas_price.load(Ordering::SeqCst) {
            return Err(SdkError::RpcUnavailable("gas price unavailable".to_string()));
        }
        Ok(1_000_000_000)
    }

    async fn estimate_gas(&self, _tx: &TransactionRequest) -> Result<u64> {
        Ok(self.gas_estimate)
    }

    async fn pending_transaction_count(&self, _address: Address) -> Result<u64> {
        // Yield so concurrent signers interleave at this await point
        tokio::task::yield_now().await;
        Ok(self.pending_count.load(Ordering::SeqCst))
    }

    async fn send_raw_transaction(&self, raw: &[u8]) -> Result<B256> {
        let raw = Bytes::copy_from_slice(raw);
        if self.rejected.lock().unwrap().contains(&raw) {
            return Err(SdkError::RpcUnavailable("nonce too low".to_string()));
        }
        let tx_hash = keccak256(&raw);
        self.submitted.lock().unwrap().push(raw);
        Ok(tx_hash)
    }

    async fn transaction_receipt(&self, tx_hash: B256) -> Result<Option<LedgerReceipt>> {
        self.receipt_polls.fetch_add(1, Ordering::SeqCst);
        if self.withheld.lock().unwrap().contains(&tx_hash) {
            return Ok(None);
        }
        let position = self
            .submitted
            .lock()
            .unwrap()
            .iter()
            .position(|raw| keccak256(raw) == tx_hash);
        Ok(position.map(|index| LedgerReceipt {
            tx_hash,
            block_number: Some(100 + index as u64),
            success: !self.reverted.lock().unwrap().contains(&tx_hash),
        }))
    }

    async fn latest_block_timestamp(&self) -> Result<u64> {
        Ok(self.block_timestamp.load(Ordering::SeqCst))
    }
}

pub struct MockExternalWallet {
    pub fail: AtomicBool,
    drafts: Mutex<Vec<TransactionRequest>>,
}

impl MockExternalWallet {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            drafts: Mutex::new(Vec::new()),
        }
    }

    pub fn drafts(&self) -> Vec<TransactionRequest> {
        self.drafts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExternalWallet for MockExternalWallet {
    async fn send_transaction(&self, tx: TransactionRequest) -> Result<B256> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SdkError::RpcUnavailable("user rejected request".to_string()));
        }
        let nonce = tx.nonce.unwrap_or_default();
        self.drafts.lock().unwrap().push(tx);
        Ok(keccak256(nonce.to_be_bytes()))
    }
}

/// Calldata every on-chain mock response carries
pub const MOCK_TX_DATA: &str = "0xdeadbeef";

/// Prover stand-in. Hands out payloads the way the real coordinator does:
/// on-chain operations get calldata, off-chain ones only an L2 transaction.
pub struct MockProverClient {
    calls: Mutex<Vec<String>>,
    transfers: Mutex<Vec<TransferRequest>>,
    transforms: Mutex<Vec<TransformTransferRequest>>,
    stored: Mutex<Vec<StoredCommitment>>,
    /// Make the next transaction-building call fail with this status
    fail_status: Mutex<Option<u16>>,
    /// Leave `txDataToSign` out even where an on-chain leg is expected
    pub omit_payload: AtomicBool,
    pub alive: AtomicBool,
    counter: AtomicUsize,
}

impl MockProverClient {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            transfers: Mutex::new(Vec::new()),
            transforms: Mutex::new(Vec::new()),
            stored: Mutex::new(Vec::new()),
            fail_status: Mutex::new(None),
            omit_payload: AtomicBool::new(false),
            alive: AtomicBool::new(true),
            counter: AtomicUsize::new(0),
        }
    }

    /// Endpoints called so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn transfers(&self) -> Vec<TransferRequest> {
        self.transfers.lock().unwrap().clone()
    }

    pub fn transforms(&self) -> Vec<TransformTransferRequest> {
        self.transforms.lock().unwrap().clone()
    }

    pub fn stored(&self) -> Vec<StoredCommitment> {
        self.stored.lock().unwrap().clone()
    }

    pub fn store(&self, commitment: StoredCommitment) {
        self.stored.lock().unwrap().push(commitment);
    }

    pub fn fail_next(&self, status: u16) {
        *self.fail_status.lock().unwrap() = Some(status);
    }

    fn record(&self, endpoint: &str) {
        self.calls.lock().unwrap().push(endpoint.to_string());
    }

    fn respond(
        &self,
        endpoint: &str,
        on_chain: bool,
        with_transaction: bool,
    ) -> Result<TransactionResponse> {
        self.record(endpoint);
        if let Some(status) = self.fail_status.lock().unwrap().take() {
            return Err(SdkError::RemoteService {
                endpoint: endpoint.to_string(),
                status,
                body: "scripted failure".to_string(),
            });
        }

        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let tx_data_to_sign = (on_chain && !self.omit_payload.load(Ordering::SeqCst))
            .then(|| MOCK_TX_DATA.to_string());
        let transaction = with_transaction.then(|| L2Transaction {
            transaction_hash: L2TxHash(format!("0xl2{}{}", endpoint, n)),
            ..L2Transaction::default()
        });
        Ok(TransactionResponse {
            tx_data_to_sign,
            transaction,
        })
    }
}

#[async_trait]
impl ProverClient for MockProverClient {
    async fn health_check(&self) -> Result<bool> {
        self.record("healthcheck");
        if self.alive.load(Ordering::SeqCst) {
            Ok(true)
        } else {
            Err(SdkError::RemoteService {
                endpoint: "healthcheck".to_string(),
                status: 503,
                body: String::new(),
            })
        }
    }

    async fn contract_address(&self, name: &str) -> Result<Address> {
        self.record(&format!("contract-address/{}", name));
        Ok(test_shield_address())
    }

    async fn generate_zkp_keys(&self, _mnemonic: &str, _address_index: u32) -> Result<ZkpKeys> {
        self.record("generate-zkp-keys");
        Ok(test_keys())
    }

    async fn subscribe_incoming_viewing_keys(&self, _keys: &ZkpKeys) -> Result<()> {
        self.record("incoming-viewing-key");
        Ok(())
    }

    async fn deposit(&self, _request: &DepositRequest) -> Result<TransactionResponse> {
        self.respond("deposit", true, true)
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TransactionResponse> {
        self.transfers.lock().unwrap().push(request.clone());
        self.respond("transfer", !request.offchain, true)
    }

    async fn withdraw(&self, request: &WithdrawRequest) -> Result<TransactionResponse> {
        self.respond("withdraw", !request.offchain, true)
    }

    async fn finalise_withdrawal(
        &self,
        _withdraw_tx_hash: &L2TxHash,
    ) -> Result<TransactionResponse> {
        self.respond("finalise-withdrawal", true, false)
    }

    async fn tokenise(&self, _request: &TokeniseRequest) -> Result<TransactionResponse> {
        self.respond("tokenise", false, true)
    }

    async fn burn(&self, _request: &BurnRequest) -> Result<TransactionResponse> {
        self.respond("burn", false, true)
    }

    async fn transform_transfer(
        &self,
        request: &TransformTransferRequest,
    ) -> Result<TransactionResponse> {
        self.transforms.lock().unwrap().push(request.clone());
        self.respond("transformTransfer", false, true)
    }

    async fn pending_deposits(
        &self,
        _compressed_zkp_public_key: &str,
        _erc_list: &[String],
    ) -> Result<Option<Balance>> {
        self.record("commitment/pending-deposit");
        Ok(None)
    }

    async fn balances(
        &self,
        _compressed_zkp_public_key: &str,
        _erc_list: &[String],
    ) -> Result<Balance> {
        self.record("commitment/balance");
        Ok(serde_json::from_str(r#"{"0xerc20": 150}"#)?)
    }

    async fn pending_spent(
        &self,
        _compressed_zkp_public_key: &str,
        _erc_list: &[String],
    ) -> Result<Option<Balance>> {
        self.record("commitment/pending-spent");
        Ok(None)
    }

    async fn unspent_commitments(
        &self,
        compressed_zkp_public_key: &str,
        _erc_list: &[String],
    ) -> Result<HashMap<String, Vec<UnspentCommitment>>> {
        self.record("commitment/commitments");
        let mut by_token: HashMap<String, Vec<UnspentCommitment>> = HashMap::new();
        for record in self.stored().iter().filter(|record| {
            record.compressed_zkp_public_key == compressed_zkp_public_key && record.is_spendable()
        }) {
            let unspent = record.to_unspent();
            by_token
                .entry(unspent.erc_address.clone())
                .or_default()
                .push(unspent);
        }
        Ok(by_token)
    }

    async fn commitments_by_compressed_keys(
        &self,
        compressed_zkp_public_keys: &[String],
    ) -> Result<Vec<StoredCommitment>> {
        self.record("commitment/compressedZkpPublicKeys");
        if compressed_zkp_public_keys.is_empty() {
            return Err(SdkError::InvalidRequest("empty key list".to_string()));
        }
        Ok(self
            .stored()
            .into_iter()
            .filter(|record| compressed_zkp_public_keys.contains(&record.compressed_zkp_public_key))
            .collect())
    }

    async fn save_commitments(&self, commitments: &[StoredCommitment]) -> Result<String> {
        self.record("commitment/save");
        self.stored.lock().unwrap().extend_from_slice(commitments);
        Ok(format!("{} commitments saved", commitments.len()))
    }

    async fn transactions_info(
        &self,
        transaction_hashes: &[String],
    ) -> Result<Vec<TransactionInfo>> {
        self.record("transaction/info");
        Ok(transaction_hashes
            .iter()
            .map(|hash| TransactionInfo {
                block_number: "10".to_string(),
                block_number_l2: "1".to_string(),
                transaction_hash: hash.clone(),
                transaction_hash_l1: "0x01".to_string(),
            })
            .collect())
    }
}
