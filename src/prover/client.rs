//! HTTP client for the remote prover/coordinator
//!
//! Transaction and commitment endpoints go to the transaction worker when
//! one is configured, viewing key subscription goes to the block-proposed
//! worker, everything else to the main client API.

use std::collections::HashMap;

use alloy::primitives::Address;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::types::{
    Balance, BurnRequest, ContractAddressResponse, DepositRequest, FinaliseWithdrawalRequest,
    GenerateKeysRequest, IncomingViewingKeyRequest, TokeniseRequest, TransactionInfo,
    TransactionResponse, TransferRequest, TransformTransferRequest, WithdrawRequest, ZkpKeys,
};
use crate::commitment::{StoredCommitment, UnspentCommitment};
use crate::config::SdkConfig;
use crate::error::{Result, SdkError};
use crate::types::L2TxHash;

/// Operations the orchestrator and account session need from the prover
#[async_trait]
pub trait ProverClient: Send + Sync {
    async fn health_check(&self) -> Result<bool>;

    /// Address of a named contract deployed on the base ledger
    async fn contract_address(&self, name: &str) -> Result<Address>;

    async fn generate_zkp_keys(&self, mnemonic: &str, address_index: u32) -> Result<ZkpKeys>;

    /// Register the account's viewing keys so incoming transfers get decrypted
    async fn subscribe_incoming_viewing_keys(&self, keys: &ZkpKeys) -> Result<()>;

    async fn deposit(&self, request: &DepositRequest) -> Result<TransactionResponse>;

    async fn transfer(&self, request: &TransferRequest) -> Result<TransactionResponse>;

    async fn withdraw(&self, request: &WithdrawRequest) -> Result<TransactionResponse>;

    async fn finalise_withdrawal(&self, withdraw_tx_hash: &L2TxHash)
        -> Result<TransactionResponse>;

    async fn tokenise(&self, request: &TokeniseRequest) -> Result<TransactionResponse>;

    async fn burn(&self, request: &BurnRequest) -> Result<TransactionResponse>;

    async fn transform_transfer(
        &self,
        request: &TransformTransferRequest,
    ) -> Result<TransactionResponse>;

    /// Deposits not yet included in an L2 block, `None` when there are none
    async fn pending_deposits(
        &self,
        compressed_zkp_public_key: &str,
        erc_list: &[String],
    ) -> Result<Option<Balance>>;

    async fn balances(&self, compressed_zkp_public_key: &str, erc_list: &[String])
        -> Result<Balance>;

    /// Commitments spent in transactions not yet included in an L2 block
    async fn pending_spent(
        &self,
        compressed_zkp_public_key: &str,
        erc_list: &[String],
    ) -> Result<Option<Balance>>;

    /// Spendable commitments keyed by token contract address
    async fn unspent_commitments(
        &self,
        compressed_zkp_public_key: &str,
        erc_list: &[String],
    ) -> Result<HashMap<String, Vec<UnspentCommitment>>>;

    async fn commitments_by_compressed_keys(
        &self,
        compressed_zkp_public_keys: &[String],
    ) -> Result<Vec<StoredCommitment>>;

    /// Import commitments into the prover's store, returns its success message
    async fn save_commitments(&self, commitments: &[StoredCommitment]) -> Result<String>;

    async fn transactions_info(&self, transaction_hashes: &[String])
        -> Result<Vec<TransactionInfo>>;
}

/// Which deployment of the client API serves an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Worker {
    Main,
    Transactions,
    BlockProposed,
}

#[derive(Deserialize)]
struct BalanceByKey {
    #[serde(default)]
    balance: Option<HashMap<String, Balance>>,
}

#[derive(Deserialize)]
struct BalanceOnly {
    #[serde(default)]
    balance: Balance,
}

#[derive(Deserialize)]
struct CommitmentsByKey {
    #[serde(default)]
    commitments: Option<HashMap<String, HashMap<String, Vec<UnspentCommitment>>>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitmentsByKeyList {
    #[serde(default)]
    commitments_by_list_of_compressed_zkp_public_key: Vec<StoredCommitment>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SaveCommitmentsResponse {
    #[serde(default)]
    success_message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransactionsInfoRequest<'a> {
    transaction_hashes: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionsInfoResponse {
    #[serde(default)]
    transactions_info: Vec<TransactionInfo>,
}

#[derive(Debug, Clone)]
pub struct HttpProverClient {
    http: reqwest::Client,
    api_url: String,
    tx_url: Option<String>,
    bp_url: Option<String>,
}

impl HttpProverClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
            tx_url: None,
            bp_url: None,
        }
    }

    pub fn from_config(config: &SdkConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.client_api_url.clone(),
            tx_url: config.client_api_tx_url.clone(),
            bp_url: config.client_api_bp_url.clone(),
        }
    }

    pub fn with_tx_worker(mut self, url: impl Into<String>) -> Self {
        self.tx_url = Some(url.into());
        self
    }

    pub fn with_bp_worker(mut self, url: impl Into<String>) -> Self {
        self.bp_url = Some(url.into());
        self
    }

    fn url(&self, worker: Worker, endpoint: &str) -> String {
        let base = match worker {
            Worker::Main => &self.api_url,
            Worker::Transactions => self.tx_url.as_ref().unwrap_or(&self.api_url),
            Worker::BlockProposed => self.bp_url.as_ref().unwrap_or(&self.api_url),
        };
        format!("{}/{}", base.trim_end_matches('/'), endpoint)
    }

    /// Turn a non-success status into `RemoteService`, otherwise decode JSON
    async fn read_json<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let response = Self::check_status(endpoint, response).await?;
        let body = response.text().await?;
        info!("Client at {} responded", endpoint);
        Ok(serde_json::from_str(&body)?)
    }

    async fn check_status(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        error!("Client at {} failed with status {}", endpoint, status);
        Err(SdkError::RemoteService {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, worker: Worker, endpoint: &str) -> Result<T> {
        debug!("Calling client at {}", endpoint);
        let response = self.http.get(self.url(worker, endpoint)).send().await?;
        Self::read_json(endpoint, response).await
    }

    async fn post_json<B, T>(&self, worker: Worker, endpoint: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        debug!("Calling client at {}", endpoint);
        let response = self
            .http
            .post(self.url(worker, endpoint))
            .json(body)
            .send()
            .await?;
        Self::read_json(endpoint, response).await
    }

    /// GET a commitment query filtered by owner key and token list
    async fn query_commitments<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        compressed_zkp_public_key: &str,
        erc_list: &[String],
    ) -> Result<T> {
        debug!("Calling client at {}", endpoint);
        let mut query = vec![("compressedZkpPublicKey", compressed_zkp_public_key)];
        query.extend(erc_list.iter().map(|erc| ("ercList", erc.as_str())));

        let response = self
            .http
            .get(self.url(Worker::Transactions, endpoint))
            .query(&query)
            .send()
            .await?;
        Self::read_json(endpoint, response).await
    }
}

#[async_trait]
impl ProverClient for HttpProverClient {
    async fn health_check(&self) -> Result<bool> {
        let endpoint = "healthcheck";
        debug!("Calling client at {}", endpoint);
        let response = self.http.get(self.url(Worker::Main, endpoint)).send().await?;
        Self::check_status(endpoint, response).await?;
        info!("Client at {} is alive", endpoint);
        Ok(true)
    }

    async fn contract_address(&self, name: &str) -> Result<Address> {
        let endpoint = format!("contract-address/{}", name);
        let response: ContractAddressResponse = self.get_json(Worker::Main, &endpoint).await?;
        response
            .address
            .parse::<Address>()
            .map_err(|e| SdkError::RemoteService {
                endpoint,
                status: 200,
                body: format!("unparseable address {}: {}", response.address, e),
            })
    }

    async fn generate_zkp_keys(&self, mnemonic: &str, address_index: u32) -> Result<ZkpKeys> {
        let request = GenerateKeysRequest {
            mnemonic,
            address_index,
        };
        self.post_json(Worker::Main, "generate-zkp-keys", &request)
            .await
    }

    async fn subscribe_incoming_viewing_keys(&self, keys: &ZkpKeys) -> Result<()> {
        let endpoint = "incoming-viewing-key";
        let request = IncomingViewingKeyRequest {
            zkp_private_keys: vec![keys.zkp_private_key.clone()],
            nullifier_keys: vec![keys.nullifier_key.clone()],
        };
        debug!("Calling client at {}", endpoint);
        let response = self
            .http
            .post(self.url(Worker::BlockProposed, endpoint))
            .json(&request)
            .send()
            .await?;
        Self::check_status(endpoint, response).await?;
        info!(
            "Subscribed incoming viewing key for {}",
            keys.compressed_zkp_public_key
        );
        Ok(())
    }

    async fn deposit(&self, request: &DepositRequest) -> Result<TransactionResponse> {
        self.post_json(Worker::Transactions, "deposit", request).await
    }

    async fn transfer(&self, request: &TransferRequest) -> Result<TransactionResponse> {
        self.post_json(Worker::Transactions, "transfer", request).await
    }

    async fn withdraw(&self, request: &WithdrawRequest) -> Result<TransactionResponse> {
        self.post_json(Worker::Transactions, "withdraw", request).await
    }

    async fn finalise_withdrawal(
        &self,
        withdraw_tx_hash: &L2TxHash,
    ) -> Result<TransactionResponse> {
        let request = FinaliseWithdrawalRequest {
            transaction_hash: withdraw_tx_hash.clone(),
        };
        self.post_json(Worker::Main, "finalise-withdrawal", &request)
            .await
    }

    async fn tokenise(&self, request: &TokeniseRequest) -> Result<TransactionResponse> {
        self.post_json(Worker::Transactions, "tokenise", request).await
    }

    async fn burn(&self, request: &BurnRequest) -> Result<TransactionResponse> {
        self.post_json(Worker::Transactions, "burn", request).await
    }

    async fn transform_transfer(
        &self,
        request: &TransformTransferRequest,
    ) -> Result<TransactionResponse> {
        self.post_json(Worker::Transactions, "transformTransfer", request)
            .await
    }

    async fn pending_deposits(
        &self,
        compressed_zkp_public_key: &str,
        erc_list: &[String],
    ) -> Result<Option<Balance>> {
        let response: BalanceByKey = self
            .query_commitments(
                "commitment/pending-deposit",
                compressed_zkp_public_key,
                erc_list,
            )
            .await?;
        Ok(response
            .balance
            .and_then(|mut by_key| by_key.remove(compressed_zkp_public_key)))
    }

    async fn balances(
        &self,
        compressed_zkp_public_key: &str,
        erc_list: &[String],
    ) -> Result<Balance> {
        let response: BalanceOnly = self
            .query_commitments("commitment/balance", compressed_zkp_public_key, erc_list)
            .await?;
        Ok(response.balance)
    }

    async fn pending_spent(
        &self,
        compressed_zkp_public_key: &str,
        erc_list: &[String],
    ) -> Result<Option<Balance>> {
        let response: BalanceByKey = self
            .query_commitments(
                "commitment/pending-spent",
                compressed_zkp_public_key,
                erc_list,
            )
            .await?;
        Ok(response
            .balance
            .and_then(|mut by_key| by_key.remove(compressed_zkp_public_key)))
    }

    async fn unspent_commitments(
        &self,
        compressed_zkp_public_key: &str,
        erc_list: &[String],
    ) -> Result<HashMap<String, Vec<UnspentCommitment>>> {
        let response: CommitmentsByKey = self
            .query_commitments(
                "commitment/commitments",
                compressed_zkp_public_key,
                erc_list,
            )
            .await?;
        Ok(response
            .commitments
            .and_then(|mut by_key| by_key.remove(compressed_zkp_public_key))
            .unwrap_or_default())
    }

    async fn commitments_by_compressed_keys(
        &self,
        compressed_zkp_public_keys: &[String],
    ) -> Result<Vec<StoredCommitment>> {
        if compressed_zkp_public_keys.is_empty() {
            return Err(SdkError::InvalidRequest(
                "at least one compressed zkp public key is required".to_string(),
            ));
        }
        let response: CommitmentsByKeyList = self
            .post_json(
                Worker::Transactions,
                "commitment/compressedZkpPublicKeys",
                compressed_zkp_public_keys,
            )
            .await?;
        Ok(response.commitments_by_list_of_compressed_zkp_public_key)
    }

    async fn save_commitments(&self, commitments: &[StoredCommitment]) -> Result<String> {
        let response: SaveCommitmentsResponse = self
            .post_json(Worker::Transactions, "commitment/save", commitments)
            .await?;
        Ok(response.success_message)
    }

    async fn transactions_info(
        &self,
        transaction_hashes: &[String],
    ) -> Result<Vec<TransactionInfo>> {
        let request = TransactionsInfoRequest { transaction_hashes };
        let response: TransactionsInfoResponse = self
            .post_json(Worker::Transactions, "transaction/info", &request)
            .await?;
        Ok(response.transactions_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prover::types::RecipientData;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    /// Serve one canned HTTP response and hand back the raw request
    async fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status_line,
            body.len(),
            body
        );

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (url, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn keys() -> ZkpKeys {
        ZkpKeys {
            root_key: "0xroot".to_string(),
            nullifier_key: "0xnsk".to_string(),
            zkp_private_key: "0xivk".to_string(),
            zkp_public_key: vec!["0x1".to_string(), "0x2".to_string()],
            compressed_zkp_public_key: "0xpkd".to_string(),
        }
    }

    #[test]
    fn test_worker_routing() {
        let client = HttpProverClient::new("http://client/");
        assert_eq!(
            client.url(Worker::Transactions, "transfer"),
            "http://client/transfer"
        );

        let client = client
            .with_tx_worker("http://tx")
            .with_bp_worker("http://bp");
        assert_eq!(client.url(Worker::Main, "healthcheck"), "http://client/healthcheck");
        assert_eq!(client.url(Worker::Transactions, "deposit"), "http://tx/deposit");
        assert_eq!(
            client.url(Worker::BlockProposed, "incoming-viewing-key"),
            "http://bp/incoming-viewing-key"
        );
    }

    #[test]
    fn test_from_config_uses_optional_workers() {
        let config = SdkConfig::new("http://client", "http://node").with_tx_worker("http://tx");
        let client = HttpProverClient::from_config(&config);
        assert_eq!(client.url(Worker::Transactions, "burn"), "http://tx/burn");
        assert_eq!(
            client.url(Worker::BlockProposed, "incoming-viewing-key"),
            "http://client/incoming-viewing-key"
        );
    }

    #[tokio::test]
    async fn test_contract_address() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"address": "0x5fbdb2315678afecb367f032d93f642f64180aa3"}"#,
        )
        .await;
        let client = HttpProverClient::new(url);

        let address = client.contract_address("Shield").await.unwrap();
        assert_eq!(
            address,
            "0x5fbdb2315678afecb367f032d93f642f64180aa3"
                .parse::<Address>()
                .unwrap()
        );
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /contract-address/Shield "));
    }

    #[tokio::test]
    async fn test_non_success_becomes_remote_service_error() {
        let (url, server) = serve_once("500 Internal Server Error", "no commitments").await;
        let client = HttpProverClient::new(url);

        let request = TransferRequest {
            erc_address: "0xabc".to_string(),
            root_key: "0xroot".to_string(),
            recipient_data: RecipientData::single("0xpkd", "1"),
            token_id: "0x00".to_string(),
            fee: "0".to_string(),
            offchain: true,
            provided_commitments: vec![],
            provided_commitments_fee: vec![],
            regulator_url: None,
            atomic_hash: None,
            atomic_timestamp: None,
            salt: None,
        };
        let err = client.transfer(&request).await.unwrap_err();
        match err {
            SdkError::RemoteService {
                endpoint,
                status,
                body,
            } => {
                assert_eq!(endpoint, "transfer");
                assert_eq!(status, 500);
                assert_eq!(body, "no commitments");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /transfer "));
        assert!(raw.contains("\"offchain\":true"));
    }

    #[tokio::test]
    async fn test_pending_deposits_picks_own_key() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"balance": {"0xpkd": {"0xerc20": 10}, "0xother": {"0xerc20": 99}}}"#,
        )
        .await;
        let client = HttpProverClient::new(url);

        let pending = client
            .pending_deposits("0xpkd", &["0xerc20".to_string()])
            .await
            .unwrap()
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending.contains_key("0xerc20"));

        let raw = server.await.unwrap();
        assert!(raw.starts_with("GET /commitment/pending-deposit?"));
        assert!(raw.contains("compressedZkpPublicKey=0xpkd"));
        assert!(raw.contains("ercList=0xerc20"));
    }

    #[tokio::test]
    async fn test_viewing_key_subscription_body() {
        let (url, server) = serve_once("200 OK", "\"success\"").await;
        let client = HttpProverClient::new("http://unused.invalid").with_bp_worker(url);

        client.subscribe_incoming_viewing_keys(&keys()).await.unwrap();

        let raw = server.await.unwrap();
        assert!(raw.starts_with("POST /incoming-viewing-key "));
        assert!(raw.contains(r#""zkpPrivateKeys":["0xivk"]"#));
        assert!(raw.contains(r#""nullifierKeys":["0xnsk"]"#));
    }

    #[tokio::test]
    async fn test_empty_key_list_rejected_locally() {
        let client = HttpProverClient::new("http://unused.invalid");
        let err = client.commitments_by_compressed_keys(&[]).await.unwrap_err();
        assert!(matches!(err, SdkError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_transactions_info() {
        let (url, server) = serve_once(
            "200 OK",
            r#"{"transactionsInfo": [{"blockNumber": "5", "blockNumberL2": "1", "transactionHash": "0xa", "transactionHashL1": "0xb"}]}"#,
        )
        .await;
        let client = HttpProverClient::new(url);

        let info = client
            .transactions_info(&["0xa".to_string()])
            .await
            .unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].transaction_hash, "0xa");

        let raw = server.await.unwrap();
        assert!(raw.contains(r#"{"transactionHashes":["0xa"]}"#));
    }

    #[tokio::test]
    async fn test_unreachable_client_is_transport_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let client = HttpProverClient::new(url);
        assert!(matches!(
            client.health_check().await,
            Err(SdkError::Transport(_))
        ));
    }
}
