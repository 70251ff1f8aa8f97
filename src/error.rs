//! Error types for shieldlink

use thiserror::Error;

/// Main error type for shieldlink
#[derive(Error, Debug)]
pub enum SdkError {
    // Commitment errors
    #[error("Malformed commitment preimage: {0}")]
    MalformedPreimage(String),

    #[error("Commitment hash mismatch: expected {expected}, computed {computed}")]
    CommitmentMismatch { expected: String, computed: String },

    // Base ledger errors
    #[error("Base ledger RPC unavailable: {0}")]
    RpcUnavailable(String),

    #[error("Signing failed after nonce {nonce} was reserved: {reason}")]
    Signing { nonce: u64, reason: String },

    #[error("Broadcast queue closed")]
    QueueClosed,

    // Atomic lock errors
    #[error("Atomic lock construction exhausted after {attempts} attempts")]
    LockConstructionExhausted { attempts: u32 },

    #[error("Atomic lock needs at least one leg")]
    EmptyLockSet,

    #[error("Random sampling failed: {0}")]
    Sampling(String),

    // Prover/coordinator errors
    #[error("Remote service error at {endpoint} (status {status}): {body}")]
    RemoteService {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Response from {0} carried no on-chain payload to sign")]
    MissingOnChainPayload(String),

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    // Operation state machine errors
    #[error("Invalid operation state transition: {0}")]
    InvalidStateTransition(String),

    // Key material errors
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    // Configuration errors
    #[error("Invalid configuration value: {0}")]
    InvalidConfig(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

impl SdkError {
    /// Whether the error was raised before any nonce was reserved.
    pub fn consumed_nonce(&self) -> bool {
        matches!(self, SdkError::Signing { .. })
    }
}

/// Result type alias for shieldlink operations
pub type Result<T> = std::result::Result<T, SdkError>;
