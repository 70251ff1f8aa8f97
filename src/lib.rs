//! shieldlink client library
//!
//! Moves value between an EVM base ledger and an off-chain privacy ledger
//! run by a remote prover/coordinator:
//! - Poseidon commitments over the BN254 scalar field
//! - Nonce-safe base ledger signing with a background broadcast queue
//! - Hash-locked atomic groups of L2 transfers
//! - Account sessions over the prover's HTTP API

pub mod account;
pub mod atomic;
pub mod commitment;
pub mod config;
pub mod error;
pub mod field;
pub mod ledger;
pub mod orchestrator;
pub mod prover;
pub mod telemetry;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use account::Account;
pub use atomic::{AtomicLockCoordinator, AtomicLockSet, LockLeg};
pub use commitment::{Commitment, CommitmentPreimage, SerializedCommitment};
pub use config::SdkConfig;
pub use error::{Result, SdkError};
pub use ledger::{BroadcastEvent, BroadcastQueue, NonceSafeSigner, SignedTransaction};
pub use orchestrator::TransactionOrchestrator;
pub use prover::{HttpProverClient, ProverClient};
pub use types::{ErcStandard, L2TxHash, Token, TransactionHashes};
