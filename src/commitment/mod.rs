//! Confidential-value commitments

pub mod model;
pub mod record;

pub use model::{Commitment, CommitmentPreimage, RawPreimage, SerializedCommitment};
pub use record::{filter_spendable, NullifierStatus, StoredCommitment, UnspentCommitment};
