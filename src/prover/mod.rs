//! Remote prover/coordinator contract

pub mod client;
pub mod types;

pub use client::{HttpProverClient, ProverClient};
pub use types::*;
