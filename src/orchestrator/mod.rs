//! Operation orchestration across the prover, signer and broadcast queue

pub mod operations;
pub mod state;

pub use operations::{
    AtomicLegParams, AtomicTransferReceipt, BurnParams, DepositParams, TokeniseParams,
    TransactionOrchestrator, TransferParams, TransformTransferParams, WithdrawParams,
};
pub use state::{OperationKind, OperationSession, OperationState};
