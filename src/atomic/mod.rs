//! Hash-lock binding for multi-leg L2 transfers

pub mod coordinator;
pub mod salt;

pub use coordinator::{lock_candidate, AtomicLockCoordinator, AtomicLockSet, LockLeg};
pub use salt::{RandomSalts, SaltSource};
