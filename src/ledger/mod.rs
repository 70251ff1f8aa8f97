//! Base ledger access: RPC, nonce-safe signing and broadcast

pub mod alloy_rpc;
pub mod broadcast;
pub mod rpc;
pub mod signer;

pub use alloy_rpc::AlloyLedgerRpc;
pub use broadcast::{BroadcastEvent, BroadcastQueue};
pub use rpc::{BaseLedgerRpc, ExternalWallet, LedgerReceipt};
pub use signer::{NonceSafeSigner, SignedTransaction, SigningAuthority};
