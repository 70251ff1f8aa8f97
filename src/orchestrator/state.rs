//! Per-call operation state machine

use alloy::primitives::B256;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SdkError};
use crate::types::{L2TxHash, TransactionHashes};

/// Operations the orchestrator drives
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Deposit,
    Transfer,
    Withdraw,
    FinaliseWithdrawal,
    Tokenise,
    Burn,
    TransformTransfer,
}

impl OperationKind {
    /// Prover endpoint that builds this operation
    pub fn endpoint(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Transfer => "transfer",
            OperationKind::Withdraw => "withdraw",
            OperationKind::FinaliseWithdrawal => "finalise-withdrawal",
            OperationKind::Tokenise => "tokenise",
            OperationKind::Burn => "burn",
            OperationKind::TransformTransfer => "transformTransfer",
        }
    }

    /// Whether the operation has a base ledger leg to sign
    pub fn has_on_chain_leg(&self, offchain: bool) -> bool {
        match self {
            OperationKind::Deposit | OperationKind::FinaliseWithdrawal => true,
            OperationKind::Transfer | OperationKind::Withdraw => !offchain,
            OperationKind::Tokenise | OperationKind::Burn | OperationKind::TransformTransfer => {
                false
            }
        }
    }
}

/// Where an operation call currently is
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperationState {
    /// Prover answered
    Built { tx_hash_l2: Option<L2TxHash> },
    /// Base ledger transaction signed or handed to the external wallet
    SignedIfOnChain {
        tx_hash_l2: Option<L2TxHash>,
        tx_hash_l1: B256,
    },
    /// Signed transaction handed to the broadcast queue
    Enqueued {
        tx_hash_l2: Option<L2TxHash>,
        tx_hash_l1: B256,
    },
    /// Identifiers handed back to the caller
    Returned { hashes: TransactionHashes },
}

impl OperationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationState::Returned { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            OperationState::Built { .. } => "Built",
            OperationState::SignedIfOnChain { .. } => "SignedIfOnChain",
            OperationState::Enqueued { .. } => "Enqueued",
            OperationState::Returned { .. } => "Returned",
        }
    }
}

/// One orchestrated call, from prover response to returned hashes
#[derive(Clone, Debug)]
pub struct OperationSession {
    kind: OperationKind,
    offchain: bool,
    state: OperationState,
    history: Vec<&'static str>,
}

impl OperationSession {
    /// Start a session once the prover built the operation
    pub fn built(kind: OperationKind, offchain: bool, tx_hash_l2: Option<L2TxHash>) -> Self {
        let state = OperationState::Built { tx_hash_l2 };
        Self {
            kind,
            offchain,
            history: vec![state.name()],
            state,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn state(&self) -> &OperationState {
        &self.state
    }

    /// Names of every state visited, in order
    pub fn history(&self) -> &[&'static str] {
        &self.history
    }

    /// Whether the session must pass through signing before returning
    pub fn needs_signature(&self) -> bool {
        self.kind.has_on_chain_leg(self.offchain)
    }

    fn transition(&mut self, state: OperationState) {
        self.history.push(state.name());
        self.state = state;
    }

    fn invalid(&self, target: &str) -> SdkError {
        SdkError::InvalidStateTransition(format!(
            "{} cannot move from {} to {}",
            self.kind.endpoint(),
            self.state.name(),
            target
        ))
    }

    pub fn mark_signed(&mut self, tx_hash_l1: B256) -> Result<()> {
        let OperationState::Built { tx_hash_l2 } = &self.state else {
            return Err(self.invalid("SignedIfOnChain"));
        };
        if !self.needs_signature() {
            return Err(self.invalid("SignedIfOnChain"));
        }

        let tx_hash_l2 = tx_hash_l2.clone();
        self.transition(OperationState::SignedIfOnChain {
            tx_hash_l2,
            tx_hash_l1,
        });
        Ok(())
    }

    pub fn mark_enqueued(&mut self) -> Result<()> {
        let OperationState::SignedIfOnChain {
            tx_hash_l2,
            tx_hash_l1,
        } = &self.state
        else {
            return Err(self.invalid("Enqueued"));
        };

        let next = OperationState::Enqueued {
            tx_hash_l2: tx_hash_l2.clone(),
            tx_hash_l1: *tx_hash_l1,
        };
        self.transition(next);
        Ok(())
    }

    /// Close the session and produce the caller's identifiers
    pub fn finish(&mut self) -> Result<TransactionHashes> {
        let hashes = match &self.state {
            OperationState::Built { tx_hash_l2 } if !self.needs_signature() => TransactionHashes {
                tx_hash_l1: None,
                tx_hash_l2: tx_hash_l2.clone(),
            },
            OperationState::Enqueued {
                tx_hash_l2,
                tx_hash_l1,
            } => TransactionHashes {
                tx_hash_l1: Some(*tx_hash_l1),
                tx_hash_l2: tx_hash_l2.clone(),
            },
            _ => return Err(self.invalid("Returned")),
        };

        self.transition(OperationState::Returned {
            hashes: hashes.clone(),
        });
        Ok(hashes)
    }
}
