//! Shared lock value for a group of L2 transfer legs
//!
//! The lock value is the XOR of every leg's commitment hash and the base
//! ledger block timestamp. It must be a field element to be usable by the
//! coordinator, so over-order candidates are resampled with fresh salts for
//! every leg, a bounded number of times.

use alloy::primitives::U256;
use tracing::{debug, info, warn};

use super::salt::{RandomSalts, SaltSource};
use crate::commitment::{Commitment, CommitmentPreimage};
use crate::config::LockConfig;
use crate::error::{Result, SdkError};
use crate::field::BN254_SCALAR_ORDER;
use crate::types::to_hex32;

/// One leg of an atomic group: the transfer's output commitment and who
/// receives it. The salt is the one inside the commitment preimage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockLeg {
    pub commitment: Commitment,
    /// Recipient's compressed zkp public key
    pub recipient_key: String,
}

impl LockLeg {
    pub fn new(commitment: Commitment, recipient_key: impl Into<String>) -> Self {
        Self {
            commitment,
            recipient_key: recipient_key.into(),
        }
    }

    /// Build a leg from its preimage
    pub fn from_preimage(
        preimage: CommitmentPreimage,
        recipient_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::new(Commitment::compute(preimage)?, recipient_key))
    }

    pub fn salt(&self) -> U256 {
        self.commitment.preimage().salt
    }

    fn with_salt(&self, salt: U256) -> Result<Self> {
        let mut preimage = self.commitment.preimage().clone();
        preimage.salt = salt;
        Ok(Self {
            commitment: Commitment::compute(preimage)?,
            recipient_key: self.recipient_key.clone(),
        })
    }
}

/// Accepted lock for an atomic group. Immutable once built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AtomicLockSet {
    lock_value: U256,
    expiry_timestamp: u64,
    legs: Vec<LockLeg>,
}

impl AtomicLockSet {
    pub fn lock_value(&self) -> U256 {
        self.lock_value
    }

    /// 32-byte hex form sent as `atomicHash`
    pub fn lock_hex(&self) -> String {
        to_hex32(&self.lock_value)
    }

    pub fn expiry_timestamp(&self) -> u64 {
        self.expiry_timestamp
    }

    pub fn legs(&self) -> &[LockLeg] {
        &self.legs
    }

    /// Salt that leg `index` must reuse in its transfer
    pub fn leg_salt(&self, index: usize) -> Option<U256> {
        self.legs.get(index).map(LockLeg::salt)
    }

    pub fn is_expired(&self, now: u64) -> bool {
        now >= self.expiry_timestamp
    }
}

/// XOR of all leg hashes and the timestamp
pub fn lock_candidate(legs: &[LockLeg], block_timestamp: u64) -> U256 {
    legs.iter()
        .fold(U256::from(block_timestamp), |acc, leg| {
            acc ^ leg.commitment.hash()
        })
}

#[derive(Debug, Clone)]
pub struct AtomicLockCoordinator {
    max_attempts: u32,
    expiry_horizon_secs: u64,
}

impl Default for AtomicLockCoordinator {
    fn default() -> Self {
        Self::new(&LockConfig::default())
    }
}

impl AtomicLockCoordinator {
    pub fn new(config: &LockConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            expiry_horizon_secs: config.expiry_horizon_secs,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Build a lock, resampling with random salts when needed
    pub fn build_lock(&self, legs: Vec<LockLeg>, block_timestamp: u64) -> Result<AtomicLockSet> {
        self.build_lock_with(legs, block_timestamp, &mut RandomSalts)
    }

    /// Build a lock, drawing resample salts from `salts`.
    ///
    /// At most `max_attempts` candidates are evaluated, the first one from
    /// the salts the legs arrived with.
    pub fn build_lock_with(
        &self,
        legs: Vec<LockLeg>,
        block_timestamp: u64,
        salts: &mut dyn SaltSource,
    ) -> Result<AtomicLockSet> {
        if legs.is_empty() {
            return Err(SdkError::EmptyLockSet);
        }

        let mut legs = legs;
        for attempt in 1..=self.max_attempts {
            let candidate = lock_candidate(&legs, block_timestamp);
            if candidate < BN254_SCALAR_ORDER {
                let expiry_timestamp = block_timestamp.saturating_add(self.expiry_horizon_secs);
                info!(
                    "Atomic lock for {} legs accepted on attempt {}, expires at {}",
                    legs.len(),
                    attempt,
                    expiry_timestamp
                );
                return Ok(AtomicLockSet {
                    lock_value: candidate,
                    expiry_timestamp,
                    legs,
                });
            }

            debug!("Lock candidate over field order on attempt {}", attempt);
            if attempt < self.max_attempts {
                legs = legs
                    .iter()
                    .map(|leg| leg.with_salt(salts.next_salt()?))
                    .collect::<Result<Vec<_>>>()?;
            }
        }

        warn!(
            "Atomic lock construction gave up after {} attempts",
            self.max_attempts
        );
        Err(SdkError::LockConstructionExhausted {
            attempts: self.max_attempts,
        })
    }
}
