//! Random scalars for salts and L2 token addresses

use alloy::primitives::U256;
use rand::RngCore;

use super::BN254_SCALAR_ORDER;
use crate::error::{Result, SdkError};

/// Rejection sampling ceiling
pub const MAX_SAMPLING_ATTEMPTS: u32 = 10_000;

/// Bits 252 and 253 set, marking a token address as L2-native
pub const L2_TOKEN_ADDRESS_FLAGS: U256 = U256::from_limbs([0, 0, 0, 0x3000_0000_0000_0000]);

/// Uniform non-zero scalar strictly below `max`
pub fn random_below<R: RngCore + ?Sized>(max: U256, rng: &mut R) -> Result<U256> {
    if max <= U256::from(1u64) {
        return Err(SdkError::Sampling(format!(
            "no non-zero value below {}",
            max
        )));
    }

    let width = max.bit_len().div_ceil(8);
    let mut buf = [0u8; 32];

    for _ in 0..MAX_SAMPLING_ATTEMPTS {
        rng.fill_bytes(&mut buf[..width]);
        let candidate = U256::from_be_slice(&buf[..width]);
        if candidate < max && !candidate.is_zero() {
            return Ok(candidate);
        }
    }

    Err(SdkError::Sampling(format!(
        "no value below {} after {} attempts",
        max, MAX_SAMPLING_ATTEMPTS
    )))
}

/// Fresh commitment salt drawn from the given generator
pub fn random_salt_with<R: RngCore + ?Sized>(rng: &mut R) -> Result<U256> {
    random_below(BN254_SCALAR_ORDER, rng)
}

/// Fresh commitment salt from the thread-local generator
pub fn random_salt() -> Result<U256> {
    random_salt_with(&mut rand::thread_rng())
}

/// Random L2 token address: a value below 2^160 with bits 252 and 253 set
pub fn random_l2_token_address() -> Result<U256> {
    let address = random_below(U256::from(1u64) << 160, &mut rand::thread_rng())?;
    Ok(address + L2_TOKEN_ADDRESS_FLAGS)
}
