//! Salt sources for lock construction

use alloy::primitives::U256;

use crate::error::Result;
use crate::field::random_salt;

/// Supplies fresh commitment salts when a lock candidate must be resampled
pub trait SaltSource: Send {
    fn next_salt(&mut self) -> Result<U256>;
}

/// Salts from the thread-local CSPRNG, uniform below the field order
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSalts;

impl SaltSource for RandomSalts {
    fn next_salt(&mut self) -> Result<U256> {
        random_salt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::BN254_SCALAR_ORDER;

    #[test]
    fn test_random_salts_are_fresh() {
        let mut source = RandomSalts;
        let a = source.next_salt().unwrap();
        let b = source.next_salt().unwrap();
        assert_ne!(a, b);
        assert!(a < BN254_SCALAR_ORDER && b < BN254_SCALAR_ORDER);
    }
}
