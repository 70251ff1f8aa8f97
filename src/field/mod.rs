//! Scalar field helpers shared by the commitment model and the atomic lock
//!
//! Everything the remote circuits consume lives in the BN254 scalar field.
//! Values arriving from callers or from the prover are parsed into `U256`,
//! reduced where the circuit expects a canonical element, and hashed with a
//! circom-compatible Poseidon.

pub mod number_theory;
pub mod poseidon;
pub mod random;

use alloy::primitives::U256;

use crate::error::{Result, SdkError};

pub use number_theory::{add_mod, jacobi_symbol, mul_mod, pow_mod, sqrt_mod_prime};
pub use poseidon::poseidon_hash;
pub use random::{random_below, random_l2_token_address, random_salt, random_salt_with};

/// BN254 scalar field order
pub const BN254_SCALAR_ORDER: U256 = U256::from_limbs([
    0x43e1_f593_f000_0001,
    0x2833_e848_79b9_7091,
    0xb850_45b6_8181_585d,
    0x3064_4e72_e131_a029,
]);

/// Multiplier placing the top token id limb above a 160-bit address
pub const ERC_ADDRESS_SHIFT: U256 = U256::from_limbs([0, 0, 1 << 32, 0]);

/// Width of the low token id limb that stays a separate hash input
pub const TOKEN_ID_LIMB_BITS: usize = 224;

/// Reduce a scalar into the BN254 scalar field
pub fn reduce(value: U256) -> U256 {
    value % BN254_SCALAR_ORDER
}

/// Whether a scalar is already a canonical field element
pub fn is_canonical(value: &U256) -> bool {
    *value < BN254_SCALAR_ORDER
}

/// Parse a non-negative integer given in decimal or 0x-prefixed hex
pub fn parse_scalar(raw: &str) -> Result<U256> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(SdkError::MalformedPreimage("empty scalar".to_string()));
    }

    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex_digits) if !hex_digits.is_empty() => U256::from_str_radix(hex_digits, 16),
        Some(_) => {
            return Err(SdkError::MalformedPreimage(format!(
                "not an integer: {}",
                trimmed
            )))
        }
        None => U256::from_str_radix(trimmed, 10),
    };

    parsed.map_err(|e| SdkError::MalformedPreimage(format!("not an integer: {} ({})", trimmed, e)))
}

/// Split a token id into its top 32 bits and its low 224 bits
pub fn split_token_id(token_id: U256) -> (U256, U256) {
    let top = token_id >> TOKEN_ID_LIMB_BITS;
    let low_mask = (U256::from(1u64) << TOKEN_ID_LIMB_BITS) - U256::from(1u64);
    (top, token_id & low_mask)
}

/// Fold the top token id limb into the spare high bits of the erc address.
///
/// Returns the packed address together with the low token id limb, the
/// two values the circuit hashes in place of `(ercAddress, tokenId)`.
pub fn pack_erc_address(erc_address: U256, token_id: U256) -> Result<(U256, U256)> {
    let (top, remainder) = split_token_id(token_id);
    let packed = top
        .checked_mul(ERC_ADDRESS_SHIFT)
        .and_then(|shifted| erc_address.checked_add(shifted))
        .ok_or_else(|| {
            SdkError::MalformedPreimage("packed erc address overflows 256 bits".to_string())
        })?;
    Ok((packed, remainder))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_order_constant() {
        let expected = U256::from_str(
            "21888242871839275222246405745257275088548364400416034343698204186575808495617",
        )
        .unwrap();
        assert_eq!(BN254_SCALAR_ORDER, expected);
    }

    #[test]
    fn test_shift_constant() {
        assert_eq!(ERC_ADDRESS_SHIFT, U256::from(1u64) << 160);
    }

    #[test]
    fn test_reduce() {
        assert_eq!(reduce(BN254_SCALAR_ORDER), U256::ZERO);
        assert_eq!(
            reduce(BN254_SCALAR_ORDER + U256::from(5u64)),
            U256::from(5u64)
        );
        assert_eq!(reduce(U256::from(5u64)), U256::from(5u64));
        assert!(is_canonical(&reduce(U256::MAX)));
    }

    #[test]
    fn test_parse_scalar_formats() {
        assert_eq!(parse_scalar("42").unwrap(), U256::from(42u64));
        assert_eq!(parse_scalar("0x2a").unwrap(), U256::from(42u64));
        assert_eq!(parse_scalar(" 0X2A ").unwrap(), U256::from(42u64));
    }

    #[test]
    fn test_parse_scalar_rejects_garbage() {
        for raw in ["", "-1", "0x", "12abc", "1.5", "0xzz"] {
            assert!(
                matches!(parse_scalar(raw), Err(SdkError::MalformedPreimage(_))),
                "accepted {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_split_token_id() {
        let token_id = (U256::from(0xAABBCCDDu64) << 224) | U256::from(7u64);
        let (top, low) = split_token_id(token_id);
        assert_eq!(top, U256::from(0xAABBCCDDu64));
        assert_eq!(low, U256::from(7u64));
    }

    #[test]
    fn test_pack_erc_address() {
        let erc = U256::from(0x1234u64);
        let token_id = (U256::from(3u64) << 224) | U256::from(9u64);
        let (packed, remainder) = pack_erc_address(erc, token_id).unwrap();
        assert_eq!(packed, erc + (U256::from(3u64) << 160));
        assert_eq!(remainder, U256::from(9u64));
    }

    #[test]
    fn test_pack_small_token_id_leaves_address() {
        let erc = U256::from(0xfeedu64);
        let (packed, remainder) = pack_erc_address(erc, U256::from(1u64)).unwrap();
        assert_eq!(packed, erc);
        assert_eq!(remainder, U256::from(1u64));
    }

    #[test]
    fn test_pack_overflow() {
        let token_id = U256::MAX;
        let result = pack_erc_address(U256::MAX, token_id);
        assert!(matches!(result, Err(SdkError::MalformedPreimage(_))));
    }
}
