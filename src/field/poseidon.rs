//! Circom-compatible Poseidon over the BN254 scalar field

use alloy::primitives::U256;
use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use light_poseidon::{Poseidon, PoseidonHasher};

use crate::error::{Result, SdkError};

/// Largest arity the circom parameter set supports
pub const MAX_POSEIDON_INPUTS: usize = 12;

fn u256_to_fr(value: &U256) -> Fr {
    Fr::from_be_bytes_mod_order(&value.to_be_bytes::<32>())
}

fn fr_to_u256(value: Fr) -> U256 {
    U256::from_be_slice(&value.into_bigint().to_bytes_be())
}

/// Hash 1 to 12 scalars. Inputs are reduced into the field first.
pub fn poseidon_hash(inputs: &[U256]) -> Result<U256> {
    if inputs.is_empty() || inputs.len() > MAX_POSEIDON_INPUTS {
        return Err(SdkError::MalformedPreimage(format!(
            "poseidon takes 1..={} inputs, got {}",
            MAX_POSEIDON_INPUTS,
            inputs.len()
        )));
    }

    let mut hasher = Poseidon::<Fr>::new_circom(inputs.len())
        .map_err(|e| SdkError::MalformedPreimage(format!("poseidon setup: {}", e)))?;
    let elements: Vec<Fr> = inputs.iter().map(u256_to_fr).collect();
    let digest = hasher
        .hash(&elements)
        .map_err(|e| SdkError::MalformedPreimage(format!("poseidon hash: {}", e)))?;

    Ok(fr_to_u256(digest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{reduce, BN254_SCALAR_ORDER};

    #[test]
    fn test_known_vector() {
        let digest = poseidon_hash(&[U256::from(1u64), U256::from(2u64)]).unwrap();
        let expected = U256::from_str_radix(
            "115cc0f5e7d690413df64c6b9662e9cf2a3617f2743245519e19607a4417189a",
            16,
        )
        .unwrap();
        assert_eq!(digest, expected);
    }

    #[test]
    fn test_deterministic() {
        let inputs = [
            U256::from(11u64),
            U256::from(22u64),
            U256::from(33u64),
            U256::from(44u64),
            U256::from(55u64),
            U256::from(66u64),
        ];
        assert_eq!(
            poseidon_hash(&inputs).unwrap(),
            poseidon_hash(&inputs).unwrap()
        );
    }

    #[test]
    fn test_output_is_field_element() {
        let digest = poseidon_hash(&[U256::MAX, U256::from(3u64)]).unwrap();
        assert!(digest < BN254_SCALAR_ORDER);
    }

    #[test]
    fn test_inputs_reduced() {
        let big = BN254_SCALAR_ORDER + U256::from(9u64);
        assert_eq!(
            poseidon_hash(&[big]).unwrap(),
            poseidon_hash(&[reduce(big)]).unwrap()
        );
    }

    #[test]
    fn test_arity_bounds() {
        assert!(poseidon_hash(&[]).is_err());
        assert!(poseidon_hash(&[U256::from(1u64); 13]).is_err());
        assert!(poseidon_hash(&[U256::from(1u64); 12]).is_ok());
    }
}
