//! Modular arithmetic helpers over 256-bit integers
//!
//! Public field API for callers working with keys and field elements
//! directly, re-exported from `field`. The commitment and lock paths only
//! need `reduce` and Poseidon.

use alloy::primitives::U256;

/// Bound on the search for a quadratic non-residue
const NON_RESIDUE_SEARCH_LIMIT: u64 = 100_000;

/// Sum of all terms modulo `m`. Returns zero for a zero modulus.
pub fn add_mod(terms: &[U256], m: U256) -> U256 {
    if m.is_zero() {
        return U256::ZERO;
    }
    terms
        .iter()
        .fold(U256::ZERO, |acc, term| acc.add_mod(*term % m, m))
}

/// Product of all terms modulo `m`. Returns zero for a zero or unit modulus.
pub fn mul_mod(terms: &[U256], m: U256) -> U256 {
    if m <= U256::from(1u64) {
        return U256::ZERO;
    }
    terms
        .iter()
        .fold(U256::from(1u64), |acc, term| acc.mul_mod(*term, m))
}

/// `base^exponent mod m`
pub fn pow_mod(base: U256, exponent: U256, m: U256) -> U256 {
    if m <= U256::from(1u64) {
        return U256::ZERO;
    }
    (base % m).pow_mod(exponent, m)
}

/// Jacobi symbol `(a / n)`. `None` when `n` is even or zero.
pub fn jacobi_symbol(a: U256, n: U256) -> Option<i8> {
    if n.is_zero() || !n.bit(0) {
        return None;
    }

    let mut a = a % n;
    let mut n = n;
    let mut result = 1i8;

    while !a.is_zero() {
        while !a.bit(0) {
            a >>= 1;
            let n_mod_8 = n.as_limbs()[0] & 7;
            if n_mod_8 == 3 || n_mod_8 == 5 {
                result = -result;
            }
        }

        std::mem::swap(&mut a, &mut n);
        if a.as_limbs()[0] & 3 == 3 && n.as_limbs()[0] & 3 == 3 {
            result = -result;
        }
        a %= n;
    }

    if n == U256::from(1u64) {
        Some(result)
    } else {
        Some(0)
    }
}

fn quadratic_non_residue(p: U256) -> Option<U256> {
    let limit = p.min(U256::from(NON_RESIDUE_SEARCH_LIMIT));
    let mut x = U256::from(2u64);
    while x < limit {
        if jacobi_symbol(x, p) == Some(-1) {
            return Some(x);
        }
        x += U256::from(1u64);
    }
    None
}

/// Square root of `n` modulo an odd prime `p` (Tonelli-Shanks).
///
/// Returns `None` when `n` is not a quadratic residue. Either root may be
/// returned; the other one is `p - root`.
pub fn sqrt_mod_prime(n: U256, p: U256) -> Option<U256> {
    let one = U256::from(1u64);
    let n = if p.is_zero() { n } else { n % p };

    match jacobi_symbol(n, p)? {
        0 => return Some(U256::ZERO),
        1 => {}
        _ => return None,
    }

    if p.as_limbs()[0] & 3 == 3 {
        return Some(n.pow_mod((p + one) >> 2, p));
    }

    // p - 1 = q * 2^s with q odd
    let mut q = p - one;
    let mut s = 0u32;
    while !q.bit(0) {
        q >>= 1;
        s += 1;
    }

    let z = quadratic_non_residue(p)?;
    let mut m = s;
    let mut c = z.pow_mod(q, p);
    let mut t = n.pow_mod(q, p);
    let mut r = n.pow_mod((q + one) >> 1, p);

    loop {
        if t == one {
            return Some(r);
        }

        // least i in (0, m) with t^(2^i) == 1
        let mut i = 1u32;
        let mut u = t.mul_mod(t, p);
        while u != one {
            u = u.mul_mod(u, p);
            i += 1;
            if i >= m {
                return None;
            }
        }

        let mut b = c;
        for _ in 0..(m - i - 1) {
            b = b.mul_mod(b, p);
        }

        m = i;
        c = b.mul_mod(b, p);
        t = t.mul_mod(c, p);
        r = r.mul_mod(b, p);
    }
}
