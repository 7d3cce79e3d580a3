//! Big-integer modular arithmetic: safe-prime generation, generator
//! selection, and bounded discrete-log recovery.
//!
//! Grounded on `util::prime`'s Miller-Rabin primality test and
//! `eg::discrete_log`'s baby-step/giant-step table, both built on
//! `num_bigint::BigUint`.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::RngCore;
use std::collections::HashMap;

use crate::errors::ModArithError;

const MILLER_RABIN_ROUNDS: usize = 40;
const SAFE_PRIME_MAX_ATTEMPTS: u32 = 20_000;
const GENERATOR_MAX_ATTEMPTS: u32 = 2_000;

/// Returns a uniformly random `BigUint` requiring exactly `bits` bits, i.e.
/// with the top bit set, read from `rng`.
fn random_biguint_with_bits(rng: &mut impl RngCore, bits: usize) -> BigUint {
    assert!(bits > 0);
    let byte_len = bits.div_ceil(8);
    let mut buf = vec![0u8; byte_len];
    rng.fill_bytes(&mut buf);

    let excess_bits = byte_len * 8 - bits;
    if excess_bits > 0 {
        buf[0] &= 0xff >> excess_bits;
    }
    let high_bit_pos = (bits - 1) % 8;
    buf[0] |= 1u8 << high_bit_pos;
    buf[byte_len - 1] |= 1; // keep candidates odd

    BigUint::from_bytes_be(&buf)
}

/// Miller-Rabin primality test, in the style of `util::prime::is_prime`.
pub fn is_probably_prime(n: &BigUint, rng: &mut impl RngCore) -> bool {
    if n < &BigUint::from(2u8) {
        return false;
    }
    for small in [2u32, 3, 5, 7, 11, 13, 17, 19, 23, 29] {
        let small = BigUint::from(small);
        if n == &small {
            return true;
        }
        if (n % &small).is_zero() {
            return false;
        }
    }

    let n_minus_one = n - BigUint::one();
    let mut d = n_minus_one.clone();
    let mut r = 0u32;
    while d.is_even() {
        d /= 2u8;
        r += 1;
    }

    'witness: for _ in 0..MILLER_RABIN_ROUNDS {
        let a = uniform_below(rng, &(n - BigUint::from(3u8))) + BigUint::from(2u8);
        let mut x = a.modpow(&d, n);
        if x == BigUint::one() || x == n_minus_one {
            continue;
        }
        for _ in 0..r - 1 {
            x = x.modpow(&BigUint::from(2u8), n);
            if x == n_minus_one {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Uniformly samples `0 <= n < bound` by rejection sampling, as
/// `util::csprng::Csprng::next_biguint_lt` does.
fn uniform_below(rng: &mut impl RngCore, bound: &BigUint) -> BigUint {
    assert!(!bound.is_zero());
    let bits = bound.bits() as usize;
    loop {
        let byte_len = bits.div_ceil(8);
        let mut buf = vec![0u8; byte_len];
        rng.fill_bytes(&mut buf);
        let excess_bits = byte_len * 8 - bits;
        if excess_bits > 0 {
            buf[0] &= 0xff >> excess_bits;
        }
        let candidate = BigUint::from_bytes_be(&buf);
        if &candidate < bound {
            return candidate;
        }
    }
}

/// Samples a uniform scalar in `[1, q-1]`.
pub fn random_scalar(rng: &mut impl RngCore, q: &BigUint) -> BigUint {
    loop {
        let candidate = uniform_below(rng, q);
        if !candidate.is_zero() {
            return candidate;
        }
    }
}

pub fn modexp(base: &BigUint, exp: &BigUint, modulus: &BigUint) -> BigUint {
    base.modpow(exp, modulus)
}

/// Modular inverse via Fermat's little theorem: requires `modulus` prime.
pub fn modinv(a: &BigUint, modulus: &BigUint) -> BigUint {
    a.modpow(&(modulus - BigUint::from(2u8)), modulus)
}

/// Generates a safe prime `p = 2q+1` of `bits` bits, returning `(p, q)`.
pub fn gen_safe_prime(
    bits: usize,
    rng: &mut impl RngCore,
) -> Result<(BigUint, BigUint), ModArithError> {
    for attempt in 0..SAFE_PRIME_MAX_ATTEMPTS {
        let q = random_biguint_with_bits(rng, bits - 1);
        if !is_probably_prime(&q, rng) {
            continue;
        }
        let p = &q * 2u8 + BigUint::one();
        if is_probably_prime(&p, rng) {
            tracing::info!(bits, attempts = attempt + 1, "found safe prime");
            return Ok((p, q));
        }
    }
    Err(ModArithError::ParameterError {
        bits,
        attempts: SAFE_PRIME_MAX_ATTEMPTS,
    })
}

/// Finds a generator `g` of the order-`q` subgroup of `Z_p^*`: `g in [2, p-2]`
/// with `g^q = 1 (mod p)` and `g^2 != 1 (mod p)`.
pub fn find_generator(
    p: &BigUint,
    q: &BigUint,
    rng: &mut impl RngCore,
) -> Result<BigUint, ModArithError> {
    let two = BigUint::from(2u8);
    let p_minus_two = p - &two;
    for attempt in 0..GENERATOR_MAX_ATTEMPTS {
        let h = uniform_below(rng, &p_minus_two) + &two; // h in [2, p-2]
        let g = h.modpow(&two, p); // square to land in the order-q subgroup
        if g == BigUint::one() {
            continue;
        }
        if g.modpow(q, p) == BigUint::one() && g.modpow(&two, p) != BigUint::one() {
            tracing::debug!(attempts = attempt + 1, "found generator");
            return Ok(g);
        }
    }
    Err(ModArithError::GeneratorNotFound {
        attempts: GENERATOR_MAX_ATTEMPTS,
    })
}

/// Precomputed baby-step table for bounded discrete-log recovery, in the
/// style of `eg::discrete_log::DiscreteLog`.
pub struct DiscreteLogTable {
    base: BigUint,
    modulus: BigUint,
    step: u64,
    table: HashMap<BigUint, u64>,
}

impl DiscreteLogTable {
    /// Builds a table covering exponents `0..=max_n` against `base^k mod modulus`.
    pub fn build(base: &BigUint, modulus: &BigUint, max_n: u64) -> Self {
        let step = (max_n as f64).sqrt().ceil() as u64 + 1;
        let mut table = HashMap::with_capacity(step as usize);
        let mut acc = BigUint::one();
        for j in 0..step {
            table.entry(acc.clone()).or_insert(j);
            acc = (&acc * base) % modulus;
        }
        Self {
            base: base.clone(),
            modulus: modulus.clone(),
            step,
            table,
        }
    }

    /// Recovers the unique `k in [0, max_n]` with `base^k = target (mod modulus)`.
    pub fn find(&self, target: &BigUint, max_n: u64) -> Result<u64, ModArithError> {
        let giant_step = modinv(
            &self.base.modpow(&BigUint::from(self.step), &self.modulus),
            &self.modulus,
        );
        let mut gamma = target.clone();
        let giant_steps = max_n / self.step + 1;
        for i in 0..=giant_steps {
            if let Some(&j) = self.table.get(&gamma) {
                let k = i * self.step + j;
                if k <= max_n {
                    return Ok(k);
                }
            }
            gamma = (&gamma * &giant_step) % &self.modulus;
        }
        Err(ModArithError::TallyOutOfRange { max_n })
    }
}

/// One-shot bounded discrete-log search: `g^k = h (mod p)`, `k in [0, max_n]`.
/// Builds a fresh table each call; callers doing many lookups against the
/// same `(g, p)` should build a [`DiscreteLogTable`] once and reuse it.
pub fn discrete_log_bounded(
    h: &BigUint,
    g: &BigUint,
    p: &BigUint,
    max_n: u64,
) -> Result<u64, ModArithError> {
    DiscreteLogTable::build(g, p, max_n).find(h, max_n)
}
