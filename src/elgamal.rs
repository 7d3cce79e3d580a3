//! The ElGamal cryptosystem over a safe-prime order-`q` subgroup, grounded
//! on `eg::key`'s `PublicKey`/`Ciphertext` pair and `eg::el_gamal`'s
//! zeroizing secret key, generalized from ElectionGuard's joint guardian key
//! to a single Authority keypair.

use num_bigint::BigUint;
use num_traits::One;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::errors::ModArithError;
use crate::modarith;

/// Group parameters `(p, q, g, u)` shared by every role in the election.
///
/// Invariant: `g^q == 1 (mod p)` and `g != 1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupParams {
    pub p: BigUint,
    pub q: BigUint,
    pub g: BigUint,
    pub u: BigUint,
}

/// The Authority's private exponent `alpha`. Zeroized on drop; never
/// serialized or logged.
///
/// `BigUint` has no `Zeroize` impl of its own, so `ZeroizeOnDrop` cannot be
/// derived here; `Drop` is implemented by hand instead, delegating to the
/// manual [`Zeroize`] impl below.
#[derive(Clone)]
pub struct SecretKey(BigUint);

impl Drop for SecretKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl SecretKey {
    pub fn exponent(&self) -> &BigUint {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SecretKey").field(&"<redacted>").finish()
    }
}

impl Zeroize for SecretKey {
    fn zeroize(&mut self) {
        // `BigUint` has no in-place zeroize; replace with a fresh zero value
        // so the old limbs are dropped and the live buffer is known-cleared.
        self.0 = BigUint::from(0u8);
    }
}

/// A ciphertext `(v, e)`. Invariants are established by [`encrypt`]: any
/// value constructed here is trusted to be `(g^beta, u^beta * g^m)` for some
/// known `beta`, `m`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext {
    pub v: BigUint,
    pub e: BigUint,
}

/// Generates fresh group parameters and an Authority keypair.
pub fn keygen(
    bits: usize,
    rng: &mut impl RngCore,
) -> Result<(GroupParams, SecretKey), ModArithError> {
    let (p, q) = modarith::gen_safe_prime(bits, rng)?;
    let g = modarith::find_generator(&p, &q, rng)?;
    let alpha = modarith::random_scalar(rng, &q);
    let u = modarith::modexp(&g, &alpha, &p);
    Ok((GroupParams { p, q, g, u }, SecretKey(alpha)))
}

/// Encrypts `m` under `params.u` using a caller-supplied randomizer `beta`,
/// or a freshly sampled one if `beta` is `None`.
pub fn encrypt(
    params: &GroupParams,
    m: u64,
    beta: Option<BigUint>,
    rng: &mut impl RngCore,
) -> Ciphertext {
    let beta = beta.unwrap_or_else(|| modarith::random_scalar(rng, &params.q));
    encrypt_with_beta(params, m, &beta)
}

/// Encrypts `m` with an explicit `beta`; used by the prover, which must know
/// `beta` to construct a NIZK witness, and by tests exercising fixed values.
pub fn encrypt_with_beta(params: &GroupParams, m: u64, beta: &BigUint) -> Ciphertext {
    let v = modarith::modexp(&params.g, beta, &params.p);
    let g_m = modarith::modexp(&params.g, &BigUint::from(m), &params.p);
    let u_beta = modarith::modexp(&params.u, beta, &params.p);
    let e = (&u_beta * &g_m) % &params.p;
    Ciphertext { v, e }
}

/// Decrypts `C` down to a small non-negative integer `m <= voter_count_cap`,
/// recovering `m` from `g^m` by bounded discrete log.
pub fn decrypt(
    params: &GroupParams,
    alpha: &SecretKey,
    c: &Ciphertext,
    voter_count_cap: u64,
) -> Result<u64, ModArithError> {
    let v_alpha = modarith::modexp(&c.v, &alpha.0, &params.p);
    let v_alpha_inv = modarith::modinv(&v_alpha, &params.p);
    let m_group = (&c.e * &v_alpha_inv) % &params.p;
    modarith::discrete_log_bounded(&m_group, &params.g, &params.p, voter_count_cap)
}

/// Re-randomizes `C` to a fresh-looking ciphertext of the same plaintext:
/// `(v*g^r, e*u^r)`.
pub fn rerandomize(params: &GroupParams, c: &Ciphertext, r: Option<BigUint>, rng: &mut impl RngCore) -> (Ciphertext, BigUint) {
    let r = r.unwrap_or_else(|| modarith::random_scalar(rng, &params.q));
    let v = (&c.v * modarith::modexp(&params.g, &r, &params.p)) % &params.p;
    let e = (&c.e * modarith::modexp(&params.u, &r, &params.p)) % &params.p;
    (Ciphertext { v, e }, r)
}

/// Componentwise product of a ciphertext batch: decrypting the result
/// recovers the sum of the constituent plaintexts.
pub fn homomorphic_sum(params: &GroupParams, cs: &[Ciphertext]) -> Ciphertext {
    let mut v = BigUint::one();
    let mut e = BigUint::one();
    for c in cs {
        v = (&v * &c.v) % &params.p;
        e = (&e * &c.e) % &params.p;
    }
    Ciphertext { v, e }
}
