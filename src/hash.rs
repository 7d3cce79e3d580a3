//! Shared hash primitives, grounded on `eg::hash`'s `HValue`/`eg_h` (SHA-256
//! over a canonical transcript) generalized to this crate's simpler
//! single-authority transcript.

use num_bigint::BigUint;
use sha2::{Digest, Sha256};

pub const HASH_BYTE_LEN: usize = 32;

/// SHA-256 of `bytes`.
pub fn sha256(bytes: &[u8]) -> [u8; HASH_BYTE_LEN] {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; HASH_BYTE_LEN];
    out.copy_from_slice(&digest);
    out
}

/// SHA-256 of `bytes`, reduced into `[0, q)`. Used for the Fiat-Shamir
/// challenge in [`crate::nizk`].
pub fn hash_to_scalar(bytes: &[u8], q: &BigUint) -> BigUint {
    BigUint::from_bytes_be(&sha256(bytes)) % q
}

pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
