//! Canonical byte encoding (spec §6), used anywhere a hash or HMAC consumes
//! structured data: integers as minimal unsigned big-endian bytes prefixed
//! by a 4-byte big-endian length, strings as UTF-8 with a 4-byte length
//! prefix, tuples as concatenation of their component encodings in order.
//!
//! This is deliberately independent of `serde_json`: JSON field order is not
//! guaranteed canonical, so the wire types in [`crate::protocol`] use serde
//! for transport while hashes and HMACs are always computed over this
//! encoding.

use num_bigint::BigUint;

/// Accumulates a canonical byte transcript.
#[derive(Default)]
pub struct Encoder(Vec<u8>);

impl Encoder {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn write_biguint(&mut self, n: &BigUint) -> &mut Self {
        let bytes = n.to_bytes_be();
        self.0
            .extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        self.0.extend_from_slice(&bytes);
        self
    }

    pub fn write_u64(&mut self, n: u64) -> &mut Self {
        self.write_biguint(&BigUint::from(n))
    }

    pub fn write_str(&mut self, s: &str) -> &mut Self {
        let bytes = s.as_bytes();
        self.0
            .extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.0
            .extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.0)
    }
}
