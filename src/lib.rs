//! Cryptographic core for a private, anonymous, verifiable yes/no election:
//! ElGamal over a safe-prime subgroup, a disjunctive Fiat-Shamir proof that
//! each ballot encrypts 0 or 1, homomorphic tallying, a re-encryption
//! mixnet, single-use HMAC tokens, and a linked-hash audit log.
//!
//! Orchestration across the election lifecycle lives in [`protocol`]; the
//! lower modules are usable independently.

pub mod audit_log;
pub mod elgamal;
pub mod encoding;
pub mod errors;
pub mod hash;
pub mod mixnet;
pub mod modarith;
pub mod nizk;
pub mod protocol;
pub mod token_registry;

pub use errors::{VoteError, VoteResult};
