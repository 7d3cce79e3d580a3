//! HMAC-bound single-use voter tokens, grounded on `eg::hash`'s
//! `Hmac<Sha256>` usage, generalized from hashing election data to issuing
//! per-voter credentials.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding::Encoder;
use crate::errors::TokenError;

type HmacSha256 = Hmac<Sha256>;

/// The per-election HMAC key `K`. Zeroized on drop; never exported.
#[derive(Clone, ZeroizeOnDrop)]
pub struct TokenKey([u8; 32]);

impl TokenKey {
    pub fn generate(rng: &mut impl RngCore) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }
}

impl std::fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("TokenKey").field(&"<redacted>").finish()
    }
}

impl Zeroize for TokenKey {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// An issued token, as returned to the voter out-of-band.
#[derive(Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Token(pub Vec<u8>);

fn digest(token: &[u8]) -> [u8; 32] {
    crate::hash::sha256(token)
}

fn compute_token(key: &TokenKey, voter_id: &str, issued_at: u64, nonce: u64) -> Token {
    let transcript = Encoder::new()
        .write_str(voter_id)
        .write_u64(issued_at)
        .write_u64(nonce)
        .finish();
    let mut mac = <HmacSha256 as Mac>::new_from_slice(&key.0).expect("HMAC accepts any key length");
    mac.update(&transcript);
    Token(mac.finalize().into_bytes().to_vec())
}

struct Registration {
    token_digest: [u8; 32],
    issued_at: u64,
    used_at: Option<u64>,
}

/// Issues and consumes single-use tokens. Owned exclusively by the
/// Authority; one entry per registered voter.
#[derive(Default)]
pub struct TokenRegistry {
    entries: std::collections::HashMap<String, Registration>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a fresh token for `voter_id`. Fails if already registered.
    pub fn issue(
        &mut self,
        key: &TokenKey,
        voter_id: &str,
        now: u64,
        rng: &mut impl RngCore,
    ) -> Result<Token, TokenError> {
        if self.entries.contains_key(voter_id) {
            return Err(TokenError::AlreadyRegistered(voter_id.to_string()));
        }
        let nonce = rng.next_u64();
        let token = compute_token(key, voter_id, now, nonce);
        self.entries.insert(
            voter_id.to_string(),
            Registration {
                token_digest: digest(&token.0),
                issued_at: now,
                used_at: None,
            },
        );
        Ok(token)
    }

    /// Authenticates `token` against the registration for `voter_id` and, if
    /// valid and unused, marks it consumed. Uses a constant-time comparison
    /// of the stored digest to avoid leaking partial matches via timing.
    pub fn authenticate_and_consume(
        &mut self,
        voter_id: &str,
        token: &Token,
        now: u64,
    ) -> Result<(), TokenError> {
        let reg = self
            .entries
            .get_mut(voter_id)
            .ok_or_else(|| TokenError::UnknownVoter(voter_id.to_string()))?;

        let candidate_digest = digest(&token.0);
        if reg.token_digest.ct_eq(&candidate_digest).unwrap_u8() != 1 {
            return Err(TokenError::BadToken);
        }
        if reg.used_at.is_some() {
            return Err(TokenError::TokenAlreadyUsed(voter_id.to_string()));
        }
        reg.used_at = Some(now);
        Ok(())
    }

    pub fn is_registered(&self, voter_id: &str) -> bool {
        self.entries.contains_key(voter_id)
    }
}
