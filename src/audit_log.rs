//! Append-only, linked-hash event log. Grounded on `eg::hash`'s `HValue`
//! chaining idea, generalized from ElectionGuard's per-object hashes to a
//! single sequential chain of electoral events.

use serde::{Deserialize, Serialize};

use crate::elgamal::Ciphertext;
use crate::encoding::Encoder;
use crate::errors::AuditError;
use crate::hash;
use crate::nizk::NizkProof;

/// Fixed genesis constant used as `prev_hash` for event index 0.
pub const GENESIS_HASH: [u8; 32] = [0u8; 32];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Setup,
    Register,
    Vote,
    Mix,
    Tally,
}

/// Event payloads. Plaintexts, randomizers, and the Authority's private key
/// never appear here: only ciphertexts, proofs, and public metadata, per
/// spec §4.6.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditPayload {
    Setup {
        bits: usize,
        voter_count_cap: u64,
    },
    Register {
        voter_id_hash: String,
    },
    Vote {
        voter_id_hash: String,
        ciphertext: Ciphertext,
        proof: NizkProof,
    },
    Mix {
        input_digest: String,
        output_len: usize,
    },
    Tally {
        ciphertext: Ciphertext,
        sum: u64,
    },
}

impl AuditPayload {
    fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            AuditPayload::Setup { bits, voter_count_cap } => Encoder::new()
                .write_str("SETUP")
                .write_u64(*bits as u64)
                .write_u64(*voter_count_cap)
                .finish(),
            AuditPayload::Register { voter_id_hash } => {
                Encoder::new().write_str("REGISTER").write_str(voter_id_hash).finish()
            }
            AuditPayload::Vote {
                voter_id_hash,
                ciphertext,
                proof,
            } => Encoder::new()
                .write_str("VOTE")
                .write_str(voter_id_hash)
                .write_biguint(&ciphertext.v)
                .write_biguint(&ciphertext.e)
                .write_biguint(&proof.a0)
                .write_biguint(&proof.a1)
                .write_biguint(&proof.b0)
                .write_biguint(&proof.b1)
                .write_biguint(&proof.c0)
                .write_biguint(&proof.c1)
                .write_biguint(&proof.r0)
                .write_biguint(&proof.r1)
                .finish(),
            AuditPayload::Mix { input_digest, output_len } => Encoder::new()
                .write_str("MIX")
                .write_str(input_digest)
                .write_u64(*output_len as u64)
                .finish(),
            AuditPayload::Tally { ciphertext, sum } => Encoder::new()
                .write_str("TALLY")
                .write_biguint(&ciphertext.v)
                .write_biguint(&ciphertext.e)
                .write_u64(*sum)
                .finish(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub index: u64,
    pub kind: EventKind,
    pub payload: AuditPayload,
    pub prev_hash: [u8; 32],
    pub hash: [u8; 32],
    pub timestamp: u64,
}

fn event_hash(index: u64, kind: &EventKind, payload_digest: &[u8; 32], prev_hash: &[u8; 32], timestamp: u64) -> [u8; 32] {
    let kind_tag = match kind {
        EventKind::Setup => "SETUP",
        EventKind::Register => "REGISTER",
        EventKind::Vote => "VOTE",
        EventKind::Mix => "MIX",
        EventKind::Tally => "TALLY",
    };
    let transcript = Encoder::new()
        .write_u64(index)
        .write_str(kind_tag)
        .write_bytes(payload_digest)
        .write_bytes(prev_hash)
        .write_u64(timestamp)
        .finish();
    hash::sha256(&transcript)
}

/// Append-only, shared-read event log. Owned exclusively by whichever role
/// mutates it; append and read are the only operations (see §5).
#[derive(Default)]
pub struct AuditLog {
    events: Vec<AuditEvent>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event, returning its index.
    pub fn append(&mut self, kind: EventKind, payload: AuditPayload, timestamp: u64) -> u64 {
        let index = self.events.len() as u64;
        let prev_hash = self.events.last().map(|e| e.hash).unwrap_or(GENESIS_HASH);
        let payload_digest = hash::sha256(&payload.canonical_bytes());
        let hash = event_hash(index, &kind, &payload_digest, &prev_hash, timestamp);
        self.events.push(AuditEvent {
            index,
            kind,
            payload,
            prev_hash,
            hash,
            timestamp,
        });
        index
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[AuditEvent] {
        &self.events
    }

    /// Recomputes every event's hash and linkage; returns the index of the
    /// first mismatch, if any.
    pub fn verify(&self) -> Result<(), AuditError> {
        let mut expected_prev = GENESIS_HASH;
        for event in &self.events {
            if event.prev_hash != expected_prev {
                return Err(AuditError::AuditTampered { index: event.index });
            }
            let payload_digest = hash::sha256(&event.payload.canonical_bytes());
            let recomputed = event_hash(event.index, &event.kind, &payload_digest, &event.prev_hash, event.timestamp);
            if recomputed != event.hash {
                return Err(AuditError::AuditTampered { index: event.index });
            }
            expected_prev = event.hash;
        }
        Ok(())
    }
}
