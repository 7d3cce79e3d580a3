//! Authority / VotingCenter / TallyingCenter orchestration.
//!
//! The token registry, audit log, and cast input batch are the only shared
//! mutable objects (§9, Design Notes); they live behind one `Mutex` so that
//! `cast`'s four effects (token consumption, proof verification, audit
//! append, batch append) are atomic, matching §5's sequencing invariant
//! that a rejected cast never consumes the token.

use std::sync::{Arc, Mutex};

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::audit_log::{AuditLog, AuditPayload, EventKind};
use crate::elgamal::{self, Ciphertext, GroupParams, SecretKey};
use crate::encoding::Encoder;
use crate::errors::{ProtocolError, VoteError, VoteResult};
use crate::hash;
use crate::mixnet::{self, MixProof};
use crate::modarith;
use crate::nizk::{self, NizkProof};
use crate::token_registry::{Token, TokenKey, TokenRegistry};

/// `SETUP -> OPEN -> CLOSED -> TALLIED`, monotone.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionState {
    Setup,
    Open,
    Closed,
    Tallied,
}

/// Election manifest, the SETUP audit payload and the public description of
/// an election (spec §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ElectionManifest {
    pub bits: usize,
    pub params: GroupParams,
    pub voter_count_cap: u64,
    pub genesis_hash: [u8; 32],
}

/// A voter's cast submission, as it crosses the wire to the VotingCenter.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CastSubmission {
    pub voter_id: String,
    pub token: Token,
    pub ciphertext: Ciphertext,
    pub proof: NizkProof,
}

/// The public record of a completed mix (spec §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MixRecord {
    pub input_digest: String,
    pub output_batch: Vec<Ciphertext>,
    pub mu: MixProof,
}

/// The public record of a completed tally (spec §6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TallyRecord {
    pub c_star: Ciphertext,
    pub sum: u64,
    pub voter_count: u64,
}

fn hash_voter_id(voter_id: &str) -> String {
    let digest = hash::sha256(&Encoder::new().write_str(voter_id).finish());
    hash::to_hex(&digest)
}

fn canonical_batch_digest(batch: &[Ciphertext]) -> String {
    let mut enc = Encoder::new();
    for c in batch {
        enc.write_biguint(&c.v).write_biguint(&c.e);
    }
    hash::to_hex(&hash::sha256(&enc.finish()))
}

struct Shared {
    state: ElectionState,
    token_registry: TokenRegistry,
    audit_log: AuditLog,
    input_batch: Vec<Ciphertext>,
    output_batch: Option<Vec<Ciphertext>>,
    mix_record: Option<MixRecord>,
    tally_record: Option<TallyRecord>,
}

/// Owns group parameters, the private key `alpha`, the token HMAC key `K`,
/// and (via the shared lock) the token registry and audit log.
pub struct Authority {
    params: GroupParams,
    alpha: SecretKey,
    token_key: TokenKey,
    voter_count_cap: u64,
    shared: Arc<Mutex<Shared>>,
}

impl Authority {
    /// Generates fresh group parameters and a keypair, and opens the audit
    /// chain with a SETUP event.
    pub fn setup(bits: usize, voter_count_cap: u64, rng: &mut impl RngCore) -> VoteResult<Self> {
        let (params, alpha) = elgamal::keygen(bits, rng)?;
        let token_key = TokenKey::generate(rng);

        let mut audit_log = AuditLog::new();
        audit_log.append(
            EventKind::Setup,
            AuditPayload::Setup { bits, voter_count_cap },
            0,
        );

        Ok(Self {
            params,
            alpha,
            token_key,
            voter_count_cap,
            shared: Arc::new(Mutex::new(Shared {
                state: ElectionState::Setup,
                token_registry: TokenRegistry::new(),
                audit_log,
                input_batch: Vec::new(),
                output_batch: None,
                mix_record: None,
                tally_record: None,
            })),
        })
    }

    pub fn manifest(&self) -> ElectionManifest {
        ElectionManifest {
            bits: self.params.p.bits() as usize,
            params: self.params.clone(),
            voter_count_cap: self.voter_count_cap,
            genesis_hash: crate::audit_log::GENESIS_HASH,
        }
    }

    pub fn params(&self) -> &GroupParams {
        &self.params
    }

    /// Registers `voter_id`, issuing a fresh token. Allowed in `SETUP` or
    /// `OPEN`.
    pub fn register(&self, voter_id: &str, now: u64, rng: &mut impl RngCore) -> VoteResult<Token> {
        let mut shared = self.shared.lock().expect("audit/registry lock poisoned");
        if !matches!(shared.state, ElectionState::Setup | ElectionState::Open) {
            return Err(ProtocolError::WrongState { current: shared.state }.into());
        }
        let token = shared.token_registry.issue(&self.token_key, voter_id, now, rng)?;
        shared.audit_log.append(
            EventKind::Register,
            AuditPayload::Register { voter_id_hash: hash_voter_id(voter_id) },
            now,
        );
        Ok(token)
    }

    /// Transitions `SETUP|OPEN -> OPEN` (opens registration/casting if not
    /// already open), separated from `setup` so registration can precede
    /// the casting window.
    pub fn open(&self) -> VoteResult<()> {
        let mut shared = self.shared.lock().expect("audit/registry lock poisoned");
        if shared.state != ElectionState::Setup {
            return Err(ProtocolError::WrongState { current: shared.state }.into());
        }
        shared.state = ElectionState::Open;
        Ok(())
    }

    /// Transitions `OPEN -> CLOSED`.
    pub fn close(&self) -> VoteResult<()> {
        let mut shared = self.shared.lock().expect("audit/registry lock poisoned");
        if shared.state != ElectionState::Open {
            return Err(ProtocolError::WrongState { current: shared.state }.into());
        }
        shared.state = ElectionState::Closed;
        Ok(())
    }

    /// Recovers the small integer sum encoded by `c_star`.
    pub fn decrypt_sum(&self, c_star: &Ciphertext) -> VoteResult<u64> {
        Ok(elgamal::decrypt(&self.params, &self.alpha, c_star, self.voter_count_cap)?)
    }

    pub fn voting_center(&self) -> VotingCenter {
        VotingCenter {
            params: self.params.clone(),
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn tallying_center<'a>(&'a self) -> TallyingCenter<'a> {
        TallyingCenter {
            authority: self,
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn audit_log_verify(&self) -> VoteResult<()> {
        Ok(self.shared.lock().expect("audit/registry lock poisoned").audit_log.verify()?)
    }

    pub fn audit_log_len(&self) -> usize {
        self.shared.lock().expect("audit/registry lock poisoned").audit_log.len()
    }

    pub fn state(&self) -> ElectionState {
        self.shared.lock().expect("audit/registry lock poisoned").state
    }

    /// The wire record of the completed mix (spec §6), once `tally` has run.
    pub fn mix_record(&self) -> Option<MixRecord> {
        self.shared.lock().expect("audit/registry lock poisoned").mix_record.clone()
    }

    /// The wire record of the completed tally (spec §6), once `tally` has run.
    pub fn tally_record(&self) -> Option<TallyRecord> {
        self.shared.lock().expect("audit/registry lock poisoned").tally_record.clone()
    }
}

/// Client-side helper producing a ballot and its proof. Not a shared-state
/// role: it runs once, on the voter's own device, with no access to the
/// registry or audit log.
pub fn prepare_ballot(
    params: &GroupParams,
    bit: u8,
    rng: &mut impl RngCore,
) -> (Ciphertext, NizkProof) {
    let beta = modarith::random_scalar(rng, &params.q);
    let ct = elgamal::encrypt_with_beta(params, bit as u64, &beta);
    let proof = nizk::prove(params, &ct, &beta, bit, rng);
    (ct, proof)
}

/// Accepts cast ballots: `cast` is the sole write path, serialized under one
/// lock so token consumption, proof verification, audit append, and batch
/// append are atomic (§5).
pub struct VotingCenter {
    params: GroupParams,
    shared: Arc<Mutex<Shared>>,
}

impl VotingCenter {
    pub fn cast(
        &self,
        voter_id: &str,
        token: &Token,
        ciphertext: Ciphertext,
        proof: NizkProof,
        now: u64,
    ) -> VoteResult<u64> {
        let mut shared = self.shared.lock().expect("audit/registry lock poisoned");

        if shared.state != ElectionState::Open {
            return Err(ProtocolError::WrongState { current: shared.state }.into());
        }

        // Proof verification happens before token consumption: a rejected
        // cast must never consume the voter's token (§5 sequencing).
        nizk::verify(&self.params, &ciphertext, &proof)?;
        shared.token_registry.authenticate_and_consume(voter_id, token, now)?;

        shared.audit_log.append(
            EventKind::Vote,
            AuditPayload::Vote {
                voter_id_hash: hash_voter_id(voter_id),
                ciphertext: ciphertext.clone(),
                proof,
            },
            now,
        );
        shared.input_batch.push(ciphertext);
        Ok((shared.input_batch.len() - 1) as u64)
    }
}

/// Mixes and tallies the cast batch. Allowed only in `CLOSED`.
pub struct TallyingCenter<'a> {
    authority: &'a Authority,
    shared: Arc<Mutex<Shared>>,
}

impl<'a> TallyingCenter<'a> {
    pub fn tally(&self, rng: &mut impl RngCore, now: u64) -> VoteResult<(u64, u64)> {
        let (input_batch, voter_count) = {
            let shared = self.shared.lock().expect("audit/registry lock poisoned");
            if shared.state != ElectionState::Closed {
                return Err(ProtocolError::WrongState { current: shared.state }.into());
            }
            (shared.input_batch.clone(), shared.input_batch.len() as u64)
        };

        let (output_batch, mu) = mixnet::mix(&self.authority.params, &input_batch, rng);
        mixnet::verify(&self.authority.params, &input_batch, &output_batch, &mu)?;

        let input_digest = canonical_batch_digest(&input_batch);
        {
            let mut shared = self.shared.lock().expect("audit/registry lock poisoned");
            shared.audit_log.append(
                EventKind::Mix,
                AuditPayload::Mix {
                    input_digest: input_digest.clone(),
                    output_len: output_batch.len(),
                },
                now,
            );
            shared.output_batch = Some(output_batch.clone());
            shared.mix_record = Some(MixRecord {
                input_digest,
                output_batch: output_batch.clone(),
                mu,
            });
        }

        let c_star = elgamal::homomorphic_sum(&self.authority.params, &output_batch);
        let sum = self.authority.decrypt_sum(&c_star)?;

        {
            let mut shared = self.shared.lock().expect("audit/registry lock poisoned");
            shared.audit_log.append(
                EventKind::Tally,
                AuditPayload::Tally { ciphertext: c_star.clone(), sum },
                now,
            );
            shared.state = ElectionState::Tallied;
            shared.tally_record = Some(TallyRecord {
                c_star,
                sum,
                voter_count,
            });
        }

        Ok((sum, voter_count - sum))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn cast_all(authority: &Authority, bits: &[u64], rng: &mut StdRng) {
        let voting_center = authority.voting_center();
        for (i, &b) in bits.iter().enumerate() {
            let voter_id = format!("voter-{i}");
            let token = authority.register(&voter_id, i as u64, rng).unwrap();
            let (ct, proof) = prepare_ballot(authority.params(), b as u8, rng);
            voting_center
                .cast(&voter_id, &token, ct, proof, 100 + i as u64)
                .unwrap();
        }
    }

    #[test]
    fn s1_three_voters_yes_majority() {
        let mut rng = StdRng::seed_from_u64(200);
        let authority = Authority::setup(64, 3, &mut rng).unwrap();
        authority.open().unwrap();
        cast_all(&authority, &[1, 0, 1], &mut rng);
        authority.close().unwrap();
        let (yes, no) = authority.tallying_center().tally(&mut rng, 1000).unwrap();
        assert_eq!((yes, no), (2, 1));
    }

    #[test]
    fn s2_eight_voters_full_audit_chain() {
        let mut rng = StdRng::seed_from_u64(201);
        let authority = Authority::setup(64, 8, &mut rng).unwrap();
        authority.open().unwrap();
        let bits = [1u64, 1, 0, 1, 0, 0, 1, 1];
        cast_all(&authority, &bits, &mut rng);
        authority.close().unwrap();
        let (yes, no) = authority.tallying_center().tally(&mut rng, 2000).unwrap();
        assert_eq!((yes, no), (5, 3));
        // 1 SETUP + 8 REGISTER + 8 VOTE + 1 MIX + 1 TALLY = 19
        assert_eq!(authority.audit_log_len(), 19);
        assert!(authority.audit_log_verify().is_ok());
    }

    #[test]
    fn s3_double_vote_is_rejected_and_tally_unchanged() {
        let mut rng = StdRng::seed_from_u64(202);
        let authority = Authority::setup(64, 3, &mut rng).unwrap();
        authority.open().unwrap();
        let voting_center = authority.voting_center();

        let token = authority.register("v1", 0, &mut rng).unwrap();
        let (ct, proof) = prepare_ballot(authority.params(), 1, &mut rng);
        voting_center.cast("v1", &token, ct, proof, 1).unwrap();

        let (ct2, proof2) = prepare_ballot(authority.params(), 1, &mut rng);
        let err = voting_center.cast("v1", &token, ct2, proof2, 2).unwrap_err();
        assert!(matches!(
            err,
            VoteError::Token(crate::errors::TokenError::TokenAlreadyUsed(_))
        ));

        authority.close().unwrap();
        let (yes, _no) = authority.tallying_center().tally(&mut rng, 10).unwrap();
        assert_eq!(yes, 1);
    }

    #[test]
    fn s4_malformed_proof_is_rejected_without_consuming_token() {
        use num_bigint::BigUint;
        use num_traits::One;

        let mut rng = StdRng::seed_from_u64(203);
        let authority = Authority::setup(64, 3, &mut rng).unwrap();
        authority.open().unwrap();
        let voting_center = authority.voting_center();

        let token = authority.register("v1", 0, &mut rng).unwrap();
        let (ct, mut proof) = prepare_ballot(authority.params(), 1, &mut rng);
        proof.r0 = (&proof.r0 + BigUint::one()) % &authority.params().q;

        let err = voting_center
            .cast("v1", &token, ct.clone(), proof, 1)
            .unwrap_err();
        assert!(matches!(err, VoteError::Nizk(_)));

        // Token must still be usable: a failed proof never consumed it.
        let (ct2, proof2) = prepare_ballot(authority.params(), 1, &mut rng);
        voting_center.cast("v1", &token, ct2, proof2, 2).unwrap();
    }

    #[test]
    fn s5_tampered_mix_output_is_rejected() {
        let mut rng = StdRng::seed_from_u64(204);
        let authority = Authority::setup(64, 3, &mut rng).unwrap();
        authority.open().unwrap();
        cast_all(&authority, &[1, 0, 1], &mut rng);
        authority.close().unwrap();

        let input_batch: Vec<Ciphertext> = {
            let shared = authority.shared.lock().unwrap();
            shared.input_batch.clone()
        };
        let (mut output, mu) = mixnet::mix(&authority.params, &input_batch, &mut rng);
        output[0] = elgamal::encrypt(&authority.params, 0, None, &mut rng);
        let err = mixnet::verify(&authority.params, &input_batch, &output, &mu).unwrap_err();
        assert_eq!(err, crate::errors::MixnetError::MixProofInvalid);
    }

    #[test]
    fn s6_audit_tamper_detected_at_offending_index() {
        let mut rng = StdRng::seed_from_u64(205);
        let authority = Authority::setup(64, 3, &mut rng).unwrap();
        authority.open().unwrap();
        cast_all(&authority, &[1, 0, 1], &mut rng);

        {
            let mut shared = authority.shared.lock().unwrap();
            // flip a byte of event 3's payload digest input: mutate the
            // stored ciphertext, which changes the recomputed payload digest.
            if let AuditPayload::Vote { ciphertext, .. } = &mut shared.audit_log.events[3].payload {
                ciphertext.e = (&ciphertext.e + num_bigint::BigUint::from(1u8)) % &authority.params.p;
            }
        }

        let err = authority.audit_log_verify().unwrap_err();
        assert_eq!(err, crate::errors::AuditError::AuditTampered { index: 3 }.into());
    }

    #[test]
    fn state_monotonicity_cast_outside_open_fails() {
        let mut rng = StdRng::seed_from_u64(206);
        let authority = Authority::setup(64, 3, &mut rng).unwrap();
        let voting_center = authority.voting_center();
        let token = authority.register("v1", 0, &mut rng).unwrap();
        let (ct, proof) = prepare_ballot(authority.params(), 1, &mut rng);
        // Still SETUP: casting must fail with WrongState.
        let err = voting_center.cast("v1", &token, ct, proof, 1).unwrap_err();
        assert!(matches!(
            err,
            VoteError::Protocol(ProtocolError::WrongState { current: ElectionState::Setup })
        ));
    }

    #[test]
    fn state_monotonicity_tally_outside_closed_fails() {
        let mut rng = StdRng::seed_from_u64(207);
        let authority = Authority::setup(64, 3, &mut rng).unwrap();
        authority.open().unwrap();
        let err = authority.tallying_center().tally(&mut rng, 1).unwrap_err();
        assert!(matches!(
            err,
            VoteError::Protocol(ProtocolError::WrongState { current: ElectionState::Open })
        ));
    }

    #[test]
    fn wire_types_round_trip_through_json() {
        let mut rng = StdRng::seed_from_u64(300);
        let authority = Authority::setup(64, 3, &mut rng).unwrap();
        let manifest = authority.manifest();
        let json = serde_json::to_string(&manifest).unwrap();
        let back: ElectionManifest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.params, manifest.params);

        let token = authority.register("v1", 0, &mut rng).unwrap();
        let (ct, proof) = prepare_ballot(authority.params(), 1, &mut rng);
        let submission = CastSubmission {
            voter_id: "v1".into(),
            token,
            ciphertext: ct,
            proof,
        };
        let json = serde_json::to_string(&submission).unwrap();
        let back: CastSubmission = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ciphertext, submission.ciphertext);
    }

    #[test]
    fn mix_and_tally_records_round_trip_through_json() {
        let mut rng = StdRng::seed_from_u64(301);
        let authority = Authority::setup(64, 3, &mut rng).unwrap();
        authority.open().unwrap();
        cast_all(&authority, &[1, 0, 1], &mut rng);
        authority.close().unwrap();
        authority.tallying_center().tally(&mut rng, 1).unwrap();

        let mix_record = authority.mix_record().expect("tally populates mix_record");
        let json = serde_json::to_string(&mix_record).unwrap();
        let back: MixRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.output_batch, mix_record.output_batch);

        let tally_record = authority.tally_record().expect("tally populates tally_record");
        let json = serde_json::to_string(&tally_record).unwrap();
        let back: TallyRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.sum, tally_record.sum);
        assert_eq!(back.c_star, tally_record.c_star);
    }
}
