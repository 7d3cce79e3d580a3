//! Re-encryption mixnet: permute and re-encrypt a ciphertext batch, and
//! prove, via a revealed aggregate randomizer plus a Schnorr proof of
//! knowledge of it, that the batch's homomorphic sum is preserved.
//!
//! This mixnet proves sum-preservation only (sufficient for additive
//! tallying), not per-ballot shuffle correctness; see `DESIGN.md` for the
//! open question this leaves unresolved.

use num_bigint::BigUint;
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::elgamal::{self, Ciphertext, GroupParams};
use crate::encoding::Encoder;
use crate::errors::MixnetError;
use crate::hash;
use crate::modarith;

/// Proof that the mix output's homomorphic sum equals the input's, shifted
/// by the revealed aggregate randomizer `r_sum`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixProof {
    pub r_sum: BigUint,
    pub schnorr_a: BigUint,
    pub schnorr_b: BigUint,
    pub schnorr_c: BigUint,
    pub schnorr_s: BigUint,
}

fn schnorr_challenge(
    params: &GroupParams,
    target_v: &BigUint,
    target_e: &BigUint,
    a: &BigUint,
    b: &BigUint,
) -> BigUint {
    let transcript = Encoder::new()
        .write_biguint(&params.p)
        .write_biguint(&params.q)
        .write_biguint(target_v)
        .write_biguint(target_e)
        .write_biguint(a)
        .write_biguint(b)
        .finish();
    hash::hash_to_scalar(&transcript, &params.q)
}

/// Permutes and re-encrypts `input`, returning the output batch and a proof
/// that its homomorphic sum matches `input`'s.
pub fn mix(
    params: &GroupParams,
    input: &[Ciphertext],
    rng: &mut impl RngCore,
) -> (Vec<Ciphertext>, MixProof) {
    let mut indices: Vec<usize> = (0..input.len()).collect();
    indices.shuffle(rng);

    let mut r_sum = BigUint::from(0u8);
    let mut output = Vec::with_capacity(input.len());
    for &i in &indices {
        let (ct, r) = elgamal::rerandomize(params, &input[i], None, rng);
        r_sum = (r_sum + r) % &params.q;
        output.push(ct);
    }

    let target_v = {
        let prod_in = elgamal::homomorphic_sum(params, input).v;
        let prod_out = elgamal::homomorphic_sum(params, &output).v;
        (prod_out * modarith::modinv(&prod_in, &params.p)) % &params.p
    };
    let target_e = {
        let prod_in = elgamal::homomorphic_sum(params, input).e;
        let prod_out = elgamal::homomorphic_sum(params, &output).e;
        (prod_out * modarith::modinv(&prod_in, &params.p)) % &params.p
    };

    let w = modarith::random_scalar(rng, &params.q);
    let schnorr_a = modarith::modexp(&params.g, &w, &params.p);
    let schnorr_b = modarith::modexp(&params.u, &w, &params.p);
    let schnorr_c = schnorr_challenge(params, &target_v, &target_e, &schnorr_a, &schnorr_b);
    let schnorr_s = (w + (&schnorr_c * &r_sum) % &params.q) % &params.q;

    (
        output,
        MixProof {
            r_sum,
            schnorr_a,
            schnorr_b,
            schnorr_c,
            schnorr_s,
        },
    )
}

/// Verifies that `output` is a sum-preserving re-encryption of `input`.
pub fn verify(
    params: &GroupParams,
    input: &[Ciphertext],
    output: &[Ciphertext],
    proof: &MixProof,
) -> Result<(), MixnetError> {
    if input.len() != output.len() {
        return Err(MixnetError::BatchLengthMismatch {
            input: input.len(),
            output: output.len(),
        });
    }

    let p = &params.p;
    let prod_in = elgamal::homomorphic_sum(params, input);
    let prod_out = elgamal::homomorphic_sum(params, output);

    let expected_v = (&prod_in.v * modarith::modexp(&params.g, &proof.r_sum, p)) % p;
    let expected_e = (&prod_in.e * modarith::modexp(&params.u, &proof.r_sum, p)) % p;
    if expected_v != prod_out.v || expected_e != prod_out.e {
        return Err(MixnetError::MixProofInvalid);
    }

    let target_v = (&prod_out.v * modarith::modinv(&prod_in.v, p)) % p;
    let target_e = (&prod_out.e * modarith::modinv(&prod_in.e, p)) % p;
    let c = schnorr_challenge(params, &target_v, &target_e, &proof.schnorr_a, &proof.schnorr_b);
    if c != proof.schnorr_c {
        return Err(MixnetError::MixProofInvalid);
    }

    let lhs_a = modarith::modexp(&params.g, &proof.schnorr_s, p);
    let rhs_a = (&proof.schnorr_a * modarith::modexp(&target_v, &proof.schnorr_c, p)) % p;
    let lhs_b = modarith::modexp(&params.u, &proof.schnorr_s, p);
    let rhs_b = (&proof.schnorr_b * modarith::modexp(&target_e, &proof.schnorr_c, p)) % p;
    if lhs_a != rhs_a || lhs_b != rhs_b {
        return Err(MixnetError::MixProofInvalid);
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn mix_preserves_tally() {
        let mut rng = StdRng::seed_from_u64(11);
        let (params, alpha) = elgamal::keygen(48, &mut rng).unwrap();
        let bits = [1u64, 0, 1, 1, 0, 0, 1];
        let input: Vec<_> = bits
            .iter()
            .map(|&b| elgamal::encrypt(&params, b, None, &mut rng))
            .collect();

        let (output, proof) = mix(&params, &input, &mut rng);
        assert!(verify(&params, &input, &output, &proof).is_ok());

        let sum_in = elgamal::homomorphic_sum(&params, &input);
        let sum_out = elgamal::homomorphic_sum(&params, &output);
        let cap = bits.len() as u64;
        assert_eq!(
            elgamal::decrypt(&params, &alpha, &sum_in, cap).unwrap(),
            elgamal::decrypt(&params, &alpha, &sum_out, cap).unwrap()
        );
    }

    #[test]
    fn tampering_an_output_ciphertext_breaks_the_mix_proof() {
        let mut rng = StdRng::seed_from_u64(12);
        let (params, _alpha) = elgamal::keygen(48, &mut rng).unwrap();
        let bits = [1u64, 0, 1];
        let input: Vec<_> = bits
            .iter()
            .map(|&b| elgamal::encrypt(&params, b, None, &mut rng))
            .collect();
        let (mut output, proof) = mix(&params, &input, &mut rng);
        output[0] = elgamal::encrypt(&params, 0, None, &mut rng);
        assert!(verify(&params, &input, &output, &proof).is_err());
    }
}
