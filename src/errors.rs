//! Crate-wide error aggregation, in the style of `eg::errors::EgError`: each
//! component owns its own error enum, and they fold into one [`VoteError`]
//! via `#[from]` so callers crossing module boundaries can use `?`.

use thiserror::Error;

/// Errors from [`crate::modarith`]: parameter search and discrete-log recovery.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModArithError {
    #[error("failed to find a safe prime of {bits} bits after {attempts} attempts")]
    ParameterError { bits: usize, attempts: u32 },

    #[error("failed to find a generator of the order-q subgroup after {attempts} attempts")]
    GeneratorNotFound { attempts: u32 },

    #[error("discrete log not found for any exponent k <= {max_n}")]
    TallyOutOfRange { max_n: u64 },
}

/// Errors from [`crate::nizk`]: the disjunctive 0-or-1 proof.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NizkError {
    #[error("NIZK proof failed verification")]
    InvalidProof,
}

/// Errors from [`crate::mixnet`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MixnetError {
    #[error("mix proof failed verification")]
    MixProofInvalid,

    #[error("mix input and output batches have different lengths ({input} != {output})")]
    BatchLengthMismatch { input: usize, output: usize },
}

/// Errors from [`crate::token_registry`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("voter `{0}` is already registered")]
    AlreadyRegistered(String),

    #[error("voter `{0}` is not registered")]
    UnknownVoter(String),

    #[error("submitted token does not match the one issued to this voter")]
    BadToken,

    #[error("token for voter `{0}` has already been consumed")]
    TokenAlreadyUsed(String),
}

/// Errors from [`crate::audit_log`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuditError {
    #[error("audit chain broken at event index {index}")]
    AuditTampered { index: u64 },
}

/// Errors from [`crate::protocol`]: role orchestration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("operation not permitted in election state `{current:?}`")]
    WrongState { current: crate::protocol::ElectionState },
}

/// The aggregate [`std::error::Error`] type returned by `votecore` operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoteError {
    #[error(transparent)]
    ModArith(#[from] ModArithError),

    #[error(transparent)]
    Nizk(#[from] NizkError),

    #[error(transparent)]
    Mixnet(#[from] MixnetError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// [`Result`](std::result::Result) type with a [`VoteError`].
pub type VoteResult<T> = std::result::Result<T, VoteError>;
