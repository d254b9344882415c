//! Runtime errors

use thiserror::Error;

/// Opaque host-side error, carried through unchanged.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Runtime result type
pub type Result<T> = std::result::Result<T, Error>;

/// Runtime errors. All are fatal for the current `next_output` call; the
/// machine may be left partially advanced.
#[derive(Debug, Error)]
pub enum Error {
    #[error("pending choice requires an input")]
    MissingInput,

    #[error("input carries no option index")]
    NullOptionIndex,

    #[error("option index {index} out of range ({len} options)")]
    OptionIndexOutOfRange { index: usize, len: usize },

    #[error("jump point not found: {tag}")]
    JumpNotFound { tag: String },

    #[error("instruction not executable: {kind}")]
    UnknownInstruction { kind: String },

    #[error("environment: {0}")]
    Environment(BoxError),

    #[error("embedded code: {0}")]
    Eval(BoxError),
}
