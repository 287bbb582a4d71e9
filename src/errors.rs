// =============================================================================
// Engine error kinds — typed propagation policy
// =============================================================================
//
// Every fallible boundary in the engine ultimately resolves to one of these
// five kinds so the CLI can map a failed run onto the exit codes from the
// operator surface: 0 ok, 1 configuration, 2 transient, 3 invariant.
// Unrecoverable-internal exits the process outright (see main.rs).
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("transient external failure: {0}")]
    TransientExternal(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unrecoverable internal error: {0}")]
    UnrecoverableInternal(String),
}

impl EngineError {
    /// Exit code surfaced to the operator shell.
    pub fn exit_code(&self) -> i32 {
        match self {
            EngineError::Configuration(_) => 1,
            EngineError::TransientExternal(_) => 2,
            EngineError::InvariantViolation(_) => 3,
            EngineError::MalformedInput(_) => 3,
            EngineError::UnrecoverableInternal(_) => 3,
        }
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        EngineError::TransientExternal(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        EngineError::InvariantViolation(msg.into())
    }
}
