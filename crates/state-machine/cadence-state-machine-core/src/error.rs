//! Error types for building, loading and driving state machines.

use cadence_expr_core::{CompileError, DecodeError};
use thiserror::Error;

use crate::ids::EntityId;

/// Asset-build failure. Never reaches the runtime.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("state machine json parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("state machine declares no states")]
    NoStates,
    #[error("duplicate state id `{0}`")]
    DuplicateState(String),
    #[error("duplicate variable `{0}`")]
    DuplicateVariable(String),
    #[error("too many variables: {count} (max {max})")]
    TooManyVariables { count: usize, max: usize },
    #[error("initial state `{0}` is not declared")]
    UnknownInitialState(String),
    #[error("state `{state}`: transition on `{event}` targets undeclared state `{target}`")]
    UnknownTransitionTarget {
        state: String,
        event: String,
        target: String,
    },
    #[error("state `{0}` declares no animations")]
    NoAnimations(String),
    #[error("{context}: {source}")]
    Expression {
        context: String,
        text: String,
        #[source]
        source: CompileError,
    },
    #[error("byte code needs {needed} words, limit is {limit}")]
    ByteCodeCapacityExceeded { needed: usize, limit: usize },
    #[error("compiled resource is {size} bytes, beyond the 32-bit offset range")]
    ResourceTooLarge { size: usize },
}

impl BuildError {
    /// Plain-text report; expression errors include a labelled source excerpt
    /// headed by the owning state and animation.
    pub fn render(&self) -> String {
        match self {
            BuildError::Expression {
                context,
                text,
                source,
            } => source.render_named(context, text),
            other => format!("Error: {other}"),
        }
    }
}

/// Load-time integrity failure of a compiled resource.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResourceError {
    #[error("resource truncated: {needed} bytes needed at offset {offset}")]
    Truncated { offset: usize, needed: usize },
    #[error("unsupported resource version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("{what} at offset {offset} lies outside the resource")]
    OutOfBounds { what: &'static str, offset: usize },
    #[error("resource declares no states")]
    NoStates,
    #[error("{referrer} points at offset {offset}, which is not a state")]
    NotAState { referrer: &'static str, offset: u32 },
    #[error("state at offset {state_offset} lists no animations")]
    EmptyState { state_offset: u32 },
    #[error("unknown transition mode {mode} in state at offset {state_offset}")]
    UnknownTransitionMode { mode: u32, state_offset: u32 },
    #[error("byte code word {index}: {source}")]
    ByteCode {
        index: usize,
        #[source]
        source: DecodeError,
    },
    #[error("program at word {offset} lies outside the {size}-word byte code")]
    ProgramOutOfBounds { offset: u32, size: usize },
    #[error("program at word {offset} is not terminated by END")]
    UnterminatedProgram { offset: u32 },
    #[error("program at word {offset} reads variable {index} of {count}")]
    VariableOutOfRange { offset: u32, index: u32, count: usize },
    #[error("program at word {offset} does not leave exactly one value")]
    MalformedProgram { offset: u32 },
}

/// Misuse of the runtime API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuntimeError {
    #[error("entity {0:?} has no state machine")]
    UnknownEntity(EntityId),
    #[error("state machine has no variable `{0}`")]
    UnknownVariable(String),
    #[error("variable index {index} out of range ({count} variables)")]
    VariableOutOfRange { index: u32, count: usize },
}
