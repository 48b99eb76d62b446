//! Configuration for the offline compiler and the runtime engine.

use cadence_expr_core::{Environment, DEFAULT_CONSTANTS, DEFAULT_STACK_CAPACITY};
use serde::{Deserialize, Serialize};

/// Runtime sizing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Capacity of the VM stack shared by every evaluation.
    pub stack_capacity: usize,
    /// Frame changes retained per tick; extra records are dropped with a warning.
    pub max_events_per_tick: usize,
    /// Initial capacity hint for the record table.
    pub initial_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stack_capacity: DEFAULT_STACK_CAPACITY,
            max_events_per_tick: 4096,
            initial_capacity: 64,
        }
    }
}

/// Settings for [`compile_state_machine`](crate::compiler::compile_state_machine).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Upper bound on the byte-code blob of one state machine, in words.
    pub max_byte_code_words: usize,
    /// Named constants folded into expressions.
    pub constants: Vec<(String, f32)>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            max_byte_code_words: 1024,
            constants: DEFAULT_CONSTANTS
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
        }
    }
}

impl CompilerConfig {
    /// Compile environment for a machine declaring `variables` in order.
    pub fn environment<'a>(&self, variables: impl IntoIterator<Item = &'a str>) -> Environment {
        self.constants.iter().fold(
            Environment::with_variables(variables),
            |env, (name, value)| env.constant(name.as_str(), *value),
        )
    }
}
