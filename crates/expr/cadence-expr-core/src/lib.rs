//! Cadence expression core.
//!
//! Compiles scalar expressions such as `match(speed, 3) + idle * 0.2` into a
//! flat byte-code program and evaluates that program on a fixed-capacity
//! stack. The language is float-only with no control flow: every program runs
//! in time linear in its length.
//!
//! ```
//! use cadence_expr_core::{compile, eval, Environment, Stack};
//!
//! let env = Environment::with_variables(["speed", "health"]);
//! let program = compile("health - speed", &env).unwrap();
//! let mut stack = Stack::default();
//! assert_eq!(eval(program.words(), &[5.0, 10.0], &mut stack), Ok(5.0));
//! ```

pub mod bytecode;
pub mod compiler;
pub mod env;
pub mod error;
pub mod functions;
pub mod stack;
pub mod token;
pub mod vm;

pub use bytecode::{decode_words, Program, Word};
pub use compiler::{compile, compile_into};
pub use env::{Environment, DEFAULT_CONSTANTS};
pub use error::{CompileError, DecodeError, EvalError, Span, StackError};
pub use functions::{Function, FunctionId, OpCode, FUNCTIONS};
pub use stack::{Stack, DEFAULT_STACK_CAPACITY};
pub use vm::{eval, run};
