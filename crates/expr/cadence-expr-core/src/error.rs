//! Error types for compilation, byte-code decoding and evaluation.

use std::fmt;

use ariadne::{Config, IndexType, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range into the expression source.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Errors reported by [`compile`](crate::compiler::compile).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    #[error("unknown identifier `{name}` at {span}")]
    UnknownIdentifier { name: String, span: Span },
    #[error("unknown symbol `{symbol}` at {span}")]
    UnknownSymbol { symbol: String, span: Span },
    #[error("malformed number `{text}` at {span}")]
    MalformedNumber { text: String, span: Span },
    #[error("unbalanced parenthesis at {span}")]
    UnbalancedParenthesis { span: Span },
    #[error("`{function}` expects {expected} operand(s), found {found} at {span}")]
    ArityMismatch {
        function: &'static str,
        expected: usize,
        found: usize,
        span: Span,
    },
    #[error("empty expression")]
    EmptyExpression,
    #[error("expression leaves {count} values, expected exactly one (near {span})")]
    DanglingOperand { count: usize, span: Span },
    #[error("constant subexpression at {span} is not finite")]
    NonFiniteConstant { span: Span },
}

impl CompileError {
    pub fn span(&self) -> Option<Span> {
        match self {
            CompileError::UnknownIdentifier { span, .. }
            | CompileError::UnknownSymbol { span, .. }
            | CompileError::MalformedNumber { span, .. }
            | CompileError::UnbalancedParenthesis { span }
            | CompileError::ArityMismatch { span, .. }
            | CompileError::DanglingOperand { span, .. }
            | CompileError::NonFiniteConstant { span } => Some(*span),
            CompileError::EmptyExpression => None,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            CompileError::UnknownIdentifier { .. } => "not a variable, constant or function",
            CompileError::UnknownSymbol { .. } => "unrecognised operator",
            CompileError::MalformedNumber { .. } => "not a valid number",
            CompileError::UnbalancedParenthesis { .. } => "unmatched parenthesis",
            CompileError::ArityMismatch { .. } => "wrong number of operands",
            CompileError::DanglingOperand { .. } => "left over here",
            CompileError::NonFiniteConstant { .. } => "folds to a non-finite value",
            CompileError::EmptyExpression => "empty",
        }
    }

    /// Render the error as a plain-text report over `source`.
    pub fn render(&self, source: &str) -> String {
        self.render_named("expression", source)
    }

    /// Like [`render`](Self::render), naming the source `name` in the report header.
    pub fn render_named(&self, name: &str, source: &str) -> String {
        let span = self
            .span()
            .map_or(0..0, |span| span.start.min(source.len())..span.end.min(source.len()));
        let mut report = Report::build(ReportKind::Error, (name, span.clone()))
            .with_message(self.to_string())
            .with_config(
                Config::default()
                    .with_color(false)
                    .with_index_type(IndexType::Byte),
            );
        if self.span().is_some() {
            report = report.with_label(Label::new((name, span)).with_message(self.label()));
        }
        let mut buf = Vec::new();
        report
            .finish()
            .write((name, Source::from(source)), &mut buf)
            .ok();
        String::from_utf8_lossy(&buf).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("stack overflow (capacity {capacity})")]
    Overflow { capacity: usize },
    #[error("stack underflow")]
    Underflow,
}

/// Failure while executing byte code. Evaluation never panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Stack(#[from] StackError),
    #[error("variable index {index} out of range ({count} variables)")]
    UnknownVariable { index: u32, count: usize },
    #[error("program is not terminated by END")]
    MissingEnd,
    #[error("program produced no value")]
    EmptyResult,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown opcode id {0}")]
    UnknownOpCode(u32),
    #[error("byte code is not terminated by END")]
    Unterminated,
}
