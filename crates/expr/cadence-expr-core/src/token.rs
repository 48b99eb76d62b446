//! Tokenizer.
//!
//! Identifiers resolve against the environment while scanning, so the token
//! stream already carries variable indices, folded constant values and
//! function ids.

use crate::env::Environment;
use crate::error::{CompileError, Span};
use crate::functions::{self, FunctionId, UNARY_MINUS, UNARY_PLUS};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Token {
    Number(f32),
    Function(FunctionId),
    Variable(u32),
    LeftParen,
    RightParen,
}

/// A token and the source bytes it came from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub span: Span,
}

impl Spanned {
    fn new(token: Token, start: usize, end: usize) -> Self {
        Self {
            token,
            span: Span::new(start, end),
        }
    }
}

pub fn tokenize(source: &str, env: &Environment) -> Result<Vec<Spanned>, CompileError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    // True when the previous token ends an operand, so `+`/`-` are binary.
    let mut binary = false;
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let start = i;

        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }

        if c.is_ascii_digit() || (c == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            i = scan_number(bytes, i);
            let text = &source[start..i];
            let value = text
                .parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| CompileError::MalformedNumber {
                    text: text.to_string(),
                    span: Span::new(start, i),
                })?;
            tokens.push(Spanned::new(Token::Number(value), start, i));
            binary = true;
        } else if c.is_ascii_alphabetic() || c == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let name = &source[start..i];
            let token = resolve_identifier(name, env).ok_or_else(|| {
                CompileError::UnknownIdentifier {
                    name: name.to_string(),
                    span: Span::new(start, i),
                }
            })?;
            binary = !matches!(token, Token::Function(_));
            tokens.push(Spanned::new(token, start, i));
        } else if c == b'(' {
            i += 1;
            tokens.push(Spanned::new(Token::LeftParen, start, i));
            binary = false;
        } else if c == b')' {
            i += 1;
            tokens.push(Spanned::new(Token::RightParen, start, i));
            binary = true;
        } else if !binary && (c == b'-' || c == b'+') {
            i += 1;
            let id = if c == b'-' { UNARY_MINUS } else { UNARY_PLUS };
            tokens.push(Spanned::new(Token::Function(id), start, i));
        } else {
            let (id, len) = lookup_symbol(&source[i..]).ok_or_else(|| {
                let symbol = source[i..].chars().next().unwrap_or_default();
                CompileError::UnknownSymbol {
                    symbol: symbol.to_string(),
                    span: Span::new(start, start + symbol.len_utf8()),
                }
            })?;
            i += len;
            tokens.push(Spanned::new(Token::Function(id), start, i));
            binary = false;
        }
    }

    Ok(tokens)
}

/// Variables shadow constants, constants shadow functions.
fn resolve_identifier(name: &str, env: &Environment) -> Option<Token> {
    if let Some(index) = env.variable_index(name) {
        return Some(Token::Variable(index));
    }
    if let Some(value) = env.constant_value(name) {
        return Some(Token::Number(value));
    }
    functions::lookup(name).map(Token::Function)
}

/// Operator symbols; a two-character spelling wins over its one-character prefix.
fn lookup_symbol(rest: &str) -> Option<(FunctionId, usize)> {
    let mut ends = rest.char_indices().map(|(i, c)| i + c.len_utf8());
    let one = ends.next()?;
    if let Some(two) = ends.next() {
        if let Some(id) = functions::lookup(&rest[..two]) {
            return Some((id, two));
        }
    }
    functions::lookup(&rest[..one]).map(|id| (id, one))
}

/// Scan `digits [. digits] [(e|E) [+|-] digits]` and return the end offset.
/// Extra dots are consumed so `1.2.3` is reported as one malformed number.
fn scan_number(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
        i += 1;
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if i < bytes.len() && (bytes[i] == b'+' || bytes[i] == b'-') {
            i += 1;
        }
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    i
}
