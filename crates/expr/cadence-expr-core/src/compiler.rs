//! Expression compiler: source text → [`Program`].
//!
//! Pipeline: tokenize → shunting-yard to reverse Polish → operand-count check →
//! constant folding → word emission.

use log::debug;

use crate::bytecode::{Program, Word};
use crate::env::Environment;
use crate::error::{CompileError, Span};
use crate::functions::{Fixity, Function, OpCode};
use crate::stack::Stack;
use crate::token::{tokenize, Spanned, Token};
use crate::vm;

/// Compile `source` against `env`.
pub fn compile(source: &str, env: &Environment) -> Result<Program, CompileError> {
    let tokens = tokenize(source, env)?;
    let rpn = to_rpn(&tokens)?;
    check_operands(&rpn)?;
    let folded = fold_constants(rpn)?;
    let program = emit(&folded);
    debug!(
        "compiled `{}` into {} words ({} tokens)",
        source,
        program.len(),
        tokens.len()
    );
    Ok(program)
}

/// Compile and write the wire encoding into `out`.
///
/// Returns the number of words the program needs. When that exceeds
/// `out.len()` only a prefix was written and the caller should treat the
/// destination as too small.
pub fn compile_into(
    source: &str,
    env: &Environment,
    out: &mut [u32],
) -> Result<usize, CompileError> {
    let program = compile(source, env)?;
    Ok(program.encode_into(out))
}

/// An operator waiting on the shunting-yard stack.
struct Pending {
    /// `(paren_level, precedence)`, compared lexicographically.
    key: (usize, u8),
    token: Spanned,
}

fn to_rpn(tokens: &[Spanned]) -> Result<Vec<Spanned>, CompileError> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Pending> = Vec::new();
    let mut open_parens: Vec<Span> = Vec::new();

    for t in tokens {
        match t.token {
            Token::Number(_) | Token::Variable(_) => output.push(*t),
            Token::LeftParen => open_parens.push(t.span),
            Token::RightParen => {
                if open_parens.pop().is_none() {
                    return Err(CompileError::UnbalancedParenthesis { span: t.span });
                }
            }
            Token::Function(id) => {
                let function = id.function();
                let key = (open_parens.len(), function.precedence);
                // A prefix operator starts a new operand, so it never pops: `abs -a`, `- -a`.
                while let Some(top) = operators.last() {
                    let pops = match function.fixity {
                        Fixity::Infix => top.key >= key,
                        Fixity::Prefix => false,
                    };
                    if !pops {
                        break;
                    }
                    if let Some(top) = operators.pop() {
                        output.push(top.token);
                    }
                }
                operators.push(Pending { key, token: *t });
            }
        }
    }

    if let Some(span) = open_parens.pop() {
        return Err(CompileError::UnbalancedParenthesis { span });
    }
    while let Some(op) = operators.pop() {
        output.push(op.token);
    }
    Ok(output)
}

fn function_of(token: &Token) -> Option<&'static Function> {
    match token {
        Token::Function(id) => Some(id.function()),
        _ => None,
    }
}

/// Simulate stack depth over the RPN so that every call has its operands and
/// exactly one value remains.
fn check_operands(rpn: &[Spanned]) -> Result<(), CompileError> {
    let mut depth = 0usize;
    for t in rpn {
        match function_of(&t.token) {
            Some(f) => {
                let arity = f.arity as usize;
                if depth < arity {
                    return Err(CompileError::ArityMismatch {
                        function: f.name,
                        expected: arity,
                        found: depth,
                        span: t.span,
                    });
                }
                depth -= arity;
                if f.opcode.produces_value() {
                    depth += 1;
                }
            }
            None => depth += 1,
        }
    }
    match depth {
        0 => Err(CompileError::EmptyExpression),
        1 => Ok(()),
        count => Err(CompileError::DanglingOperand {
            count,
            span: rpn.last().map(|t| t.span).unwrap_or_default(),
        }),
    }
}

/// Replace calls whose operands are all literals with their value.
///
/// A single left-to-right scan is enough: a folded result is itself a literal,
/// so an enclosing call sees it as such when its turn comes.
fn fold_constants(rpn: Vec<Spanned>) -> Result<Vec<Spanned>, CompileError> {
    let mut out: Vec<Spanned> = Vec::with_capacity(rpn.len());
    let mut stack = Stack::with_capacity(4);

    for t in rpn {
        if let Some(f) = function_of(&t.token) {
            if f.opcode == OpCode::Nop {
                // `,` and unary `+` do nothing at runtime.
                continue;
            }
            let arity = f.arity as usize;
            let base = out.len().saturating_sub(arity);
            let operands = &out[base..];
            if operands.len() == arity
                && operands.iter().all(|o| matches!(o.token, Token::Number(_)))
            {
                let span = operands
                    .iter()
                    .fold(t.span, |span, o| span.cover(o.span));
                let value = fold_call(f, operands, &mut stack).ok_or(
                    CompileError::ArityMismatch {
                        function: f.name,
                        expected: arity,
                        found: operands.len(),
                        span: t.span,
                    },
                )?;
                if !value.is_finite() {
                    return Err(CompileError::NonFiniteConstant { span });
                }
                out.truncate(base);
                out.push(Spanned {
                    token: Token::Number(value),
                    span,
                });
                continue;
            }
        }
        out.push(t);
    }
    Ok(out)
}

fn fold_call(f: &Function, operands: &[Spanned], stack: &mut Stack) -> Option<f32> {
    stack.clear();
    for o in operands {
        if let Token::Number(v) = o.token {
            stack.push(v).ok()?;
        }
    }
    vm::execute(f.opcode, stack).ok()?;
    stack.pop().ok()
}

fn emit(tokens: &[Spanned]) -> Program {
    let mut words = Vec::with_capacity(tokens.len() + 1);
    for t in tokens {
        let word = match t.token {
            Token::Number(v) => Word::Literal(v),
            Token::Variable(index) => Word::PushVariable(index),
            Token::Function(id) => Word::Call(id.function().opcode),
            Token::LeftParen | Token::RightParen => continue,
        };
        words.push(word);
    }
    words.push(Word::End);
    Program::from_words(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Environment {
        Environment::with_variables(["speed", "health"]).with_default_constants()
    }

    #[test]
    fn folds_fully_constant_expression() {
        let program = compile("1 + 2 * 3", &env()).unwrap();
        assert_eq!(program.words(), &[Word::Literal(7.0), Word::End]);
    }

    #[test]
    fn folds_constant_subtrees_only() {
        let program = compile("speed * (2 + 3)", &env()).unwrap();
        assert_eq!(
            program.words(),
            &[
                Word::PushVariable(0),
                Word::Literal(5.0),
                Word::Call(OpCode::Mul),
                Word::End,
            ]
        );
    }

    #[test]
    fn comma_and_unary_plus_vanish() {
        let program = compile("match(speed, +3)", &env()).unwrap();
        assert_eq!(
            program.words(),
            &[
                Word::PushVariable(0),
                Word::Literal(3.0),
                Word::Call(OpCode::Match),
                Word::End,
            ]
        );
    }

    #[test]
    fn nested_prefix_operators_apply_right_to_left() {
        let program = compile("- -speed", &env()).unwrap();
        assert_eq!(
            program.words(),
            &[
                Word::PushVariable(0),
                Word::Call(OpCode::UnaryMinus),
                Word::Call(OpCode::UnaryMinus),
                Word::End,
            ]
        );
    }

    #[test]
    fn prefix_operator_binds_to_a_function_argument() {
        for (source, op) in [("abs -speed", OpCode::Abs), ("sin -speed", OpCode::Sin)] {
            let program = compile(source, &env()).unwrap();
            assert_eq!(
                program.words(),
                &[
                    Word::PushVariable(0),
                    Word::Call(OpCode::UnaryMinus),
                    Word::Call(op),
                    Word::End,
                ],
                "{source}"
            );
        }
        let vars = [2.5, 0.0];
        let mut stack = Stack::with_capacity(4);
        let abs = compile("abs -speed", &env()).unwrap();
        assert_eq!(vm::eval(abs.words(), &vars, &mut stack), Ok(2.5));
        let sin = compile("sin -speed", &env()).unwrap();
        assert_eq!(vm::eval(sin.words(), &vars, &mut stack), Ok((-2.5f32).sin()));
    }

    #[test]
    fn constants_fold_like_literals() {
        let program = compile("PI * 2", &env()).unwrap();
        assert_eq!(program.as_constant(), Some(std::f32::consts::PI * 2.0));
    }

    #[test]
    fn division_by_zero_constant_is_rejected() {
        let err = compile("1 / 0", &env()).unwrap_err();
        assert_eq!(
            err,
            CompileError::NonFiniteConstant {
                span: Span::new(0, 5)
            }
        );
    }

    #[test]
    fn missing_operand_is_an_arity_error() {
        let err = compile("match(speed)", &env()).unwrap_err();
        assert!(matches!(
            err,
            CompileError::ArityMismatch {
                function: "match",
                expected: 2,
                found: 1,
                ..
            }
        ));
        assert!(matches!(
            compile("speed +", &env()).unwrap_err(),
            CompileError::ArityMismatch { function: "+", .. }
        ));
    }

    #[test]
    fn leftover_operands_are_rejected() {
        assert!(matches!(
            compile("speed health", &env()).unwrap_err(),
            CompileError::DanglingOperand { count: 2, .. }
        ));
    }

    #[test]
    fn empty_source_is_rejected() {
        assert_eq!(compile("", &env()), Err(CompileError::EmptyExpression));
        assert_eq!(compile(" ( ) ", &env()), Err(CompileError::EmptyExpression));
    }

    #[test]
    fn unbalanced_parentheses_are_rejected() {
        assert_eq!(
            compile("(speed + 1", &env()),
            Err(CompileError::UnbalancedParenthesis {
                span: Span::new(0, 1)
            })
        );
        assert_eq!(
            compile("speed)", &env()),
            Err(CompileError::UnbalancedParenthesis {
                span: Span::new(5, 6)
            })
        );
    }

    #[test]
    fn compile_into_truncates_and_reports_size() {
        let mut out = [0u32; 2];
        let needed = compile_into("health - speed", &env(), &mut out).unwrap();
        assert_eq!(needed, 4);
        assert_eq!(out, [0x7f90_0001, 0x7f90_0000]);

        let mut roomy = [0u32; 8];
        assert_eq!(compile_into("2", &env(), &mut roomy).unwrap(), 2);
        assert_eq!(&roomy[..2], &[0x4000_0000, 0x7fa0_0000]);
    }
}
