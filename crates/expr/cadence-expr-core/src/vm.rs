//! Byte-code interpreter.
//!
//! Execution is a single forward pass with no jumps, so cost is linear in the
//! program length. Malformed programs surface as [`EvalError`]s; the VM never
//! panics on bad input.

use crate::bytecode::Word;
use crate::error::{EvalError, StackError};
use crate::functions::{match_weight, OpCode};
use crate::stack::Stack;

/// Execute `code` until its `End` word, pushing results onto `stack`.
///
/// The stack is not cleared first so callers can chain programs.
pub fn run(code: &[Word], variables: &[f32], stack: &mut Stack) -> Result<(), EvalError> {
    for word in code {
        match *word {
            Word::Literal(value) => stack.push(value)?,
            Word::PushVariable(index) => {
                let value = variables.get(index as usize).copied().ok_or(
                    EvalError::UnknownVariable {
                        index,
                        count: variables.len(),
                    },
                )?;
                stack.push(value)?;
            }
            Word::Call(op) => execute(op, stack)?,
            Word::End => return Ok(()),
        }
    }
    Err(EvalError::MissingEnd)
}

/// Clear `stack`, run `code` and return the value left on top.
pub fn eval(code: &[Word], variables: &[f32], stack: &mut Stack) -> Result<f32, EvalError> {
    stack.clear();
    run(code, variables, stack)?;
    stack.top().ok_or(EvalError::EmptyResult)
}

/// Apply one opcode to the stack.
pub fn execute(op: OpCode, stack: &mut Stack) -> Result<(), StackError> {
    match op {
        OpCode::Add => binary(stack, |a, b| a + b),
        OpCode::Sub => binary(stack, |a, b| a - b),
        OpCode::Mul => binary(stack, |a, b| a * b),
        OpCode::Div => binary(stack, |a, b| a / b),
        OpCode::UnaryMinus => unary(stack, |a| -a),
        OpCode::Nop => Ok(()),
        OpCode::Sin => unary(stack, f32::sin),
        OpCode::Cos => unary(stack, f32::cos),
        OpCode::Abs => unary(stack, f32::abs),
        OpCode::Match => binary(stack, match_weight),
        OpCode::Match2d => {
            // c and d are popped but unused: match2d currently matches (a, b) only.
            let _d = stack.pop()?;
            let _c = stack.pop()?;
            binary(stack, match_weight)
        }
    }
}

#[inline]
fn unary(stack: &mut Stack, op: impl Fn(f32) -> f32) -> Result<(), StackError> {
    let a = stack.pop()?;
    stack.push(op(a))
}

#[inline]
fn binary(stack: &mut Stack, op: impl Fn(f32, f32) -> f32) -> Result<(), StackError> {
    let b = stack.pop()?;
    let a = stack.pop()?;
    stack.push(op(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(ws: &[Word]) -> Vec<Word> {
        ws.to_vec()
    }

    #[test]
    fn binary_ops_pop_b_then_a() {
        let code = words(&[
            Word::Literal(10.0),
            Word::Literal(4.0),
            Word::Call(OpCode::Sub),
            Word::Literal(2.0),
            Word::Call(OpCode::Div),
            Word::End,
        ]);
        let mut stack = Stack::default();
        assert_eq!(eval(&code, &[], &mut stack), Ok(3.0));
    }

    #[test]
    fn variables_are_read_by_index() {
        let code = words(&[
            Word::PushVariable(1),
            Word::PushVariable(0),
            Word::Call(OpCode::Sub),
            Word::End,
        ]);
        let mut stack = Stack::default();
        assert_eq!(eval(&code, &[5.0, 10.0], &mut stack), Ok(5.0));
    }

    #[test]
    fn unknown_variable_is_an_error() {
        let code = words(&[Word::PushVariable(2), Word::End]);
        let mut stack = Stack::default();
        assert_eq!(
            run(&code, &[1.0], &mut stack),
            Err(EvalError::UnknownVariable { index: 2, count: 1 })
        );
    }

    #[test]
    fn underflow_and_overflow_fail_without_panicking() {
        let mut stack = Stack::with_capacity(1);
        let underflow = words(&[Word::Call(OpCode::Add), Word::End]);
        assert_eq!(
            run(&underflow, &[], &mut stack),
            Err(EvalError::Stack(StackError::Underflow))
        );

        stack.clear();
        let overflow = words(&[Word::Literal(1.0), Word::Literal(2.0), Word::End]);
        assert_eq!(
            run(&overflow, &[], &mut stack),
            Err(EvalError::Stack(StackError::Overflow { capacity: 1 }))
        );
    }

    #[test]
    fn missing_end_is_reported() {
        let mut stack = Stack::default();
        assert_eq!(
            run(&[Word::Literal(1.0)], &[], &mut stack),
            Err(EvalError::MissingEnd)
        );
    }

    #[test]
    fn nop_leaves_stack_untouched() {
        let code = words(&[Word::Literal(4.0), Word::Call(OpCode::Nop), Word::End]);
        let mut stack = Stack::default();
        assert_eq!(eval(&code, &[], &mut stack), Ok(4.0));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn empty_program_has_no_result() {
        let mut stack = Stack::default();
        assert_eq!(
            eval(&[Word::End], &[], &mut stack),
            Err(EvalError::EmptyResult)
        );
    }

    #[test]
    fn known_quirk_match2d_ignores_second_pair() {
        let code = words(&[
            Word::Literal(1.0),
            Word::Literal(1.5),
            Word::Literal(100.0),
            Word::Literal(-100.0),
            Word::Call(OpCode::Match2d),
            Word::End,
        ]);
        let mut stack = Stack::default();
        assert_eq!(eval(&code, &[], &mut stack), Ok(0.5));
        assert_eq!(stack.len(), 1);
    }
}
