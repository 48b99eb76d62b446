//! Built-in function table shared by the compiler and the VM.
//!
//! The table is a `const` array; a [`FunctionId`] is an index into it. Operator
//! symbols and named functions live side by side, the compiler decides which
//! entry a piece of source text maps to.

use serde::{Deserialize, Serialize};

/// Operation executed by a `Word::Call`.
///
/// Discriminants are the wire ids stored in the low 20 bits of a function word,
/// do not reorder.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum OpCode {
    Add = 0,
    Sub = 1,
    Mul = 2,
    Div = 3,
    UnaryMinus = 4,
    Nop = 5,
    Sin = 6,
    Cos = 7,
    Abs = 8,
    Match = 9,
    Match2d = 10,
}

impl OpCode {
    pub const ALL: [OpCode; 11] = [
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::UnaryMinus,
        OpCode::Nop,
        OpCode::Sin,
        OpCode::Cos,
        OpCode::Abs,
        OpCode::Match,
        OpCode::Match2d,
    ];

    #[inline]
    pub fn id(self) -> u32 {
        self as u32
    }

    #[inline]
    pub fn from_id(id: u32) -> Option<OpCode> {
        Self::ALL.get(id as usize).copied()
    }

    /// Number of operands popped from the stack.
    pub fn arity(self) -> usize {
        match self {
            OpCode::Nop => 0,
            OpCode::UnaryMinus | OpCode::Sin | OpCode::Cos | OpCode::Abs => 1,
            OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div | OpCode::Match => 2,
            OpCode::Match2d => 4,
        }
    }

    /// Whether the operation pushes a result.
    #[inline]
    pub fn produces_value(self) -> bool {
        self != OpCode::Nop
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            OpCode::Add => "add",
            OpCode::Sub => "sub",
            OpCode::Mul => "mul",
            OpCode::Div => "div",
            OpCode::UnaryMinus => "neg",
            OpCode::Nop => "nop",
            OpCode::Sin => "sin",
            OpCode::Cos => "cos",
            OpCode::Abs => "abs",
            OpCode::Match => "match",
            OpCode::Match2d => "match2d",
        }
    }
}

/// How a function token binds during the shunting-yard pass.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Fixity {
    /// Written between its operands (`a + b`) or used as a separator (`,`).
    Infix,
    /// Written before its operands (`-a`, `sin(a)`).
    Prefix,
}

/// Static descriptor of a built-in function.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Function {
    pub name: &'static str,
    pub opcode: OpCode,
    pub precedence: u8,
    pub arity: u8,
    pub fixity: Fixity,
}

impl Function {
    const fn new(
        name: &'static str,
        opcode: OpCode,
        precedence: u8,
        arity: u8,
        fixity: Fixity,
    ) -> Self {
        Self {
            name,
            opcode,
            precedence,
            arity,
            fixity,
        }
    }
}

/// Index into [`FUNCTIONS`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct FunctionId(pub u8);

impl FunctionId {
    #[inline]
    pub fn function(self) -> &'static Function {
        &FUNCTIONS[self.0 as usize]
    }
}

pub const COMMA: FunctionId = FunctionId(0);
pub const UNARY_MINUS: FunctionId = FunctionId(5);
pub const UNARY_PLUS: FunctionId = FunctionId(6);

pub const FUNCTIONS: [Function; 12] = [
    Function::new(",", OpCode::Nop, 1, 0, Fixity::Infix),
    Function::new("+", OpCode::Add, 12, 2, Fixity::Infix),
    Function::new("-", OpCode::Sub, 12, 2, Fixity::Infix),
    Function::new("*", OpCode::Mul, 13, 2, Fixity::Infix),
    Function::new("/", OpCode::Div, 13, 2, Fixity::Infix),
    Function::new("u-", OpCode::UnaryMinus, 16, 1, Fixity::Prefix),
    Function::new("u+", OpCode::Nop, 16, 0, Fixity::Prefix),
    Function::new("sin", OpCode::Sin, 17, 1, Fixity::Prefix),
    Function::new("cos", OpCode::Cos, 17, 1, Fixity::Prefix),
    Function::new("abs", OpCode::Abs, 17, 1, Fixity::Prefix),
    Function::new("match", OpCode::Match, 17, 2, Fixity::Prefix),
    Function::new("match2d", OpCode::Match2d, 17, 4, Fixity::Prefix),
];

/// Look up a function by its source spelling.
pub fn lookup(name: &str) -> Option<FunctionId> {
    FUNCTIONS
        .iter()
        .position(|f| f.name == name)
        .map(|i| FunctionId(i as u8))
}

/// `match(a, b)`: 1 when equal, falling off linearly to 0 at distance 1.
#[inline]
pub fn match_weight(a: f32, b: f32) -> f32 {
    (1.0 - (b - a).abs()).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_ids_round_trip() {
        for op in OpCode::ALL {
            assert_eq!(OpCode::from_id(op.id()), Some(op));
        }
        assert_eq!(OpCode::from_id(11), None);
    }

    #[test]
    fn table_arity_agrees_with_opcodes() {
        for f in FUNCTIONS.iter() {
            assert_eq!(f.arity as usize, f.opcode.arity(), "{}", f.name);
        }
    }

    #[test]
    fn lookup_finds_symbols_and_names() {
        assert_eq!(lookup("+").map(|id| id.function().opcode), Some(OpCode::Add));
        assert_eq!(lookup("match2d").map(|id| id.function().arity), Some(4));
        assert_eq!(lookup("tan"), None);
        assert_eq!(UNARY_MINUS.function().opcode, OpCode::UnaryMinus);
        assert_eq!(COMMA.function().name, ",");
    }

    #[test]
    fn match_weight_is_triangular() {
        assert_eq!(match_weight(3.0, 3.0), 1.0);
        assert_eq!(match_weight(3.0, 5.0), 0.0);
        assert!((match_weight(3.0, 3.25) - 0.75).abs() < 1e-6);
    }
}
