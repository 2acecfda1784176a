//! Abstract syntax produced by the grammar, consumed by `eval`/`pass`.
//!
//! Shaped directly after the captured PEG (`Program`/`Statement`/`Expression`
//! rules): a `Program` is a flat list of `Stmt`, blocks nest by holding
//! another `Program`, and `Expression`'s C-like precedence ladder becomes
//! `BinOp`'s variants rather than a precedence-climbing loop at eval time.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

pub type Program = Vec<Stmt>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// A bare label on its own line.
    Label(String),
    /// `*= expr` (set the program counter) or `symbol = expr`.
    Assign { target: AssignTarget, expr: Expr },
    Instruction {
        label: Option<String>,
        mnemonic: String,
        suffix: Option<String>,
        arg: Option<InstrArg>,
    },
    MacroCall {
        label: Option<String>,
        name: String,
        args: Vec<CallArg>,
    },
    Meta(Meta),
    /// `{ ... }` following a meta decl or if/enum block.
    Block(Program),
    /// `%{ ... }%`, passed through uninterpreted (scripting is external).
    Script(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AssignTarget {
    Pc,
    Symbol(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum InstrArg {
    Accumulator,
    Immediate(Expr),
    ZeroPageRelative { zp: Expr, bit: Expr, target: Expr },
    IndX(Expr),
    IndY(Expr),
    Indirect(Expr),
    AbsoluteX(Expr),
    AbsoluteY(Expr),
    /// Plain operand; resolved to zero-page/absolute/relative by the encoder
    /// once the value is known, per the mode-reconciliation rules.
    Operand(Expr),
    LabelRef(i32),
}

/// One `!name args` / `!name { block }` directive, dispatched by `meta::dispatch`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    pub name: String,
    pub args: Vec<CallArg>,
    pub block: Option<Program>,
    pub else_block: Option<Program>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallArg {
    pub name: Option<String>,
    pub value: Expr,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    Not,
    BitNot,
    Neg,
}

/// `<expr` / `>expr`: low byte / high byte selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ByteOp {
    Low,
    High,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    And,
    Or,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Cmp,
    Shl,
    Shr,
    Sub,
    Add,
    Div,
    Mul,
    Mod,
    IntDiv,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    Str(String),
    /// Dotted variable reference (`foo`, `.local`, `foo.bar`).
    Var(String),
    /// `*`: the current program counter.
    Pc,
    Unary(UnOp, Box<Expr>),
    ByteSelect(ByteOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    Array(Vec<Expr>),
    /// `indexable[start]` or `indexable[start:end]`.
    Index {
        base: Box<Expr>,
        start: Option<Box<Expr>>,
        end: Option<Box<Expr>>,
    },
    Call(String, Vec<CallArg>),
    Lambda(Rc<Lambda>),
    /// A run of `+` or `-` referring to the next/previous anonymous label;
    /// the sign of the count distinguishes direction (`++` => `LabelRef(2)`).
    LabelRef(i32),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    pub params: Vec<String>,
    pub body: Expr,
}
