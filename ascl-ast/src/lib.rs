#![forbid(unsafe_code)]

mod blk;
mod exp;
mod id;
mod meta;

use miette::SourceSpan;

pub use blk::{Ast, Block, Stmt, StmtKind};
pub use exp::{BinOp, Deferred, Exp, ExpKind, TypeSpec, UnaryOp, Value};
pub use id::{
    ContractId, FuncId, Id, IdKind, IdRef, IdTable, InterfaceId, Modifier, ParamId, StructId,
    VarId,
};
pub use meta::{align_to, checked_align_to, Meta, Nominal, NominalKind, TypeKind, ADDR_SIZE};

pub type Span = SourceSpan;

pub fn span(start: usize, len: usize) -> Span {
    SourceSpan::new(start.into(), len)
}

pub fn span_between(start: usize, end: usize) -> Span {
    debug_assert!(end >= start);
    span(start, end - start)
}

/// Functions provided by the runtime's system library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SysFnKind {
    Abs32,
    Abs64,
    Pow32,
    Pow64,
    Sign32,
    Sign64,
    Lower,
    Upper,
}
