#![forbid(unsafe_code)]

use crate::{Exp, IdRef, IdTable, Span};

#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    Exp(Exp),
    Assign { lhs: Exp, rhs: Exp },
    /// Declaration of a local variable; lowered to its initialization.
    Decl(IdRef),
    If {
        cond: Exp,
        then_blk: Block,
        else_blk: Option<Block>,
    },
    Return(Option<Exp>),
    Block(Block),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn exp(exp: Exp) -> Self {
        let span = exp.span;
        Stmt::new(StmtKind::Exp(exp), span)
    }

    pub fn assign(lhs: Exp, rhs: Exp, span: Span) -> Self {
        Stmt::new(StmtKind::Assign { lhs, rhs }, span)
    }

    pub fn decl(id: IdRef, span: Span) -> Self {
        Stmt::new(StmtKind::Decl(id), span)
    }

    pub fn if_else(cond: Exp, then_blk: Block, else_blk: Option<Block>, span: Span) -> Self {
        Stmt::new(
            StmtKind::If {
                cond,
                then_blk,
                else_blk,
            },
            span,
        )
    }

    pub fn ret(value: Option<Exp>, span: Span) -> Self {
        Stmt::new(StmtKind::Return(value), span)
    }

    pub fn block(blk: Block) -> Self {
        let span = blk.span;
        Stmt::new(StmtKind::Block(blk), span)
    }
}

/// A lexical scope. Identifiers are looked up in `structs` and `ids`, then in
/// the enclosing blocks.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub span: Span,
    pub ids: Vec<IdRef>,
    pub structs: Vec<IdRef>,
    pub stmts: Vec<Stmt>,
}

impl Block {
    pub fn new(span: Span) -> Self {
        Self {
            span,
            ids: Vec::new(),
            structs: Vec::new(),
            stmts: Vec::new(),
        }
    }
}

/// A parsed compilation unit.
#[derive(Clone, Debug, PartialEq)]
pub struct Ast {
    pub ids: IdTable,
    pub root: Block,
}

impl Ast {
    pub fn new(ids: IdTable, root: Block) -> Self {
        Self { ids, root }
    }
}
