#![forbid(unsafe_code)]

use crate::{IdRef, Meta, Span, SysFnKind, TypeKind};

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Null,
    /// Raw object payload from the source, placed in the data segment.
    Blob(Vec<u8>),
    /// Folded aggregate initializer, laid out per the node's Meta.
    Aggr(Vec<u8>),
    /// Offset of a payload inside the static data segment.
    Addr(u32),
}

impl Value {
    /// Values the generator can emit as an immediate operand.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Double(_) | Value::Null | Value::Addr(_)
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Inc,
    Dec,
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    And,
    Or,
}

impl BinOp {
    pub fn is_cmp(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }
}

/// Runtime helper a node still needs after lowering.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deferred {
    MapGet,
    Concat,
    Convert,
    Query,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeSpec {
    Prim(TypeKind),
    /// Struct, contract or interface name.
    Named(String),
    Map(Box<Exp>, Box<Exp>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExpKind {
    Null,
    Lit(Value),
    /// Type annotation of a declaration.
    Type {
        spec: TypeSpec,
        public: bool,
    },
    Id(String),
    Array {
        base: Box<Exp>,
        index: Box<Exp>,
    },
    Cast {
        value: Box<Exp>,
        to: TypeKind,
    },
    Unary {
        op: UnaryOp,
        prefix: bool,
        operand: Box<Exp>,
    },
    Binary {
        op: BinOp,
        left: Box<Exp>,
        right: Box<Exp>,
    },
    Ternary {
        cond: Box<Exp>,
        then: Box<Exp>,
        otherwise: Box<Exp>,
    },
    Access {
        qual: Box<Exp>,
        name: String,
    },
    Call {
        callee: Box<Exp>,
        args: Vec<Exp>,
        /// Set when the callee is a system library function.
        sys: Option<SysFnKind>,
        /// Already lowered: the implicit contract-address argument, when the
        /// callee takes one, is in `args`.
        self_arg: bool,
    },
    /// Embedded query; not supported beyond type checking.
    Sql(String),
    Tuple(Vec<Exp>),
    /// Aggregate initializer `{a, b, ...}`.
    Init {
        elems: Vec<Exp>,
        /// Stack offset reserved for runtime materialization.
        slot: Option<u32>,
    },
    Alloc {
        slot: Option<u32>,
    },

    // Addressing modes, produced by lowering.
    Global(String),
    Local {
        idx: u32,
        ty: TypeKind,
    },
    Stack {
        base: u32,
        addr: u32,
        offset: u32,
        ty: TypeKind,
    },
}

#[derive(Clone, Debug, PartialEq)]
pub struct Exp {
    pub kind: ExpKind,
    pub meta: Meta,
    pub span: Span,
    /// Declaration this expression resolves to.
    pub id: Option<IdRef>,
    pub deferred: Option<Deferred>,
}

impl Exp {
    pub fn new(kind: ExpKind, span: Span) -> Self {
        Self {
            kind,
            meta: Meta::default().with_span(span),
            span,
            id: None,
            deferred: None,
        }
    }

    pub fn with_meta(mut self, meta: Meta) -> Self {
        self.meta = meta.with_span(self.span);
        self
    }

    pub fn null(span: Span) -> Self {
        Exp::new(ExpKind::Null, span)
    }

    pub fn lit(value: Value, span: Span) -> Self {
        Exp::new(ExpKind::Lit(value), span)
    }

    pub fn lit_int(v: i64, span: Span) -> Self {
        Exp::lit(Value::Int(v), span)
    }

    pub fn lit_bool(v: bool, span: Span) -> Self {
        Exp::lit(Value::Bool(v), span)
    }

    pub fn lit_str(v: impl Into<String>, span: Span) -> Self {
        Exp::lit(Value::Str(v.into()), span)
    }

    pub fn type_prim(ty: TypeKind, span: Span) -> Self {
        Exp::new(
            ExpKind::Type {
                spec: TypeSpec::Prim(ty),
                public: false,
            },
            span,
        )
    }

    pub fn type_named(name: impl Into<String>, span: Span) -> Self {
        Exp::new(
            ExpKind::Type {
                spec: TypeSpec::Named(name.into()),
                public: false,
            },
            span,
        )
    }

    pub fn type_map(key: Exp, value: Exp, span: Span) -> Self {
        Exp::new(
            ExpKind::Type {
                spec: TypeSpec::Map(Box::new(key), Box::new(value)),
                public: false,
            },
            span,
        )
    }

    /// Marks a type annotation `public`.
    pub fn public(mut self) -> Self {
        if let ExpKind::Type { public, .. } = &mut self.kind {
            *public = true;
        }
        self
    }

    pub fn id(name: impl Into<String>, span: Span) -> Self {
        Exp::new(ExpKind::Id(name.into()), span)
    }

    pub fn array(base: Exp, index: Exp, span: Span) -> Self {
        Exp::new(
            ExpKind::Array {
                base: Box::new(base),
                index: Box::new(index),
            },
            span,
        )
    }

    pub fn cast(value: Exp, to: TypeKind, span: Span) -> Self {
        Exp::new(
            ExpKind::Cast {
                value: Box::new(value),
                to,
            },
            span,
        )
    }

    pub fn unary(op: UnaryOp, prefix: bool, operand: Exp, span: Span) -> Self {
        Exp::new(
            ExpKind::Unary {
                op,
                prefix,
                operand: Box::new(operand),
            },
            span,
        )
    }

    pub fn binary(op: BinOp, left: Exp, right: Exp, span: Span) -> Self {
        Exp::new(
            ExpKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        )
    }

    pub fn ternary(cond: Exp, then: Exp, otherwise: Exp, span: Span) -> Self {
        Exp::new(
            ExpKind::Ternary {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: Box::new(otherwise),
            },
            span,
        )
    }

    pub fn access(qual: Exp, name: impl Into<String>, span: Span) -> Self {
        Exp::new(
            ExpKind::Access {
                qual: Box::new(qual),
                name: name.into(),
            },
            span,
        )
    }

    pub fn call(callee: Exp, args: Vec<Exp>, span: Span) -> Self {
        Exp::new(
            ExpKind::Call {
                callee: Box::new(callee),
                args,
                sys: None,
                self_arg: false,
            },
            span,
        )
    }

    pub fn sql(text: impl Into<String>, span: Span) -> Self {
        Exp::new(ExpKind::Sql(text.into()), span)
    }

    pub fn tuple(elems: Vec<Exp>, span: Span) -> Self {
        Exp::new(ExpKind::Tuple(elems), span)
    }

    pub fn init(elems: Vec<Exp>, span: Span) -> Self {
        Exp::new(ExpKind::Init { elems, slot: None }, span)
    }

    pub fn alloc(meta: Meta, span: Span) -> Self {
        Exp::new(ExpKind::Alloc { slot: None }, span).with_meta(meta)
    }

    pub fn global(name: impl Into<String>, meta: Meta, span: Span) -> Self {
        Exp::new(ExpKind::Global(name.into()), span).with_meta(meta)
    }

    /// Local slot `idx`, typed the way the frame types that slot.
    pub fn local(idx: u32, meta: Meta, span: Span) -> Self {
        let ty = meta.slot_type();
        Exp::new(ExpKind::Local { idx, ty }, span).with_meta(meta)
    }

    pub fn stack(base: u32, addr: u32, offset: u32, meta: Meta, span: Span) -> Self {
        let ty = meta.ty;
        Exp::new(
            ExpKind::Stack {
                base,
                addr,
                offset,
                ty,
            },
            span,
        )
        .with_meta(meta)
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, ExpKind::Null)
    }

    pub fn is_lit(&self) -> bool {
        matches!(self.kind, ExpKind::Lit(_))
    }

    pub fn is_local(&self) -> bool {
        matches!(self.kind, ExpKind::Local { .. })
    }

    pub fn is_stack(&self) -> bool {
        matches!(self.kind, ExpKind::Stack { .. })
    }

    /// Already in one of the addressing-mode forms.
    pub fn is_addressed(&self) -> bool {
        matches!(
            self.kind,
            ExpKind::Global(_) | ExpKind::Local { .. } | ExpKind::Stack { .. }
        )
    }

    pub fn as_int(&self) -> Option<i64> {
        match self.kind {
            ExpKind::Lit(Value::Int(v)) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.kind {
            ExpKind::Lit(Value::Bool(v)) => Some(v),
            _ => None,
        }
    }
}
