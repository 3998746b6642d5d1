#![forbid(unsafe_code)]

use std::ops::{Index, IndexMut};

use crate::{Block, Exp, Meta, Span};

/// Handle into the `IdTable`. Metas and expressions refer to declarations
/// only through this key; the table owns every declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdRef(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Modifier {
    pub public: bool,
    pub constant: bool,
    pub ctor: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarId {
    pub type_exp: Exp,
    /// One size expression per array dimension; `Exp::null` for `[]`.
    pub size_exps: Vec<Exp>,
    pub init: Option<Exp>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParamId {
    pub type_exp: Exp,
    pub size_exps: Vec<Exp>,
    /// Pass-by-reference return slot.
    pub out: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructId {
    pub fields: Vec<IdRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FuncId {
    pub params: Vec<IdRef>,
    pub rets: Vec<Exp>,
    pub body: Option<Block>,
    /// Local variables of the body in slot order, filled by the checker.
    pub vars: Vec<IdRef>,
    /// Number of local slots (contract address, parameters, variables).
    pub local_cnt: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ContractId {
    pub body: Option<Block>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct InterfaceId {
    pub funcs: Vec<IdRef>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum IdKind {
    Var(VarId),
    Struct(StructId),
    Func(FuncId),
    Contract(ContractId),
    Interface(InterfaceId),
    Param(ParamId),
    /// Compiler-generated local, e.g. the captured result of a call.
    Tmp,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Id {
    pub name: String,
    pub span: Span,
    pub meta: Meta,
    pub modifier: Modifier,
    pub kind: IdKind,
    /// Enclosing function, contract or struct.
    pub up: Option<IdRef>,
    /// Local slot.
    pub idx: u32,
    /// Linear-memory address of a global variable.
    pub addr: u32,
    /// Byte offset of a struct field inside its struct.
    pub offset: u32,
}

impl Id {
    pub fn new(name: impl Into<String>, kind: IdKind, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
            meta: Meta::default().with_span(span),
            modifier: Modifier::default(),
            kind,
            up: None,
            idx: 0,
            addr: 0,
            offset: 0,
        }
    }

    pub fn var(name: impl Into<String>, type_exp: Exp, span: Span) -> Self {
        Id::new(
            name,
            IdKind::Var(VarId {
                type_exp,
                size_exps: Vec::new(),
                init: None,
            }),
            span,
        )
    }

    pub fn param(name: impl Into<String>, type_exp: Exp, span: Span) -> Self {
        Id::new(
            name,
            IdKind::Param(ParamId {
                type_exp,
                size_exps: Vec::new(),
                out: false,
            }),
            span,
        )
    }

    pub fn structure(name: impl Into<String>, fields: Vec<IdRef>, span: Span) -> Self {
        Id::new(name, IdKind::Struct(StructId { fields }), span)
    }

    pub fn func(
        name: impl Into<String>,
        params: Vec<IdRef>,
        rets: Vec<Exp>,
        body: Option<Block>,
        span: Span,
    ) -> Self {
        Id::new(
            name,
            IdKind::Func(FuncId {
                params,
                rets,
                body,
                vars: Vec::new(),
                local_cnt: 0,
            }),
            span,
        )
    }

    pub fn contract(name: impl Into<String>, body: Option<Block>, span: Span) -> Self {
        Id::new(name, IdKind::Contract(ContractId { body }), span)
    }

    pub fn interface(name: impl Into<String>, funcs: Vec<IdRef>, span: Span) -> Self {
        Id::new(name, IdKind::Interface(InterfaceId { funcs }), span)
    }

    pub fn tmp(name: impl Into<String>, meta: Meta, span: Span) -> Self {
        let mut id = Id::new(name, IdKind::Tmp, span);
        id.meta = meta;
        id
    }

    /// Adds an array dimension to a variable or parameter.
    pub fn with_size(mut self, size: Exp) -> Self {
        match &mut self.kind {
            IdKind::Var(var) => var.size_exps.push(size),
            IdKind::Param(param) => param.size_exps.push(size),
            _ => {}
        }
        self
    }

    pub fn with_init(mut self, init: Exp) -> Self {
        if let IdKind::Var(var) = &mut self.kind {
            var.init = Some(init);
        }
        self
    }

    pub fn with_out(mut self) -> Self {
        if let IdKind::Param(param) = &mut self.kind {
            param.out = true;
        }
        self
    }

    pub fn with_modifier(mut self, modifier: Modifier) -> Self {
        self.modifier = modifier;
        self
    }

    pub fn is_var(&self) -> bool {
        matches!(self.kind, IdKind::Var(_))
    }

    pub fn is_func(&self) -> bool {
        matches!(self.kind, IdKind::Func(_))
    }

    pub fn is_contract(&self) -> bool {
        matches!(self.kind, IdKind::Contract(_))
    }

    pub fn is_ctor(&self) -> bool {
        self.is_func() && self.modifier.ctor
    }

    pub fn is_out_param(&self) -> bool {
        matches!(&self.kind, IdKind::Param(p) if p.out)
    }

    pub fn as_func(&self) -> Option<&FuncId> {
        match &self.kind {
            IdKind::Func(func) => Some(func),
            _ => None,
        }
    }

    pub fn as_func_mut(&mut self) -> Option<&mut FuncId> {
        match &mut self.kind {
            IdKind::Func(func) => Some(func),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            IdKind::Var(_) => "variable",
            IdKind::Struct(_) => "struct",
            IdKind::Func(_) => "function",
            IdKind::Contract(_) => "contract",
            IdKind::Interface(_) => "interface",
            IdKind::Param(_) => "parameter",
            IdKind::Tmp => "temporary",
        }
    }
}

/// Owns every declaration of a compilation unit.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdTable {
    ids: Vec<Id>,
}

impl IdTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, id: Id) -> IdRef {
        let r = IdRef(self.ids.len() as u32);
        self.ids.push(id);
        r
    }

    pub fn get(&self, r: IdRef) -> Option<&Id> {
        self.ids.get(r.0 as usize)
    }

    pub fn get_mut(&mut self, r: IdRef) -> Option<&mut Id> {
        self.ids.get_mut(r.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (IdRef, &Id)> {
        self.ids
            .iter()
            .enumerate()
            .map(|(i, id)| (IdRef(i as u32), id))
    }
}

impl Index<IdRef> for IdTable {
    type Output = Id;

    fn index(&self, r: IdRef) -> &Id {
        &self.ids[r.0 as usize]
    }
}

impl IndexMut<IdRef> for IdTable {
    fn index_mut(&mut self, r: IdRef) -> &mut Id {
        &mut self.ids[r.0 as usize]
    }
}
