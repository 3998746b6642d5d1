#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use ascl_ast::{align_to, IdRef, Meta, Span, TypeKind};

use crate::Segment;

/// Slot holding the address of the contract the function runs in.
pub const CONT_IDX: u32 = 0;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Local {
    pub name: String,
    pub ty: TypeKind,
}

/// Frame of one lowered function: its local slots and the stack memory it
/// reserves for values that do not fit a slot.
#[derive(Clone, Debug, PartialEq)]
pub struct IrFn {
    pub name: String,
    pub id: IdRef,
    pub span: Span,
    pub locals: Vec<Local>,
    pub param_cnt: u32,
    /// Slot holding the base address of this frame's stack memory.
    pub stack_idx: u32,
    /// Bytes of stack memory reserved so far.
    pub usage: u32,
}

impl IrFn {
    pub fn new(name: impl Into<String>, id: IdRef, span: Span) -> Self {
        Self {
            name: name.into(),
            id,
            span,
            locals: vec![Local {
                name: "cont$addr".to_string(),
                ty: TypeKind::Uint32,
            }],
            param_cnt: 0,
            stack_idx: 0,
            usage: 0,
        }
    }

    pub fn add_param(&mut self, name: impl Into<String>, ty: TypeKind) -> u32 {
        self.param_cnt += 1;
        self.add_local(name, ty)
    }

    pub fn add_local(&mut self, name: impl Into<String>, ty: TypeKind) -> u32 {
        let idx = self.locals.len() as u32;
        self.locals.push(Local {
            name: name.into(),
            ty,
        });
        idx
    }

    /// Allocates the stack-base slot once parameters and variables are in.
    pub fn add_stack_base(&mut self) -> u32 {
        self.stack_idx = self.add_local("stack$base", TypeKind::Uint32);
        self.stack_idx
    }

    /// Reserves stack memory for a value of `meta` and returns its offset.
    pub fn add_stack(&mut self, meta: &Meta) -> u32 {
        let offset = align_to(self.usage, meta.align());
        self.usage = offset.saturating_add(meta.size());
        offset
    }

    pub fn local_cnt(&self) -> u32 {
        self.locals.len() as u32
    }

    /// Stack usage rounded up to `align`, as passed down to callees.
    pub fn frame_size(&self, align: u32) -> u32 {
        align_to(self.usage, align)
    }
}

/// Output of lowering handed to the code generator.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Ir {
    pub segment: Segment,
    pub fns: BTreeMap<IdRef, IrFn>,
}

impl Ir {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fn_of(&self, id: IdRef) -> Option<&IrFn> {
        self.fns.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ascl_ast::span;

    #[test]
    fn slot_zero_is_the_contract_address() {
        let mut f = IrFn::new("f", IdRef(3), span(0, 1));
        assert_eq!(f.add_param("a", TypeKind::Int32), 1);
        assert_eq!(f.add_local("b", TypeKind::Int64), 2);
        assert_eq!(f.add_stack_base(), 3);

        assert_eq!(f.locals[CONT_IDX as usize].name, "cont$addr");
        assert_eq!(f.param_cnt, 1);
        assert_eq!(f.local_cnt(), 4);
    }

    #[test]
    fn stack_reservations_are_aligned() {
        let mut f = IrFn::new("f", IdRef(0), span(0, 1));
        assert_eq!(f.add_stack(&Meta::new(TypeKind::Bool)), 0);
        assert_eq!(f.add_stack(&Meta::new(TypeKind::Int64)), 8);
        assert_eq!(f.usage, 16);

        let arr = Meta::new(TypeKind::Int16).with_dims(vec![Some(3)]);
        assert_eq!(f.add_stack(&arr), 16);
        assert_eq!(f.usage, 22);
        assert_eq!(f.frame_size(8), 24);
    }
}
