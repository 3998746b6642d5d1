#![forbid(unsafe_code)]

use ascl_ast::{
    align_to, BinOp, Deferred, Exp, ExpKind, Id, IdKind, IdRef, Meta, Span, Stmt, SysFnKind,
    TypeKind, UnaryOp, Value,
};
use ascl_ir::CONT_IDX;

use super::Trans;
use crate::error::InternalError;

/// An expression with its kind taken out for lowering.
struct Node {
    meta: Meta,
    span: Span,
    id: Option<IdRef>,
    deferred: Option<Deferred>,
}

impl Node {
    fn with(self, kind: ExpKind) -> Exp {
        Exp {
            kind,
            meta: self.meta,
            span: self.span,
            id: self.id,
            deferred: self.deferred,
        }
    }
}

/// Bytes of a literal as stored in an aggregate slot of `size` bytes.
fn value_bytes(value: &Value, size: u32, exp: &Exp) -> Result<Vec<u8>, InternalError> {
    let mut raw = match value {
        Value::Bool(b) => vec![u8::from(*b)],
        Value::Int(v) => v.to_le_bytes().to_vec(),
        Value::Double(v) if size == 4 => (*v as f32).to_le_bytes().to_vec(),
        Value::Double(v) => v.to_le_bytes().to_vec(),
        Value::Addr(a) => a.to_le_bytes().to_vec(),
        Value::Null => Vec::new(),
        Value::Aggr(bytes) => bytes.clone(),
        Value::Str(_) | Value::Blob(_) => {
            return Err(InternalError::new(
                "raw literal left in an aggregate initializer",
                exp.span,
            ));
        }
    };
    raw.resize(size as usize, 0);
    Ok(raw)
}

impl Trans<'_> {
    pub fn lower_exp(&mut self, exp: Exp) -> Result<Exp, InternalError> {
        let Exp {
            kind,
            meta,
            span,
            id,
            deferred,
        } = exp;
        let node = Node {
            meta,
            span,
            id,
            deferred,
        };

        match kind {
            kind @ (ExpKind::Null
            | ExpKind::Global(_)
            | ExpKind::Local { .. }
            | ExpKind::Stack { .. }) => Ok(node.with(kind)),
            ExpKind::Lit(value) => Ok(self.lower_lit(node, value)),
            ExpKind::Id(name) => self.lower_id(node, name),
            ExpKind::Array { base, index } => self.lower_array(node, *base, *index),
            ExpKind::Cast { value, to } => self.lower_cast(node, *value, to),
            ExpKind::Unary {
                op,
                prefix,
                operand,
            } => self.lower_unary(node, op, prefix, *operand),
            ExpKind::Binary { op, left, right } => self.lower_binary(node, op, *left, *right),
            ExpKind::Ternary {
                cond,
                then,
                otherwise,
            } => self.lower_ternary(node, *cond, *then, *otherwise),
            ExpKind::Access { qual, name } => self.lower_access(node, *qual, name),
            ExpKind::Call {
                callee,
                args,
                sys,
                self_arg,
            } => self.lower_call(node, *callee, args, sys, self_arg),
            kind @ ExpKind::Sql(_) => {
                log::trace!("query deferred to the runtime");
                Ok(Exp {
                    deferred: Some(Deferred::Query),
                    ..node.with(kind)
                })
            }
            ExpKind::Tuple(elems) => {
                let elems = self.lower_all(elems)?;
                Ok(node.with(ExpKind::Tuple(elems)))
            }
            ExpKind::Init { elems, slot } => self.lower_init(node, elems, slot, true),
            ExpKind::Alloc { slot: Some(slot) } => {
                Ok(node.with(ExpKind::Alloc { slot: Some(slot) }))
            }
            ExpKind::Alloc { slot: None } => {
                let slot = self.frame()?.add_stack(&node.meta);
                log::trace!("{} bytes of stack reserved at {slot}", node.meta.size());
                Ok(node.with(ExpKind::Alloc { slot: Some(slot) }))
            }
            ExpKind::Type { .. } => Err(InternalError::new(
                "type expression reached lowering",
                node.span,
            )),
        }
    }

    fn lower_all(&mut self, exps: Vec<Exp>) -> Result<Vec<Exp>, InternalError> {
        exps.into_iter().map(|e| self.lower_exp(e)).collect()
    }

    fn lower_lit(&mut self, node: Node, value: Value) -> Exp {
        let raw = match value {
            Value::Str(s) => {
                let mut raw = s.into_bytes();
                raw.push(0);
                raw
            }
            Value::Blob(bytes) => bytes,
            value => return node.with(ExpKind::Lit(value)),
        };
        let addr = self.ir.segment.add_raw(&raw);
        log::trace!("{} byte literal placed at {}", raw.len(), addr);
        node.with(ExpKind::Lit(Value::Addr(addr)))
    }

    fn lower_id(&mut self, node: Node, name: String) -> Result<Exp, InternalError> {
        let Some(r) = node.id else {
            return Err(InternalError::new(
                format!("unresolved identifier '{name}'"),
                node.span,
            ));
        };
        let id = &self.ids[r];

        let kind = match &id.kind {
            IdKind::Var(_) if self.is_global(id) => ExpKind::Stack {
                base: CONT_IDX,
                addr: id.addr,
                offset: 0,
                ty: node.meta.ty,
            },
            IdKind::Param(_) if id.is_out_param() => ExpKind::Stack {
                base: id.idx,
                addr: 0,
                offset: 0,
                ty: node.meta.ty,
            },
            IdKind::Var(_) | IdKind::Param(_) | IdKind::Tmp => ExpKind::Local {
                idx: id.idx,
                ty: node.meta.slot_type(),
            },
            // `this`: the contract address the function runs on.
            IdKind::Func(_) | IdKind::Contract(_) => ExpKind::Local {
                idx: CONT_IDX,
                ty: TypeKind::Uint32,
            },
            IdKind::Struct(_) | IdKind::Interface(_) => {
                return Err(InternalError::new(
                    format!("{} '{}' used as a value", id.kind_name(), id.name),
                    node.span,
                ));
            }
        };
        Ok(node.with(kind))
    }

    fn is_global(&self, id: &Id) -> bool {
        match id.up {
            Some(up) => self.ids[up].is_contract(),
            None => true,
        }
    }

    fn lower_array(&mut self, node: Node, base: Exp, index: Exp) -> Result<Exp, InternalError> {
        let base = self.lower_exp(base)?;
        let index = self.lower_exp(index)?;

        if base.meta.is_map() {
            log::trace!("map element access deferred to the runtime");
            return Ok(Exp {
                deferred: Some(Deferred::MapGet),
                ..node.with(ExpKind::Array {
                    base: Box::new(base),
                    index: Box::new(index),
                })
            });
        }

        let at = match (&base.kind, index.as_int()) {
            (ExpKind::Stack { base, addr, offset, .. }, Some(i)) => Some((*base, *addr, *offset, i)),
            (ExpKind::Local { idx, .. }, Some(i)) => Some((*idx, 0, 0, i)),
            _ => None,
        };
        // Row-major: one step of index `i` skips `i` whole sub-arrays.
        let folded = at
            .filter(|_| self.flags.fold && base.meta.is_fixed())
            .and_then(|(b, addr, offset, i)| {
                let step = u32::try_from(i).ok()?.checked_mul(node.meta.checked_size()?)?;
                Some((b, addr, offset.checked_add(step)?))
            });

        let Some((b, addr, offset)) = folded else {
            return Ok(node.with(ExpKind::Array {
                base: Box::new(base),
                index: Box::new(index),
            }));
        };

        log::trace!("array index folded to offset {offset}");
        let ty = if node.meta.is_array() {
            TypeKind::Uint32
        } else {
            node.meta.ty
        };
        Ok(node.with(ExpKind::Stack {
            base: b,
            addr,
            offset,
            ty,
        }))
    }

    fn lower_cast(&mut self, node: Node, value: Exp, to: TypeKind) -> Result<Exp, InternalError> {
        let value = self.lower_exp(value)?;

        let deferred = if value.meta.ty == TypeKind::String || to == TypeKind::String {
            log::trace!("string conversion deferred to the runtime");
            Some(Deferred::Convert)
        } else {
            node.deferred
        };
        Ok(Exp {
            deferred,
            ..node.with(ExpKind::Cast {
                value: Box::new(value),
                to,
            })
        })
    }

    fn lower_unary(
        &mut self,
        node: Node,
        op: UnaryOp,
        prefix: bool,
        operand: Exp,
    ) -> Result<Exp, InternalError> {
        let value = self.lower_exp(operand)?;
        let bin_op = match op {
            UnaryOp::Inc => BinOp::Add,
            UnaryOp::Dec => BinOp::Sub,
            UnaryOp::Neg | UnaryOp::Not => {
                return Ok(node.with(ExpKind::Unary {
                    op,
                    prefix,
                    operand: Box::new(value),
                }));
            }
        };

        // `x++` is `x` now and `x = x + 1` right after the statement;
        // `++x` runs the store first.
        let span = node.span;
        let one = Exp::lit_int(1, span).with_meta(Meta::new(value.meta.ty));
        let rhs = Exp::binary(bin_op, value.clone(), one, span).with_meta(value.meta.clone());
        let store = Stmt::assign(value.clone(), rhs, span);
        if prefix {
            log::trace!("prefix update inserted before the statement");
            self.before.push(store);
        } else {
            log::trace!("postfix update piggybacked after the statement");
            self.after.push(store);
        }
        Ok(value)
    }

    fn lower_binary(
        &mut self,
        node: Node,
        op: BinOp,
        left: Exp,
        right: Exp,
    ) -> Result<Exp, InternalError> {
        let left = self.lower_exp(left)?;
        let right = self.lower_exp(right)?;

        let deferred = if op == BinOp::Add && node.meta.is_string() {
            log::trace!("string concatenation deferred to the runtime");
            Some(Deferred::Concat)
        } else {
            node.deferred
        };
        Ok(Exp {
            deferred,
            ..node.with(ExpKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            })
        })
    }

    fn lower_ternary(
        &mut self,
        node: Node,
        cond: Exp,
        then: Exp,
        otherwise: Exp,
    ) -> Result<Exp, InternalError> {
        let cond = self.lower_exp(cond)?;
        let then = self.lower_exp(then)?;
        let otherwise = self.lower_exp(otherwise)?;

        if let (true, Some(c)) = (self.flags.fold, cond.as_bool()) {
            log::trace!("ternary folded to its {} branch", if c { "then" } else { "else" });
            let picked = if c { then } else { otherwise };
            return Ok(Exp {
                meta: node.meta,
                ..picked
            });
        }

        Ok(node.with(ExpKind::Ternary {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }))
    }

    fn lower_access(&mut self, node: Node, qual: Exp, name: String) -> Result<Exp, InternalError> {
        let Some(r) = node.id else {
            return Err(InternalError::new(
                format!("unresolved member '{name}'"),
                node.span,
            ));
        };
        let qual = self.lower_exp(qual)?;
        let member = &self.ids[r];

        if member.is_func() {
            // The function runs on the object the qualifier points to.
            if let ExpKind::Stack { base, .. } = qual.kind {
                return Ok(node.with(ExpKind::Local {
                    idx: base,
                    ty: TypeKind::Uint32,
                }));
            }
            return Ok(node.with(ExpKind::Access {
                qual: Box::new(qual),
                name,
            }));
        }

        let field = member.offset;
        let ty = node.meta.ty;
        let kind = match qual.kind {
            ExpKind::Local { idx, .. } => ExpKind::Stack {
                base: idx,
                addr: 0,
                offset: field,
                ty,
            },
            ExpKind::Stack {
                base, addr, offset, ..
            } => ExpKind::Stack {
                base,
                addr,
                offset: offset.saturating_add(field),
                ty,
            },
            _ => {
                return Err(InternalError::new(
                    format!("field '{name}' accessed through an unaddressed qualifier"),
                    node.span,
                ));
            }
        };
        Ok(node.with(kind))
    }

    fn lower_call(
        &mut self,
        node: Node,
        mut callee: Exp,
        mut args: Vec<Exp>,
        sys: Option<SysFnKind>,
        self_arg: bool,
    ) -> Result<Exp, InternalError> {
        if self_arg {
            return Ok(node.with(ExpKind::Call {
                callee: Box::new(callee),
                args,
                sys,
                self_arg,
            }));
        }
        let span = node.span;

        // `x.f()` passes `x`, lowered once and shared with the callee.
        let mut qual_arg = None;
        if let ExpKind::Access { qual, .. } = &mut callee.kind {
            let at = qual.span;
            let q = std::mem::replace(&mut **qual, Exp::null(at));
            let q = self.lower_exp(q)?;
            **qual = q.clone();
            qual_arg = Some(q);
        }
        // A system function has no declaration to address.
        let callee = match sys {
            Some(_) => callee,
            None => self.lower_exp(callee)?,
        };

        let is_ctor = match node.id {
            Some(r) => self.ids[r].is_ctor() || self.ids[r].is_contract(),
            None => false,
        };
        if sys.is_none() && !is_ctor {
            let implicit = match qual_arg {
                Some(q) => q,
                None => Exp::local(CONT_IDX, Meta::new(TypeKind::Uint32), span),
            };
            args.insert(0, implicit);
        }
        let args = self.lower_all(args)?;

        let stack_align = self.flags.stack_align;
        let frame = self.frame()?;
        if frame.usage > 0 {
            let size = frame.frame_size(stack_align);
            let base = Exp::local(frame.stack_idx, Meta::new(TypeKind::Uint32), span);
            let size = Exp::lit_int(i64::from(size), span).with_meta(Meta::new(TypeKind::Int32));
            let rhs =
                Exp::binary(BinOp::Sub, base, size, span).with_meta(Meta::new(TypeKind::Uint32));
            let target = Exp::global("stack$offset", Meta::new(TypeKind::Uint32), span);
            log::trace!("stack offset moved before call");
            self.before.push(Stmt::assign(target, rhs, span));
        }

        let call = node.with(ExpKind::Call {
            callee: Box::new(callee),
            args,
            sys,
            self_arg: true,
        });

        if is_ctor || call.meta.is_void() {
            return Ok(call);
        }

        // Later uses of the result read a stable local, not the call.
        let func = self.frame()?.id;
        let mut tmp = Id::tmp("temp$val", call.meta.clone(), span);
        tmp.up = Some(func);
        tmp.idx = self.frame()?.add_local("temp$val", call.meta.slot_type());
        let idx = tmp.idx;
        let tmp = self.ids.add(tmp);

        let mut var = Exp::local(idx, call.meta.clone(), span);
        var.id = Some(tmp);
        log::trace!("call result captured in local {idx}");
        self.before.push(Stmt::assign(var.clone(), call, span));
        Ok(var)
    }

    /// Folds an all-literal aggregate. The outermost one lands in the data
    /// segment; nested ones stay as bytes for their parent to copy.
    fn lower_init(
        &mut self,
        node: Node,
        elems: Vec<Exp>,
        slot: Option<u32>,
        outer: bool,
    ) -> Result<Exp, InternalError> {
        let elems = elems
            .into_iter()
            .map(|elem| match elem.kind {
                ExpKind::Init { elems, slot } => {
                    let inner = Node {
                        meta: elem.meta,
                        span: elem.span,
                        id: elem.id,
                        deferred: elem.deferred,
                    };
                    self.lower_init(inner, elems, slot, false)
                }
                _ => self.lower_exp(elem),
            })
            .collect::<Result<Vec<_>, _>>()?;

        if self.flags.fold && !elems.is_empty() && elems.iter().all(Exp::is_lit) {
            let raw = self.fold_aggr(&node, &elems)?;
            if !outer {
                return Ok(node.with(ExpKind::Lit(Value::Aggr(raw))));
            }
            let addr = self.ir.segment.add_raw(&raw);
            log::trace!("{} byte aggregate placed at {addr}", raw.len());
            return Ok(node.with(ExpKind::Lit(Value::Addr(addr))));
        }

        let slot = match slot {
            Some(slot) => slot,
            None => self.frame()?.add_stack(&node.meta),
        };
        Ok(node.with(ExpKind::Init {
            elems,
            slot: Some(slot),
        }))
    }

    fn fold_aggr(&self, node: &Node, elems: &[Exp]) -> Result<Vec<u8>, InternalError> {
        let Some(size) = node.meta.checked_size() else {
            return Err(InternalError::new("aggregate larger than memory", node.span));
        };
        let mut raw = vec![0u8; size as usize];
        let mut offset = 0u32;

        for elem in elems {
            let ExpKind::Lit(value) = &elem.kind else {
                continue;
            };
            offset = align_to(offset, elem.meta.align());
            let len = elem.meta.size();
            let end = match offset.checked_add(len) {
                Some(end) if end <= size => end,
                _ => {
                    return Err(InternalError::new(
                        format!("aggregate overruns its {size} byte slot"),
                        elem.span,
                    ));
                }
            };
            let bytes = value_bytes(value, len, elem)?;
            raw[offset as usize..end as usize].copy_from_slice(&bytes);
            offset = end;
        }

        log::trace!("aggregate initializer folded to {size} bytes");
        Ok(raw)
    }
}
