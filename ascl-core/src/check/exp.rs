#![forbid(unsafe_code)]

use ascl_ast::{
    BinOp, Exp, ExpKind, IdKind, IdRef, Meta, Nominal, NominalKind, Span, TypeKind, TypeSpec,
    UnaryOp, Value,
};

use super::{CheckResult, Checker, Ctx};
use crate::error::{ErrorKind, SemanticError};
use crate::meta::{compare, eval};
use crate::syslib;

fn invalid_operand(meta: &Meta, span: Span) -> SemanticError {
    SemanticError::new(
        ErrorKind::InvalidOperand {
            ty: meta.to_string(),
        },
        span,
    )
}

fn lit_meta(value: &Value) -> Option<Meta> {
    let meta = match value {
        Value::Bool(_) => Meta::new(TypeKind::Bool),
        Value::Int(_) => Meta::untyped(TypeKind::Int64),
        Value::Double(_) => Meta::untyped(TypeKind::Double),
        Value::Str(_) => Meta::new(TypeKind::String),
        Value::Null => Meta::untyped(TypeKind::Object),
        Value::Blob(_) => Meta::new(TypeKind::Object),
        // Produced by lowering; the node already carries its type.
        Value::Aggr(_) | Value::Addr(_) => return None,
    };
    Some(meta)
}

/// Pushes `meta` down into an expression after inference: aggregate
/// elements receive their element type, untyped operands adopt `meta`.
/// Expressions with a type of their own are left alone.
pub(crate) fn settle(exp: &mut Exp, meta: &Meta) {
    let span = exp.span;
    let untyped = exp.meta.untyped;

    match &mut exp.kind {
        ExpKind::Tuple(elems) | ExpKind::Init { elems, .. } => {
            exp.meta = meta.clone().with_span(span);
            for (i, elem) in elems.iter_mut().enumerate() {
                if let Some(child) = child_meta(meta, i) {
                    settle(elem, &child);
                }
            }
        }
        ExpKind::Binary { op, left, right } if untyped && !op.is_cmp() && !op.is_logical() => {
            exp.meta = meta.clone().with_span(span);
            settle(left, meta);
            settle(right, meta);
        }
        ExpKind::Unary { operand, .. } if untyped => {
            exp.meta = meta.clone().with_span(span);
            settle(operand, meta);
        }
        ExpKind::Ternary {
            then, otherwise, ..
        } if untyped => {
            exp.meta = meta.clone().with_span(span);
            settle(then, meta);
            settle(otherwise, meta);
        }
        _ if untyped => {
            exp.meta = meta.clone().with_span(span);
        }
        _ => {}
    }
}

fn child_meta(meta: &Meta, i: usize) -> Option<Meta> {
    if meta.is_array() {
        return Some(meta.strip());
    }
    match meta.ty {
        TypeKind::Map => Some(Meta::tuple(meta.elems.clone())),
        TypeKind::Struct | TypeKind::Tuple => meta.elems.get(i).cloned(),
        _ => None,
    }
}

/// Infers `exp` against `target`, then settles the inferred type into it.
pub(crate) fn coerce(target: &mut Meta, exp: &mut Exp) {
    let mut meta = exp.meta.clone();
    eval(target, &mut meta);
    settle(exp, &meta);
}

/// Fixes a still-untyped expression to the default of its literal kind.
fn pin(exp: &mut Exp) {
    if exp.meta.untyped {
        let meta = Meta::new(exp.meta.ty);
        settle(exp, &meta);
    }
}

impl Checker<'_> {
    pub(crate) fn check_exp(&mut self, exp: &mut Exp) -> CheckResult {
        let span = exp.span;

        let (meta, id) = match &mut exp.kind {
            ExpKind::Null
            | ExpKind::Alloc { .. }
            | ExpKind::Global(_)
            | ExpKind::Local { .. }
            | ExpKind::Stack { .. } => return Ok(()),

            ExpKind::Lit(value) => match lit_meta(value) {
                Some(meta) => (meta, None),
                None => return Ok(()),
            },

            ExpKind::Type { spec, .. } => self.check_type(spec, span)?,

            ExpKind::Id(name) => {
                let Some(r) = self.lookup(name) else {
                    return Err(SemanticError::new(
                        ErrorKind::UndefinedId { name: name.clone() },
                        span,
                    )
                    .into());
                };
                (self.ids[r].meta.clone(), Some(r))
            }

            ExpKind::Array { base, index } => self.check_array(base, index)?,

            ExpKind::Cast { value, to } => {
                self.check_exp(value)?;
                if value.meta.is_array() || value.meta.ty.is_composite() {
                    return Err(invalid_operand(&value.meta, value.span).into());
                }
                pin(value);
                (Meta::new(*to), None)
            }

            ExpKind::Unary { op, operand, .. } => {
                self.check_exp(operand)?;
                let m = &operand.meta;
                let ok = !m.is_array()
                    && match op {
                        UnaryOp::Inc | UnaryOp::Dec => m.ty.is_integer(),
                        UnaryOp::Neg => m.ty.is_numeric(),
                        UnaryOp::Not => m.ty == TypeKind::Bool,
                    };
                if !ok {
                    return Err(invalid_operand(m, operand.span).into());
                }
                (operand.meta.clone(), None)
            }

            ExpKind::Binary { op, left, right } => (self.check_binary(*op, left, right)?, None),

            ExpKind::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.check_exp(cond)?;
                if cond.meta.ty != TypeKind::Bool || cond.meta.is_array() {
                    return Err(SemanticError::mismatched_type(
                        TypeKind::Bool.name(),
                        &cond.meta,
                        cond.span,
                    )
                    .into());
                }
                self.check_exp(then)?;
                self.check_exp(otherwise)?;
                compare(&then.meta, &otherwise.meta)?;

                let mut x = then.meta.clone();
                let mut y = otherwise.meta.clone();
                eval(&mut x, &mut y);
                settle(then, &x);
                settle(otherwise, &y);
                (then.meta.clone(), None)
            }

            ExpKind::Access { qual, name } => self.check_access(qual, name, span)?,

            ExpKind::Call {
                callee, args, sys, ..
            } => match self.builtin(callee) {
                Some(f) => {
                    *sys = Some(f.kind);
                    self.check_args(&f.param_metas(), args, span)?;
                    callee.meta = f.result_meta().with_span(callee.span);
                    (f.result_meta(), None)
                }
                None => self.check_call(callee, args, span)?,
            },

            ExpKind::Sql(_) => (Meta::new(TypeKind::Int32), None),

            ExpKind::Tuple(elems) | ExpKind::Init { elems, .. } => {
                for elem in elems.iter_mut() {
                    self.check_exp(elem)?;
                }
                let metas = elems.iter().map(|e| e.meta.clone()).collect();
                (Meta::tuple(metas), None)
            }
        };

        exp.meta = meta.with_span(span);
        exp.id = id;
        Ok(())
    }

    fn check_type(&mut self, spec: &mut TypeSpec, span: Span) -> CheckResult<(Meta, Option<IdRef>)> {
        match spec {
            TypeSpec::Prim(ty) => Ok((Meta::new(*ty), None)),
            TypeSpec::Named(name) => {
                let Some(r) = self.lookup(name) else {
                    return Err(SemanticError::new(
                        ErrorKind::UndefinedId { name: name.clone() },
                        span,
                    )
                    .into());
                };
                let id = &self.ids[r];
                let kind = match id.kind {
                    IdKind::Struct(_) => return Ok((id.meta.clone(), Some(r))),
                    IdKind::Contract(_) => NominalKind::Contract,
                    IdKind::Interface(_) => NominalKind::Interface,
                    _ => {
                        return Err(SemanticError::new(
                            ErrorKind::NotAllowedType { ty: name.clone() },
                            span,
                        )
                        .into());
                    }
                };
                let nominal = Nominal {
                    id: r,
                    name: id.name.clone(),
                    kind,
                };
                Ok((Meta::object(Some(nominal)), Some(r)))
            }
            TypeSpec::Map(key, value) => {
                self.check_exp(key)?;
                self.check_exp(value)?;
                Ok((Meta::map(key.meta.clone(), value.meta.clone()), None))
            }
        }
    }

    fn check_array(&mut self, base: &mut Exp, index: &mut Exp) -> CheckResult<(Meta, Option<IdRef>)> {
        self.check_exp(base)?;
        self.check_exp(index)?;

        if base.meta.is_array() {
            if !index.meta.is_integer() {
                return Err(invalid_operand(&index.meta, index.span).into());
            }
            let idx_meta = Meta::new(TypeKind::Int32);
            settle(index, &idx_meta);
            return Ok((base.meta.strip(), base.id));
        }

        if base.meta.is_map() {
            let (Some(key), Some(value)) = (base.meta.elems.first(), base.meta.elems.get(1)) else {
                return Err(invalid_operand(&base.meta, base.span).into());
            };
            compare(key, &index.meta)?;
            let mut key = key.clone();
            let value = value.clone();
            coerce(&mut key, index);
            return Ok((value, base.id));
        }

        Err(invalid_operand(&base.meta, base.span).into())
    }

    fn check_binary(&mut self, op: BinOp, left: &mut Exp, right: &mut Exp) -> CheckResult<Meta> {
        self.check_exp(left)?;
        self.check_exp(right)?;

        if op.is_logical() {
            for side in [&*left, &*right] {
                if side.meta.ty != TypeKind::Bool || side.meta.is_array() {
                    return Err(invalid_operand(&side.meta, side.span).into());
                }
            }
            return Ok(Meta::new(TypeKind::Bool));
        }

        compare(&left.meta, &right.meta)?;
        let mut x = left.meta.clone();
        let mut y = right.meta.clone();
        eval(&mut x, &mut y);
        settle(left, &x);
        settle(right, &y);

        let m = &left.meta;
        let ok = !m.is_array()
            && match op {
                BinOp::Add => m.ty.is_numeric() || m.ty == TypeKind::String,
                BinOp::Sub | BinOp::Mul | BinOp::Div => m.ty.is_numeric(),
                BinOp::Mod => m.ty.is_integer(),
                BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge => {
                    m.ty.is_numeric() || m.ty == TypeKind::String
                }
                BinOp::Eq | BinOp::Ne => !m.ty.is_composite(),
                BinOp::And | BinOp::Or => false,
            };
        if !ok {
            return Err(invalid_operand(m, left.span).into());
        }

        if op.is_cmp() {
            pin(left);
            pin(right);
            Ok(Meta::new(TypeKind::Bool))
        } else {
            Ok(left.meta.clone())
        }
    }

    fn check_access(
        &mut self,
        qual: &mut Exp,
        name: &str,
        span: Span,
    ) -> CheckResult<(Meta, Option<IdRef>)> {
        self.check_exp(qual)?;

        let undefined = || {
            SemanticError::new(
                ErrorKind::UndefinedField {
                    name: name.to_string(),
                    ty: qual.meta.to_string(),
                },
                span,
            )
        };

        let target = match (&qual.meta.nominal, qual.meta.is_array()) {
            (Some(n), false) if qual.meta.is_struct() || qual.meta.is_object() => n.id,
            _ => return Err(undefined().into()),
        };

        let ctx = Ctx {
            qual: Some(target),
            ..self.ctx.clone()
        };
        let (found, _) = self.scoped(ctx, |c| c.lookup_member(name));
        let Some(m) = found else {
            return Err(undefined().into());
        };
        Ok((self.ids[m].meta.clone(), Some(m)))
    }

    /// A call target that names no declaration in scope but a system function.
    fn builtin(&self, callee: &Exp) -> Option<&'static syslib::SysFn> {
        match &callee.kind {
            ExpKind::Id(name) if self.lookup(name).is_none() => syslib::lookup(name),
            _ => None,
        }
    }

    fn check_call(
        &mut self,
        callee: &mut Exp,
        args: &mut [Exp],
        span: Span,
    ) -> CheckResult<(Meta, Option<IdRef>)> {
        self.check_exp(callee)?;

        let not_callable = |callee: &Exp| {
            let name = match &callee.kind {
                ExpKind::Id(name) | ExpKind::Access { name, .. } => name.clone(),
                _ => callee.meta.to_string(),
            };
            SemanticError::new(ErrorKind::NotCallable { name }, callee.span)
        };
        let Some(mut r) = callee.id else {
            return Err(not_callable(callee).into());
        };

        // `Token(...)` runs the constructor of `Token`, if it has one.
        if self.ids[r].is_contract() {
            let ctor = self
                .members
                .get(&r)
                .and_then(|ms| ms.iter().copied().find(|m| self.ids[*m].is_ctor()));
            let meta = self.ids[r].meta.clone();
            let Some(ctor) = ctor else {
                self.check_args(&[], args, span)?;
                return Ok((meta, Some(r)));
            };
            r = ctor;
            callee.id = Some(ctor);
        }

        if !self.ids[r].is_func() {
            return Err(not_callable(callee).into());
        }
        self.check_signature(r)?;

        let params: Vec<Meta> = match self.ids[r].as_func() {
            Some(func) => func.params.iter().map(|p| self.ids[*p].meta.clone()).collect(),
            None => Vec::new(),
        };
        self.check_args(&params, args, span)?;

        let meta = &self.ids[r].meta;
        let ret = match meta.elems.as_slice() {
            [single] if meta.is_tuple() => single.clone(),
            _ => meta.clone(),
        };
        Ok((ret, Some(r)))
    }

    fn check_args(&mut self, params: &[Meta], args: &mut [Exp], span: Span) -> CheckResult {
        if params.len() != args.len() {
            return Err(SemanticError::mismatched_count(
                "argument",
                params.len(),
                args.len(),
                span,
            )
            .into());
        }
        for (param, arg) in params.iter().zip(args.iter_mut()) {
            self.check_exp(arg)?;
            compare(param, &arg.meta)?;

            let mut x = param.clone();
            coerce(&mut x, arg);
        }
        Ok(())
    }
}
