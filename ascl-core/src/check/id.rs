#![forbid(unsafe_code)]

use ascl_ast::{
    checked_align_to, ExpKind, IdKind, IdRef, Meta, Nominal, NominalKind, ParamId, Span, VarId,
};

use super::{coerce, CheckResult, Checker, Ctx};
use crate::error::{ErrorKind, InternalError, SemanticError};
use crate::meta::compare;

/// A declaration must be addressable with 32-bit offsets.
fn check_fits(meta: &Meta, span: Span) -> Result<(), SemanticError> {
    match meta.checked_size() {
        Some(_) => Ok(()),
        None => Err(SemanticError::new(ErrorKind::InvalidSizeValue, span)),
    }
}

impl Checker<'_> {
    pub(super) fn check_var(&mut self, r: IdRef) -> CheckResult {
        let span = self.ids[r].span;
        let kind = std::mem::replace(&mut self.ids[r].kind, IdKind::Tmp);
        let IdKind::Var(mut var) = kind else {
            self.ids[r].kind = kind;
            return Err(InternalError::new("variable declaration expected", span).into());
        };

        let res = self.check_var_parts(r, &mut var);
        self.ids[r].kind = IdKind::Var(var);
        res
    }

    fn check_var_parts(&mut self, r: IdRef, var: &mut VarId) -> CheckResult {
        self.check_exp(&mut var.type_exp)?;
        if let ExpKind::Type { public: true, .. } = var.type_exp.kind {
            self.ids[r].modifier.public = true;
        }

        let mut meta = var.type_exp.meta.clone().with_span(self.ids[r].span);
        for size in var.size_exps.iter_mut() {
            if size.is_null() {
                if var.init.is_none() {
                    return Err(SemanticError::new(ErrorKind::MissingArraySize, size.span).into());
                }
                meta.dims.push(None);
                continue;
            }

            self.check_exp(size)?;
            if !size.meta.is_integer() {
                return Err(SemanticError::new(
                    ErrorKind::InvalidSizeType {
                        found: size.meta.to_string(),
                    },
                    size.span,
                )
                .into());
            }
            // Only a literal fixes a length; dynamic sizes come from an initializer.
            let len = match size.as_int() {
                Some(n) if size.meta.untyped && n > 0 && n <= u32::MAX as i64 => n as u32,
                _ => {
                    return Err(
                        SemanticError::new(ErrorKind::InvalidSizeValue, size.span).into(),
                    );
                }
            };
            meta.dims.push(Some(len));
        }
        let size_span = var.size_exps.last().map_or(self.ids[r].span, |e| e.span);
        check_fits(&meta, size_span)?;
        self.ids[r].meta = meta.clone();

        let Some(init) = var.init.as_mut() else {
            return Ok(());
        };
        self.check_exp(init)?;

        if !meta.is_array() {
            if init.meta.is_tuple() && !meta.is_map() && !meta.is_struct() {
                return Err(SemanticError::new(
                    ErrorKind::NotAllowedInit {
                        ty: meta.to_string(),
                    },
                    init.span,
                )
                .into());
            }
        } else {
            if !init.meta.is_tuple() {
                return Err(SemanticError::new(ErrorKind::MissingArrayInit, init.span).into());
            }
            if meta.is_object() {
                return Err(SemanticError::new(
                    ErrorKind::NotAllowedInit {
                        ty: meta.to_string(),
                    },
                    init.span,
                )
                .into());
            }
            if let Some(Some(expected)) = meta.dims.first() {
                let found = init.meta.elems.len();
                if *expected as usize != found {
                    return Err(SemanticError::new(
                        ErrorKind::MismatchedElemCount {
                            expected: *expected as usize,
                            found,
                        },
                        init.span,
                    )
                    .into());
                }
            }
        }

        compare(&meta, &init.meta)?;
        coerce(&mut meta, init);
        // Open dimensions are only known now.
        check_fits(&meta, init.span)?;

        self.ids[r].meta = meta;
        Ok(())
    }

    /// Gives a variable its slot or address once its type is known.
    pub(super) fn assign_storage(&mut self, r: IdRef) -> CheckResult {
        let up = self.ctx.func.or(self.ctx.cont);
        match self.ctx.func {
            Some(func) => {
                let idx = self.ctx.var_idx;
                self.ctx.var_idx += 1;
                if let Some(f) = self.ids[func].as_func_mut() {
                    f.vars.push(r);
                }
                let id = &mut self.ids[r];
                id.idx = idx;
                id.up = up;
            }
            None => {
                let id = &mut self.ids[r];
                id.up = up;
                let end = checked_align_to(self.ctx.mem_addr, id.meta.align()).and_then(|addr| {
                    let end = addr.checked_add(id.meta.checked_size()?)?;
                    Some((addr, end))
                });
                let Some((addr, end)) = end else {
                    return Err(SemanticError::new(ErrorKind::InvalidSizeValue, id.span).into());
                };
                self.ctx.mem_addr = end;
                id.addr = addr;
                log::trace!("global '{}' at {}", id.name, addr);
            }
        }
        Ok(())
    }

    pub(super) fn check_struct(&mut self, r: IdRef) -> CheckResult {
        let IdKind::Struct(st) = &self.ids[r].kind else {
            return Err(InternalError::new("struct declaration expected", self.ids[r].span).into());
        };
        let fields = st.fields.clone();

        for f in &fields {
            self.ids[*f].up = Some(r);
            self.check_var(*f)?;
        }

        let nominal = Nominal {
            id: r,
            name: self.ids[r].name.clone(),
            kind: NominalKind::Struct,
        };
        let metas = fields.iter().map(|f| self.ids[*f].meta.clone()).collect();
        let span = self.ids[r].span;
        let mut meta = Meta::default().with_span(span);
        meta.set_struct(nominal, metas);

        for (f, offset) in fields.iter().zip(meta.offsets()) {
            self.ids[*f].offset = offset;
        }
        let fits = check_fits(&meta, span);
        self.ids[r].meta = meta;
        fits?;
        Ok(())
    }

    pub(super) fn check_param(&mut self, r: IdRef) -> CheckResult {
        let span = self.ids[r].span;
        let kind = std::mem::replace(&mut self.ids[r].kind, IdKind::Tmp);
        let IdKind::Param(mut param) = kind else {
            self.ids[r].kind = kind;
            return Err(InternalError::new("parameter expected", span).into());
        };

        let res = self.check_param_parts(r, &mut param);
        self.ids[r].kind = IdKind::Param(param);
        res
    }

    fn check_param_parts(&mut self, r: IdRef, param: &mut ParamId) -> CheckResult {
        self.check_exp(&mut param.type_exp)?;

        let span = self.ids[r].span;
        let mut meta = param.type_exp.meta.clone().with_span(span);
        for size in param.size_exps.iter_mut() {
            // A parameter never fixes its length.
            if !size.is_null() {
                self.check_exp(size)?;
                if !size.meta.is_integer() {
                    return Err(SemanticError::new(
                        ErrorKind::NotAllowedType {
                            ty: size.meta.to_string(),
                        },
                        span,
                    )
                    .into());
                }
            }
            meta.dims.push(None);
        }
        self.ids[r].meta = meta;
        Ok(())
    }

    /// Parameters and return type of a function or prototype. Runs once.
    pub(super) fn check_signature(&mut self, r: IdRef) -> CheckResult {
        if !self.signed.insert(r) {
            return Ok(());
        }
        let Some(func) = self.ids[r].as_func() else {
            return Err(InternalError::new("function expected", self.ids[r].span).into());
        };
        let params = func.params.clone();

        for (i, p) in params.iter().enumerate() {
            let id = &mut self.ids[*p];
            id.idx = 1 + i as u32;
            id.up = Some(r);
            self.check_param(*p)?;
        }

        let mut rets = match self.ids[r].as_func_mut() {
            Some(func) => std::mem::take(&mut func.rets),
            None => Vec::new(),
        };
        let res = rets.iter_mut().try_for_each(|ret| self.check_exp(ret));
        let metas: Vec<Meta> = rets.iter().map(|ret| ret.meta.clone()).collect();
        if let Some(func) = self.ids[r].as_func_mut() {
            func.rets = rets;
        }
        res?;

        let span = self.ids[r].span;
        let meta = if !metas.is_empty() {
            Meta::tuple(metas)
        } else if self.ids[r].is_ctor() {
            Meta::object(self.owner_nominal(r))
        } else {
            Meta::void()
        };
        let id = &mut self.ids[r];
        id.meta = meta.with_span(span);
        if id.up.is_none() {
            id.up = self.ctx.cont;
        }
        Ok(())
    }

    pub(super) fn check_func(&mut self, r: IdRef) -> CheckResult {
        self.check_signature(r)?;

        let Some(func) = self.ids[r].as_func_mut() else {
            return Err(InternalError::new("function expected", self.ids[r].span).into());
        };
        let Some(mut body) = func.body.take() else {
            return Ok(());
        };
        let params = func.params.clone();

        let ctx = Ctx {
            func: Some(r),
            qual: None,
            var_idx: 1 + params.len() as u32,
            ..self.ctx.clone()
        };
        let (res, inner) = self.scoped(ctx, |c| {
            c.push_scope();
            for p in &params {
                c.declare(*p);
            }
            let res = c.check_block(&mut body);
            c.pop_scope();
            res
        });

        if let Some(func) = self.ids[r].as_func_mut() {
            func.body = Some(body);
            func.local_cnt = inner.var_idx;
        }
        res?;
        Ok(())
    }

    /// The contract a constructor belongs to.
    fn owner_nominal(&self, r: IdRef) -> Option<Nominal> {
        let cont = self.ids[r]
            .up
            .filter(|up| self.ids[*up].is_contract())
            .or(self.ctx.cont)?;
        Some(Nominal {
            id: cont,
            name: self.ids[cont].name.clone(),
            kind: NominalKind::Contract,
        })
    }

    pub(super) fn check_contract(&mut self, r: IdRef) -> CheckResult {
        let span = self.ids[r].span;
        let nominal = Nominal {
            id: r,
            name: self.ids[r].name.clone(),
            kind: NominalKind::Contract,
        };
        self.ids[r].meta = Meta::object(Some(nominal)).with_span(span);

        let body = match &mut self.ids[r].kind {
            IdKind::Contract(cont) => cont.body.take(),
            _ => return Err(InternalError::new("contract expected", span).into()),
        };
        let Some(mut body) = body else {
            return Ok(());
        };

        let ctx = Ctx {
            cont: Some(r),
            ..Ctx::default()
        };
        let (res, _) = self.scoped(ctx, |c| c.check_block(&mut body));

        if let IdKind::Contract(cont) = &mut self.ids[r].kind {
            cont.body = Some(body);
        }
        res?;
        Ok(())
    }

    pub(super) fn check_interface(&mut self, r: IdRef) -> CheckResult {
        let span = self.ids[r].span;
        let nominal = Nominal {
            id: r,
            name: self.ids[r].name.clone(),
            kind: NominalKind::Interface,
        };
        self.ids[r].meta = Meta::object(Some(nominal)).with_span(span);

        let IdKind::Interface(itf) = &self.ids[r].kind else {
            return Err(InternalError::new("interface expected", span).into());
        };
        let funcs = itf.funcs.clone();

        let ctx = Ctx {
            cont: None,
            func: None,
            ..self.ctx.clone()
        };
        let (res, _) = self.scoped(ctx, |c| -> CheckResult {
            for f in &funcs {
                c.ids[*f].up = Some(r);
                c.check_signature(*f)?;
            }
            Ok(())
        });
        res
    }
}
