#![forbid(unsafe_code)]

mod exp;

use ascl_ast::{Block, Exp, Id, IdKind, IdRef, IdTable, Span, Stmt, StmtKind};
use ascl_ir::{Ir, IrFn};

use crate::config::Flags;
use crate::error::InternalError;

/// Expression lowering over checked function bodies.
pub struct Trans<'a> {
    ids: &'a mut IdTable,
    flags: &'a Flags,
    ir: Ir,
    func: Option<IrFn>,
    /// Statements to run before the statement being lowered.
    before: Vec<Stmt>,
    /// Piggyback statements to run right after it.
    after: Vec<Stmt>,
}

impl<'a> Trans<'a> {
    pub fn new(ids: &'a mut IdTable, flags: &'a Flags) -> Self {
        Self {
            ids,
            flags,
            ir: Ir::new(),
            func: None,
            before: Vec::new(),
            after: Vec::new(),
        }
    }

    pub fn finish(self) -> Ir {
        self.ir
    }

    /// Lowers every function declared in `blk`, descending into contracts.
    pub fn lower_decls(&mut self, blk: &Block) -> Result<(), InternalError> {
        for r in &blk.ids {
            match &self.ids[*r].kind {
                IdKind::Func(_) => self.lower_func(*r)?,
                IdKind::Contract(_) => self.lower_contract(*r)?,
                _ => {}
            }
        }
        Ok(())
    }

    fn lower_contract(&mut self, r: IdRef) -> Result<(), InternalError> {
        let body = match &mut self.ids[r].kind {
            IdKind::Contract(cont) => cont.body.take(),
            _ => None,
        };
        let Some(mut body) = body else {
            return Ok(());
        };
        let res = self
            .move_state_inits(r, &mut body)
            .and_then(|()| self.lower_decls(&body));
        if let IdKind::Contract(cont) = &mut self.ids[r].kind {
            cont.body = Some(body);
        }
        res
    }

    /// Moves state variable initializers to the head of the constructor,
    /// adding an empty constructor to a contract that has none.
    fn move_state_inits(&mut self, cont: IdRef, body: &mut Block) -> Result<(), InternalError> {
        let mut stores = Vec::new();
        for v in &body.ids {
            let id = &mut self.ids[*v];
            let IdKind::Var(var) = &mut id.kind else {
                continue;
            };
            let Some(init) = var.init.take() else {
                continue;
            };
            let mut lhs = Exp::id(id.name.clone(), id.span).with_meta(id.meta.clone());
            lhs.id = Some(*v);
            let span = init.span;
            stores.push(Stmt::assign(lhs, init, span));
        }
        if stores.is_empty() {
            return Ok(());
        }

        let ctor = match body.ids.iter().copied().find(|f| self.ids[*f].is_ctor()) {
            Some(ctor) => ctor,
            None => {
                let ctor = self.default_ctor(cont);
                body.ids.push(ctor);
                ctor
            }
        };
        let id = &mut self.ids[ctor];
        let span = id.span;
        let Some(func) = id.as_func_mut() else {
            return Err(InternalError::new("constructor is not a function", span));
        };
        log::debug!("{} state initializer(s) moved into the constructor", stores.len());
        let ctor_body = func.body.get_or_insert_with(|| Block::new(span));
        ctor_body.stmts.splice(0..0, stores);
        Ok(())
    }

    fn default_ctor(&mut self, cont: IdRef) -> IdRef {
        let id = &self.ids[cont];
        let (name, span, meta) = (id.name.clone(), id.span, id.meta.clone());

        let mut ctor = Id::func(name, Vec::new(), Vec::new(), Some(Block::new(span)), span);
        ctor.modifier.ctor = true;
        ctor.meta = meta;
        ctor.up = Some(cont);
        if let Some(func) = ctor.as_func_mut() {
            func.local_cnt = 1;
        }
        self.ids.add(ctor)
    }

    fn lower_func(&mut self, r: IdRef) -> Result<(), InternalError> {
        let id = &mut self.ids[r];
        let (name, span) = (id.name.clone(), id.span);
        let Some(func) = id.as_func_mut() else {
            return Err(InternalError::new("function expected", span));
        };
        let Some(body) = func.body.take() else {
            return Ok(());
        };
        let (params, vars) = (func.params.clone(), func.vars.clone());
        log::debug!("lowering function '{name}'");

        let mut frame = IrFn::new(&name, r, span);
        for p in &params {
            let id = &self.ids[*p];
            let idx = frame.add_param(&id.name, id.meta.slot_type());
            debug_assert_eq!(idx, id.idx);
        }
        for v in &vars {
            let id = &self.ids[*v];
            let idx = frame.add_local(&id.name, id.meta.slot_type());
            debug_assert_eq!(idx, id.idx);
        }
        frame.add_stack_base();

        let outer = self.func.replace(frame);
        let res = self.trans_block(body);
        let frame = std::mem::replace(&mut self.func, outer);

        let body = res?;
        if let Some(func) = self.ids[r].as_func_mut() {
            func.body = Some(body);
        }
        if let Some(frame) = frame {
            self.ir.fns.insert(r, frame);
        }
        Ok(())
    }

    pub(crate) fn frame(&mut self) -> Result<&mut IrFn, InternalError> {
        self.func.as_mut().ok_or_else(|| InternalError {
            message: "expression lowered outside of a function".to_string(),
            span: None,
        })
    }

    pub fn trans_block(&mut self, blk: Block) -> Result<Block, InternalError> {
        let Block {
            span,
            ids,
            structs,
            stmts,
        } = blk;

        let mut out = Vec::with_capacity(stmts.len());
        for stmt in stmts {
            out.extend(self.trans_stmt(stmt)?);
        }
        Ok(Block {
            span,
            ids,
            structs,
            stmts: out,
        })
    }

    /// Lowers one statement into the statements that replace it: inserted
    /// statements, the statement itself, then its piggyback statements.
    pub fn trans_stmt(&mut self, stmt: Stmt) -> Result<Vec<Stmt>, InternalError> {
        let outer_before = std::mem::take(&mut self.before);
        let outer_after = std::mem::take(&mut self.after);

        let res = self.trans_stmt_kind(stmt);

        let before = std::mem::replace(&mut self.before, outer_before);
        let after = std::mem::replace(&mut self.after, outer_after);
        let lowered = res?;

        let mut out = before;
        out.extend(lowered);
        if !after.is_empty() {
            log::trace!("{} piggyback statement(s) appended", after.len());
        }
        out.extend(after);
        Ok(out)
    }

    fn trans_stmt_kind(&mut self, stmt: Stmt) -> Result<Option<Stmt>, InternalError> {
        let span = stmt.span;
        let kind = match stmt.kind {
            StmtKind::Exp(exp) => StmtKind::Exp(self.lower_exp(exp)?),
            StmtKind::Assign { lhs, rhs } => {
                let lhs = self.lower_exp(lhs)?;
                let rhs = self.lower_exp(rhs)?;
                StmtKind::Assign { lhs, rhs }
            }
            StmtKind::Decl(r) => return self.trans_decl(r, span),
            StmtKind::If {
                cond,
                then_blk,
                else_blk,
            } => {
                let cond = self.lower_exp(cond)?;
                // Updates piggybacked on the condition run first in either branch.
                let updates = std::mem::take(&mut self.after);
                let mut then_blk = self.trans_block(then_blk)?;
                let mut else_blk = match else_blk {
                    Some(blk) => Some(self.trans_block(blk)?),
                    None if !updates.is_empty() => Some(Block::new(span)),
                    None => None,
                };
                if let Some(blk) = else_blk.as_mut() {
                    blk.stmts.splice(0..0, updates.iter().cloned());
                }
                then_blk.stmts.splice(0..0, updates);
                StmtKind::If {
                    cond,
                    then_blk,
                    else_blk,
                }
            }
            StmtKind::Return(value) => StmtKind::Return(match value {
                Some(exp) => Some(self.lower_exp(exp)?),
                None => None,
            }),
            StmtKind::Block(blk) => StmtKind::Block(self.trans_block(blk)?),
        };
        Ok(Some(Stmt::new(kind, span)))
    }

    /// A local declaration becomes the store of its initializer. A fixed
    /// array or struct without one gets zeroed stack memory; anything else
    /// emits nothing.
    fn trans_decl(&mut self, r: IdRef, span: Span) -> Result<Option<Stmt>, InternalError> {
        let id = &self.ids[r];
        let IdKind::Var(var) = &id.kind else {
            return Err(InternalError::new(
                format!("declaration of {} '{}'", id.kind_name(), id.name),
                span,
            ));
        };
        let init = match &var.init {
            Some(init) => init.clone(),
            None if id.meta.is_fixed() || id.meta.is_struct() => {
                Exp::alloc(id.meta.clone(), id.span)
            }
            None => return Ok(None),
        };

        let mut lhs = Exp::local(id.idx, id.meta.clone(), id.span);
        lhs.id = Some(r);
        let rhs = self.lower_exp(init)?;
        Ok(Some(Stmt::assign(lhs, rhs, span)))
    }
}
