#![forbid(unsafe_code)]

mod exp;
mod id;
mod stmt;

use std::collections::{HashMap, HashSet};

use ascl_ast::{Block, IdKind, IdRef, IdTable};

use crate::error::{InternalError, SemanticError};

pub(crate) use exp::coerce;

/// Either a diagnostic for the user or a broken compiler invariant.
#[derive(Debug)]
pub(crate) enum CheckError {
    Semantic(SemanticError),
    Internal(InternalError),
}

impl From<SemanticError> for CheckError {
    fn from(e: SemanticError) -> Self {
        CheckError::Semantic(e)
    }
}

impl From<InternalError> for CheckError {
    fn from(e: InternalError) -> Self {
        CheckError::Internal(e)
    }
}

pub(crate) type CheckResult<T = ()> = Result<T, CheckError>;

/// Position of the checker in the declaration tree.
#[derive(Clone, Debug, Default)]
struct Ctx {
    cont: Option<IdRef>,
    /// Declaration whose members a qualified name is looked up in.
    qual: Option<IdRef>,
    func: Option<IdRef>,
    /// Next free linear-memory address for globals of `cont`.
    mem_addr: u32,
    /// Next free local slot of `func`.
    var_idx: u32,
}

pub struct Checker<'a> {
    ids: &'a mut IdTable,
    scopes: Vec<HashMap<String, IdRef>>,
    ctx: Ctx,
    /// Members visible through a qualifier, per contract and interface.
    members: HashMap<IdRef, Vec<IdRef>>,
    signed: HashSet<IdRef>,
    diags: Vec<SemanticError>,
}

impl<'a> Checker<'a> {
    pub fn new(ids: &'a mut IdTable) -> Self {
        Self {
            ids,
            scopes: Vec::new(),
            ctx: Ctx::default(),
            members: HashMap::new(),
            signed: HashSet::new(),
            diags: Vec::new(),
        }
    }

    pub fn diagnostics(&self) -> &[SemanticError] {
        &self.diags
    }

    pub fn into_diagnostics(self) -> Vec<SemanticError> {
        self.diags
    }

    /// Checks a top-level block: contracts, interfaces and their bodies.
    pub fn check_root(&mut self, root: &mut Block) -> Result<(), InternalError> {
        self.check_block(root)
    }

    /// Checks one declaration. A diagnostic is recorded and checking moves
    /// on; only an internal error is returned.
    pub fn check_id(&mut self, r: IdRef) -> Result<(), InternalError> {
        let Some(id) = self.ids.get(r) else {
            return Err(InternalError {
                message: format!("dangling declaration handle {}", r.0),
                span: None,
            });
        };
        log::trace!("checking {} '{}'", id.kind_name(), id.name);

        let res = match &id.kind {
            IdKind::Var(_) => {
                // A rejected variable still takes its slot.
                let res = self.check_var(r);
                let stored = self.assign_storage(r);
                res.and(stored)
            }
            IdKind::Struct(_) => self.check_struct(r),
            IdKind::Func(_) => self.check_func(r),
            IdKind::Contract(_) => self.check_contract(r),
            IdKind::Interface(_) => self.check_interface(r),
            IdKind::Param(_) | IdKind::Tmp => {
                let id = &self.ids[r];
                return Err(InternalError::new(
                    format!("unexpected {} '{}' in declaration list", id.kind_name(), id.name),
                    id.span,
                ));
            }
        };
        self.report(res)
    }

    /// Records a diagnostic, passes an internal error through.
    fn report(&mut self, res: CheckResult) -> Result<(), InternalError> {
        match res {
            Ok(()) => Ok(()),
            Err(CheckError::Semantic(e)) => {
                log::debug!("{e}");
                self.diags.push(e);
                Ok(())
            }
            Err(CheckError::Internal(e)) => Err(e),
        }
    }

    /// Runs `f` with `ctx` in place, restoring the current context after.
    fn scoped<T>(&mut self, ctx: Ctx, f: impl FnOnce(&mut Self) -> T) -> (T, Ctx) {
        let saved = std::mem::replace(&mut self.ctx, ctx);
        let out = f(self);
        let inner = std::mem::replace(&mut self.ctx, saved);
        (out, inner)
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, r: IdRef) {
        let name = self.ids[r].name.clone();
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, r);
        }
    }

    fn lookup(&self, name: &str) -> Option<IdRef> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    /// Looks `name` up among the members of the current qualifier.
    fn lookup_member(&self, name: &str) -> Option<IdRef> {
        let qual = self.ctx.qual?;
        match &self.ids[qual].kind {
            IdKind::Struct(st) => st.fields.iter().copied().find(|f| self.ids[*f].name == name),
            _ => self
                .members
                .get(&qual)?
                .iter()
                .copied()
                .find(|m| self.ids[*m].name == name && self.ids[*m].is_func()),
        }
    }

    /// Makes the functions of a contract or interface reachable through a
    /// qualifier before any body is checked.
    fn register_members(&mut self, r: IdRef) {
        let members = match &self.ids[r].kind {
            IdKind::Contract(cont) => match &cont.body {
                Some(body) => body.ids.clone(),
                None => Vec::new(),
            },
            IdKind::Interface(itf) => itf.funcs.clone(),
            _ => return,
        };
        for m in &members {
            self.ids[*m].up = Some(r);
        }
        self.members.insert(r, members);
    }

    fn check_block(&mut self, blk: &mut Block) -> Result<(), InternalError> {
        self.push_scope();
        for r in blk.structs.iter().chain(&blk.ids) {
            self.declare(*r);
        }

        let res = self.check_block_body(blk);
        self.pop_scope();
        res
    }

    fn check_block_body(&mut self, blk: &mut Block) -> Result<(), InternalError> {
        for r in &blk.ids {
            self.register_members(*r);
        }

        for r in &blk.structs {
            self.check_id(*r)?;
        }

        // Signatures first, so calls resolve regardless of declaration order.
        for r in &blk.ids {
            if self.ids[*r].is_func() {
                let res = self.check_signature(*r);
                self.report(res)?;
            }
        }

        for r in &blk.ids {
            self.check_id(*r)?;
        }

        for s in blk.stmts.iter_mut() {
            let res = self.check_stmt(s);
            self.report(res)?;
        }
        Ok(())
    }
}
