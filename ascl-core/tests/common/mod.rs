#![allow(dead_code)]

use ascl_ast::{span, Ast, Block, Exp, Id, IdRef, IdTable, Span, Stmt, StmtKind, TypeKind};

pub fn sp() -> Span {
    span(0, 0)
}

pub fn ty(kind: TypeKind) -> Exp {
    Exp::type_prim(kind, sp())
}

pub fn int(v: i64) -> Exp {
    Exp::lit_int(v, sp())
}

pub fn name(n: &str) -> Exp {
    Exp::id(n, sp())
}

pub fn var(n: &str, kind: TypeKind) -> Id {
    Id::var(n, ty(kind), sp())
}

pub fn decl(r: IdRef) -> Stmt {
    Stmt::decl(r, sp())
}

pub fn assign(lhs: Exp, rhs: Exp) -> Stmt {
    Stmt::assign(lhs, rhs, sp())
}

/// Builds a compilation unit contract by contract.
#[derive(Default)]
pub struct Unit {
    pub ids: IdTable,
    members: Vec<IdRef>,
    structs: Vec<IdRef>,
    contracts: Vec<IdRef>,
}

impl Unit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declaration owned by something else, e.g. a local of a function body.
    pub fn add(&mut self, id: Id) -> IdRef {
        self.ids.add(id)
    }

    /// State variable of the contract being built.
    pub fn global(&mut self, id: Id) -> IdRef {
        let r = self.ids.add(id);
        self.members.push(r);
        r
    }

    pub fn structure(&mut self, n: &str, fields: Vec<Id>) -> IdRef {
        let fields = fields.into_iter().map(|f| self.ids.add(f)).collect();
        let r = self.ids.add(Id::structure(n, fields, sp()));
        self.structs.push(r);
        r
    }

    pub fn func(
        &mut self,
        n: &str,
        params: Vec<Id>,
        rets: Vec<Exp>,
        locals: Vec<IdRef>,
        stmts: Vec<Stmt>,
    ) -> IdRef {
        let params = params.into_iter().map(|p| self.ids.add(p)).collect();
        let mut body = Block::new(sp());
        body.ids = locals;
        body.stmts = stmts;
        let r = self.ids.add(Id::func(n, params, rets, Some(body), sp()));
        self.members.push(r);
        r
    }

    pub fn member(&mut self, id: Id) -> IdRef {
        let r = self.ids.add(id);
        self.members.push(r);
        r
    }

    /// Closes the contract being built.
    pub fn contract(&mut self, n: &str) -> IdRef {
        let mut body = Block::new(sp());
        body.ids = std::mem::take(&mut self.members);
        body.structs = std::mem::take(&mut self.structs);
        let r = self.ids.add(Id::contract(n, Some(body), sp()));
        self.contracts.push(r);
        r
    }

    /// Adds a top-level declaration next to the contracts.
    pub fn top(&mut self, id: Id) -> IdRef {
        let r = self.ids.add(id);
        self.contracts.push(r);
        r
    }

    pub fn finish(self) -> Ast {
        let mut root = Block::new(sp());
        root.ids = self.contracts;
        Ast::new(self.ids, root)
    }
}

/// One contract `C` holding whatever was added so far.
pub fn single(mut unit: Unit) -> Ast {
    unit.contract("C");
    unit.finish()
}

pub fn body(ast: &Ast, f: IdRef) -> &[Stmt] {
    let func = ast.ids[f].as_func().expect("function");
    &func.body.as_ref().expect("body").stmts
}

pub fn assign_parts(stmt: &Stmt) -> (&Exp, &Exp) {
    match &stmt.kind {
        StmtKind::Assign { lhs, rhs } => (lhs, rhs),
        other => panic!("expected assignment, got {other:?}"),
    }
}
