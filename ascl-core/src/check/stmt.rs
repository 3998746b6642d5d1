#![forbid(unsafe_code)]

use ascl_ast::{Meta, Stmt, StmtKind, TypeKind};

use super::{coerce, CheckResult, Checker};
use crate::error::SemanticError;
use crate::meta::compare;

impl Checker<'_> {
    pub(super) fn check_stmt(&mut self, stmt: &mut Stmt) -> CheckResult {
        match &mut stmt.kind {
            StmtKind::Exp(exp) => self.check_exp(exp),

            StmtKind::Assign { lhs, rhs } => {
                self.check_exp(lhs)?;
                self.check_exp(rhs)?;
                compare(&lhs.meta, &rhs.meta)?;

                let mut x = lhs.meta.clone();
                coerce(&mut x, rhs);
                Ok(())
            }

            // The declaration itself is checked with the block's ids.
            StmtKind::Decl(_) => Ok(()),

            StmtKind::If {
                cond,
                then_blk,
                else_blk,
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
                self.check_block(then_blk)?;
                if let Some(blk) = else_blk {
                    self.check_block(blk)?;
                }
                Ok(())
            }

            StmtKind::Return(value) => {
                let expected = self.return_meta();
                match value {
                    Some(exp) => {
                        self.check_exp(exp)?;
                        compare(&expected, &exp.meta)?;

                        let mut x = expected.clone();
                        coerce(&mut x, exp);
                        Ok(())
                    }
                    None if expected.is_void() => Ok(()),
                    None => Err(SemanticError::mismatched_type(
                        &expected,
                        TypeKind::Void.name(),
                        stmt.span,
                    )
                    .into()),
                }
            }

            StmtKind::Block(blk) => {
                self.check_block(blk)?;
                Ok(())
            }
        }
    }

    /// Type a `return` in the current function must produce.
    fn return_meta(&self) -> Meta {
        let Some(func) = self.ctx.func else {
            return Meta::void();
        };
        let meta = &self.ids[func].meta;
        match meta.elems.as_slice() {
            [single] if meta.is_tuple() => single.clone(),
            _ => meta.clone(),
        }
    }
}
