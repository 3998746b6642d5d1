#![forbid(unsafe_code)]

mod check;
mod config;
mod error;
pub mod meta;
pub mod syslib;
mod trans;

use ascl_ast::Ast;
use ascl_ir::Ir;

pub use check::Checker;
pub use config::{ConfigError, Flags};
pub use error::{CompileError, ErrorKind, InternalError, SemanticError};
pub use trans::Trans;

/// Checks every declaration of `ast`, filling in types and storage.
pub fn check(ast: &mut Ast) -> Result<(), CompileError> {
    let mut checker = Checker::new(&mut ast.ids);
    checker.check_root(&mut ast.root)?;

    let errors = checker.into_diagnostics();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CompileError::Semantic { errors })
    }
}

/// Rewrites the bodies of a checked `ast` into addressing-mode form.
pub fn lower(ast: &mut Ast, flags: &Flags) -> Result<Ir, InternalError> {
    let mut trans = Trans::new(&mut ast.ids, flags);
    trans.lower_decls(&ast.root)?;
    Ok(trans.finish())
}

pub fn compile(ast: &mut Ast, flags: &Flags) -> Result<Ir, CompileError> {
    check(ast)?;
    Ok(lower(ast, flags)?)
}
