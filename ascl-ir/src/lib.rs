#![forbid(unsafe_code)]

pub mod ir;
pub mod segment;

pub use ir::*;
pub use segment::*;
