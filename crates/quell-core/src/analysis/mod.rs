//! Flow-sensitive semantic analysis.
//!
//! The entry point is [`analyze`], which runs one [`CheckerVisitor`] over a
//! module. Supporting pieces: [`scope`] holds the per-path variable state
//! and its merge algebra, [`symbols`] the arena of declared names,
//! [`speculate`] turns branch conditions into nullability facts, [`effects`]
//! tracks which outer variables a function may write, and [`compare`] the
//! structural equality, diff and complexity machinery behind the duplicate
//! and similarity findings.

pub mod compare;
pub mod effects;
pub mod scope;
pub mod symbols;

mod checker;
mod speculate;

pub use checker::{CheckerVisitor, analyze};
