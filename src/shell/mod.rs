//! Shell-AST plumbing shared by the validator, the script-transitive
//! validator, and the in-process interpreter.
//!
//! `brush_parser` hands back a full Bash-dialect AST but, being a parser and
//! not an interpreter, never assigns meaning to any of it. Everything in
//! this module is about reading that tree the way a policy engine needs to:
//! literal text out of words, the full list of simple commands a program
//! runs, and the function names a program declares.

pub mod ast;

#[cfg(test)]
mod tests;

pub use ast::*;
