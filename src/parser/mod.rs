//! Parser for the template notation

pub mod ast;
mod grammar;
pub mod lexer;
mod validate;

pub use ast::*;
pub use grammar::parse;
pub use lexer::Delims;
pub use validate::validate;
