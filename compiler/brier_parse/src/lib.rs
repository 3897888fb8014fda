//! Default text front end for Brier scripts.
//!
//! [`BrierParser`] implements [`brier_ir::LineParser`]; [`split_script`]
//! turns script text into the line list a script is built from.

mod lexer;
mod parser;
mod script;

pub use lexer::{lex, Token};
pub use parser::{parse_line, BrierParser};
pub use script::split_script;
