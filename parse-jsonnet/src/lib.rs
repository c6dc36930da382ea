pub mod ast;
pub mod char;
pub mod error;
pub mod lex;
pub mod loc;
pub mod matcher;
pub mod parse;
pub mod token;

pub use lex::lex;
pub use parse::parse;
pub use parse::parse_partial;
