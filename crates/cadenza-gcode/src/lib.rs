//! G-code tokenizer and parser.

mod lexer;
mod parser;

pub use lexer::{LexError, Lexer, Number, Token, TokenKind, lex};
pub use parser::{ParseError, Statement, Word, parse, parse_tokens};

#[cfg(test)]
mod testing;
