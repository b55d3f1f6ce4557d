//! Generic streaming lexer.
//!
//! A [`Tokenizer`] is configured with a list of [`TokenType`]s (what to emit) and a
//! list of skip types (what to discard). Token kinds are supplied by the caller, so the
//! same machinery serves any grammar.

mod token;
mod tokenizer;

pub use token::{Match, Matcher, Position, Token, TokenType};
pub use tokenizer::Tokenizer;
