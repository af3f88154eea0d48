//! Document reading and tokenization.

mod tokenizer;

pub use tokenizer::{Tokens, TokenizingReader};
