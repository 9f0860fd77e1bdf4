// Core primitives shared by the chunker, tokenizer and baselines.

pub mod field;

pub use field::*;
