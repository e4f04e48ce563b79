//! A C++ preprocessor implemented in Rust: line splicing, tokenization,
//! macro expansion, and conditional/inclusion directives, composed as a
//! pull pipeline of token streams.

pub mod driver;
pub mod error;
pub mod file;
pub mod position;
pub mod pp;
