// src/output/mod.rs

//! Turning captured worker output into an execution result.

pub mod parser;

pub use parser::{ParsedOutput, parse};
