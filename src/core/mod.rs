//! Core engine: recipe schema, validation, plan compilation, execution.

pub mod compiler;
pub mod context;
pub mod engine;
pub mod errors;
pub mod parser;
pub mod registry;
pub mod runtime;
pub mod types;
