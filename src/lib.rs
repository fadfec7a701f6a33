//! Orquesta — recipe-driven deployment automation.
//!
//! Declarative recipes compiled into skip-aware execution plans, driven
//! sequentially through a pluggable action registry with halt-on-error
//! semantics and JSONL run logs.

pub mod actions;
pub mod cli;
pub mod core;
pub mod trace;
