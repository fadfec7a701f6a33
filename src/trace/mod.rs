//! Run observability: append-only JSONL run logs.

pub mod eventlog;
