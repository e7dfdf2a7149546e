//! Huella - call-site stack tracing for pluggable storage environment I/O
//!
//! This library decorates a storage backend's environment abstraction so
//! that every file open, read, write, and sync performed through it emits a
//! bounded number of human-readable stack trace records, without changing
//! the behavior or return values the backend observes.

pub mod capture;
pub mod cli;
pub mod env;
pub mod error;
pub mod policy;
pub mod sink;
pub mod trace_env;
pub mod trace_file;
