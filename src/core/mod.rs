//! core
//!
//! Core domain types and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, and the value snapshots
//!   returned by forge operations
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Every returned entity is a plain value snapshot of one API response

pub mod config;
pub mod types;
