//! ts2psql library - relational schema generation from annotated types
//!
//! Provides annotation parsing, table model building, foreign-key
//! resolution, dependency ordering and PostgreSQL DDL emission, plus the
//! source scanning, input loading and configuration used by the binary.

pub mod cli;
pub mod config;
pub mod input;
pub mod pipeline;
pub mod schema;
pub mod source;

pub use pipeline::{build_schema, generate, generate_script};
