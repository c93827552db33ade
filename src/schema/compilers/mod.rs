//! Database schema compilers.
//!
//! Generates DDL from resolved schema definitions. Each compiler converts
//! `Table` definitions into the target database's native DDL syntax.

pub mod postgres;

pub use postgres::PostgresCompiler;
