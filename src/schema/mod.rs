//! Relational schema extraction and DDL generation.
//!
//! Declared types flow forward through five stages, each producing a new
//! value and never mutating the previous one:
//!
//! 1. **Annotation parsing** (`annotation.rs`) - raw option text to
//!    `ColumnOptions` / `TableOptions`
//! 2. **Model building** (`builder.rs`) - one `DeclaredType` to one `Table`,
//!    with foreign keys recorded as pending references
//! 3. **Reference resolution** (`resolver.rs`) - pending references to
//!    emitted table and column names
//! 4. **Dependency ordering** (`order.rs`) - referenced tables before
//!    referencing tables
//! 5. **DDL emission** (`compilers/`) - `CREATE TABLE` statements
//!
//! # Type Mapping
//!
//! | Semantic type | SQL type |
//! |---------------|----------|
//! | number | INTEGER (SERIAL with `serial`, or per `numberType`) |
//! | string | VARCHAR(n) with `maxLength`, else TEXT |
//! | boolean | BOOLEAN |
//! | Date | TIMESTAMP |
//! | another declared type | type of the referenced primary key |

pub mod annotation;
pub mod builder;
pub mod compilers;
pub mod definition;
pub mod error;
pub mod escape;
pub mod naming;
pub mod order;
pub mod resolver;

pub use annotation::{parse_annotation, Annotation, ColumnOptions, TableOptions};
pub use builder::SchemaBuilder;
pub use compilers::PostgresCompiler;
pub use definition::{
    Column, DeclaredField, DeclaredType, DefaultValue, ForeignKey, NumberType, Schema,
    SemanticType, SqlType, Table,
};
pub use error::{AnnotationError, SchemaError, SchemaErrorKind};
pub use order::DependencyOrderer;
pub use resolver::ReferenceResolver;
