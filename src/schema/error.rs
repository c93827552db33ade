//! Error types for schema extraction and DDL generation.
//!
//! Every variant carries enough context (type, field, table, target) to
//! locate the annotation that caused it. Any error aborts the whole run.

use thiserror::Error;

/// Low-level failure while reading a single annotation.
///
/// `offset` is a byte offset into the raw annotation text when the failure
/// is syntactic; semantic failures (wrong value type, option not valid for
/// the column type) have no offset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}{}", .offset.map(|o| format!(" (at offset {})", o)).unwrap_or_default())]
pub struct AnnotationError {
    pub message: String,
    pub offset: Option<usize>,
}

impl AnnotationError {
    pub fn at(offset: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: Some(offset),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            offset: None,
        }
    }
}

/// The error taxonomy, without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    AnnotationParse,
    SchemaBuild,
    ReferenceResolution,
    Cycle,
    Internal,
}

/// Schema generation error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("Invalid annotation on {}: {source}", location(type_name, field.as_deref()))]
    AnnotationParse {
        type_name: String,
        field: Option<String>,
        #[source]
        source: AnnotationError,
    },

    #[error("Cannot build table for {}: {message}", location(type_name, field.as_deref()))]
    SchemaBuild {
        type_name: String,
        field: Option<String>,
        message: String,
    },

    #[error("Unresolved foreign key on {table}.{column} -> {target}: {reason}")]
    ReferenceResolution {
        table: String,
        column: String,
        target: String,
        reason: String,
    },

    #[error("Foreign key cycle between tables: {}", cycle_path(tables))]
    Cycle { tables: Vec<String> },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SchemaError {
    pub fn kind(&self) -> SchemaErrorKind {
        match self {
            SchemaError::AnnotationParse { .. } => SchemaErrorKind::AnnotationParse,
            SchemaError::SchemaBuild { .. } => SchemaErrorKind::SchemaBuild,
            SchemaError::ReferenceResolution { .. } => SchemaErrorKind::ReferenceResolution,
            SchemaError::Cycle { .. } => SchemaErrorKind::Cycle,
            SchemaError::Internal { .. } => SchemaErrorKind::Internal,
        }
    }

    pub(crate) fn build(type_name: &str, field: Option<&str>, message: impl Into<String>) -> Self {
        SchemaError::SchemaBuild {
            type_name: type_name.to_string(),
            field: field.map(str::to_string),
            message: message.into(),
        }
    }

    pub(crate) fn annotation(type_name: &str, field: Option<&str>, source: AnnotationError) -> Self {
        SchemaError::AnnotationParse {
            type_name: type_name.to_string(),
            field: field.map(str::to_string),
            source,
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        SchemaError::Internal {
            message: message.into(),
        }
    }
}

fn location(type_name: &str, field: Option<&str>) -> String {
    match field {
        Some(field) => format!("type '{}', field '{}'", type_name, field),
        None => format!("type '{}'", type_name),
    }
}

fn cycle_path(tables: &[String]) -> String {
    match tables.first() {
        Some(first) => format!("{} -> {}", tables.join(" -> "), first),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_annotation_error_display_with_offset() {
        let err = AnnotationError::at(7, "expected ':'");
        assert_eq!(err.to_string(), "expected ':' (at offset 7)");
    }

    #[rstest]
    fn test_annotation_error_display_without_offset() {
        let err = AnnotationError::invalid("'maxLength' must be a positive integer");
        assert_eq!(err.to_string(), "'maxLength' must be a positive integer");
    }

    #[rstest]
    fn test_annotation_parse_names_type_and_field() {
        let err = SchemaError::annotation("User", Some("name"), AnnotationError::at(3, "unexpected '}'"));
        assert_eq!(
            err.to_string(),
            "Invalid annotation on type 'User', field 'name': unexpected '}' (at offset 3)"
        );
        assert_eq!(err.kind(), SchemaErrorKind::AnnotationParse);
    }

    #[rstest]
    fn test_cycle_lists_every_table() {
        let err = SchemaError::Cycle {
            tables: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(err.to_string(), "Foreign key cycle between tables: a -> b -> a");
    }
}
