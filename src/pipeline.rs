//! End-to-end generation: declared types in, ordered DDL statements out.
//!
//! Per-table building runs first for every type; resolution and ordering only
//! start once all tables are built. Any error aborts the run with no output.

use std::collections::HashSet;

use log::info;

use crate::schema::{
    DeclaredType, DependencyOrderer, PostgresCompiler, ReferenceResolver, Schema, SchemaBuilder,
    SchemaError,
};

/// Build, resolve and order the schema for a set of declared types.
pub fn build_schema(declared: &[DeclaredType]) -> Result<Schema, SchemaError> {
    let mut type_names = HashSet::new();
    for declared_type in declared {
        if !type_names.insert(declared_type.name.as_str()) {
            return Err(SchemaError::SchemaBuild {
                type_name: declared_type.name.clone(),
                field: None,
                message: "type is declared more than once".to_string(),
            });
        }
    }

    let built = SchemaBuilder::build_all(declared)?;

    let mut table_names = HashSet::new();
    for table in &built {
        if !table_names.insert(table.name.as_str()) {
            return Err(SchemaError::SchemaBuild {
                type_name: table.type_name.clone(),
                field: None,
                message: format!("table name '{}' is already used by another type", table.name),
            });
        }
    }

    let tables = ReferenceResolver::resolve(&built)?;
    let order = DependencyOrderer::order(&tables)?;

    let schema = Schema { tables, order };
    info!(
        "Emission order: {}",
        schema
            .ordered_tables()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(schema)
}

/// Generate one `CREATE TABLE` statement per declared type, in dependency order.
pub fn generate(declared: &[DeclaredType]) -> Result<Vec<String>, SchemaError> {
    let schema = build_schema(declared)?;
    PostgresCompiler::compile_schema(&schema)
}

/// Generate the full DDL script: statements separated by a blank line.
pub fn generate_script(declared: &[DeclaredType]) -> Result<String, SchemaError> {
    let statements = generate(declared)?;
    if statements.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("{}\n", statements.join("\n\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DeclaredField, SchemaErrorKind, SemanticType};
    use rstest::rstest;

    fn field(name: &str, ty: &str, annotation: &str) -> DeclaredField {
        DeclaredField::new(name, SemanticType::from_source_name(ty)).annotated(annotation)
    }

    #[rstest]
    fn test_empty_input_produces_empty_script() {
        assert_eq!(generate_script(&[]).unwrap(), "");
    }

    #[rstest]
    fn test_duplicate_type_name_is_rejected() {
        let a = DeclaredType::new("User").field(field("id", "number", ""));
        let err = build_schema(&[a.clone(), a]).unwrap_err();
        assert_eq!(err.kind(), SchemaErrorKind::SchemaBuild);
    }

    #[rstest]
    fn test_duplicate_table_name_is_rejected() {
        let a = DeclaredType::new("User")
            .annotated(r#"{ "tableName": "people" }"#)
            .field(field("id", "number", ""));
        let b = DeclaredType::new("Person")
            .annotated(r#"{ "tableName": "people" }"#)
            .field(field("id", "number", ""));
        let err = build_schema(&[a, b]).unwrap_err();
        assert!(err.to_string().contains("type 'Person'"), "{}", err);
    }

    #[rstest]
    fn test_build_error_wins_over_resolution_error() {
        let order = DeclaredType::new("Order")
            .field(field("userId", "number", r#"{ "fk": { "type": Unknown, "property": "id" } }"#));
        let user = DeclaredType::new("User")
            .field(field("id", "number", r#"{ "primaryKey": true }"#))
            .field(field("uuid", "string", r#"{ "primaryKey": true }"#));
        let err = generate(&[order, user]).unwrap_err();
        assert_eq!(err.kind(), SchemaErrorKind::SchemaBuild);
    }

    #[rstest]
    fn test_script_is_newline_terminated() {
        let a = DeclaredType::new("A").field(field("id", "number", ""));
        let b = DeclaredType::new("B").field(field("id", "number", ""));
        let script = generate_script(&[a, b]).unwrap();
        assert_eq!(
            script,
            "CREATE TABLE \"A\" (\n    id INTEGER NOT NULL\n);\n\nCREATE TABLE \"B\" (\n    id INTEGER NOT NULL\n);\n"
        );
    }
}
