//! Foreign-key resolution across tables.
//!
//! Pending references name their target by declared type and declared field.
//! Resolution maps them to emitted table and column names, and gives
//! reference-typed columns the type of the column they point at.

use std::collections::{HashMap, HashSet};

use log::debug;

use crate::schema::definition::{Column, ForeignKey, PendingReference, SqlType, Table};
use crate::schema::error::SchemaError;

/// Resolves pending foreign keys against the full set of built tables.
pub struct ReferenceResolver<'a> {
    tables: &'a [Table],
    by_type: HashMap<&'a str, usize>,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(tables: &'a [Table]) -> Self {
        let by_type = tables
            .iter()
            .enumerate()
            .map(|(i, t)| (t.type_name.as_str(), i))
            .collect();
        Self { tables, by_type }
    }

    /// Resolve every pending reference, returning new fully resolved tables.
    pub fn resolve(tables: &[Table]) -> Result<Vec<Table>, SchemaError> {
        let resolver = ReferenceResolver::new(tables);
        tables.iter().map(|t| resolver.resolve_table(t)).collect()
    }

    fn resolve_table(&self, table: &Table) -> Result<Table, SchemaError> {
        let mut columns = table.columns.clone();
        for pending in &table.pending {
            let column = columns
                .iter_mut()
                .find(|c| c.name == pending.column)
                .ok_or_else(|| {
                    SchemaError::internal(format!(
                        "pending reference on missing column {}.{}",
                        table.name, pending.column
                    ))
                })?;

            let (target_table, target_column) = self.target(table, pending)?;
            if column.sql_type == SqlType::Inherited {
                column.sql_type = self.inherited_type(table, pending, &mut HashSet::new())?;
            }
            debug!(
                "Resolved {}.{} -> {}.{}",
                table.name, column.name, target_table.name, target_column.name
            );
            column.foreign_key = Some(ForeignKey {
                table: target_table.name.clone(),
                column: target_column.name.clone(),
            });
        }

        Ok(Table {
            columns,
            pending: Vec::new(),
            ..table.clone()
        })
    }

    fn target(&self, table: &Table, pending: &PendingReference) -> Result<(&'a Table, &'a Column), SchemaError> {
        let error = |reason: String| SchemaError::ReferenceResolution {
            table: table.name.clone(),
            column: pending.column.clone(),
            target: pending.target_label(),
            reason,
        };

        let tables: &'a [Table] = self.tables;
        let target_table = self
            .by_type
            .get(pending.target_type.as_str())
            .and_then(|&i| tables.get(i))
            .ok_or_else(|| error(format!("type '{}' is not declared", pending.target_type)))?;

        let target_column = match &pending.target_field {
            Some(field) => match target_table.column_for_field(field) {
                Some(column) => column,
                None if target_table.excluded_fields.contains(field) => {
                    return Err(error(format!(
                        "field '{}' of type '{}' is not a column",
                        field, pending.target_type
                    )));
                }
                None => {
                    return Err(error(format!(
                        "type '{}' has no field '{}'",
                        pending.target_type, field
                    )));
                }
            },
            None => target_table.primary_key().ok_or_else(|| {
                error(format!("type '{}' has no primary key", pending.target_type))
            })?,
        };

        Ok((target_table, target_column))
    }

    /// Follow a chain of reference-typed columns to a concrete type.
    fn inherited_type(
        &self,
        table: &Table,
        pending: &PendingReference,
        visited: &mut HashSet<(String, String)>,
    ) -> Result<SqlType, SchemaError> {
        if !visited.insert((table.type_name.clone(), pending.column.clone())) {
            return Err(SchemaError::ReferenceResolution {
                table: table.name.clone(),
                column: pending.column.clone(),
                target: pending.target_label(),
                reason: "column type is defined only through a circular chain of references".to_string(),
            });
        }

        let (target_table, target_column) = self.target(table, pending)?;
        if target_column.sql_type != SqlType::Inherited {
            return Ok(target_column.sql_type.referencing_type());
        }
        let next = target_table
            .pending
            .iter()
            .find(|p| p.column == target_column.name)
            .ok_or_else(|| {
                SchemaError::internal(format!(
                    "{}.{} has an inherited type but no pending reference",
                    target_table.name, target_column.name
                ))
            })?;
        self.inherited_type(target_table, next, visited)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::builder::SchemaBuilder;
    use crate::schema::definition::{DeclaredField, DeclaredType, NumberType, SemanticType};
    use crate::schema::error::SchemaErrorKind;
    use rstest::rstest;

    fn field(name: &str, ty: &str, annotation: &str) -> DeclaredField {
        DeclaredField::new(name, SemanticType::from_source_name(ty)).annotated(annotation)
    }

    fn user() -> DeclaredType {
        DeclaredType::new("User")
            .annotated(r#"{ "tableName": "users", "toSnakeCase": true }"#)
            .field(field("id", "number", r#"{ "primaryKey": true, "serial": true }"#))
            .field(field("emailAddress", "string", r#"{ "unique": true }"#))
            .field(DeclaredField::new("password", SemanticType::String))
    }

    fn build(declared: &[DeclaredType]) -> Vec<Table> {
        SchemaBuilder::build_all(declared).unwrap()
    }

    #[rstest]
    fn test_resolves_fk_to_emitted_names() {
        let order = DeclaredType::new("Order")
            .field(field("id", "number", r#"{ "primaryKey": true }"#))
            .field(field("email", "string", r#"{ "fk": { "type": User, "property": "emailAddress" } }"#));
        let tables = ReferenceResolver::resolve(&build(&[user(), order])).unwrap();

        let email = tables[1].column("email").unwrap();
        assert_eq!(
            email.foreign_key,
            Some(ForeignKey {
                table: "users".to_string(),
                column: "email_address".to_string(),
            })
        );
        assert!(tables.iter().all(Table::is_resolved));
    }

    #[rstest]
    fn test_reference_typed_field_takes_primary_key_type() {
        let order = DeclaredType::new("Order").field(field("owner", "User", ""));
        let tables = ReferenceResolver::resolve(&build(&[user(), order])).unwrap();

        let owner = tables[1].column("owner").unwrap();
        assert_eq!(owner.sql_type, SqlType::Number(NumberType::Integer));
        assert_eq!(owner.foreign_key.as_ref().unwrap().column, "id");
    }

    #[rstest]
    fn test_inherited_type_follows_chain() {
        let order = DeclaredType::new("Order")
            .field(field("owner", "User", r#"{ "primaryKey": true }"#));
        let line = DeclaredType::new("Line").field(field("order", "Order", ""));
        let tables = ReferenceResolver::resolve(&build(&[user(), order, line])).unwrap();
        assert_eq!(
            tables[2].column("order").unwrap().sql_type,
            SqlType::Number(NumberType::Integer)
        );
    }

    #[rstest]
    fn test_input_tables_are_not_modified() {
        let order = DeclaredType::new("Order").field(field("owner", "User", ""));
        let built = build(&[user(), order]);
        let _ = ReferenceResolver::resolve(&built).unwrap();
        assert!(!built[1].is_resolved());
    }

    #[rstest]
    #[case::unknown_type(r#"{ "fk": { "type": Unknown, "property": "id" } }"#, "type 'Unknown' is not declared")]
    #[case::unknown_field(r#"{ "fk": { "type": User, "property": "nope" } }"#, "has no field 'nope'")]
    #[case::excluded_field(r#"{ "fk": { "type": User, "property": "password" } }"#, "'password' of type 'User' is not a column")]
    fn test_unresolvable_references(#[case] annotation: &str, #[case] reason_part: &str) {
        let order = DeclaredType::new("Order").field(field("userRef", "number", annotation));
        let err = ReferenceResolver::resolve(&build(&[user(), order])).unwrap_err();
        assert_eq!(err.kind(), SchemaErrorKind::ReferenceResolution);
        match err {
            SchemaError::ReferenceResolution { table, column, reason, .. } => {
                assert_eq!(table, "Order");
                assert_eq!(column, "userRef");
                assert!(reason.contains(reason_part), "{}", reason);
            }
            other => panic!("Expected ReferenceResolution, got {:?}", other),
        }
    }

    #[rstest]
    fn test_reference_to_type_without_primary_key() {
        let tag = DeclaredType::new("Tag").field(field("label", "string", ""));
        let post = DeclaredType::new("Post").field(field("tag", "Tag", ""));
        let err = ReferenceResolver::resolve(&build(&[tag, post])).unwrap_err();
        assert!(err.to_string().contains("has no primary key"), "{}", err);
    }

    #[rstest]
    fn test_circular_inherited_types_are_rejected() {
        let a = DeclaredType::new("A").field(field("b", "B", r#"{ "primaryKey": true }"#));
        let b = DeclaredType::new("B").field(field("a", "A", r#"{ "primaryKey": true }"#));
        let err = ReferenceResolver::resolve(&build(&[a, b])).unwrap_err();
        assert_eq!(err.kind(), SchemaErrorKind::ReferenceResolution);
    }
}
