//! Schema model builder.
//!
//! Turns one `DeclaredType` into one `Table`: parses annotations, applies
//! naming, maps semantic types to SQL types, coerces defaults, and records
//! foreign keys as pending references for the resolver.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use log::{debug, warn};

use crate::schema::annotation::{parse_annotation, Annotation, ColumnOptions, TableOptions, Value};
use crate::schema::definition::{
    Column, DeclaredField, DeclaredType, DefaultValue, NumberType, PendingReference, SemanticType,
    SqlType, Table,
};
use crate::schema::error::{AnnotationError, SchemaError};
use crate::schema::naming::to_snake_case;

/// Builds table models from declared types.
pub struct SchemaBuilder;

impl SchemaBuilder {
    /// Build one table. Fails on the first invalid field.
    pub fn build_table(declared: &DeclaredType) -> Result<Table, SchemaError> {
        let type_name = declared.name.as_str();
        let table_options = Self::table_options(declared)?;

        let table_name = match &table_options.table_name {
            Some(name) => name.clone(),
            None if table_options.to_snake_case => to_snake_case(type_name),
            None => type_name.to_string(),
        };

        let mut columns: Vec<Column> = Vec::new();
        let mut excluded_fields = Vec::new();
        let mut pending = Vec::new();

        for (index, field) in declared.fields.iter().enumerate() {
            let Some(raw) = field.annotation.as_deref() else {
                debug!("{}.{} has no annotation, not a column", type_name, field.name);
                excluded_fields.push(field.name.clone());
                continue;
            };

            let annotation = parse_annotation(raw)
                .map_err(|e| SchemaError::annotation(type_name, Some(&field.name), e))?;
            let options = match annotation {
                Annotation::End => {
                    let rest = &declared.fields[index + 1..];
                    if !rest.is_empty() {
                        warn!(
                            "{}: end marker on field '{}', ignoring {} trailing field(s)",
                            type_name,
                            field.name,
                            rest.len()
                        );
                    }
                    break;
                }
                Annotation::Empty => ColumnOptions::default(),
                Annotation::Options(entries) => ColumnOptions::from_entries(&entries)
                    .map_err(|e| SchemaError::annotation(type_name, Some(&field.name), e))?,
            };

            let column = Self::build_column(type_name, field, &options, table_options.to_snake_case)?;

            if columns.iter().any(|c| c.name == column.name) {
                return Err(SchemaError::build(
                    type_name,
                    Some(&field.name),
                    format!("duplicate column name '{}'", column.name),
                ));
            }
            if column.primary_key {
                if let Some(existing) = columns.iter().find(|c| c.primary_key) {
                    return Err(SchemaError::build(
                        type_name,
                        Some(&field.name),
                        format!("second primary key (already declared on '{}')", existing.field_name),
                    ));
                }
            }

            if let Some(fk) = &options.fk {
                pending.push(PendingReference {
                    column: column.name.clone(),
                    target_type: fk.type_name.clone(),
                    target_field: Some(fk.property.clone()),
                });
            } else if let SemanticType::Reference(target) = &field.semantic_type {
                pending.push(PendingReference {
                    column: column.name.clone(),
                    target_type: target.clone(),
                    target_field: None,
                });
            }

            columns.push(column);
        }

        if columns.is_empty() {
            return Err(SchemaError::build(type_name, None, "type has no annotated fields"));
        }

        debug!("Built table {} from {} ({} columns)", table_name, type_name, columns.len());

        Ok(Table {
            type_name: type_name.to_string(),
            name: table_name,
            columns,
            excluded_fields,
            pending,
        })
    }

    /// Build every table, in declaration order.
    pub fn build_all(declared: &[DeclaredType]) -> Result<Vec<Table>, SchemaError> {
        declared.iter().map(Self::build_table).collect()
    }

    fn table_options(declared: &DeclaredType) -> Result<TableOptions, SchemaError> {
        let Some(raw) = declared.annotation.as_deref() else {
            return Ok(TableOptions::default());
        };
        let to_error = |e| SchemaError::annotation(&declared.name, None, e);
        match parse_annotation(raw).map_err(to_error)? {
            Annotation::Empty => Ok(TableOptions::default()),
            Annotation::End => Err(to_error(AnnotationError::invalid(
                "end marker is not valid on a type",
            ))),
            Annotation::Options(entries) => TableOptions::from_entries(&entries).map_err(to_error),
        }
    }

    fn build_column(
        type_name: &str,
        field: &DeclaredField,
        options: &ColumnOptions,
        to_snake: bool,
    ) -> Result<Column, SchemaError> {
        let invalid = |message: String| {
            SchemaError::annotation(type_name, Some(&field.name), AnnotationError::invalid(message))
        };

        let name = match &options.column_name {
            Some(name) => name.clone(),
            None if to_snake => to_snake_case(&field.name),
            None => field.name.clone(),
        };

        let sql_type = Self::sql_type(&field.semantic_type, options).map_err(invalid)?;

        if options.primary_key && field.optional {
            return Err(SchemaError::build(
                type_name,
                Some(&field.name),
                "primary key cannot be declared on an optional field",
            ));
        }
        let nullable = field.optional;

        let default = match &options.default {
            Some(value) => Some(Self::coerce_default(value, sql_type, nullable).map_err(invalid)?),
            None => None,
        };

        Ok(Column {
            name,
            field_name: field.name.clone(),
            sql_type,
            nullable,
            primary_key: options.primary_key,
            unique: options.unique,
            default,
            foreign_key: None,
        })
    }

    fn sql_type(semantic: &SemanticType, options: &ColumnOptions) -> Result<SqlType, String> {
        let kind = semantic.source_name();
        if options.max_length.is_some() && *semantic != SemanticType::String {
            return Err(format!("'maxLength' only applies to string columns, not '{}'", kind));
        }
        if options.number_type.is_some() && *semantic != SemanticType::Integer {
            return Err(format!("'numberType' only applies to number columns, not '{}'", kind));
        }
        if options.serial && *semantic != SemanticType::Integer {
            return Err(format!("'serial' only applies to number columns, not '{}'", kind));
        }

        Ok(match semantic {
            SemanticType::Integer => {
                let number = options.number_type.unwrap_or(NumberType::Integer);
                if options.serial && !number.is_integer() {
                    return Err(format!("'serial' requires an integer numberType, not {:?}", number));
                }
                if options.serial {
                    SqlType::Serial(number)
                } else {
                    SqlType::Number(number)
                }
            }
            SemanticType::String => match options.max_length {
                Some(length) => SqlType::Varchar(length),
                None => SqlType::Text,
            },
            SemanticType::Boolean => SqlType::Boolean,
            SemanticType::Date => SqlType::Timestamp,
            SemanticType::Reference(_) => SqlType::Inherited,
        })
    }

    fn coerce_default(value: &Value, sql_type: SqlType, nullable: bool) -> Result<DefaultValue, String> {
        if let Value::Null = value {
            return if nullable {
                Ok(DefaultValue::Null)
            } else {
                Err("'default' of null requires an optional field".to_string())
            };
        }

        match (sql_type, value) {
            (SqlType::Serial(_), _) => Err("'default' cannot be combined with 'serial'".to_string()),
            (SqlType::Inherited, _) => {
                Err("'default' is not supported on reference-typed fields".to_string())
            }
            (SqlType::Number(number), Value::Number(literal)) => {
                if number.is_integer() && literal.parse::<i64>().is_err() {
                    Err(format!("default {} is not an integer", literal))
                } else {
                    Ok(DefaultValue::Number(literal.clone()))
                }
            }
            (SqlType::Varchar(length), Value::String(text)) => {
                if text.chars().count() > length as usize {
                    Err(format!("default is longer than maxLength {}", length))
                } else {
                    Ok(DefaultValue::Text(text.clone()))
                }
            }
            (SqlType::Text, Value::String(text)) => Ok(DefaultValue::Text(text.clone())),
            (SqlType::Boolean, Value::Bool(b)) => Ok(DefaultValue::Boolean(*b)),
            (SqlType::Timestamp, Value::String(text) | Value::Ident(text)) => {
                if text.eq_ignore_ascii_case("now") || text.eq_ignore_ascii_case("current_timestamp") {
                    Ok(DefaultValue::CurrentTimestamp)
                } else if is_timestamp_literal(text) {
                    Ok(DefaultValue::Timestamp(text.clone()))
                } else {
                    Err(format!("default '{}' is not a valid timestamp", text))
                }
            }
            (sql_type, value) => Err(format!(
                "default {} is not compatible with column type {}",
                describe_value(value),
                sql_type.render().unwrap_or_default()
            )),
        }
    }
}

fn is_timestamp_literal(text: &str) -> bool {
    DateTime::parse_from_rfc3339(text).is_ok()
        || NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").is_ok()
        || NaiveDate::parse_from_str(text, "%Y-%m-%d").is_ok()
}

fn describe_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{}\"", s),
        Value::Number(n) => n.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Ident(name) => name.clone(),
        Value::Object(_) => "{...}".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::error::SchemaErrorKind;
    use rstest::{fixture, rstest};

    fn field(name: &str, ty: &str, annotation: &str) -> DeclaredField {
        DeclaredField::new(name, SemanticType::from_source_name(ty)).annotated(annotation)
    }

    #[fixture]
    fn user_type() -> DeclaredType {
        DeclaredType::new("User")
            .annotated(r#"{ "tableName": "users", "toSnakeCase": true }"#)
            .field(field("id", "number", r#"{ "primaryKey": true, "serial": true }"#))
            .field(field("uuid", "string", r#"{ "unique": true }"#))
            .field(field("name", "string", r#"{ "columnName": "username", "unique": true, "maxLength": 50 }"#))
            .field(field("deleted", "boolean", r#"{ "default": false }"#))
            .field(field("timeCreated", "Date", ""))
            .field(field("timeLastLogin", "Date", "").optional())
            .field(DeclaredField::new("scratch", SemanticType::String))
    }

    #[rstest]
    fn test_builds_user_table(user_type: DeclaredType) {
        let table = SchemaBuilder::build_table(&user_type).unwrap();
        assert_eq!(table.name, "users");
        assert_eq!(table.type_name, "User");

        let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["id", "uuid", "username", "deleted", "time_created", "time_last_login"]
        );
        assert_eq!(table.excluded_fields, vec!["scratch".to_string()]);
        assert!(table.pending.is_empty());
    }

    #[rstest]
    fn test_serial_primary_key_is_not_null(user_type: DeclaredType) {
        let table = SchemaBuilder::build_table(&user_type).unwrap();
        let id = table.primary_key().unwrap();
        assert_eq!(id.name, "id");
        assert_eq!(id.sql_type, SqlType::Serial(NumberType::Integer));
        assert!(!id.nullable);
    }

    #[rstest]
    fn test_column_types_and_constraints(user_type: DeclaredType) {
        let table = SchemaBuilder::build_table(&user_type).unwrap();

        let uuid = table.column("uuid").unwrap();
        assert_eq!(uuid.sql_type, SqlType::Text);
        assert!(uuid.unique);

        let username = table.column("username").unwrap();
        assert_eq!(username.sql_type, SqlType::Varchar(50));
        assert_eq!(username.field_name, "name");

        let deleted = table.column("deleted").unwrap();
        assert_eq!(deleted.default, Some(DefaultValue::Boolean(false)));

        assert!(table.column("time_last_login").unwrap().nullable);
        assert!(!table.column("time_created").unwrap().nullable);
    }

    #[rstest]
    fn test_names_are_verbatim_without_snake_case() {
        let declared = DeclaredType::new("TireOrder")
            .field(field("timeCreated", "Date", ""));
        let table = SchemaBuilder::build_table(&declared).unwrap();
        assert_eq!(table.name, "TireOrder");
        assert_eq!(table.columns[0].name, "timeCreated");
    }

    #[rstest]
    fn test_snake_case_applies_to_table_without_override() {
        let declared = DeclaredType::new("TireOrder")
            .annotated(r#"{ "toSnakeCase": true }"#)
            .field(field("timeCreated", "Date", ""));
        let table = SchemaBuilder::build_table(&declared).unwrap();
        assert_eq!(table.name, "tire_order");
    }

    #[rstest]
    fn test_fk_is_recorded_as_pending() {
        let declared = DeclaredType::new("Order")
            .field(field("userId", "number", r#"{ "fk": { "type": User, "property": "id" } }"#));
        let table = SchemaBuilder::build_table(&declared).unwrap();
        assert_eq!(table.columns[0].sql_type, SqlType::Number(NumberType::Integer));
        assert_eq!(table.columns[0].foreign_key, None);
        assert_eq!(
            table.pending,
            vec![PendingReference {
                column: "userId".to_string(),
                target_type: "User".to_string(),
                target_field: Some("id".to_string()),
            }]
        );
    }

    #[rstest]
    fn test_reference_typed_field_is_implicit_fk() {
        let declared = DeclaredType::new("Order").field(field("owner", "User", ""));
        let table = SchemaBuilder::build_table(&declared).unwrap();
        assert_eq!(table.columns[0].sql_type, SqlType::Inherited);
        assert_eq!(table.pending[0].target_field, None);
        assert!(!table.is_resolved());
    }

    #[rstest]
    fn test_number_type_and_serial() {
        let declared = DeclaredType::new("Event")
            .field(field("id", "number", r#"{ "primaryKey": true, "serial": true, "numberType": "bigint" }"#))
            .field(field("score", "number", r#"{ "numberType": "double precision", "default": 0.5 }"#));
        let table = SchemaBuilder::build_table(&declared).unwrap();
        assert_eq!(table.columns[0].sql_type, SqlType::Serial(NumberType::BigInt));
        assert_eq!(table.columns[1].sql_type, SqlType::Number(NumberType::DoublePrecision));
        assert_eq!(table.columns[1].default, Some(DefaultValue::Number("0.5".to_string())));
    }

    #[rstest]
    #[case("now", DefaultValue::CurrentTimestamp)]
    #[case("2024-01-02", DefaultValue::Timestamp("2024-01-02".to_string()))]
    #[case("2024-01-02 03:04:05", DefaultValue::Timestamp("2024-01-02 03:04:05".to_string()))]
    fn test_timestamp_defaults(#[case] literal: &str, #[case] expected: DefaultValue) {
        let declared = DeclaredType::new("Event")
            .field(field("at", "Date", &format!(r#"{{ "default": "{}" }}"#, literal)));
        let table = SchemaBuilder::build_table(&declared).unwrap();
        assert_eq!(table.columns[0].default, Some(expected));
    }

    #[rstest]
    #[case::max_length_on_number("number", r#"{ "maxLength": 10 }"#)]
    #[case::serial_on_string("string", r#"{ "serial": true }"#)]
    #[case::number_type_on_boolean("boolean", r#"{ "numberType": "bigint" }"#)]
    #[case::serial_on_real("number", r#"{ "serial": true, "numberType": "real" }"#)]
    #[case::string_default_on_boolean("boolean", r#"{ "default": "no" }"#)]
    #[case::float_default_on_integer("number", r#"{ "default": 1.5 }"#)]
    #[case::default_too_long("string", r#"{ "maxLength": 2, "default": "abc" }"#)]
    #[case::bad_timestamp("Date", r#"{ "default": "yesterday" }"#)]
    #[case::null_default_on_required("string", r#"{ "default": null }"#)]
    #[case::default_with_serial("number", r#"{ "serial": true, "default": 1 }"#)]
    #[case::malformed("string", r#"{ "unique": }"#)]
    fn test_annotation_errors(#[case] ty: &str, #[case] annotation: &str) {
        let declared = DeclaredType::new("Thing").field(field("value", ty, annotation));
        let err = SchemaBuilder::build_table(&declared).unwrap_err();
        assert_eq!(err.kind(), SchemaErrorKind::AnnotationParse, "{}", err);
        match err {
            SchemaError::AnnotationParse { type_name, field, .. } => {
                assert_eq!(type_name, "Thing");
                assert_eq!(field.as_deref(), Some("value"));
            }
            other => panic!("Expected AnnotationParse, got {:?}", other),
        }
    }

    #[rstest]
    fn test_duplicate_primary_key_is_build_error() {
        let declared = DeclaredType::new("User")
            .field(field("id", "number", r#"{ "primaryKey": true }"#))
            .field(field("uuid", "string", r#"{ "primaryKey": true }"#));
        let err = SchemaBuilder::build_table(&declared).unwrap_err();
        assert_eq!(err.kind(), SchemaErrorKind::SchemaBuild);
        assert!(err.to_string().contains("type 'User', field 'uuid'"), "{}", err);
    }

    #[rstest]
    fn test_duplicate_column_name_is_build_error() {
        let declared = DeclaredType::new("User")
            .field(field("name", "string", ""))
            .field(field("displayName", "string", r#"{ "columnName": "name" }"#));
        let err = SchemaBuilder::build_table(&declared).unwrap_err();
        assert_eq!(err.kind(), SchemaErrorKind::SchemaBuild);
    }

    #[rstest]
    fn test_optional_primary_key_is_build_error() {
        let declared = DeclaredType::new("User")
            .field(field("id", "number", r#"{ "primaryKey": true }"#).optional());
        let err = SchemaBuilder::build_table(&declared).unwrap_err();
        assert_eq!(err.kind(), SchemaErrorKind::SchemaBuild);
    }

    #[rstest]
    fn test_type_without_columns_is_build_error() {
        let declared = DeclaredType::new("Ghost").field(DeclaredField::new("id", SemanticType::Integer));
        let err = SchemaBuilder::build_table(&declared).unwrap_err();
        assert_eq!(err.kind(), SchemaErrorKind::SchemaBuild);
    }

    #[rstest]
    fn test_end_marker_closes_table() {
        let declared = DeclaredType::new("User")
            .field(field("id", "number", ""))
            .field(field("marker", "number", "end"))
            .field(field("after", "number", ""));
        let table = SchemaBuilder::build_table(&declared).unwrap();
        assert_eq!(table.columns.len(), 1);
    }

    #[rstest]
    fn test_end_marker_on_type_is_error() {
        let declared = DeclaredType::new("User").annotated("end").field(field("id", "number", ""));
        let err = SchemaBuilder::build_table(&declared).unwrap_err();
        assert_eq!(err.kind(), SchemaErrorKind::AnnotationParse);
    }
}
