//! PostgreSQL DDL compiler.
//!
//! Generates `CREATE TABLE` statements from resolved, ordered table models.
//! Primary and foreign keys are rendered as named table-level constraints
//! following PostgreSQL's default naming (`<table>_pkey`,
//! `<table>_<column>_fkey`), including its truncation to 63 bytes.

use std::collections::HashSet;

use crate::schema::definition::{Column, Schema, Table};
use crate::schema::error::SchemaError;
use crate::schema::escape::quote_identifier;

/// PostgreSQL's identifier limit (`NAMEDATALEN - 1`).
const MAX_IDENTIFIER_LEN: usize = 63;

/// Compiler for generating PostgreSQL DDL from schema definitions.
pub struct PostgresCompiler;

impl PostgresCompiler {
    /// Generate the `CREATE TABLE` statement for a single table.
    ///
    /// Produces output in the format:
    /// ```sql
    /// CREATE TABLE orders (
    ///     id SERIAL NOT NULL,
    ///     user_id INTEGER NOT NULL,
    ///     time_cancelled TIMESTAMP,
    ///     CONSTRAINT orders_pkey PRIMARY KEY (id),
    ///     CONSTRAINT orders_user_id_fkey FOREIGN KEY (user_id) REFERENCES users(id)
    /// );
    /// ```
    pub fn compile_table(table: &Table) -> Result<String, SchemaError> {
        if !table.pending.is_empty() {
            return Err(SchemaError::internal(format!(
                "table '{}' has unresolved foreign keys",
                table.name
            )));
        }

        let mut clauses = table
            .columns
            .iter()
            .map(|c| Self::compile_column(table, c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut constraint_names = HashSet::new();

        if let Some(pk) = table.primary_key() {
            let name =
                Self::choose_constraint_name(&mut constraint_names, &table.name, None, "pkey");
            clauses.push(format!(
                "    CONSTRAINT {} PRIMARY KEY ({})",
                quote_identifier(&name),
                quote_identifier(&pk.name)
            ));
        }

        for (column, fk) in table.foreign_keys() {
            let name = Self::choose_constraint_name(
                &mut constraint_names,
                &table.name,
                Some(&column.name),
                "fkey",
            );
            clauses.push(format!(
                "    CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}({})",
                quote_identifier(&name),
                quote_identifier(&column.name),
                quote_identifier(&fk.table),
                quote_identifier(&fk.column)
            ));
        }

        Ok(format!(
            "CREATE TABLE {} (\n{}\n);",
            quote_identifier(&table.name),
            clauses.join(",\n")
        ))
    }

    /// Generate statements for every table in emission order.
    pub fn compile_schema(schema: &Schema) -> Result<Vec<String>, SchemaError> {
        if schema.order.len() != schema.tables.len() {
            return Err(SchemaError::internal(format!(
                "emission order covers {} of {} tables",
                schema.order.len(),
                schema.tables.len()
            )));
        }
        schema.ordered_tables().map(Self::compile_table).collect()
    }

    /// Pick a constraint name not yet used in this table, appending a
    /// counter to the label on collision (`fkey1`, `fkey2`, ...).
    fn choose_constraint_name(
        used: &mut HashSet<String>,
        name1: &str,
        name2: Option<&str>,
        label: &str,
    ) -> String {
        let mut candidate = object_name(name1, name2, label);
        let mut pass = 0;
        while !used.insert(candidate.clone()) {
            pass += 1;
            candidate = object_name(name1, name2, &format!("{label}{pass}"));
        }
        candidate
    }

    fn compile_column(table: &Table, column: &Column) -> Result<String, SchemaError> {
        let sql_type = column.sql_type.render().ok_or_else(|| {
            SchemaError::internal(format!(
                "column {}.{} has no concrete type",
                table.name, column.name
            ))
        })?;

        let mut clause = format!("    {} {}", quote_identifier(&column.name), sql_type);
        if !column.nullable || column.primary_key {
            clause.push_str(" NOT NULL");
        }
        if column.unique {
            clause.push_str(" UNIQUE");
        }
        if let Some(default) = &column.default {
            clause.push_str(" DEFAULT ");
            clause.push_str(&default.to_sql());
        }
        Ok(clause)
    }
}

/// Build `name1[_name2]_label` within the identifier limit, shortening the
/// longer of the two names first.
fn object_name(name1: &str, name2: Option<&str>, label: &str) -> String {
    let overhead = label.len() + 1 + usize::from(name2.is_some());
    let available = MAX_IDENTIFIER_LEN.saturating_sub(overhead);

    let mut len1 = name1.len();
    let mut len2 = name2.map_or(0, str::len);
    while len1 + len2 > available {
        if len1 > len2 {
            len1 -= 1;
        } else {
            len2 -= 1;
        }
    }

    let mut name = clip(name1, len1).to_string();
    if let Some(name2) = name2 {
        name.push('_');
        name.push_str(clip(name2, len2));
    }
    name.push('_');
    name.push_str(label);
    name
}

/// Longest prefix of `s` within `max` bytes that ends on a char boundary.
fn clip(s: &str, max: usize) -> &str {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
