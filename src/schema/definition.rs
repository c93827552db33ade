//! Core schema definition types.
//!
//! `DeclaredType` and `DeclaredField` describe the input handed over by the
//! type source. `Table`, `Column` and `Schema` are the normalized model the
//! builder, resolver and orderer produce.

use serde::{Deserialize, Serialize};

use crate::schema::escape::quote_literal;

/// Semantic type of a declared field.
///
/// Built from the source type name: `number`/`bigint`, `string`, `boolean`
/// and `Date` are the primitive kinds; any other name is a reference to
/// another declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SemanticType {
    Integer,
    String,
    Boolean,
    Date,
    Reference(String),
}

impl SemanticType {
    pub fn from_source_name(name: &str) -> Self {
        match name {
            "number" | "bigint" => SemanticType::Integer,
            "string" => SemanticType::String,
            "boolean" => SemanticType::Boolean,
            "Date" => SemanticType::Date,
            other => SemanticType::Reference(other.to_string()),
        }
    }

    pub fn source_name(&self) -> &str {
        match self {
            SemanticType::Integer => "number",
            SemanticType::String => "string",
            SemanticType::Boolean => "boolean",
            SemanticType::Date => "Date",
            SemanticType::Reference(name) => name,
        }
    }
}

impl From<String> for SemanticType {
    fn from(name: String) -> Self {
        SemanticType::from_source_name(&name)
    }
}

impl From<SemanticType> for String {
    fn from(value: SemanticType) -> Self {
        value.source_name().to_string()
    }
}

/// A field of a declared type.
///
/// `annotation: None` means the field is not a column. `Some("")` is the
/// empty marker: a column with default typing and no constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredField {
    pub name: String,
    #[serde(rename = "type")]
    pub semantic_type: SemanticType,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub annotation: Option<String>,
}

impl DeclaredField {
    pub fn new(name: &str, semantic_type: SemanticType) -> Self {
        Self {
            name: name.to_string(),
            semantic_type,
            optional: false,
            annotation: None,
        }
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn annotated(mut self, annotation: &str) -> Self {
        self.annotation = Some(annotation.to_string());
        self
    }
}

/// A declared type with its ordered fields and raw type-level annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredType {
    pub name: String,
    #[serde(default)]
    pub annotation: Option<String>,
    pub fields: Vec<DeclaredField>,
}

impl DeclaredType {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            annotation: None,
            fields: Vec::new(),
        }
    }

    pub fn annotated(mut self, annotation: &str) -> Self {
        self.annotation = Some(annotation.to_string());
        self
    }

    pub fn field(mut self, field: DeclaredField) -> Self {
        self.fields.push(field);
        self
    }
}

/// Numeric column type, selectable with the `numberType` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberType {
    SmallInt,
    Integer,
    BigInt,
    Real,
    DoublePrecision,
    Numeric,
}

impl NumberType {
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.as_str() {
            "smallint" | "int2" => Some(NumberType::SmallInt),
            "integer" | "int" | "int4" => Some(NumberType::Integer),
            "bigint" | "int8" => Some(NumberType::BigInt),
            "real" | "float4" => Some(NumberType::Real),
            "double precision" | "float8" => Some(NumberType::DoublePrecision),
            "numeric" | "decimal" => Some(NumberType::Numeric),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, NumberType::SmallInt | NumberType::Integer | NumberType::BigInt)
    }

    fn sql_name(&self) -> &'static str {
        match self {
            NumberType::SmallInt => "SMALLINT",
            NumberType::Integer => "INTEGER",
            NumberType::BigInt => "BIGINT",
            NumberType::Real => "REAL",
            NumberType::DoublePrecision => "DOUBLE PRECISION",
            NumberType::Numeric => "NUMERIC",
        }
    }

    fn serial_name(&self) -> Option<&'static str> {
        match self {
            NumberType::SmallInt => Some("SMALLSERIAL"),
            NumberType::Integer => Some("SERIAL"),
            NumberType::BigInt => Some("BIGSERIAL"),
            _ => None,
        }
    }
}

/// SQL column type.
///
/// `Inherited` marks a reference-typed field whose type is taken from the
/// referenced column during resolution; it never reaches the emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Number(NumberType),
    Serial(NumberType),
    Varchar(u32),
    Text,
    Boolean,
    Timestamp,
    Inherited,
}

impl SqlType {
    /// Render the type as written in DDL, or `None` for `Inherited`.
    pub fn render(&self) -> Option<String> {
        match self {
            SqlType::Number(number) => Some(number.sql_name().to_string()),
            SqlType::Serial(number) => number.serial_name().map(str::to_string),
            SqlType::Varchar(length) => Some(format!("VARCHAR({})", length)),
            SqlType::Text => Some("TEXT".to_string()),
            SqlType::Boolean => Some("BOOLEAN".to_string()),
            SqlType::Timestamp => Some("TIMESTAMP".to_string()),
            SqlType::Inherited => None,
        }
    }

    /// The type a referencing column takes: serial kinds become plain integers.
    pub fn referencing_type(&self) -> SqlType {
        match self {
            SqlType::Serial(number) => SqlType::Number(*number),
            other => *other,
        }
    }

    pub fn is_serial(&self) -> bool {
        matches!(self, SqlType::Serial(_))
    }
}

/// Coerced default value of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultValue {
    /// Numeric literal, kept as written.
    Number(String),
    Text(String),
    Boolean(bool),
    Timestamp(String),
    CurrentTimestamp,
    Null,
}

impl DefaultValue {
    pub fn to_sql(&self) -> String {
        match self {
            DefaultValue::Number(literal) => literal.clone(),
            DefaultValue::Text(text) | DefaultValue::Timestamp(text) => quote_literal(text),
            DefaultValue::Boolean(true) => "TRUE".to_string(),
            DefaultValue::Boolean(false) => "FALSE".to_string(),
            DefaultValue::CurrentTimestamp => "CURRENT_TIMESTAMP".to_string(),
            DefaultValue::Null => "NULL".to_string(),
        }
    }
}

/// Resolved foreign-key edge, by emitted names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

/// Foreign key recorded by the builder and not yet resolved.
///
/// Targets are named by declared type and declared field. `target_field: None`
/// means "the target type's primary key" (implicit reference-typed fields).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReference {
    pub column: String,
    pub target_type: String,
    pub target_field: Option<String>,
}

impl PendingReference {
    pub fn target_label(&self) -> String {
        match &self.target_field {
            Some(field) => format!("{}.{}", self.target_type, field),
            None => format!("{} (primary key)", self.target_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Emitted column name
    pub name: String,

    /// Name of the declared field this column came from
    pub field_name: String,

    pub sql_type: SqlType,
    pub nullable: bool,
    pub primary_key: bool,
    pub unique: bool,
    pub default: Option<DefaultValue>,
    pub foreign_key: Option<ForeignKey>,
}

impl Column {
    pub fn is_serial(&self) -> bool {
        self.sql_type.is_serial()
    }
}

/// A table built from one declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Name of the declared type this table came from
    pub type_name: String,

    /// Emitted table name
    pub name: String,

    /// Columns in field declaration order
    pub columns: Vec<Column>,

    /// Declared fields that carry no annotation and so are not columns
    pub excluded_fields: Vec<String>,

    /// Foreign keys awaiting resolution; empty once resolved
    pub pending: Vec<PendingReference>,
}

impl Table {
    pub fn primary_key(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.primary_key)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_for_field(&self, field_name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.field_name == field_name)
    }

    /// Foreign-key edges of this table, in column order.
    pub fn foreign_keys(&self) -> impl Iterator<Item = (&Column, &ForeignKey)> {
        self.columns
            .iter()
            .filter_map(|c| c.foreign_key.as_ref().map(|fk| (c, fk)))
    }

    pub fn is_resolved(&self) -> bool {
        self.pending.is_empty() && self.columns.iter().all(|c| c.sql_type != SqlType::Inherited)
    }
}

/// Resolved tables in declaration order plus their emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub tables: Vec<Table>,

    /// Indices into `tables`, referenced tables first
    pub order: Vec<usize>,
}

impl Schema {
    pub fn ordered_tables(&self) -> impl Iterator<Item = &Table> {
        self.order.iter().filter_map(|&i| self.tables.get(i))
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }
}
