//! Annotation parsing.
//!
//! An annotation is the option text attached to a type or field. Syntax is a
//! JSON-like object that additionally accepts bare identifiers as keys and
//! values (so `{ "fk": { "type": User, "property": "id" } }` is valid) and
//! trailing commas:
//!
//! ```text
//! annotation := "" | "end" | object
//! object     := "{" (key ":" value ("," key ":" value)* ","?)? "}"
//! key        := string | ident
//! value      := string | number | "true" | "false" | "null" | ident | object
//! ```

use log::warn;

use crate::schema::definition::NumberType;
use crate::schema::error::AnnotationError;

/// A parsed annotation value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    /// Numeric literal as written
    Number(String),
    Bool(bool),
    Null,
    /// Bare identifier, e.g. a type reference
    Ident(String),
    Object(Vec<(String, Value)>),
}

impl Value {
    fn describe(&self) -> &'static str {
        match self {
            Value::String(_) => "a string",
            Value::Number(_) => "a number",
            Value::Bool(_) => "a boolean",
            Value::Null => "null",
            Value::Ident(_) => "an identifier",
            Value::Object(_) => "an object",
        }
    }
}

/// Result of parsing one raw annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Annotation {
    /// Marker with no options
    Empty,
    /// Table terminator marker
    End,
    Options(Vec<(String, Value)>),
}

/// Parse a raw annotation string.
pub fn parse_annotation(raw: &str) -> Result<Annotation, AnnotationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Annotation::Empty);
    }
    if trimmed == "end" {
        return Ok(Annotation::End);
    }

    let mut parser = Parser::new(raw);
    parser.skip_whitespace();
    let entries = parser.object()?;
    parser.skip_whitespace();
    if let Some(c) = parser.peek() {
        return Err(AnnotationError::at(
            parser.pos,
            format!("unexpected '{}' after annotation object", c),
        ));
    }
    Ok(Annotation::Options(entries))
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), AnnotationError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(AnnotationError::at(
                self.pos,
                format!("expected '{}', found '{}'", expected, c),
            )),
            None => Err(AnnotationError::at(
                self.pos,
                format!("expected '{}', found end of annotation", expected),
            )),
        }
    }

    fn object(&mut self) -> Result<Vec<(String, Value)>, AnnotationError> {
        self.expect('{')?;
        let mut entries: Vec<(String, Value)> = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(entries);
            }

            let key_pos = self.pos;
            let key = match self.peek() {
                Some('"') => self.string()?,
                Some(c) if is_ident_start(c) => self.ident(),
                Some(c) => {
                    return Err(AnnotationError::at(self.pos, format!("expected a key, found '{}'", c)));
                }
                None => {
                    return Err(AnnotationError::at(self.pos, "unterminated object"));
                }
            };
            if entries.iter().any(|(existing, _)| *existing == key) {
                return Err(AnnotationError::at(key_pos, format!("duplicate key '{}'", key)));
            }

            self.skip_whitespace();
            self.expect(':')?;
            self.skip_whitespace();
            let value = self.value()?;
            entries.push((key, value));

            self.skip_whitespace();
            match self.peek() {
                Some(',') => {
                    self.bump();
                }
                Some('}') => {}
                Some(c) => {
                    return Err(AnnotationError::at(
                        self.pos,
                        format!("expected ',' or '}}', found '{}'", c),
                    ));
                }
                None => return Err(AnnotationError::at(self.pos, "unterminated object")),
            }
        }
    }

    fn value(&mut self) -> Result<Value, AnnotationError> {
        match self.peek() {
            Some('{') => Ok(Value::Object(self.object()?)),
            Some('"') => Ok(Value::String(self.string()?)),
            Some(c) if c == '-' || c.is_ascii_digit() => self.number(),
            Some(c) if is_ident_start(c) => Ok(match self.ident().as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "null" => Value::Null,
                other => Value::Ident(other.to_string()),
            }),
            Some(c) => Err(AnnotationError::at(self.pos, format!("expected a value, found '{}'", c))),
            None => Err(AnnotationError::at(self.pos, "expected a value, found end of annotation")),
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if is_ident_continue(c)) {
            self.bump();
        }
        self.text[start..self.pos].to_string()
    }

    fn digits(&mut self) -> usize {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
        }
        self.pos - start
    }

    fn number(&mut self) -> Result<Value, AnnotationError> {
        let start = self.pos;
        if self.peek() == Some('-') {
            self.bump();
        }
        if self.digits() == 0 {
            return Err(AnnotationError::at(self.pos, "expected digits"));
        }
        if self.peek() == Some('.') {
            self.bump();
            if self.digits() == 0 {
                return Err(AnnotationError::at(self.pos, "expected digits after '.'"));
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            if self.digits() == 0 {
                return Err(AnnotationError::at(self.pos, "expected digits in exponent"));
            }
        }
        Ok(Value::Number(self.text[start..self.pos].to_string()))
    }

    fn string(&mut self) -> Result<String, AnnotationError> {
        let start = self.pos;
        self.expect('"')?;
        let mut result = String::new();
        loop {
            let escape_pos = self.pos;
            match self.bump() {
                Some('"') => return Ok(result),
                Some('\\') => match self.bump() {
                    Some('"') => result.push('"'),
                    Some('\\') => result.push('\\'),
                    Some('/') => result.push('/'),
                    Some('b') => result.push('\u{8}'),
                    Some('f') => result.push('\u{c}'),
                    Some('n') => result.push('\n'),
                    Some('r') => result.push('\r'),
                    Some('t') => result.push('\t'),
                    Some('u') => result.push(self.unicode_escape(escape_pos)?),
                    _ => return Err(AnnotationError::at(escape_pos, "invalid escape sequence")),
                },
                Some(c) => result.push(c),
                None => return Err(AnnotationError::at(start, "unterminated string")),
            }
        }
    }

    fn unicode_escape(&mut self, escape_pos: usize) -> Result<char, AnnotationError> {
        let hex = self.text.get(self.pos..self.pos + 4).unwrap_or("");
        let code = u32::from_str_radix(hex, 16)
            .ok()
            .and_then(char::from_u32)
            .ok_or_else(|| AnnotationError::at(escape_pos, "invalid unicode escape"))?;
        self.pos += 4;
        Ok(code)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Target of an `fk` option, by declared type and field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FkOption {
    pub type_name: String,
    pub property: String,
}

/// Field-level options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnOptions {
    pub column_name: Option<String>,
    pub primary_key: bool,
    pub serial: bool,
    pub unique: bool,
    /// Raw default value; coerced against the column type by the builder
    pub default: Option<Value>,
    pub max_length: Option<u32>,
    pub number_type: Option<NumberType>,
    pub fk: Option<FkOption>,
}

const TABLE_KEYS: &[&str] = &["tableName", "toSnakeCase"];
const COLUMN_KEYS: &[&str] = &[
    "columnName",
    "primaryKey",
    "serial",
    "unique",
    "default",
    "maxLength",
    "numberType",
    "fk",
];

impl ColumnOptions {
    pub fn from_entries(entries: &[(String, Value)]) -> Result<Self, AnnotationError> {
        let mut options = ColumnOptions::default();
        for (key, value) in entries {
            match key.as_str() {
                "columnName" => options.column_name = Some(expect_name(key, value)?),
                "primaryKey" => options.primary_key = expect_bool(key, value)?,
                "serial" => options.serial = expect_bool(key, value)?,
                "unique" => options.unique = expect_bool(key, value)?,
                "default" => options.default = Some(value.clone()),
                "maxLength" => options.max_length = Some(expect_length(key, value)?),
                "numberType" => {
                    let name = expect_name(key, value)?;
                    let number_type = NumberType::parse(&name).ok_or_else(|| {
                        AnnotationError::invalid(format!("unknown numberType '{}'", name))
                    })?;
                    options.number_type = Some(number_type);
                }
                "fk" => options.fk = Some(expect_fk(value)?),
                other if TABLE_KEYS.contains(&other) => {
                    warn!("Ignoring type-level option '{}' on a field annotation", other)
                }
                other => warn!("Ignoring unknown annotation option '{}'", other),
            }
        }
        Ok(options)
    }
}

/// Type-level options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    pub table_name: Option<String>,
    pub to_snake_case: bool,
}

impl TableOptions {
    pub fn from_entries(entries: &[(String, Value)]) -> Result<Self, AnnotationError> {
        let mut options = TableOptions::default();
        for (key, value) in entries {
            match key.as_str() {
                "tableName" => options.table_name = Some(expect_name(key, value)?),
                "toSnakeCase" => options.to_snake_case = expect_bool(key, value)?,
                other if COLUMN_KEYS.contains(&other) => {
                    warn!("Ignoring field-level option '{}' on a type annotation", other)
                }
                other => warn!("Ignoring unknown annotation option '{}'", other),
            }
        }
        Ok(options)
    }
}

fn wrong_type(key: &str, expected: &str, value: &Value) -> AnnotationError {
    AnnotationError::invalid(format!("'{}' must be {}, got {}", key, expected, value.describe()))
}

fn expect_bool(key: &str, value: &Value) -> Result<bool, AnnotationError> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(wrong_type(key, "a boolean", other)),
    }
}

fn expect_name(key: &str, value: &Value) -> Result<String, AnnotationError> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Ok(s.clone()),
        Value::String(_) => Err(AnnotationError::invalid(format!("'{}' must not be empty", key))),
        other => Err(wrong_type(key, "a string", other)),
    }
}

fn expect_length(key: &str, value: &Value) -> Result<u32, AnnotationError> {
    match value {
        Value::Number(n) => n
            .parse::<u32>()
            .ok()
            .filter(|&len| len > 0)
            .ok_or_else(|| AnnotationError::invalid(format!("'{}' must be a positive integer, got {}", key, n))),
        other => Err(wrong_type(key, "a positive integer", other)),
    }
}

fn expect_fk(value: &Value) -> Result<FkOption, AnnotationError> {
    let Value::Object(entries) = value else {
        return Err(wrong_type("fk", "an object", value));
    };
    let mut type_name = None;
    let mut property = None;
    for (key, value) in entries {
        match (key.as_str(), value) {
            ("type", Value::Ident(name) | Value::String(name)) => type_name = Some(name.clone()),
            ("type", other) => return Err(wrong_type("fk.type", "a type name", other)),
            ("property", Value::String(name) | Value::Ident(name)) => property = Some(name.clone()),
            ("property", other) => return Err(wrong_type("fk.property", "a field name", other)),
            (other, _) => warn!("Ignoring unknown fk option '{}'", other),
        }
    }
    match (type_name, property) {
        (Some(type_name), Some(property)) => Ok(FkOption { type_name, property }),
        (None, _) => Err(AnnotationError::invalid("'fk' is missing 'type'")),
        (_, None) => Err(AnnotationError::invalid("'fk' is missing 'property'")),
    }
}
