//! Scanner for annotated TypeScript type declarations.
//!
//! Extracts declared types from source text of the form:
//!
//! ```text
//! /* ts2psql { "tableName": "users", "toSnakeCase": true } */
//! export type User = {
//!   /* ts2psql { "primaryKey": true, "serial": true } */
//!   id: number
//!   /* ts2psql */
//!   timeDeleted?: Date
//!   notAColumn: string
//! }
//! /* ts2psql end */
//! ```
//!
//! Only marked types are extracted. Annotation text is passed through
//! unparsed; the schema builder reports any syntax error in it.

use std::sync::LazyLock;

use log::{debug, warn};
use regex::{Captures, Regex};

use crate::schema::{DeclaredField, DeclaredType, SemanticType};

const IDENT: &str = r"[A-Za-z_$][A-Za-z0-9_$]*";

static TYPE_START: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"/\*\s*ts2psql\b(?P<annotation>(?:[^*]|\*+[^*/])*)\*+/\s*(?:export\s+)?(?:type\s+(?P<type_name>{IDENT})\s*=|interface\s+(?P<interface_name>{IDENT}))\s*\{{"
    ))
    .expect("valid regex")
});

static TYPE_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\*\s*ts2psql\s+end\s*\*+/").expect("valid regex"));

// A field's type ends at a terminator, the end of the line or a trailing comment.
static BODY_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?s)(?P<marker>/\*\s*ts2psql\b(?P<annotation>(?:[^*]|\*+[^*/])*)\*+/)|(?P<comment>/\*.*?\*/|//[^\n]*)|(?P<field>(?:readonly\s+)?(?P<name>{IDENT})(?P<optional>\?)?\s*:\s*(?P<type>(?:[^;,\n}}/]|/[^/*\n])+))"
    ))
    .expect("valid regex")
});

/// Extract every marked type declaration from `source`, in source order.
pub fn scan_declared_types(source: &str) -> Vec<DeclaredType> {
    let mut declared = Vec::new();
    let mut pos = 0;

    while let Some(start) = TYPE_START.captures_at(source, pos) {
        let whole = start.get(0).map_or(pos..pos, |m| m.range());
        let name = start
            .name("type_name")
            .or_else(|| start.name("interface_name"))
            .map_or("", |m| m.as_str());

        let body_start = whole.end;
        let end_marker = TYPE_END.find_at(source, body_start);
        let next_start = TYPE_START.find_at(source, body_start);
        let (body_end, resume) = match (end_marker, next_start) {
            (Some(end), Some(next)) if next.start() < end.start() => {
                warn!("Type '{}' has no end marker before the next marked type", name);
                (next.start(), next.start())
            }
            (Some(end), _) => (end.start(), end.end()),
            (None, Some(next)) => {
                warn!("Type '{}' has no end marker before the next marked type", name);
                (next.start(), next.start())
            }
            (None, None) => {
                warn!("Type '{}' has no end marker", name);
                (source.len(), source.len())
            }
        };

        let mut declared_type = DeclaredType::new(name);
        declared_type.annotation = Some(marker_text(&start));
        declared_type.fields = scan_fields(name, &source[body_start..body_end]);
        debug!("Scanned type {} ({} fields)", name, declared_type.fields.len());
        declared.push(declared_type);

        pos = resume;
    }

    declared
}

fn marker_text(captures: &Captures) -> String {
    captures
        .name("annotation")
        .map_or("", |m| m.as_str())
        .trim()
        .to_string()
}

fn scan_fields(type_name: &str, body: &str) -> Vec<DeclaredField> {
    let mut fields = Vec::new();
    let mut pending_annotation: Option<String> = None;

    for item in BODY_ITEM.captures_iter(body) {
        if item.name("marker").is_some() {
            if pending_annotation.is_some() {
                warn!("{}: marker without a following field is ignored", type_name);
            }
            pending_annotation = Some(marker_text(&item));
        } else if let (Some(name), Some(ty)) = (item.name("name"), item.name("type")) {
            let (semantic_type, nullable) = parse_field_type(ty.as_str());
            fields.push(DeclaredField {
                name: name.as_str().to_string(),
                semantic_type,
                optional: item.name("optional").is_some() || nullable,
                annotation: pending_annotation.take(),
            });
        }
    }

    if pending_annotation.is_some() {
        warn!("{}: trailing marker without a field is ignored", type_name);
    }
    fields
}

/// Parse a field type expression, returning the semantic type and whether
/// the union admits `null`/`undefined`.
fn parse_field_type(expression: &str) -> (SemanticType, bool) {
    let mut nullable = false;
    let parts: Vec<&str> = expression
        .split('|')
        .map(str::trim)
        .filter(|part| {
            let is_null = matches!(*part, "null" | "undefined");
            nullable |= is_null;
            !is_null && !part.is_empty()
        })
        .collect();

    let semantic_type = match parts.as_slice() {
        [single] => SemanticType::from_source_name(single),
        many if !many.is_empty() && many.iter().all(|p| is_string_literal(p)) => SemanticType::String,
        many if !many.is_empty() && many.iter().all(|p| p.parse::<f64>().is_ok()) => SemanticType::Integer,
        _ => SemanticType::Reference(expression.trim().to_string()),
    };
    (semantic_type, nullable)
}

fn is_string_literal(part: &str) -> bool {
    part.len() >= 2
        && ((part.starts_with('"') && part.ends_with('"'))
            || (part.starts_with('\'') && part.ends_with('\'')))
}
