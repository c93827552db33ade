//! Identifier and literal quoting for PostgreSQL DDL.

/// Reserved keywords, including those only allowed as function or type names,
/// which cannot appear as bare identifiers in a column or table position.
const RESERVED_WORDS: &[&str] = &[
    "all", "analyse", "analyze", "and", "any", "array", "as", "asc", "asymmetric",
    "authorization", "binary", "both", "case", "cast", "check", "collate", "collation",
    "column", "concurrently", "constraint", "create", "cross", "current_catalog",
    "current_date", "current_role", "current_schema", "current_time", "current_timestamp",
    "current_user", "default", "deferrable", "desc", "distinct", "do", "else", "end", "except",
    "false", "fetch", "for", "foreign", "freeze", "from", "full", "grant", "group", "having",
    "ilike", "in", "initially", "inner", "intersect", "into", "is", "isnull", "join", "lateral",
    "leading", "left", "like", "limit", "localtime", "localtimestamp", "natural", "not",
    "notnull", "null", "offset", "on", "only", "or", "order", "outer", "overlaps", "placing",
    "primary", "references", "returning", "right", "select", "session_user", "similar", "some",
    "symmetric", "table", "tablesample", "then", "to", "trailing", "true", "union", "unique",
    "user", "using", "variadic", "verbose", "when", "where", "window", "with",
];

fn is_bare_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_');
    starts_ok
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !RESERVED_WORDS.contains(&name)
}

/// Quote an identifier unless it can be written bare.
///
/// Bare identifiers are folded to lowercase by PostgreSQL, so anything with
/// uppercase letters (e.g. `timeCreated`) is quoted to keep the declared name.
pub fn quote_identifier(name: &str) -> String {
    if is_bare_identifier(name) {
        return name.to_string();
    }
    let mut result = String::with_capacity(name.len() + 2);
    result.push('"');
    for c in name.chars() {
        if c == '"' {
            result.push('"');
        }
        result.push(c);
    }
    result.push('"');
    result
}

/// Render a string as a single-quoted SQL literal.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("users", "users")]
    #[case("time_created", "time_created")]
    #[case("_private1", "_private1")]
    #[case("timeCreated", "\"timeCreated\"")]
    #[case("order", "\"order\"")]
    #[case("user", "\"user\"")]
    #[case("left", "\"left\"")]
    #[case("right", "\"right\"")]
    #[case("join", "\"join\"")]
    #[case("inner", "\"inner\"")]
    #[case("like", "\"like\"")]
    #[case("is", "\"is\"")]
    #[case("full", "\"full\"")]
    #[case("natural", "\"natural\"")]
    #[case("authorization", "\"authorization\"")]
    #[case("verbose", "\"verbose\"")]
    #[case("1st", "\"1st\"")]
    #[case("odd\"name", "\"odd\"\"name\"")]
    fn test_quote_identifier(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(quote_identifier(input), expected);
    }

    #[rstest]
    fn test_quote_literal_basic() {
        assert_eq!(quote_literal("hello"), "'hello'");
    }

    #[rstest]
    fn test_quote_literal_doubles_quotes() {
        assert_eq!(quote_literal("it's"), "'it''s'");
    }
}
