//! Naming conventions for emitted tables and columns.

use std::sync::LazyLock;

use regex::Regex;

static FIRST_CAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(.)([A-Z][a-z]+)").expect("valid regex"));
static ALL_CAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("valid regex"));

/// Convert a camel/Pascal case name to snake_case.
///
/// - `timeCreated` -> `time_created`
/// - `TireOrders` -> `tire_orders`
/// - `HTTPServer` -> `http_server`
pub fn to_snake_case(name: &str) -> String {
    let snake = FIRST_CAP.replace_all(name, "${1}_${2}");
    let snake = ALL_CAP.replace_all(&snake, "${1}_${2}");
    snake.to_lowercase()
}
