//! Cache key generators for consistent key naming.
//!
//! Keys embed a canonical encoding of the lookup parameters rather than a
//! hash: object members are sorted by name and `null` members are dropped,
//! so two descriptors that differ only in member order (or in an explicit
//! `null` versus a missing field) produce the same key. Array order is
//! preserved.

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;

/// Canonical JSON text for any serializable descriptor.
pub fn canonical<T: Serialize + ?Sized>(descriptor: &T) -> Result<String> {
    let value = serde_json::to_value(descriptor)?;
    let mut out = String::new();
    write_canonical(&value, &mut out);
    Ok(out)
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut members: Vec<_> = map.iter().filter(|(_, v)| !v.is_null()).collect();
            members.sort_unstable_by(|a, b| a.0.cmp(b.0));

            out.push('{');
            for (i, (name, member)) in members.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(name.clone()).to_string());
                out.push(':');
                write_canonical(member, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

/// Key for a search over filter criteria.
pub fn search<T: Serialize + ?Sized>(filters: &T) -> Result<String> {
    Ok(format!("search:{}", canonical(filters)?))
}

/// Key for a template listing under the given filters.
pub fn templates<T: Serialize + ?Sized>(filters: &T) -> Result<String> {
    Ok(format!("templates:{}", canonical(filters)?))
}

/// Key for a user's favorites.
#[must_use]
pub fn favorites(user_id: &str) -> String {
    format!("favorites:{}", user_id)
}

/// Percent-escapes `%` and `:` so a segment can never contain the separator.
fn segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => out.push_str("%25"),
            ':' => out.push_str("%3A"),
            c => out.push(c),
        }
    }
    out
}

/// Key for a single entity by kind and id.
///
/// Both parts are escaped, so `("asset", "1:2")` and `("asset:1", "2")` get
/// different keys.
#[must_use]
pub fn entity(kind: &str, id: &str) -> String {
    format!("{}:{}", segment(kind), segment(id))
}

/// Pattern invalidating every cached entity of a kind.
#[must_use]
pub fn entity_pattern(kind: &str) -> String {
    format!("^{}:", regex::escape(&segment(kind)))
}

/// Key for an HTTP response, with query parameters in sorted order.
#[must_use]
pub fn response(method: &str, path: &str, query: Option<&str>) -> String {
    let mut params: Vec<&str> = query
        .unwrap_or_default()
        .split('&')
        .filter(|p| !p.is_empty())
        .collect();
    params.sort_unstable();

    if params.is_empty() {
        format!("response:{}:{}", method, path)
    } else {
        format!("response:{}:{}?{}", method, path, params.join("&"))
    }
}
