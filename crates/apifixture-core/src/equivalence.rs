//! Structural JSON equivalence
//!
//! `expected` is the reference: every member it declares must be present and
//! equivalent in `actual`, extra members in `actual` are ignored. Arrays
//! compare element-wise and must have the same length. Numbers compare by
//! value (`1` is equivalent to `1.0`).

use serde_json::{Number, Value};

/// Differences reported past this count are summarized.
const MAX_DIFFERENCES: usize = 20;

/// Compare `actual` against `expected`.
///
/// # Errors
///
/// Returns one entry per difference, each prefixed with its JSON path.
pub fn json_equivalent(actual: &Value, expected: &Value) -> Result<(), Vec<String>> {
    let mut diffs = Vec::new();
    compare(actual, expected, "$", &mut diffs);
    if diffs.is_empty() {
        return Ok(());
    }
    if diffs.len() > MAX_DIFFERENCES {
        let extra = diffs.len() - MAX_DIFFERENCES;
        diffs.truncate(MAX_DIFFERENCES);
        diffs.push(format!("... and {extra} more differences"));
    }
    Err(diffs)
}

fn compare(actual: &Value, expected: &Value, path: &str, diffs: &mut Vec<String>) {
    match (actual, expected) {
        (Value::Object(a), Value::Object(e)) => {
            for (key, e_val) in e {
                let child = format!("{path}.{key}");
                match a.get(key) {
                    Some(a_val) => compare(a_val, e_val, &child, diffs),
                    None => diffs.push(format!("{child}: missing, expected {}", short(e_val))),
                }
            }
        }
        (Value::Array(a), Value::Array(e)) => {
            if a.len() != e.len() {
                diffs.push(format!("{path}: expected {} items, found {}", e.len(), a.len()));
                return;
            }
            for (i, (a_val, e_val)) in a.iter().zip(e).enumerate() {
                compare(a_val, e_val, &format!("{path}[{i}]"), diffs);
            }
        }
        (Value::Number(a), Value::Number(e)) => {
            if !same_number(a, e) {
                diffs.push(format!("{path}: expected {e}, found {a}"));
            }
        }
        _ if actual == expected => {}
        _ => diffs.push(format!(
            "{path}: expected {}, found {}",
            short(expected),
            short(actual)
        )),
    }
}

/// Integers compare exactly in `i64` or `u64`; anything else by `f64` value.
fn same_number(a: &Number, e: &Number) -> bool {
    if let (Some(x), Some(y)) = (a.as_i64(), e.as_i64()) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.as_u64(), e.as_u64()) {
        return x == y;
    }
    a.as_f64() == e.as_f64()
}

fn short(value: &Value) -> String {
    let s = value.to_string();
    if s.chars().count() > 80 {
        let cut: String = s.chars().take(77).collect();
        format!("{cut}...")
    } else {
        s
    }
}
