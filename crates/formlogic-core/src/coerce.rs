//! JavaScript-compatible coercions over `serde_json::Value`.
//!
//! Form inputs arrive as text, so rules written against numbers and booleans
//! only work if comparisons coerce the way a browser-side logic engine does:
//! `"20" == 20`, `"" == false`, `null == null` but `null != 0`.

use serde_json::{Number, Value};
use std::cmp::Ordering;

/// Truthiness used by `and`, `or` and rule results.
///
/// Matches the logic-engine flavour of JavaScript truthiness: an empty array
/// is falsy, an empty object is not.
pub fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(_) => true,
    }
}

/// Plain JavaScript truthiness (`!!v`), used where a rule's final result
/// becomes a yes/no answer. Unlike [`truthy`], every array is true.
pub fn js_truthy(v: &Value) -> bool {
    match v {
        Value::Array(_) => true,
        other => truthy(other),
    }
}

/// Decimal form of a number as JavaScript's `String(n)` prints it.
pub fn number_string(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    n.as_f64().map(format_f64).unwrap_or_default()
}

pub(crate) fn format_f64(f: f64) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }
    if f.abs() >= 1e21 {
        let s = format!("{f:e}");
        return match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => s,
        };
    }
    if f.fract() == 0.0 {
        format!("{f:.0}")
    } else {
        f.to_string()
    }
}

/// String form of a value (`String(v)` in JavaScript).
pub fn to_js_string(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_string(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => to_js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Parse a JavaScript numeric literal: decimal with optional exponent,
/// `Infinity`, or `0x`/`0o`/`0b` integers. Surrounding whitespace is ignored;
/// blank input is not a number here.
pub fn parse_number_literal(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    match t {
        "Infinity" | "+Infinity" => return Some(f64::INFINITY),
        "-Infinity" => return Some(f64::NEG_INFINITY),
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)] {
        if let Some(digits) = t.strip_prefix(prefix) {
            return u64::from_str_radix(digits, radix).ok().map(|n| n as f64);
        }
    }
    let allowed = t
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'));
    if !allowed || !t.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    t.parse::<f64>().ok()
}

/// `ToNumber` coercion. Returns NaN when the value has no numeric reading.
pub fn to_number(v: &Value) -> f64 {
    match v {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => {
            if s.trim().is_empty() {
                0.0
            } else {
                parse_number_literal(s).unwrap_or(f64::NAN)
            }
        }
        Value::Array(_) => to_number(&Value::String(to_js_string(v))),
        Value::Object(_) => f64::NAN,
    }
}

fn bool_as_number(b: bool) -> Value {
    Value::from(if b { 1 } else { 0 })
}

/// Loose (`==`) equality.
///
/// Arrays and objects compare by identity in JavaScript; values pulled out of
/// a record are never the same object, so two containers are never equal.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(_) | Value::Object(_), Value::Array(_) | Value::Object(_)) => false,
        (Value::Bool(x), other) => loose_eq(&bool_as_number(*x), other),
        (other, Value::Bool(y)) => loose_eq(other, &bool_as_number(*y)),
        (Value::Number(_), Value::String(_)) | (Value::String(_), Value::Number(_)) => {
            to_number(a) == to_number(b)
        }
        (Value::Array(_) | Value::Object(_), prim) => {
            loose_eq(&Value::String(to_js_string(a)), prim)
        }
        (prim, Value::Array(_) | Value::Object(_)) => {
            loose_eq(prim, &Value::String(to_js_string(b)))
        }
    }
}

/// Ordering used by `<`, `<=`, `>` and `>=`.
///
/// Numeric when both sides coerce to a number, otherwise the string forms
/// are compared by UTF-16 code unit.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    let (x, y) = (to_number(a), to_number(b));
    if !x.is_nan() && !y.is_nan() {
        return x.partial_cmp(&y);
    }
    let (left, right) = (to_js_string(a), to_js_string(b));
    Some(left.encode_utf16().cmp(right.encode_utf16()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthiness_follows_logic_engine_rules() {
        assert!(!truthy(&json!([])));
        assert!(truthy(&json!({})));
        assert!(truthy(&json!("0")));
        assert!(!truthy(&json!(0)));
        assert!(!truthy(&json!("")));
        assert!(!truthy(&Value::Null));
    }

    #[test]
    fn plain_truthiness_treats_every_array_as_true() {
        assert!(js_truthy(&json!([])));
        assert!(js_truthy(&json!([0])));
        assert!(js_truthy(&json!({})));
        assert!(!js_truthy(&json!(0)));
        assert!(!js_truthy(&json!("")));
        assert!(!js_truthy(&json!(false)));
        assert!(!js_truthy(&Value::Null));
    }

    #[test]
    fn loose_equality_coerces_form_input() {
        assert!(loose_eq(&json!("20"), &json!(20)));
        assert!(loose_eq(&json!(""), &json!(false)));
        assert!(loose_eq(&json!("1"), &json!(true)));
        assert!(loose_eq(&json!(0), &json!(false)));
        assert!(loose_eq(&Value::Null, &Value::Null));
        assert!(!loose_eq(&Value::Null, &json!(0)));
        assert!(!loose_eq(&Value::Null, &json!("")));
        assert!(!loose_eq(&json!("abc"), &json!(0)));
        assert!(loose_eq(&json!([1, 2]), &json!("1,2")));
        assert!(!loose_eq(&json!([1]), &json!([1])));
    }

    #[test]
    fn numeric_literals_follow_javascript_grammar() {
        assert_eq!(parse_number_literal(" 12 "), Some(12.0));
        assert_eq!(parse_number_literal("1e3"), Some(1000.0));
        assert_eq!(parse_number_literal("0x10"), Some(16.0));
        assert_eq!(parse_number_literal(".5"), Some(0.5));
        assert_eq!(parse_number_literal("   "), None);
        assert_eq!(parse_number_literal("inf"), None);
        assert_eq!(parse_number_literal("nan"), None);
        assert_eq!(parse_number_literal("12a"), None);
    }

    #[test]
    fn string_forms_match_javascript() {
        assert_eq!(to_js_string(&json!(18.0)), "18");
        assert_eq!(to_js_string(&json!(1.5)), "1.5");
        assert_eq!(to_js_string(&json!([1, null, "a"])), "1,,a");
        assert_eq!(to_js_string(&json!({"a": 1})), "[object Object]");
        assert_eq!(format_f64(1e21), "1e+21");
    }

    #[test]
    fn compare_prefers_numbers_then_text() {
        assert_eq!(compare(&json!("20"), &json!(18)), Some(Ordering::Greater));
        assert_eq!(compare(&json!("9"), &json!("18")), Some(Ordering::Less));
        assert_eq!(compare(&json!("apple"), &json!("banana")), Some(Ordering::Less));
        assert_eq!(compare(&Value::Null, &json!(5)), Some(Ordering::Less));
    }
}
