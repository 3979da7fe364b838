use crate::coerce::{js_truthy, to_js_string};
use crate::expr::Expr;
use crate::runtime::{FieldValues, Operators, apply};
use crate::schema::FieldDef;
use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Appended after rule messages when a required field is empty.
pub const REQUIRED_MESSAGE: &str = "Required";

/// Field id -> messages, in field order. Valid fields are absent.
pub type FormErrors = IndexMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("field '{field}' has an invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Whether `field` is shown for `values`.
///
/// No rule means visible, and so does a falsy literal in the rule's place
/// (`false`, `0`, `""`). A rule that cannot be evaluated also means visible:
/// a broken condition must not hide an input.
pub fn is_visible(field: &FieldDef, values: &FieldValues, operators: &Operators) -> bool {
    let Some(rule) = field.visible_when.as_ref().filter(|r| !is_blank_rule(r)) else {
        return true;
    };
    match apply(rule, values, operators) {
        Ok(result) => js_truthy(&result),
        Err(err) => {
            debug!(field = %field.id, error = %err, "visibility rule failed; showing field");
            true
        }
    }
}

/// A literal that reads as false stands for "no rule".
fn is_blank_rule(rule: &Expr) -> bool {
    matches!(rule, Expr::Literal(v) if !js_truthy(v))
}

fn compile_pattern(field: &FieldDef, pattern: &str) -> Result<Regex, ValidationError> {
    Regex::new(pattern).map_err(|source| ValidationError::InvalidPattern {
        field: field.id.clone(),
        pattern: pattern.to_string(),
        source,
    })
}

fn pattern_input(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(other) => to_js_string(other),
    }
}

/// Messages of the rules `field` currently violates, in rule order.
///
/// Logic rules that fault are skipped. Invalid patterns are returned as
/// errors.
pub fn collect_rule_errors(
    field: &FieldDef,
    values: &FieldValues,
    operators: &Operators,
) -> Result<Vec<String>, ValidationError> {
    let mut errors = Vec::new();
    for rule in &field.validate {
        if let Some(pattern) = &rule.pattern {
            let re = compile_pattern(field, pattern)?;
            if !re.is_match(&pattern_input(values.get(&field.id))) {
                errors.push(rule.message.clone());
            }
        }
        if let Some(logic) = rule.logic.as_ref().filter(|l| !is_blank_rule(l)) {
            match apply(logic, values, operators) {
                Ok(result) if js_truthy(&result) => {}
                Ok(_) => errors.push(rule.message.clone()),
                Err(err) => {
                    debug!(field = %field.id, error = %err, "validation rule failed; skipping");
                }
            }
        }
    }
    Ok(errors)
}

/// Absent, `null` and `""` count as empty; `false` and `0` do not.
pub fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Errors of every visible field. Hidden fields are never reported.
pub fn validate_form(
    fields: &[FieldDef],
    values: &FieldValues,
    operators: &Operators,
) -> Result<FormErrors, ValidationError> {
    let mut out = FormErrors::new();
    for field in fields {
        if !is_visible(field, values, operators) {
            continue;
        }
        let mut errors = collect_rule_errors(field, values, operators)?;
        if field.required && is_empty_value(values.get(&field.id)) {
            errors.push(REQUIRED_MESSAGE.to_string());
        }
        if !errors.is_empty() {
            out.insert(field.id.clone(), errors);
        }
    }
    Ok(out)
}

/// Compile every pattern once so authoring mistakes surface before the
/// form is filled in.
pub fn check_patterns(fields: &[FieldDef]) -> Result<(), ValidationError> {
    for field in fields {
        for pattern in field.validate.iter().filter_map(|r| r.pattern.as_deref()) {
            compile_pattern(field, pattern)?;
        }
    }
    Ok(())
}
