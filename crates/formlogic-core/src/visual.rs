//! Two-way mapping between rule expressions and the condition editor model.
//!
//! The editor only understands a flat list of `field <op> value` clauses
//! joined by one combinator. [`to_visual`] returns `None` for anything else,
//! and callers fall back to editing the raw expression.
//!
//! Clause values are kept as the text the user typed. Going back to an
//! expression, `"true"`, `"false"`, `"null"` and numeric text become typed
//! literals again, so a string that reads `"true"` does not survive a round
//! trip as a string.

use crate::coerce::{number_string, parse_number_literal};
use crate::expr::Expr;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[default]
    And,
    Or,
}

impl Combinator {
    pub fn operator(self) -> &'static str {
        match self {
            Combinator::And => "and",
            Combinator::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClauseOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Neq,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "in")]
    Contains,
}

impl ClauseOp {
    pub fn from_operator(op: &str) -> Option<Self> {
        Some(match op {
            "==" => ClauseOp::Eq,
            "!=" => ClauseOp::Neq,
            ">" => ClauseOp::Gt,
            ">=" => ClauseOp::Gte,
            "<" => ClauseOp::Lt,
            "<=" => ClauseOp::Lte,
            "in" => ClauseOp::Contains,
            _ => return None,
        })
    }

    pub fn operator(self) -> &'static str {
        match self {
            ClauseOp::Eq => "==",
            ClauseOp::Neq => "!=",
            ClauseOp::Gt => ">",
            ClauseOp::Gte => ">=",
            ClauseOp::Lt => "<",
            ClauseOp::Lte => "<=",
            ClauseOp::Contains => "in",
        }
    }

    /// Symbol shown in the editor's operator picker.
    pub fn symbol(self) -> &'static str {
        match self {
            ClauseOp::Eq => "=",
            ClauseOp::Neq => "≠",
            ClauseOp::Gt => ">",
            ClauseOp::Gte => "≥",
            ClauseOp::Lt => "<",
            ClauseOp::Lte => "≤",
            ClauseOp::Contains => "contains",
        }
    }
}

impl fmt::Display for ClauseOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualClause {
    pub field: String,
    pub op: ClauseOp,
    pub value: String,
}

impl VisualClause {
    pub fn new(field: impl Into<String>, op: ClauseOp, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VisualModel {
    #[serde(default)]
    pub combinator: Combinator,
    #[serde(default)]
    pub clauses: Vec<VisualClause>,
}

/// Read `expr` as an editor model, or `None` when any part of it is outside
/// what the editor can show.
pub fn to_visual(expr: &Expr) -> Option<VisualModel> {
    let (combinator, items) = match expr {
        Expr::Op { op, args } if op == "and" => (Combinator::And, args.as_slice()),
        Expr::Op { op, args } if op == "or" => (Combinator::Or, args.as_slice()),
        single => (Combinator::And, std::slice::from_ref(single)),
    };
    let clauses = items
        .iter()
        .map(parse_clause)
        .collect::<Option<Vec<_>>>()?;
    Some(VisualModel {
        combinator,
        clauses,
    })
}

fn parse_clause(expr: &Expr) -> Option<VisualClause> {
    let Expr::Op { op, args } = expr else {
        return None;
    };
    let op = ClauseOp::from_operator(op)?;
    let [left, right] = args.as_slice() else {
        return None;
    };
    let (field_side, value_side) = match op {
        ClauseOp::Contains => (right, left),
        _ => (left, right),
    };
    let Expr::Var(var) = field_side else {
        return None;
    };
    let field = var.plain_field()?;
    if !value_side.is_literal_bearing() {
        return None;
    }
    Some(VisualClause {
        field: field.to_string(),
        op,
        value: input_string(&value_side.to_json()),
    })
}

/// Text shown in the value box for a literal operand.
fn input_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_string(n),
        other => other.to_string(),
    }
}

/// Typed literal for the text in a value box.
pub fn parse_primitive(text: &str) -> Value {
    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        "" => return Value::String(String::new()),
        _ => {}
    }
    parse_number_literal(text)
        .and_then(number_value)
        .unwrap_or_else(|| Value::String(text.to_string()))
}

fn number_value(f: f64) -> Option<Value> {
    if !f.is_finite() {
        return None;
    }
    if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 {
        return Some(Value::Number(Number::from(f as i64)));
    }
    Number::from_f64(f).map(Value::Number)
}

fn clause_expr(clause: &VisualClause) -> Expr {
    let field = Expr::var(clause.field.clone());
    let value = Expr::from(parse_primitive(&clause.value));
    let args = match clause.op {
        ClauseOp::Contains => vec![value, field],
        _ => vec![field, value],
    };
    Expr::op(clause.op.operator(), args)
}

/// Build the expression for an editor model.
///
/// Clauses without a field are dropped. With nothing left the result is the
/// always-true rule rather than an empty `and`/`or`.
pub fn from_visual(model: &VisualModel) -> Expr {
    let clauses: Vec<Expr> = model
        .clauses
        .iter()
        .filter(|c| !c.field.is_empty())
        .map(clause_expr)
        .collect();
    if clauses.is_empty() {
        return Expr::always_true();
    }
    Expr::op(model.combinator.operator(), clauses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn visual(logic: Value) -> Option<VisualModel> {
        to_visual(&Expr::from(logic))
    }

    #[test]
    fn empty_models_become_always_true() {
        for combinator in [Combinator::And, Combinator::Or] {
            let model = VisualModel {
                combinator,
                clauses: vec![],
            };
            assert_eq!(from_visual(&model).to_json(), json!({"==": [true, true]}));
        }
        let fieldless = VisualModel {
            combinator: Combinator::Or,
            clauses: vec![VisualClause::new("", ClauseOp::Eq, "1")],
        };
        assert_eq!(from_visual(&fieldless), Expr::always_true());
    }

    #[test]
    fn reads_combinator_of_simple_clauses() {
        let model = visual(json!({"or": [
            {"==": [{"var": "country"}, "AR"]},
            {">=": [{"var": "age"}, 18]},
            {"in": ["vip", {"var": "tags"}]}
        ]}))
        .expect("visual");
        assert_eq!(model.combinator, Combinator::Or);
        assert_eq!(
            model.clauses,
            vec![
                VisualClause::new("country", ClauseOp::Eq, "AR"),
                VisualClause::new("age", ClauseOp::Gte, "18"),
                VisualClause::new("tags", ClauseOp::Contains, "vip"),
            ]
        );
    }

    #[test]
    fn single_clause_reads_as_and() {
        let model = visual(json!({"!=": [{"var": "a"}, null]})).expect("visual");
        assert_eq!(model.combinator, Combinator::And);
        assert_eq!(model.clauses, vec![VisualClause::new("a", ClauseOp::Neq, "null")]);
    }

    #[test]
    fn always_true_rule_is_not_visual() {
        assert_eq!(to_visual(&Expr::always_true()), None);
    }

    #[test]
    fn unsupported_shapes_are_rejected_whole() {
        let nested = json!({"or": [
            {"==": [{"var": "x"}, 1]},
            {"and": [{"==": [{"var": "y"}, 2]}]}
        ]});
        assert_eq!(visual(nested), None);
        assert_eq!(visual(json!({"==": [{"var": "x"}, 1, 2]})), None);
        assert_eq!(visual(json!({"==": [1, {"var": "x"}]})), None);
        assert_eq!(visual(json!({"in": [{"var": "x"}, "abc"]})), None);
        assert_eq!(visual(json!({"==": [{"var": "x"}, {"var": "y"}]})), None);
        assert_eq!(visual(json!({"==": [{"var": ["x", 0]}, 1]})), None);
        assert_eq!(visual(json!({"and": [{"!": [{"var": "x"}]}]})), None);
    }

    #[test]
    fn literal_values_encode_as_input_text() {
        let model = visual(json!({"and": [
            {"==": [{"var": "a"}, true]},
            {"==": [{"var": "b"}, 1.5]},
            {"==": [{"var": "c"}, 20.0]},
            {"in": [["x", 1], {"var": "d"}]}
        ]}))
        .expect("visual");
        let values: Vec<&str> = model.clauses.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["true", "1.5", "20", r#"["x",1]"#]);
    }

    #[test]
    fn values_are_retyped_on_the_way_back() {
        assert_eq!(parse_primitive("true"), json!(true));
        assert_eq!(parse_primitive("null"), Value::Null);
        assert_eq!(parse_primitive(""), json!(""));
        assert_eq!(parse_primitive("18"), json!(18));
        assert_eq!(parse_primitive("1.5"), json!(1.5));
        assert_eq!(parse_primitive("  "), json!("  "));
        assert_eq!(parse_primitive("Infinity"), json!("Infinity"));
        assert_eq!(parse_primitive("AR"), json!("AR"));
    }

    #[test]
    fn single_clause_stays_wrapped() {
        let model = VisualModel {
            combinator: Combinator::And,
            clauses: vec![VisualClause::new("age", ClauseOp::Gte, "18")],
        };
        assert_eq!(
            from_visual(&model).to_json(),
            json!({"and": [{">=": [{"var": "age"}, 18]}]})
        );
    }

    #[test]
    fn contains_puts_field_on_the_right() {
        let model = VisualModel {
            combinator: Combinator::Or,
            clauses: vec![VisualClause::new("bio", ClauseOp::Contains, "rust")],
        };
        assert_eq!(
            from_visual(&model).to_json(),
            json!({"or": [{"in": ["rust", {"var": "bio"}]}]})
        );
    }

    #[test]
    fn round_trip_stabilizes_after_one_pass() {
        let cases = [
            json!({"and": [{"==": [{"var": "a"}, "x"]}, {"<": [{"var": "b"}, 3]}]}),
            json!({"or": [{"in": ["q", {"var": "c"}]}, {"!=": [{"var": "d"}, false]}]}),
            json!({"<=": [{"var": "e"}, 2.5]}),
            json!({"==": [{"var": "f"}, "true"]}),
        ];
        for logic in cases {
            let first = visual(logic.clone()).expect("visual");
            let rebuilt = from_visual(&first);
            let second = to_visual(&rebuilt).expect("visual again");
            assert_eq!(first, second, "unstable for {logic}");
            assert_eq!(to_visual(&from_visual(&second)), Some(second));
        }
    }

    #[test]
    fn text_true_collapses_to_boolean() {
        let model = visual(json!({"==": [{"var": "f"}, "true"]})).expect("visual");
        assert_eq!(
            from_visual(&model).to_json(),
            json!({"and": [{"==": [{"var": "f"}, true]}]})
        );
    }

    #[test]
    fn model_serializes_with_editor_operator_names() {
        let model = VisualModel {
            combinator: Combinator::Or,
            clauses: vec![VisualClause::new("a", ClauseOp::Contains, "x")],
        };
        assert_eq!(
            serde_json::to_value(&model).expect("encode"),
            json!({"combinator": "or", "clauses": [{"field": "a", "op": "in", "value": "x"}]})
        );
    }
}
