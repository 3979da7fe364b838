use crate::coerce::{compare, loose_eq, number_string, to_js_string, truthy};
use crate::expr::{Expr, VarRef};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

/// Current input values of a form, keyed by field id.
pub type FieldValues = Map<String, Value>;
pub type EvalResult = Result<Value, EvalError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unrecognized operation '{0}'")]
    UnknownOperator(String),
    #[error("variable path must be a string or number, got {0}")]
    InvalidVarPath(String),
}

pub struct Context<'a> {
    pub values: &'a FieldValues,
    pub operators: &'a Operators,
}

/// Operators receive their operands unevaluated so `and`/`or` can
/// short-circuit.
pub type Operator = fn(args: &[Expr], ctx: &Context) -> EvalResult;

pub struct Operators {
    ops: HashMap<String, Operator>,
}

impl Operators {
    pub fn new() -> Self {
        let mut ops: HashMap<String, Operator> = HashMap::new();
        ops.insert("==".into(), op_eq as Operator);
        ops.insert("!=".into(), op_neq as Operator);
        ops.insert(">".into(), op_gt as Operator);
        ops.insert(">=".into(), op_gte as Operator);
        ops.insert("<".into(), op_lt as Operator);
        ops.insert("<=".into(), op_lte as Operator);
        ops.insert("in".into(), op_in as Operator);
        ops.insert("and".into(), op_and as Operator);
        ops.insert("or".into(), op_or as Operator);
        Self { ops }
    }

    pub fn get(&self, name: &str) -> Option<Operator> {
        self.ops.get(name).copied()
    }

    pub fn register(&mut self, name: impl Into<String>, operator: Operator) -> Option<Operator> {
        self.ops.insert(name.into(), operator)
    }
}

impl Default for Operators {
    fn default() -> Self {
        Self::new()
    }
}

pub fn evaluate(expr: &Expr, ctx: &Context) -> EvalResult {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::List(items) => items
            .iter()
            .map(|item| evaluate(item, ctx))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Var(var) => resolve_var(var, ctx),
        Expr::Op { op, args } => match ctx.operators.get(op) {
            Some(operator) => operator(args, ctx),
            None => Err(EvalError::UnknownOperator(op.clone())),
        },
    }
}

/// Evaluate `expr` against `values` with the given operator set.
pub fn apply(expr: &Expr, values: &FieldValues, operators: &Operators) -> EvalResult {
    let ctx = Context { values, operators };
    evaluate(expr, &ctx)
}

fn resolve_var(var: &VarRef, ctx: &Context) -> EvalResult {
    let path = match evaluate(&var.path, ctx)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => number_string(&n),
        Value::Bool(b) => b.to_string(),
        other => return Err(EvalError::InvalidVarPath(other.to_string())),
    };
    if let Some(found) = map_get(ctx.values, &path) {
        return Ok(found);
    }
    match &var.default {
        Some(default) => evaluate(default, ctx),
        None => Ok(Value::Null),
    }
}

fn map_get(map: &Map<String, Value>, path: &str) -> Option<Value> {
    if path.is_empty() {
        return Some(Value::Object(map.clone()));
    }
    let mut parts = path.split('.');
    let first = parts.next()?;
    let mut current = map.get(first)?;
    for part in parts {
        match current {
            Value::Object(obj) => current = obj.get(part)?,
            Value::Array(arr) => {
                let idx = part.parse::<usize>().ok()?;
                current = arr.get(idx)?;
            }
            _ => return None,
        }
    }
    Some(current.clone())
}

/// Missing operands read as `null`, never as an error.
fn arg(args: &[Expr], index: usize, ctx: &Context) -> EvalResult {
    match args.get(index) {
        Some(expr) => evaluate(expr, ctx),
        None => Ok(Value::Null),
    }
}

fn op_eq(args: &[Expr], ctx: &Context) -> EvalResult {
    let a = arg(args, 0, ctx)?;
    let b = arg(args, 1, ctx)?;
    Ok(Value::Bool(loose_eq(&a, &b)))
}

fn op_neq(args: &[Expr], ctx: &Context) -> EvalResult {
    let a = arg(args, 0, ctx)?;
    let b = arg(args, 1, ctx)?;
    Ok(Value::Bool(!loose_eq(&a, &b)))
}

fn op_gt(args: &[Expr], ctx: &Context) -> EvalResult {
    let a = arg(args, 0, ctx)?;
    let b = arg(args, 1, ctx)?;
    Ok(Value::Bool(compare(&a, &b).is_some_and(Ordering::is_gt)))
}

fn op_gte(args: &[Expr], ctx: &Context) -> EvalResult {
    let a = arg(args, 0, ctx)?;
    let b = arg(args, 1, ctx)?;
    Ok(Value::Bool(compare(&a, &b).is_some_and(Ordering::is_ge)))
}

/// `<` and `<=` take an optional third operand: `{"<": [1, x, 10]}` is a
/// between test.
fn chained(args: &[Expr], ctx: &Context, accept: fn(Ordering) -> bool) -> EvalResult {
    let a = arg(args, 0, ctx)?;
    let b = arg(args, 1, ctx)?;
    let first = compare(&a, &b).is_some_and(accept);
    if args.len() < 3 || !first {
        return Ok(Value::Bool(first));
    }
    let c = arg(args, 2, ctx)?;
    Ok(Value::Bool(compare(&b, &c).is_some_and(accept)))
}

fn op_lt(args: &[Expr], ctx: &Context) -> EvalResult {
    chained(args, ctx, Ordering::is_lt)
}

fn op_lte(args: &[Expr], ctx: &Context) -> EvalResult {
    chained(args, ctx, Ordering::is_le)
}

fn op_in(args: &[Expr], ctx: &Context) -> EvalResult {
    let needle = arg(args, 0, ctx)?;
    let haystack = arg(args, 1, ctx)?;
    let found = match &haystack {
        Value::Array(items) => items.iter().any(|item| loose_eq(&needle, item)),
        Value::String(s) if !s.is_empty() => s.contains(to_js_string(&needle).as_str()),
        _ => false,
    };
    Ok(Value::Bool(found))
}

fn op_and(args: &[Expr], ctx: &Context) -> EvalResult {
    let mut last = Value::Null;
    for expr in args {
        last = evaluate(expr, ctx)?;
        if !truthy(&last) {
            return Ok(last);
        }
    }
    Ok(last)
}

fn op_or(args: &[Expr], ctx: &Context) -> EvalResult {
    let mut last = Value::Null;
    for expr in args {
        last = evaluate(expr, ctx)?;
        if truthy(&last) {
            return Ok(last);
        }
    }
    Ok(last)
}
