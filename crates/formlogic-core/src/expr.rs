use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

/// Rule expression in JSON-Logic shape.
///
/// Decoding from JSON never fails: a one-key object is an operation (or a
/// variable reference when the key is `var`), an array is a list whose items
/// are evaluated, and anything else is a literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum Expr {
    Literal(Value),
    List(Vec<Expr>),
    Var(VarRef),
    Op { op: String, args: Vec<Expr> },
}

/// `{"var": path}` or `{"var": [path, default]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub path: Box<Expr>,
    pub default: Option<Box<Expr>>,
}

impl VarRef {
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            path: Box::new(Expr::Literal(Value::String(name.into()))),
            default: None,
        }
    }

    /// The referenced field when the path is a plain string and no default
    /// is attached.
    pub fn plain_field(&self) -> Option<&str> {
        if self.default.is_some() {
            return None;
        }
        match self.path.as_ref() {
            Expr::Literal(Value::String(name)) => Some(name),
            _ => None,
        }
    }
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn var(field: impl Into<String>) -> Self {
        Expr::Var(VarRef::field(field))
    }

    pub fn op(op: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Op {
            op: op.into(),
            args,
        }
    }

    /// `{"==":[true,true]}`, the rule a new field starts with.
    pub fn always_true() -> Self {
        Expr::op("==", vec![Expr::literal(true), Expr::literal(true)])
    }

    pub fn operator(&self) -> Option<&str> {
        match self {
            Expr::Op { op, .. } => Some(op),
            _ => None,
        }
    }

    /// Literal data with no variable or operation inside.
    pub fn is_literal_bearing(&self) -> bool {
        match self {
            Expr::Literal(_) => true,
            Expr::List(items) => items.iter().all(Expr::is_literal_bearing),
            Expr::Var(_) | Expr::Op { .. } => false,
        }
    }

    pub fn to_json(&self) -> Value {
        Value::from(self.clone())
    }
}

fn decode_operation(key: String, operand: Value) -> Expr {
    let args: Vec<Expr> = match operand {
        Value::Array(items) => items.into_iter().map(Expr::from).collect(),
        other => vec![Expr::from(other)],
    };
    if key != "var" {
        return Expr::Op { op: key, args };
    }
    let mut args = args.into_iter();
    let path = args.next().unwrap_or(Expr::Literal(Value::Null));
    Expr::Var(VarRef {
        path: Box::new(path),
        default: args.next().map(Box::new),
    })
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        match v {
            Value::Array(items) => Expr::List(items.into_iter().map(Expr::from).collect()),
            Value::Object(obj) if obj.len() == 1 => match obj.into_iter().next() {
                Some((key, operand)) => decode_operation(key, operand),
                None => Expr::Literal(Value::Object(Map::new())),
            },
            other => Expr::Literal(other),
        }
    }
}

impl From<Expr> for Value {
    fn from(expr: Expr) -> Self {
        match expr {
            Expr::Literal(v) => v,
            Expr::List(items) => Value::Array(items.into_iter().map(Value::from).collect()),
            Expr::Var(VarRef {
                path,
                default: None,
            }) => json!({ "var": Value::from(*path) }),
            Expr::Var(VarRef {
                path,
                default: Some(default),
            }) => json!({ "var": [Value::from(*path), Value::from(*default)] }),
            Expr::Op { op, args } => {
                let mut obj = Map::new();
                obj.insert(op, Value::Array(args.into_iter().map(Value::from).collect()));
                Value::Object(obj)
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}
