use crate::coerce::js_truthy;
use crate::expr::Expr;
use crate::runtime::{EvalError, EvalResult, FieldValues, Operator, Operators, apply};
use crate::schema::FieldDef;
use crate::validation::{self, FormErrors, ValidationError};

/// Engine-scoped evaluation surface for form rules.
///
/// Operator registration is instance-local, so hosts can add operators for
/// their own forms without affecting anyone else's.
#[derive(Default)]
pub struct Engine {
    operators: Operators,
}

impl Engine {
    /// Create an engine with the comparison and logic operators preloaded.
    pub fn new() -> Self {
        Self {
            operators: Operators::new(),
        }
    }

    /// Register or replace an operator.
    pub fn register(&mut self, name: impl Into<String>, operator: Operator) -> Option<Operator> {
        self.operators.register(name, operator)
    }

    /// Evaluate to a value.
    pub fn apply(&self, expr: &Expr, values: &FieldValues) -> EvalResult {
        apply(expr, values, &self.operators)
    }

    /// Evaluate and coerce the result to a boolean the way a host script
    /// would (`!!result`), so an empty list still counts as true.
    pub fn test(&self, expr: &Expr, values: &FieldValues) -> Result<bool, EvalError> {
        self.apply(expr, values).map(|v| js_truthy(&v))
    }

    pub fn is_visible(&self, field: &FieldDef, values: &FieldValues) -> bool {
        validation::is_visible(field, values, &self.operators)
    }

    pub fn visible_fields<'f>(
        &self,
        fields: &'f [FieldDef],
        values: &FieldValues,
    ) -> Vec<&'f FieldDef> {
        fields
            .iter()
            .filter(|f| self.is_visible(f, values))
            .collect()
    }

    pub fn rule_errors(
        &self,
        field: &FieldDef,
        values: &FieldValues,
    ) -> Result<Vec<String>, ValidationError> {
        validation::collect_rule_errors(field, values, &self.operators)
    }

    pub fn validate(
        &self,
        fields: &[FieldDef],
        values: &FieldValues,
    ) -> Result<FormErrors, ValidationError> {
        validation::validate_form(fields, values, &self.operators)
    }
}
