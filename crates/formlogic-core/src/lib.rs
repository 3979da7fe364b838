//! formlogic core crate.
//!
//! Rules attached to form fields are small JSON-Logic documents. This crate
//! keeps the pieces that give them meaning separate:
//!
//! - `expr` + `coerce` + `runtime`: the expression tree, JavaScript-style
//!   value coercions, and the evaluator with its operator registry.
//! - `visual`: the mapping between expressions and the flat condition-editor
//!   model, with an explicit "not representable" outcome.
//! - `validation` + `engine`: field visibility, rule errors and the per-form
//!   error map.
//! - `schema` + `store`: form documents, field list editing, and slug-keyed
//!   persistence.
//! - `submit`: sending filled-in values to the form's target endpoint.
//!
//! Broken rules never take a form down: a visibility rule that cannot be
//! evaluated shows its field, and a faulty validation rule is skipped. Only
//! an invalid regex pattern is reported, because it is an authoring mistake.

pub mod coerce;
pub mod engine;
pub mod expr;
pub mod runtime;
pub mod schema;
pub mod store;
pub mod submit;
pub mod validation;
pub mod visual;

pub use engine::Engine;
pub use expr::{Expr, VarRef};
pub use runtime::{
    Context, EvalError, EvalResult, FieldValues, Operator, Operators, apply, evaluate,
};
pub use schema::{
    FieldDef, FieldProps, FieldType, FormMeta, FormSchema, SelectOption, SubmitTarget,
    ValidationRule,
};
pub use store::{
    DEFAULT_SLUG, DirBackend, KeyValueBackend, MemoryBackend, STORAGE_PREFIX, SchemaStore,
    StoreError, resolve_slug, slugify,
};
pub use submit::{SubmitError, SubmitRequest, Submitter, build_request};
pub use validation::{FormErrors, REQUIRED_MESSAGE, ValidationError};
pub use visual::{ClauseOp, Combinator, VisualClause, VisualModel, from_visual, to_visual};
