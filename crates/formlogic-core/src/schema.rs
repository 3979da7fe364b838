//! Form schema documents.
//!
//! The JSON shape is the one the builder writes and the viewer reads:
//!
//! ```json
//! {
//!   "meta":   { "name": "Signup", "version": 1 },
//!   "target": { "uri": "https://example.test/hook", "method": "POST", "headers": {} },
//!   "fields": [
//!     { "id": "age", "label": "Age", "type": "number", "required": true,
//!       "visibleWhen": { "==": [true, true] },
//!       "validate": [{ "pattern": "^[0-9]+$", "message": "digits only" }],
//!       "props": {} }
//!   ]
//! }
//! ```
//!
//! Field list edits (`add_field`, `insert_field`, `move_field`,
//! `remove_field`) take the current list plus indices and never rely on
//! ambient state.

use crate::expr::Expr;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const DEFAULT_METHOD: &str = "POST";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FormSchema {
    #[serde(default)]
    pub meta: FormMeta,
    #[serde(default)]
    pub target: SubmitTarget,
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_version() -> u32 {
    1
}

impl Default for FormMeta {
    fn default() -> Self {
        Self {
            name: String::new(),
            version: default_version(),
            extra: Map::new(),
        }
    }
}

/// Where a filled-in form is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitTarget {
    #[serde(default)]
    pub uri: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: IndexMap<String, String>,
}

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

impl Default for SubmitTarget {
    fn default() -> Self {
        Self {
            uri: String::new(),
            method: default_method(),
            headers: IndexMap::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Textarea,
    Checkbox,
    Select,
    Date,
}

impl FieldType {
    pub const ALL: [FieldType; 6] = [
        FieldType::Text,
        FieldType::Number,
        FieldType::Textarea,
        FieldType::Checkbox,
        FieldType::Select,
        FieldType::Date,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Text => "text",
            FieldType::Number => "number",
            FieldType::Textarea => "textarea",
            FieldType::Checkbox => "checkbox",
            FieldType::Select => "select",
            FieldType::Date => "date",
        }
    }

    /// Label given to a freshly added field: `"select"` -> `"Select"`.
    pub fn default_label(self) -> String {
        let name = self.as_str();
        let mut chars = name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Stable identity used by editors while ids are being renamed.
    #[serde(rename = "_uid", default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<String>,
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(rename = "visibleWhen", default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Expr>,
    #[serde(default)]
    pub validate: Vec<ValidationRule>,
    #[serde(default)]
    pub props: FieldProps,
}

impl FieldDef {
    pub fn new(id: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            uid: None,
            id: id.into(),
            label: label.into(),
            field_type,
            required: false,
            visible_when: Some(Expr::always_true()),
            validate: Vec::new(),
            props: FieldProps::default(),
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn visible_when(mut self, rule: Expr) -> Self {
        self.visible_when = Some(rule);
        self
    }

    pub fn with_rule(mut self, rule: ValidationRule) -> Self {
        self.validate.push(rule);
        self
    }

    pub fn with_option(mut self, label: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.options.push(SelectOption {
            label: label.into(),
            value: value.into(),
        });
        self
    }
}

/// Type-specific options. Keys this crate does not know are kept verbatim.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldProps {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub label: String,
    pub value: Value,
}

/// A regex check, a logic check, or both. The pattern runs first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValidationRule {
    #[serde(default, alias = "regex", skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<Expr>,
    #[serde(default)]
    pub message: String,
}

impl ValidationRule {
    pub fn pattern(pattern: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            logic: None,
            message: message.into(),
        }
    }

    pub fn logic(logic: Expr, message: impl Into<String>) -> Self {
        Self {
            pattern: None,
            logic: Some(logic),
            message: message.into(),
        }
    }
}

impl FormSchema {
    /// Empty schema as the builder starts it: POST with a JSON content type.
    pub fn new(name: impl Into<String>) -> Self {
        let mut headers = IndexMap::new();
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        Self {
            meta: FormMeta {
                name: name.into(),
                ..FormMeta::default()
            },
            target: SubmitTarget {
                headers,
                ..SubmitTarget::default()
            },
            fields: Vec::new(),
        }
    }

    pub fn field_ids(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.id.as_str()).collect()
    }

    pub fn field(&self, id: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.id == id)
    }

    /// `base` if unused, otherwise the first free `base-1`, `base-2`, ...
    pub fn unique_field_id(&self, base: &str) -> String {
        let taken = |candidate: &str| self.fields.iter().any(|f| f.id == candidate);
        if !base.is_empty() && !taken(base) {
            return base.to_string();
        }
        let mut i = 1usize;
        loop {
            let candidate = format!("{base}-{i}");
            if !taken(&candidate) {
                return candidate;
            }
            i += 1;
        }
    }

    fn new_field_of_type(&self, field_type: FieldType) -> FieldDef {
        let id = self.unique_field_id(field_type.as_str());
        FieldDef::new(id, field_type.default_label(), field_type)
    }

    /// Append a field of `field_type`; returns its index.
    pub fn add_field(&mut self, field_type: FieldType) -> usize {
        let field = self.new_field_of_type(field_type);
        self.fields.push(field);
        self.fields.len() - 1
    }

    /// Insert a field of `field_type` at `index` (clamped to the list end);
    /// returns the index it landed on.
    pub fn insert_field(&mut self, field_type: FieldType, index: usize) -> usize {
        let field = self.new_field_of_type(field_type);
        let at = index.min(self.fields.len());
        self.fields.insert(at, field);
        at
    }

    /// Move the field at `from` so it drops before the field currently at
    /// `to` (`to == len` drops at the end). Returns false when `from` is out
    /// of range.
    pub fn move_field(&mut self, from: usize, to: usize) -> bool {
        if from >= self.fields.len() {
            return false;
        }
        let mut to = to.min(self.fields.len());
        let moved = self.fields.remove(from);
        if from < to {
            to -= 1;
        }
        self.fields.insert(to, moved);
        true
    }

    pub fn remove_field(&mut self, index: usize) -> Option<FieldDef> {
        (index < self.fields.len()).then(|| self.fields.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ids(schema: &FormSchema) -> Vec<&str> {
        schema.field_ids()
    }

    #[test]
    fn new_schema_has_builder_defaults() {
        let schema = FormSchema::new("Signup");
        assert_eq!(schema.meta.version, 1);
        assert_eq!(schema.target.method, "POST");
        assert_eq!(
            schema.target.headers.get("Content-Type").map(String::as_str),
            Some(JSON_CONTENT_TYPE)
        );
    }

    #[test]
    fn added_fields_get_unique_ids_and_labels() {
        let mut schema = FormSchema::new("f");
        schema.add_field(FieldType::Text);
        schema.add_field(FieldType::Text);
        schema.add_field(FieldType::Select);
        assert_eq!(ids(&schema), vec!["text", "text-1", "select"]);
        assert_eq!(schema.fields[2].label, "Select");
        assert_eq!(schema.fields[0].visible_when, Some(Expr::always_true()));
    }

    #[test]
    fn insert_clamps_index() {
        let mut schema = FormSchema::new("f");
        schema.add_field(FieldType::Text);
        let at = schema.insert_field(FieldType::Date, 99);
        assert_eq!(at, 1);
        let at = schema.insert_field(FieldType::Number, 0);
        assert_eq!(at, 0);
        assert_eq!(ids(&schema), vec!["number", "text", "date"]);
    }

    #[test]
    fn move_forward_adjusts_for_removal() {
        let mut schema = FormSchema::new("f");
        for t in [FieldType::Text, FieldType::Number, FieldType::Date] {
            schema.add_field(t);
        }
        assert!(schema.move_field(0, 2));
        assert_eq!(ids(&schema), vec!["number", "text", "date"]);
        assert!(schema.move_field(0, 3));
        assert_eq!(ids(&schema), vec!["text", "date", "number"]);
        assert!(schema.move_field(2, 0));
        assert_eq!(ids(&schema), vec!["number", "text", "date"]);
        assert!(!schema.move_field(7, 0));
    }

    #[test]
    fn remove_returns_the_field_and_ignores_bad_indexes() {
        let mut schema = FormSchema::new("f");
        for t in [FieldType::Text, FieldType::Checkbox] {
            schema.add_field(t);
        }
        let removed = schema.remove_field(0).expect("removed");
        assert_eq!(removed.id, "text");
        assert!(schema.field("text").is_none());
        assert_eq!(schema.field("checkbox").map(|f| f.field_type), Some(FieldType::Checkbox));
        assert!(schema.remove_field(5).is_none());
        assert_eq!(ids(&schema), vec!["checkbox"]);
    }

    #[test]
    fn removed_ids_are_free_again() {
        let mut schema = FormSchema::new("f");
        schema.add_field(FieldType::Date);
        schema.add_field(FieldType::Date);
        schema.remove_field(0);
        assert_eq!(schema.unique_field_id("date"), "date");
    }

    #[test]
    fn select_options_are_appended_in_order() {
        let field = FieldDef::new("size", "Size", FieldType::Select)
            .with_option("Small", "s")
            .with_option("Large", 3);
        let options: Vec<(&str, &Value)> =
            field.props.options.iter().map(|o| (o.label.as_str(), &o.value)).collect();
        assert_eq!(options, vec![("Small", &json!("s")), ("Large", &json!(3))]);
        let encoded = serde_json::to_value(&field).expect("encode");
        assert_eq!(encoded["props"]["options"][1], json!({"label": "Large", "value": 3}));
    }

    #[test]
    fn every_field_type_uses_its_wire_name() {
        for field_type in FieldType::ALL {
            let encoded = serde_json::to_value(field_type).expect("encode");
            assert_eq!(encoded, json!(field_type.as_str()));
            let label = field_type.default_label();
            assert!(label.chars().next().is_some_and(char::is_uppercase), "{label}");
        }
    }

    #[test]
    fn decodes_builder_document_and_keeps_unknown_props() {
        let doc = json!({
            "meta": {"name": "Encuesta", "version": 2, "owner": "ops"},
            "target": {"uri": "https://example.test", "method": "put", "headers": {"X-Key": "1"}},
            "fields": [{
                "_uid": "abc",
                "id": "color",
                "label": "Color",
                "type": "select",
                "required": true,
                "visibleWhen": {"==": [true, true]},
                "validate": [{"regex": "^[a-z]+$", "message": "lowercase"}],
                "props": {"options": [{"label": "Red", "value": "red"}], "placeholder": "pick"}
            }]
        });
        let schema: FormSchema = serde_json::from_value(doc).expect("decode");
        assert_eq!(schema.meta.extra.get("owner"), Some(&json!("ops")));
        let field = &schema.fields[0];
        assert_eq!(field.uid.as_deref(), Some("abc"));
        assert_eq!(field.field_type, FieldType::Select);
        assert_eq!(field.validate[0].pattern.as_deref(), Some("^[a-z]+$"));
        assert_eq!(field.props.extra.get("placeholder"), Some(&json!("pick")));
        assert_eq!(field.props.options[0].value, json!("red"));

        let encoded = serde_json::to_value(&schema).expect("encode");
        assert_eq!(encoded["fields"][0]["validate"][0]["pattern"], json!("^[a-z]+$"));
        assert_eq!(encoded["fields"][0]["_uid"], json!("abc"));
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let schema: FormSchema = serde_json::from_value(json!({"fields": []})).expect("decode");
        assert_eq!(schema.meta.version, 1);
        assert_eq!(schema.target.method, "POST");
        assert!(schema.target.uri.is_empty());
    }
}
