//! Preview a form: print which fields show and what errors the values raise.
//!
//! Usage: cargo run -p formlogic-core --example preview_form -- form.json [values.json]

use formlogic_core::{Engine, FieldValues, FormSchema};
use std::env;
use std::fs;
use std::process;

fn read_json(path: &str) -> serde_json::Value {
    let src = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("read {}: {}", path, e);
        process::exit(1);
    });
    serde_json::from_str(&src).unwrap_or_else(|e| {
        eprintln!("parse {}: {}", path, e);
        process::exit(1);
    })
}

fn main() {
    let mut args = env::args().skip(1);
    let Some(schema_path) = args.next() else {
        eprintln!("Usage: preview_form <form.json> [values.json]");
        process::exit(1);
    };
    let schema: FormSchema = serde_json::from_value(read_json(&schema_path)).unwrap_or_else(|e| {
        eprintln!("schema {}: {}", schema_path, e);
        process::exit(1);
    });
    let values: FieldValues = match args.next() {
        Some(path) => read_json(&path).as_object().cloned().unwrap_or_default(),
        None => FieldValues::new(),
    };

    let engine = Engine::new();
    println!("{} (v{})", schema.meta.name, schema.meta.version);
    for field in &schema.fields {
        let mark = if engine.is_visible(field, &values) { "show" } else { "hide" };
        let req = if field.required { "*" } else { "" };
        println!("  [{mark}] {}{req} ({})", field.label, field.field_type);
    }
    match engine.validate(&schema.fields, &values) {
        Ok(errors) if errors.is_empty() => println!("valid"),
        Ok(errors) => {
            for (id, messages) in &errors {
                println!("  {id}: {}", messages.join("; "));
            }
        }
        Err(e) => {
            eprintln!("rules: {e}");
            process::exit(1);
        }
    }
}
