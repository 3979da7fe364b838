use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use formlogic_core::{
    DirBackend, Engine, Expr, FieldValues, FormSchema, SchemaStore, Submitter, VisualModel,
    from_visual, to_visual, validation,
};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "formlogic",
    about = "Evaluate, edit and store form rules",
    version,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Directory holding saved form schemas
    #[arg(long, global = true, env = "FORMLOGIC_STORE_DIR", default_value = "forms")]
    pub store_dir: PathBuf,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Evaluate an expression against field values
    Eval {
        /// Expression as JSON text or a path to a JSON file
        expr: String,
        /// Field values as JSON text or a path to a JSON file
        #[arg(long)]
        data: Option<String>,
    },
    /// Show an expression as a condition-editor model
    Visual {
        /// Expression as JSON text or a path to a JSON file
        expr: String,
    },
    /// Build the expression for a condition-editor model
    Logic {
        /// Model as JSON text or a path to a JSON file
        model: String,
    },
    /// Report visible fields and validation errors for a schema
    Check {
        /// Schema as JSON text or a path to a JSON file
        schema: String,
        #[arg(long)]
        data: Option<String>,
    },
    /// Save a schema into the store and print its slug
    Save {
        schema: String,
    },
    /// Print a saved schema
    Load {
        slug: String,
    },
    /// List saved schema slugs
    List,
    /// Validate field values and send them to the schema's target
    Submit {
        /// Saved slug, or schema JSON text / path
        schema: String,
        #[arg(long)]
        data: Option<String>,
    },
}

pub async fn run(cli: Cli) -> Result<()> {
    let engine = Engine::new();
    match cli.command {
        Command::Eval { expr, data } => {
            let expr = Expr::from(read_json_arg(&expr)?);
            let values = read_values(data.as_deref())?;
            let out = engine
                .apply(&expr, &values)
                .map_err(|e| anyhow!("evaluation failed: {e}"))?;
            print_json(&out)
        }
        Command::Visual { expr } => {
            let expr = Expr::from(read_json_arg(&expr)?);
            let model = to_visual(&expr)
                .ok_or_else(|| anyhow!("expression cannot be edited visually; edit the raw JSON"))?;
            print_json(&serde_json::to_value(model)?)
        }
        Command::Logic { model } => {
            let model: VisualModel = serde_json::from_value(read_json_arg(&model)?)
                .context("invalid condition model")?;
            print_json(&from_visual(&model).to_json())
        }
        Command::Check { schema, data } => {
            let schema = read_schema(&schema)?;
            let values = read_values(data.as_deref())?;
            check(&engine, &schema, &values)
        }
        Command::Save { schema } => {
            let schema = read_schema(&schema)?;
            let slug = open_store(&cli.store_dir)
                .save(&schema)
                .ok_or_else(|| anyhow!("could not save into {}", cli.store_dir.display()))?;
            println!("{slug}");
            Ok(())
        }
        Command::Load { slug } => {
            let schema = open_store(&cli.store_dir)
                .load(&slug)
                .ok_or_else(|| missing_slug(&cli.store_dir, &slug))?;
            print_json(&serde_json::to_value(schema)?)
        }
        Command::List => {
            for slug in open_store(&cli.store_dir).list() {
                println!("{slug}");
            }
            Ok(())
        }
        Command::Submit { schema, data } => {
            let schema = resolve_schema(&cli.store_dir, &schema)?;
            let values = read_values(data.as_deref())?;
            let body = Submitter::new().submit(&engine, &schema, &values).await?;
            println!("{body}");
            Ok(())
        }
    }
}

fn check(engine: &Engine, schema: &FormSchema, values: &FieldValues) -> Result<()> {
    validation::check_patterns(&schema.fields)?;
    let visible: Vec<&str> = engine
        .visible_fields(&schema.fields, values)
        .iter()
        .map(|f| f.id.as_str())
        .collect();
    let errors = engine.validate(&schema.fields, values)?;
    print_json(&json!({ "visible": visible, "errors": errors }))?;
    if !errors.is_empty() {
        bail!("{} field(s) failed validation", errors.len());
    }
    Ok(())
}

fn open_store(dir: &Path) -> SchemaStore<DirBackend> {
    SchemaStore::new(DirBackend::new(dir))
}

fn missing_slug(dir: &Path, slug: &str) -> anyhow::Error {
    let known = open_store(dir).list().join(", ");
    anyhow!("no saved form named '{slug}'. available: [{known}]")
}

/// A saved slug when one exists, otherwise JSON text or a file path.
fn resolve_schema(dir: &Path, input: &str) -> Result<FormSchema> {
    if !input.trim_start().starts_with('{') {
        if let Some(schema) = open_store(dir).load(input) {
            debug!(slug = input, "using saved schema");
            return Ok(schema);
        }
    }
    read_schema(input)
}

fn read_schema(input: &str) -> Result<FormSchema> {
    serde_json::from_value(read_json_arg(input)?).context("invalid form schema")
}

fn read_values(input: Option<&str>) -> Result<FieldValues> {
    let Some(input) = input else {
        return Ok(FieldValues::new());
    };
    match read_json_arg(input)? {
        Value::Object(map) => Ok(map),
        other => bail!("field values must be a JSON object, got {other}"),
    }
}

/// JSON from a file when `input` names one, otherwise `input` parsed as JSON.
fn read_json_arg(input: &str) -> Result<Value> {
    let as_path = Path::new(input);
    if as_path.is_file() {
        let content = fs::read_to_string(as_path)
            .with_context(|| format!("failed to read {}", as_path.display()))?;
        return serde_json::from_str(&content)
            .with_context(|| format!("invalid JSON in {}", as_path.display()));
    }
    serde_json::from_str(input).context("argument is neither a file nor valid JSON")
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_eval_with_data() {
        let cli = Cli::try_parse_from([
            "formlogic",
            "eval",
            r#"{">=":[{"var":"age"},18]}"#,
            "--data",
            r#"{"age":"20"}"#,
        ])
        .expect("parse");
        assert!(matches!(cli.command, Command::Eval { data: Some(_), .. }));
        assert!(!cli.verbose);
    }

    #[test]
    fn store_dir_flag_is_global() {
        let cli = Cli::try_parse_from(["formlogic", "list", "--store-dir", "/tmp/f", "-v"])
            .expect("parse");
        assert_eq!(cli.store_dir, PathBuf::from("/tmp/f"));
        assert!(cli.verbose);
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["formlogic"]).is_err());
    }

    #[test]
    fn json_args_accept_files_and_inline_text() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("values.json");
        fs::write(&path, r#"{"a": 1}"#).expect("write");
        let from_file = read_values(path.to_str()).expect("file");
        assert_eq!(from_file.get("a"), Some(&json!(1)));
        let inline = read_values(Some(r#"{"b": true}"#)).expect("inline");
        assert_eq!(inline.get("b"), Some(&json!(true)));
        assert!(read_values(Some("[1, 2]")).is_err());
        assert!(read_json_arg("not json").is_err());
    }

    #[test]
    fn saved_slug_wins_over_inline_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let slug = open_store(dir.path())
            .save(&FormSchema::new("Saved One"))
            .expect("saved");
        let schema = resolve_schema(dir.path(), &slug).expect("resolve");
        assert_eq!(schema.meta.name, "Saved One");
        let inline =
            resolve_schema(dir.path(), r#"{"meta": {"name": "Inline"}}"#).expect("inline");
        assert_eq!(inline.meta.name, "Inline");
    }

    #[tokio::test]
    async fn check_fails_on_invalid_values() {
        let schema =
            r#"{"fields": [{"id": "email", "label": "Email", "type": "text", "required": true}]}"#;
        let cli = Cli::try_parse_from(["formlogic", "check", schema]).expect("parse");
        assert!(run(cli).await.is_err());
        let data = r#"{"email": "a"}"#;
        let cli =
            Cli::try_parse_from(["formlogic", "check", schema, "--data", data]).expect("parse");
        assert!(run(cli).await.is_ok());
    }
}
