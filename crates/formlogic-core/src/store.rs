//! Slug-keyed persistence of whole form schemas.
//!
//! Schemas live in a flat key-value namespace under [`STORAGE_PREFIX`]. The
//! store never fails loudly: a backend fault is logged and reported as a
//! missing result, the same way a browser without storage would behave.

use crate::schema::FormSchema;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::LazyLock;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{info, warn};

pub const STORAGE_PREFIX: &str = "form:";
/// Slug used when a form name slugifies to nothing.
pub const DEFAULT_SLUG: &str = "form";

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));
static DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9_\-]").expect("slug charset pattern"));
static UNDERSCORES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_+").expect("underscore pattern"));

/// `"  My Form! 2024  "` -> `"my_form_2024"`. May return an empty string.
pub fn slugify(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let joined = WHITESPACE_RE.replace_all(&lowered, "_");
    let stripped = DISALLOWED_RE.replace_all(&joined, "");
    let collapsed = UNDERSCORES_RE.replace_all(&stripped, "_");
    collapsed.trim_matches('_').to_string()
}

/// Slug a schema is saved under.
pub fn schema_slug(schema: &FormSchema) -> String {
    let slug = slugify(&schema.meta.name);
    if slug.is_empty() {
        DEFAULT_SLUG.to_string()
    } else {
        slug
    }
}

/// Slug named by a viewer request path, e.g. `/app/my_form?x=1` with base
/// `/app/`. `None` when the path names no form.
pub fn resolve_slug(path: &str, base: &str) -> Option<String> {
    let base = format!("{}/", base.trim_end_matches('/'));
    let rest = if base == "/" {
        path
    } else {
        path.strip_prefix(base.as_str()).unwrap_or(path)
    };
    let raw = rest.split(['?', '#']).next().unwrap_or_default();
    let decoded = urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let slug = decoded.trim_matches('/');
    let slug = slug.strip_prefix(STORAGE_PREFIX).unwrap_or(slug);
    if slug.is_empty() || slug == "index.html" {
        None
    } else {
        Some(slug.to_string())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("stored schema is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("storage key '{0}' cannot be used as a file name")]
    InvalidKey(String),
}

/// String key-value storage, the contract browser local storage offers.
pub trait KeyValueBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// One `<percent-encoded key>.json` file per key.
#[derive(Debug, Clone)]
pub struct DirBackend {
    root: PathBuf,
}

impl DirBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.json", urlencoding::encode(key))))
    }
}

impl KeyValueBackend for DirBackend {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.root)?;
        let mut staged = NamedTempFile::new_in(&self.root)?;
        staged.write_all(value.as_bytes())?;
        staged.persist(path).map_err(|err| err.error)?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut keys = Vec::new();
        for entry in entries {
            let name = entry?.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(".json")) else {
                continue;
            };
            if let Ok(key) = urlencoding::decode(stem) {
                keys.push(key.into_owned());
            }
        }
        Ok(keys)
    }
}

pub struct SchemaStore<B> {
    backend: B,
}

impl<B: KeyValueBackend> SchemaStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Save `schema` under its slug and return the slug, or `None` when the
    /// backend refused the write.
    pub fn save(&mut self, schema: &FormSchema) -> Option<String> {
        let slug = schema_slug(schema);
        match self.try_save(&slug, schema) {
            Ok(()) => {
                info!(slug = %slug, fields = schema.fields.len(), "saved form schema");
                Some(slug)
            }
            Err(err) => {
                warn!(slug = %slug, error = %err, "could not save form schema");
                None
            }
        }
    }

    fn try_save(&mut self, slug: &str, schema: &FormSchema) -> Result<(), StoreError> {
        let raw = serde_json::to_string(schema)?;
        self.backend.set(&format!("{STORAGE_PREFIX}{slug}"), &raw)
    }

    pub fn load(&self, slug: &str) -> Option<FormSchema> {
        match self.try_load(slug) {
            Ok(found) => found,
            Err(err) => {
                warn!(slug = %slug, error = %err, "could not load form schema");
                None
            }
        }
    }

    fn try_load(&self, slug: &str) -> Result<Option<FormSchema>, StoreError> {
        let Some(raw) = self.backend.get(&format!("{STORAGE_PREFIX}{slug}"))? else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }

    /// Slugs of every saved schema, sorted.
    pub fn list(&self) -> Vec<String> {
        let keys = match self.backend.keys() {
            Ok(keys) => keys,
            Err(err) => {
                warn!(error = %err, "could not list form schemas");
                return Vec::new();
            }
        };
        let mut slugs: Vec<String> = keys
            .iter()
            .filter_map(|k| k.strip_prefix(STORAGE_PREFIX))
            .map(str::to_string)
            .collect();
        slugs.sort();
        slugs
    }
}
