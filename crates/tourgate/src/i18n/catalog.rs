//! Locale bundle loading.
//!
//! One JSON file per language, named by canonical code (`en_US.json`), each a
//! nested object whose leaves are message templates. Bundles are read once at
//! startup and shared immutably afterwards.

use std::{collections::HashMap, fs, path::Path};

use serde_json::Value;
use tracing::debug;

use crate::{error::GateError, i18n::language::Language};

/// Immutable set of loaded message bundles.
#[derive(Debug, Default)]
pub struct Catalog {
    bundles: HashMap<Language, Value>,
}

impl Catalog {
    /// Load every supported language's bundle from `dir`. Languages without a
    /// bundle file are simply absent; a missing bundle for the default
    /// language is a startup error.
    pub fn load_dir(dir: &Path, default_language: Language) -> Result<Catalog, GateError> {
        let mut bundles = HashMap::new();
        for language in Language::ALL {
            let path = dir.join(format!("{}.json", language.code()));
            if !path.is_file() {
                debug!(language = %language, path = %path.display(), "no locale bundle");
                continue;
            }
            let text = fs::read_to_string(&path)
                .map_err(|source| GateError::ReadBundle { path: path.clone(), source })?;
            let value: Value = serde_json::from_str(&text)
                .map_err(|source| GateError::ParseBundle { path: path.clone(), source })?;
            if !value.is_object() {
                return Err(GateError::BundleNotObject { path });
            }
            bundles.insert(language, value);
        }

        if !bundles.contains_key(&default_language) {
            return Err(GateError::DefaultBundleMissing {
                language: default_language.code().to_string(),
                dir: dir.to_path_buf(),
            });
        }
        Ok(Catalog { bundles })
    }

    /// Build a catalog directly from in-memory bundles.
    pub fn from_bundles(bundles: impl IntoIterator<Item = (Language, Value)>) -> Catalog {
        Catalog { bundles: bundles.into_iter().collect() }
    }

    pub fn has(&self, language: Language) -> bool {
        self.bundles.contains_key(&language)
    }

    pub fn languages(&self) -> impl Iterator<Item = Language> + '_ {
        self.bundles.keys().copied()
    }

    /// Look up the template for a dot-separated key in one language's bundle.
    /// Returns `None` when the language has no bundle, any path segment is
    /// missing, or the path lands on a non-string node.
    pub fn template(&self, language: Language, key: &str) -> Option<&str> {
        let mut node = self.bundles.get(&language)?;
        for segment in key.split('.') {
            node = node.as_object()?.get(segment)?;
        }
        node.as_str()
    }

    /// Number of string leaves in one language's bundle. Used by the bundle
    /// check command to report coverage.
    pub fn leaf_count(&self, language: Language) -> usize {
        fn count(value: &Value) -> usize {
            match value {
                Value::String(_) => 1,
                Value::Object(map) => map.values().map(count).sum(),
                _ => 0,
            }
        }
        self.bundles.get(&language).map(count).unwrap_or(0)
    }
}
