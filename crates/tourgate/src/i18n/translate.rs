//! Message descriptors and the translation engine.
//!
//! A [`MessageDescriptor`] is the deferred form of a user-facing message: a
//! catalog key plus optional interpolation arguments, produced deep inside
//! handlers and resolved only at the response boundary, where the request's
//! language is known.

use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::{
    context,
    i18n::{catalog::Catalog, language::Language},
};

/// A translatable message in its unresolved form.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageDescriptor {
    #[serde(rename = "translateKey")]
    pub translate_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub args: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<Language>,
    #[serde(rename = "defaultValue", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl MessageDescriptor {
    pub fn key(key: impl Into<String>) -> Self {
        MessageDescriptor { translate_key: key.into(), args: None, lang: None, default_value: None }
    }

    pub fn with_args(mut self, args: Map<String, Value>) -> Self {
        self.args = Some(args);
        self
    }

    pub fn with_lang(mut self, lang: Language) -> Self {
        self.lang = Some(lang);
        self
    }

    pub fn with_default(mut self, default_value: impl Into<String>) -> Self {
        self.default_value = Some(default_value.into());
        self
    }

    /// Structural match: any JSON object carrying a string `translateKey`
    /// field is treated as a descriptor. Unknown extra fields are ignored.
    pub fn from_value(value: &Value) -> Option<MessageDescriptor> {
        let map = value.as_object()?;
        map.get("translateKey")?.as_str()?;
        serde_json::from_value(value.clone()).ok()
    }
}

/// Per-call overrides for [`TranslationEngine::translate`].
#[derive(Clone, Debug, Default)]
pub struct TranslateOptions {
    pub args: Option<Map<String, Value>>,
    pub lang: Option<Language>,
    pub default_value: Option<String>,
}

/// Resolves descriptors against the loaded catalog. Cheap to clone and share;
/// the catalog behind it is immutable.
#[derive(Clone, Debug)]
pub struct TranslationEngine {
    catalog: Arc<Catalog>,
    default_language: Language,
}

impl TranslationEngine {
    pub fn new(catalog: Arc<Catalog>, default_language: Language) -> Self {
        TranslationEngine { catalog, default_language }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn default_language(&self) -> Language {
        self.default_language
    }

    /// Language used for the next resolution: an explicit override wins, then
    /// the active request scope, then the configured default. Read fresh on
    /// every call so late `set_language` writes take effect.
    pub fn effective_language(&self, explicit: Option<Language>) -> Language {
        explicit.or_else(context::language).unwrap_or(self.default_language)
    }

    /// Resolve one key. A missing template logs a warning and falls back to
    /// the provided default value, or failing that the raw key, so a
    /// translation gap never turns into a request failure.
    pub fn translate(&self, key: &str, opts: &TranslateOptions) -> String {
        let language = self.effective_language(opts.lang);
        let template = self.catalog.template(language, key).or_else(|| {
            if language != self.default_language {
                self.catalog.template(self.default_language, key)
            } else {
                None
            }
        });

        let Some(template) = template else {
            warn!(key, language = %language, "missing translation");
            return opts.default_value.clone().unwrap_or_else(|| key.to_string());
        };
        interpolate(template, opts.args.as_ref())
    }

    pub fn resolve(&self, descriptor: &MessageDescriptor) -> String {
        self.translate(
            &descriptor.translate_key,
            &TranslateOptions {
                args: descriptor.args.clone(),
                lang: descriptor.lang,
                default_value: descriptor.default_value.clone(),
            },
        )
    }
}

/// Replace `{name}` placeholders. Placeholders without a matching argument
/// are left verbatim; string arguments insert raw, other JSON values insert
/// their compact serialization.
fn interpolate(template: &str, args: Option<&Map<String, Value>>) -> String {
    let Some(args) = args else {
        return template.to_string();
    };
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        match tail.find('}') {
            Some(close) => {
                let name = &tail[1..close];
                match args.get(name) {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(other) => out.push_str(&other.to_string()),
                    None => out.push_str(&tail[..=close]),
                }
                rest = &tail[close + 1..];
            }
            None => {
                out.push_str(tail);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

static ENGINE: OnceLock<TranslationEngine> = OnceLock::new();

/// Install the process-wide engine. First install wins; later calls are
/// no-ops, which keeps repeated installs in tests harmless.
pub fn install(engine: TranslationEngine) -> &'static TranslationEngine {
    ENGINE.get_or_init(|| engine)
}

/// The installed engine, if any. Response-boundary code that finds none
/// passes values through untranslated.
pub fn global() -> Option<&'static TranslationEngine> {
    ENGINE.get()
}
