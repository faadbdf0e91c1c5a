//! Gateway configuration loaded from TOML.

use std::{fs, net::SocketAddr, path::Path};

use serde::{Deserialize, Serialize};

use crate::{error::GateError, i18n::language::Language};

/// Settings for one gateway process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GatewayConfig {
    /// Language used when a request names none, and the fallback for missing
    /// translations.
    #[serde(default = "default_language")]
    pub default_language: Language,
    /// Locale bundle directory; defaults to `<root>/locales`.
    #[serde(default)]
    pub locales_dir: Option<String>,
    /// HTTP bind address; defaults to an ephemeral loopback port.
    #[serde(default)]
    pub http_bind: Option<SocketAddr>,
}

fn default_language() -> Language {
    Language::EnUs
}

impl Default for GatewayConfig {
    fn default() -> Self {
        GatewayConfig { default_language: default_language(), locales_dir: None, http_bind: None }
    }
}

/// Accept both `[gateway]`-wrapped and flat documents.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ConfigDocument {
    Wrapped { gateway: GatewayConfig },
    Direct(GatewayConfig),
}

impl ConfigDocument {
    fn into_config(self) -> GatewayConfig {
        match self {
            ConfigDocument::Wrapped { gateway } => gateway,
            ConfigDocument::Direct(config) => config,
        }
    }
}

impl GatewayConfig {
    /// Load from a TOML file. A missing file is not an error; the defaults
    /// apply.
    pub fn load(path: impl AsRef<Path>) -> Result<GatewayConfig, GateError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Ok(GatewayConfig::default());
        }
        let content = fs::read_to_string(path)
            .map_err(|source| GateError::ReadConfig { path: path.to_path_buf(), source })?;
        let doc: ConfigDocument = toml_edit::de::from_str(&content)
            .map_err(|source| GateError::ParseConfig { path: path.to_path_buf(), source })?;
        Ok(doc.into_config())
    }
}
