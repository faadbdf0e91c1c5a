use std::{collections::BTreeMap, io, path::PathBuf};

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::{Error as JsonError, Value};
use thiserror::Error;
use toml_edit::de::Error as TomlDeError;

use crate::{i18n::translate::MessageDescriptor, status::RpcCode};

/// Infrastructure failures: workspace layout, locale bundles, configuration.
/// These never cross the wire; they abort startup or a CLI command.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("failed to create directory {path}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read locale bundle {path}")]
    ReadBundle {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse locale bundle {path}")]
    ParseBundle {
        path: PathBuf,
        #[source]
        source: JsonError,
    },

    #[error("locale bundle {path} must contain a JSON object at the top level")]
    BundleNotObject { path: PathBuf },

    #[error("no locale bundle found for default language '{language}' in {dir}")]
    DefaultBundleMissing { language: String, dir: PathBuf },

    #[error("failed to read config file {path}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: TomlDeError,
    },

    #[error("unable to determine user home directory for TOURGATE_ROOT")]
    HomeDirectoryUnknown,
}

/// One failing rule for one field of client input. Only the first failing
/// constraint per field is surfaced, keyed by constraint name.
#[derive(Clone, Debug, Serialize)]
pub struct FieldViolation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    pub property: String,
    pub constraints: BTreeMap<String, String>,
}

impl FieldViolation {
    pub fn new(property: impl Into<String>, constraint: &str, message: impl Into<String>) -> Self {
        let mut constraints = BTreeMap::new();
        constraints.insert(constraint.to_string(), message.into());
        FieldViolation { value: None, property: property.into(), constraints }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// Logging-only classification of an error's likely origin. Never changes the
/// wire status; it exists so triage can separate a persistence failure from a
/// malformed payload without reading stack traces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticCategory {
    Validation,
    Domain,
    Rpc,
    Persistence,
    Serialization,
    Unknown,
}

impl DiagnosticCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCategory::Validation => "validation",
            DiagnosticCategory::Domain => "domain",
            DiagnosticCategory::Rpc => "rpc",
            DiagnosticCategory::Persistence => "persistence",
            DiagnosticCategory::Serialization => "serialization",
            DiagnosticCategory::Unknown => "unknown",
        }
    }
}

/// Closed taxonomy of everything a handler can raise. The normalizers match
/// these variants explicitly; there is no structural probing of foreign error
/// shapes.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed client input. Always a 400 / INVALID_ARGUMENT.
    #[error("request validation failed")]
    Validation { violations: Vec<FieldViolation> },

    /// Intentional business-rule rejection carrying an explicit HTTP status.
    #[error("{}", .message.translate_key)]
    Domain { status: StatusCode, message: MessageDescriptor },

    /// An error that already travelled through the RPC status space and
    /// carries its code.
    #[error("{}", .message.translate_key)]
    Rpc { code: RpcCode, message: MessageDescriptor },

    /// Anything unexpected. Logged in full, crosses the wire as a generic
    /// internal error.
    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(violations: Vec<FieldViolation>) -> Self {
        AppError::Validation { violations }
    }

    pub fn domain(status: StatusCode, message: MessageDescriptor) -> Self {
        AppError::Domain { status, message }
    }

    pub fn not_found(message: MessageDescriptor) -> Self {
        AppError::Domain { status: StatusCode::NOT_FOUND, message }
    }

    pub fn rpc(code: RpcCode, message: MessageDescriptor) -> Self {
        AppError::Rpc { code, message }
    }

    pub fn diagnostic(&self) -> DiagnosticCategory {
        match self {
            AppError::Validation { .. } => DiagnosticCategory::Validation,
            AppError::Domain { .. } => DiagnosticCategory::Domain,
            AppError::Rpc { .. } => DiagnosticCategory::Rpc,
            AppError::Unclassified(err) => {
                for cause in err.chain() {
                    if cause.downcast_ref::<io::Error>().is_some() {
                        return DiagnosticCategory::Persistence;
                    }
                    if cause.downcast_ref::<JsonError>().is_some() {
                        return DiagnosticCategory::Serialization;
                    }
                }
                DiagnosticCategory::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn diagnostic_spots_persistence_failures() {
        let io = io::Error::new(io::ErrorKind::ConnectionRefused, "db gone");
        let err = AppError::Unclassified(anyhow::Error::new(io).context("loading tour"));
        assert_eq!(err.diagnostic(), DiagnosticCategory::Persistence);
    }

    #[test]
    fn diagnostic_spots_serialization_failures() {
        let json = serde_json::from_str::<Value>("{").unwrap_err();
        let err = AppError::Unclassified(anyhow::Error::new(json));
        assert_eq!(err.diagnostic(), DiagnosticCategory::Serialization);
    }

    #[test]
    fn diagnostic_defaults_to_unknown() {
        let err = AppError::Unclassified(anyhow!("something odd"));
        assert_eq!(err.diagnostic(), DiagnosticCategory::Unknown);
    }

    #[test]
    fn violation_records_first_constraint_only() {
        let violation = FieldViolation::new("rating", "max", "rating must be at most 5")
            .with_value(Value::from(9));
        assert_eq!(violation.constraints.len(), 1);
        assert_eq!(violation.value, Some(Value::from(9)));
    }
}
