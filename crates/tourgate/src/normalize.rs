//! Cross-protocol error normalization.
//!
//! Every error a handler raises funnels through one classifier that produces
//! a canonical [`ErrorEnvelope`]. Each surface owns a normalizer; when an
//! error arrives at the wrong surface's normalizer (both are installed
//! process-wide) it is deferred rather than half-translated, and the sibling
//! picks it up.

use axum::http::StatusCode;
use serde_json::Value;
use tracing::{error, warn};

use crate::{
    context,
    context::Surface,
    error::{AppError, FieldViolation},
    i18n::translate::{self, MessageDescriptor},
    status::{self, RpcCode},
};

/// Surface-independent description of a failed request. Both wire formats
/// are renderings of this envelope.
#[derive(Clone, Debug)]
pub struct ErrorEnvelope {
    pub code: RpcCode,
    pub status: StatusCode,
    pub message: String,
    pub translate_key: Option<String>,
    pub violations: Option<Vec<FieldViolation>>,
}

/// Result of offering an error to one surface's normalizer.
#[derive(Debug)]
pub enum Outcome {
    Handled(ErrorEnvelope),
    /// The error belongs to the other surface; the caller hands it back.
    Deferred(AppError),
}

/// Normalize for the HTTP surface. Defers when the active request scope says
/// the call came in over RPC.
pub fn normalize_http(err: AppError) -> Outcome {
    if context::surface() == Some(Surface::Rpc) {
        return Outcome::Deferred(err);
    }
    Outcome::Handled(classify(err))
}

/// Normalize for the RPC surface. Defers when the active request scope says
/// the call came in over HTTP.
pub fn normalize_rpc(err: AppError) -> Outcome {
    if context::surface() == Some(Surface::Http) {
        return Outcome::Deferred(err);
    }
    Outcome::Handled(classify(err))
}

/// Offer the error to both normalizers in order. At most one defers, so this
/// always produces an envelope; outside any request scope neither defers and
/// the HTTP normalizer wins.
pub fn normalize_any(err: AppError) -> ErrorEnvelope {
    match normalize_http(err) {
        Outcome::Handled(envelope) => envelope,
        Outcome::Deferred(err) => match normalize_rpc(err) {
            Outcome::Handled(envelope) => envelope,
            Outcome::Deferred(err) => classify(err),
        },
    }
}

fn resolve(message: &MessageDescriptor) -> String {
    match translate::global() {
        Some(engine) => engine.resolve(message),
        None => message
            .default_value
            .clone()
            .unwrap_or_else(|| message.translate_key.clone()),
    }
}

fn generic_internal() -> (String, Option<String>) {
    let descriptor = MessageDescriptor::key("errors.internal")
        .with_default("An internal error occurred.");
    (resolve(&descriptor), Some(descriptor.translate_key))
}

/// Classify into the canonical envelope and emit the structured log record.
/// This is the single point where error details and the sanitized request
/// snapshot reach the logs; the wire only ever sees the envelope.
fn classify(err: AppError) -> ErrorEnvelope {
    let diagnostic = err.diagnostic();
    let request_id = context::request_id();
    let snapshot = context::current().map(|cx| cx.snapshot);
    let target = snapshot.as_ref().map(|s| s.target.clone()).unwrap_or_default();

    match err {
        AppError::Validation { violations } => {
            let descriptor = MessageDescriptor::key("errors.validation")
                .with_default("Request validation failed.");
            warn!(
                request_id = ?request_id,
                target = %target,
                category = diagnostic.as_str(),
                violations = violations.len(),
                "request rejected"
            );
            ErrorEnvelope {
                code: RpcCode::InvalidArgument,
                status: StatusCode::BAD_REQUEST,
                message: resolve(&descriptor),
                translate_key: Some(descriptor.translate_key),
                violations: Some(violations),
            }
        }
        AppError::Domain { status, message } => {
            warn!(
                request_id = ?request_id,
                target = %target,
                category = diagnostic.as_str(),
                status = status.as_u16(),
                key = %message.translate_key,
                "domain rejection"
            );
            ErrorEnvelope {
                code: status::http_to_rpc(status),
                status,
                message: resolve(&message),
                translate_key: Some(message.translate_key),
                violations: None,
            }
        }
        AppError::Rpc { code, message } => {
            warn!(
                request_id = ?request_id,
                target = %target,
                category = diagnostic.as_str(),
                code = %code,
                key = %message.translate_key,
                "rpc rejection"
            );
            ErrorEnvelope {
                code,
                status: status::rpc_to_http(code),
                message: resolve(&message),
                translate_key: Some(message.translate_key),
                violations: None,
            }
        }
        AppError::Unclassified(inner) => {
            // Full detail and snapshot go to the log record only; the wire
            // gets the generic localized message.
            let body = snapshot
                .as_ref()
                .and_then(|s| s.body.clone())
                .unwrap_or(Value::Null);
            error!(
                request_id = ?request_id,
                target = %target,
                category = diagnostic.as_str(),
                request_body = %body,
                error = %format!("{inner:#}"),
                "unhandled error"
            );
            let (message, translate_key) = generic_internal();
            ErrorEnvelope {
                code: RpcCode::Internal,
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message,
                translate_key,
                violations: None,
            }
        }
    }
}
