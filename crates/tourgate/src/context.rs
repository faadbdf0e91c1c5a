//! Per-request isolated state, carried across `.await` points.
//!
//! Each inbound call runs inside a [`scope`] holding one [`RequestContext`].
//! Storage is `task_local!`, so concurrently in-flight requests interleaving
//! on the same worker never observe each other's values, and the context
//! survives I/O suspension without explicit parameter threading. It is
//! destroyed when the scope future completes; there is no teardown call.

use std::{cell::RefCell, collections::BTreeMap, future::Future};

use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::i18n::language::Language;

/// Protocol surface a request arrived on. Drives error-normalizer deferral.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Surface {
    Http,
    Rpc,
}

impl Surface {
    pub fn as_str(self) -> &'static str {
        match self {
            Surface::Http => "http",
            Surface::Rpc => "rpc",
        }
    }
}

/// Caller identity attached at ingress. Context attachment only; no
/// authorization decisions happen in this layer.
#[derive(Clone, Debug)]
pub struct Identity {
    pub user_id: String,
}

/// Sanitized snapshot of the inbound request, captured at ingress so the
/// error normalizers can log it without re-reading the (possibly consumed)
/// request. Credential-bearing headers and body fields are stripped before
/// the snapshot enters the context.
#[derive(Clone, Debug, Default)]
pub struct RequestSnapshot {
    pub target: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
}

const SENSITIVE_HEADERS: &[&str] = &["authorization", "cookie", "x-api-key", "x-auth-token"];
const SENSITIVE_FIELDS: &[&str] =
    &["password", "token", "secret", "apiKey", "accessToken", "refreshToken"];
const REDACTED: &str = "[redacted]";

impl RequestSnapshot {
    pub fn new(target: impl Into<String>) -> Self {
        RequestSnapshot { target: target.into(), headers: BTreeMap::new(), body: None }
    }

    /// Record a header, redacting denylisted names.
    pub fn header(&mut self, name: &str, value: &str) {
        let lowered = name.to_ascii_lowercase();
        let value = if SENSITIVE_HEADERS.contains(&lowered.as_str()) {
            REDACTED.to_string()
        } else {
            value.to_string()
        };
        self.headers.insert(lowered, value);
    }

    /// Record a body, redacting denylisted fields at every depth.
    pub fn body(&mut self, body: Value) {
        self.body = Some(redact(body));
    }
}

fn redact(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| {
                    if SENSITIVE_FIELDS.contains(&key.as_str()) {
                        (key, Value::String(REDACTED.to_string()))
                    } else {
                        (key, redact(value))
                    }
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(redact).collect()),
        other => other,
    }
}

/// Ephemeral state for one inbound call.
#[derive(Clone, Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub surface: Surface,
    pub language: Option<Language>,
    pub identity: Option<Identity>,
    pub started_at: OffsetDateTime,
    pub snapshot: RequestSnapshot,
}

impl RequestContext {
    /// Seed a fresh context with a generated correlation id.
    pub fn new(surface: Surface) -> Self {
        RequestContext {
            request_id: Uuid::new_v4().to_string(),
            surface,
            language: None,
            identity: None,
            started_at: OffsetDateTime::now_utc(),
            snapshot: RequestSnapshot::default(),
        }
    }

    pub fn with_snapshot(mut self, snapshot: RequestSnapshot) -> Self {
        self.snapshot = snapshot;
        self
    }
}

tokio::task_local! {
    static CURRENT: RefCell<RequestContext>;
}

/// Run `fut` inside an isolated scope seeded with `seed`. The scope covers
/// the entire execution chain of the future, including continuations resumed
/// after I/O suspension.
pub async fn scope<F>(seed: RequestContext, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT.scope(RefCell::new(seed), fut).await
}

/// Snapshot of the active context, or `None` outside any scope.
pub fn current() -> Option<RequestContext> {
    CURRENT.try_with(|cx| cx.borrow().clone()).ok()
}

pub fn request_id() -> Option<String> {
    CURRENT.try_with(|cx| cx.borrow().request_id.clone()).ok()
}

pub fn language() -> Option<Language> {
    CURRENT.try_with(|cx| cx.borrow().language).ok().flatten()
}

pub fn surface() -> Option<Surface> {
    CURRENT.try_with(|cx| cx.borrow().surface).ok()
}

/// Write the resolved language into the active scope. Returns `false` when
/// called outside a scope; trusted boundary steps treat that as a no-op.
pub fn set_language(language: Language) -> bool {
    CURRENT
        .try_with(|cx| {
            cx.borrow_mut().language = Some(language);
        })
        .is_ok()
}

pub fn set_identity(identity: Identity) -> bool {
    CURRENT
        .try_with(|cx| {
            cx.borrow_mut().identity = Some(identity);
        })
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn accessors_outside_scope_return_absent() {
        assert!(current().is_none());
        assert!(language().is_none());
        assert!(!set_language(Language::EnUs));
    }

    #[tokio::test]
    async fn scope_isolates_interleaved_requests() {
        let first = scope(RequestContext::new(Surface::Http), async {
            set_language(Language::PhPh);
            tokio::task::yield_now().await;
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            language()
        });
        let second = scope(RequestContext::new(Surface::Http), async {
            set_language(Language::EnUs);
            tokio::task::yield_now().await;
            language()
        });

        let (a, b) = tokio::join!(first, second);
        assert_eq!(a, Some(Language::PhPh));
        assert_eq!(b, Some(Language::EnUs));
    }

    #[tokio::test]
    async fn scope_survives_spawned_io_suspension() {
        let seed = RequestContext::new(Surface::Rpc);
        let id = seed.request_id.clone();
        let observed = scope(seed, async {
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
            request_id()
        })
        .await;
        assert_eq!(observed, Some(id));
    }

    #[test]
    fn snapshot_redacts_denylisted_headers_and_fields() {
        let mut snapshot = RequestSnapshot::new("POST /api/login");
        snapshot.header("Authorization", "Bearer hunter2");
        snapshot.header("accept", "application/json");
        snapshot.body(json!({
            "user": "aidan",
            "password": "hunter2",
            "nested": {"token": "abc", "keep": 1},
            "list": [{"secret": "x"}]
        }));

        assert_eq!(snapshot.headers["authorization"], "[redacted]");
        assert_eq!(snapshot.headers["accept"], "application/json");
        let body = snapshot.body.unwrap();
        assert_eq!(body["password"], "[redacted]");
        assert_eq!(body["nested"]["token"], "[redacted]");
        assert_eq!(body["nested"]["keep"], 1);
        assert_eq!(body["list"][0]["secret"], "[redacted]");
        assert_eq!(body["user"], "aidan");
    }
}
