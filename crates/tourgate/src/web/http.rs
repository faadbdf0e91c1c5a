//! HTTP surface: REST routes, the request-scope middleware pair, the
//! localized response wrapper, and the HTTP rendering of error envelopes.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Result;
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query, State},
    http::{HeaderName, Method, Request, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tokio::{net::TcpListener, task::JoinHandle};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

use crate::{
    context::{self, Identity, RequestContext, RequestSnapshot, Surface},
    error::{AppError, FieldViolation},
    i18n::{
        language::Language,
        project::EntityProjector,
        translate::{self, MessageDescriptor, TranslationEngine},
        walker,
    },
    normalize::{self, ErrorEnvelope},
    store::{TOUR_PROJECTION, TourStore},
};

pub const LANG_HEADER: &str = "x-lang";
pub const USER_HEADER: &str = "x-user-id";

#[derive(Clone)]
pub struct HttpState {
    pub engine: Arc<TranslationEngine>,
    pub projector: EntityProjector,
    pub tours: Arc<TourStore>,
}

impl HttpState {
    pub fn new(engine: Arc<TranslationEngine>, tours: Arc<TourStore>) -> Self {
        let projector = EntityProjector::new(engine.default_language());
        HttpState { engine, projector, tours }
    }
}

#[derive(Debug)]
pub struct HttpServerHandle {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl HttpServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}

/// JSON body wrapper that localizes the response tree on the way out.
/// Resolution happens at serialization time, after handlers have finished
/// and the request language is final.
pub struct Localized<T>(pub T);

impl<T: Serialize> IntoResponse for Localized<T> {
    fn into_response(self) -> Response {
        let value = match serde_json::to_value(self.0) {
            Ok(value) => value,
            Err(err) => return AppError::Unclassified(err.into()).into_response(),
        };
        let value = match translate::global() {
            Some(engine) => walker::walk(engine, value),
            None => value,
        };
        Json(value).into_response()
    }
}

/// HTTP wire shape of a normalized error.
#[derive(Debug, Serialize)]
struct HttpErrorBody {
    #[serde(rename = "translateKey", skip_serializing_if = "Option::is_none")]
    translate_key: Option<String>,
    message: String,
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
    #[serde(rename = "validationErrors", skip_serializing_if = "Option::is_none")]
    validation_errors: Option<Vec<FieldViolation>>,
}

fn envelope_response(envelope: ErrorEnvelope) -> Response {
    let errors = envelope.violations.as_ref().map(|violations| {
        violations
            .iter()
            .flat_map(|violation| violation.constraints.values().cloned())
            .collect()
    });
    let body = HttpErrorBody {
        translate_key: envelope.translate_key,
        message: envelope.message,
        error: envelope.code.name(),
        errors,
        validation_errors: envelope.violations,
    };
    (envelope.status, Json(body)).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        envelope_response(normalize::normalize_any(self))
    }
}

pub fn build_router(state: HttpState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::ACCEPT,
            header::CONTENT_TYPE,
            HeaderName::from_static(LANG_HEADER),
            HeaderName::from_static(USER_HEADER),
        ])
        .allow_origin(Any);

    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/welcome", get(get_welcome))
        .route("/api/tours", get(list_tours))
        .route("/api/tours/:id", get(get_tour))
        .route("/api/feedback", post(create_feedback))
        .layer(middleware::from_fn(resolve_language))
        .layer(middleware::from_fn(request_scope))
        .layer(cors)
        .with_state(state)
}

/// Outermost middleware: every request runs inside a fresh isolated context
/// scope, seeded with a correlation id, the HTTP surface marker, the caller
/// identity when supplied, and a sanitized snapshot for error logging.
async fn request_scope(req: Request<Body>, next: Next) -> Response {
    let mut snapshot = RequestSnapshot::new(format!("{} {}", req.method(), req.uri()));
    for (name, value) in req.headers() {
        if let Ok(value) = value.to_str() {
            snapshot.header(name.as_str(), value);
        }
    }

    let mut seed = RequestContext::new(Surface::Http).with_snapshot(snapshot);
    if let Some(user_id) = req
        .headers()
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
    {
        seed.identity = Some(Identity { user_id: user_id.to_string() });
    }

    context::scope(seed, next.run(req)).await
}

/// Resolve the request language from the `x-lang` header, overridable by a
/// `lang` query parameter. Unsupported tags are ignored and the configured
/// default applies.
async fn resolve_language(req: Request<Body>, next: Next) -> Response {
    let from_query = req.uri().query().and_then(|query| {
        query.split('&').find_map(|pair| {
            pair.strip_prefix("lang=").and_then(Language::parse)
        })
    });
    let resolved = from_query.or_else(|| {
        req.headers()
            .get(LANG_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(Language::parse)
    });
    if let Some(language) = resolved {
        context::set_language(language);
    }
    next.run(req).await
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

#[derive(Deserialize)]
struct WelcomeQuery {
    name: Option<String>,
}

async fn get_welcome(Query(query): Query<WelcomeQuery>) -> Localized<Value> {
    let name = query
        .name
        .or_else(|| context::current().and_then(|cx| cx.identity).map(|id| id.user_id))
        .unwrap_or_else(|| "guest".to_string());
    let mut args = Map::new();
    args.insert("name".into(), Value::String(name));
    Localized(json!({
        "message": MessageDescriptor::key("common.admin.welcome").with_args(args),
    }))
}

async fn list_tours(State(state): State<HttpState>) -> Localized<Value> {
    let tours: Vec<Value> = state
        .tours
        .list()
        .iter()
        .map(|tour| {
            Value::Object(state.projector.project(
                &tour.base_fields(),
                &tour.translations,
                &TOUR_PROJECTION,
            ))
        })
        .collect();
    Localized(json!({ "tours": tours }))
}

async fn get_tour(
    State(state): State<HttpState>,
    Path(id): Path<String>,
) -> Result<Localized<Value>, AppError> {
    let tour = state.tours.get(&id).ok_or_else(|| {
        let mut args = Map::new();
        args.insert("id".into(), Value::String(id.clone()));
        AppError::not_found(
            MessageDescriptor::key("errors.tour_not_found")
                .with_args(args)
                .with_default("Tour not found."),
        )
    })?;
    let dto = state.projector.project(&tour.base_fields(), &tour.translations, &TOUR_PROJECTION);
    Ok(Localized(Value::Object(dto)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FeedbackRequest {
    tour_id: Option<String>,
    rating: Option<i64>,
    comment: Option<String>,
}

async fn create_feedback(
    State(state): State<HttpState>,
    Json(body): Json<FeedbackRequest>,
) -> Result<(StatusCode, Localized<Value>), AppError> {
    let mut violations = Vec::new();

    let tour_id = body.tour_id.unwrap_or_default();
    if tour_id.is_empty() {
        violations.push(FieldViolation::new(
            "tourId",
            "isNotEmpty",
            "tourId must not be empty",
        ));
    }
    match body.rating {
        None => violations.push(FieldViolation::new(
            "rating",
            "isDefined",
            "rating is required",
        )),
        Some(rating) if !(1..=5).contains(&rating) => violations.push(
            FieldViolation::new("rating", "range", "rating must be between 1 and 5")
                .with_value(Value::from(rating)),
        ),
        Some(_) => {}
    }
    if body.comment.as_deref().is_some_and(|comment| comment.len() > 2000) {
        violations.push(FieldViolation::new(
            "comment",
            "maxLength",
            "comment must be at most 2000 characters",
        ));
    }
    if !violations.is_empty() {
        return Err(AppError::validation(violations));
    }

    if state.tours.get(&tour_id).is_none() {
        let mut args = Map::new();
        args.insert("id".into(), Value::String(tour_id));
        return Err(AppError::not_found(
            MessageDescriptor::key("errors.tour_not_found")
                .with_args(args)
                .with_default("Tour not found."),
        ));
    }

    Ok((
        StatusCode::CREATED,
        Localized(json!({
            "accepted": true,
            "message": MessageDescriptor::key("feedback.thanks")
                .with_default("Thanks for your feedback."),
        })),
    ))
}

pub async fn spawn_http_server(state: HttpState, addr: SocketAddr) -> Result<HttpServerHandle> {
    let router = build_router(state);
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("HTTP server listening on {}", local_addr);

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, router).await {
            error!("HTTP server terminated with error: {err}");
        }
    });

    Ok(HttpServerHandle { addr: local_addr, task })
}
