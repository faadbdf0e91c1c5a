use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use serde_json::{Value, json};
use tokio::runtime::Runtime;
use tourgate::{
    Language,
    i18n::{catalog::Catalog, translate::{self, TranslationEngine}},
    store::TourStore,
    web::http::{self, HttpState},
};
use tower::ServiceExt;

fn test_runtime() -> Runtime {
    Runtime::new().expect("create tokio runtime")
}

fn engine() -> Arc<TranslationEngine> {
    let catalog = Catalog::from_bundles([
        (
            Language::EnUs,
            json!({
                "common": {"admin": {"welcome": "Welcome, {name}!"}},
                "feedback": {"thanks": "Thanks for your feedback."},
                "errors": {
                    "internal": "An internal error occurred.",
                    "validation": "Request validation failed.",
                    "tour_not_found": "Tour {id} was not found."
                }
            }),
        ),
        (
            Language::PhPh,
            json!({
                "common": {"admin": {"welcome": "Maligayang pagdating, {name}!"}},
                "errors": {
                    "validation": "Nabigo ang pagpapatunay ng kahilingan.",
                    "tour_not_found": "Hindi natagpuan ang tour na {id}."
                }
            }),
        ),
    ]);
    let engine = Arc::new(TranslationEngine::new(Arc::new(catalog), Language::EnUs));
    translate::install((*engine).clone());
    engine
}

fn make_router() -> Router {
    let state = HttpState::new(engine(), Arc::new(TourStore::sample()));
    http::build_router(state)
}

async fn get_json(router: &Router, uri: &str, headers: &[(&str, &str)]) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    let response =
        router.clone().oneshot(builder.body(Body::empty()).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

async fn post_json(router: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

#[test]
fn health_endpoint_reports_ok() {
    test_runtime().block_on(async {
        let router = make_router();
        let (status, body) = get_json(&router, "/api/health", &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], json!("ok"));
    });
}

#[test]
fn welcome_message_localizes_from_lang_header() {
    test_runtime().block_on(async {
        let router = make_router();

        let (status, body) =
            get_json(&router, "/api/welcome?name=Aidan", &[("x-lang", "ph_PH")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], json!("Maligayang pagdating, Aidan!"));

        let (_, body) = get_json(&router, "/api/welcome?name=Aidan", &[]).await;
        assert_eq!(body["message"], json!("Welcome, Aidan!"));
    });
}

#[test]
fn lang_query_parameter_overrides_header() {
    test_runtime().block_on(async {
        let router = make_router();
        let (_, body) = get_json(
            &router,
            "/api/welcome?name=Aidan&lang=en_US",
            &[("x-lang", "ph_PH")],
        )
        .await;
        assert_eq!(body["message"], json!("Welcome, Aidan!"));
    });
}

#[test]
fn welcome_falls_back_to_identity_header() {
    test_runtime().block_on(async {
        let router = make_router();
        let (_, body) = get_json(&router, "/api/welcome", &[("x-user-id", "user-42")]).await;
        assert_eq!(body["message"], json!("Welcome, user-42!"));
    });
}

#[test]
fn tour_detail_projects_request_language() {
    test_runtime().block_on(async {
        let router = make_router();

        let (status, body) =
            get_json(&router, "/api/tours/tour-001", &[("x-lang", "ph_PH")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], json!("Look ng Paglubog ng Araw"));
        assert_eq!(body["slug"], json!("sunset-bay"));
        assert_eq!(body["sceneCount"], json!(4));

        let (_, body) = get_json(&router, "/api/tours/tour-001", &[]).await;
        assert_eq!(body["title"], json!("Sunset Bay"));
    });
}

#[test]
fn tour_without_requested_language_omits_translatable_fields() {
    test_runtime().block_on(async {
        let router = make_router();
        let (status, body) =
            get_json(&router, "/api/tours/tour-002", &[("x-lang", "ph_PH")]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["slug"], json!("old-quarter"));
        assert!(body.get("title").is_none());
    });
}

#[test]
fn missing_tour_renders_translated_error_envelope() {
    test_runtime().block_on(async {
        let router = make_router();
        let (status, body) =
            get_json(&router, "/api/tours/tour-999", &[("x-lang", "ph_PH")]).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], json!("NOT_FOUND"));
        assert_eq!(body["translateKey"], json!("errors.tour_not_found"));
        assert_eq!(body["message"], json!("Hindi natagpuan ang tour na tour-999."));
        assert!(body.get("validationErrors").is_none());
    });
}

#[test]
fn invalid_feedback_renders_validation_envelope() {
    test_runtime().block_on(async {
        let router = make_router();
        let (status, body) =
            post_json(&router, "/api/feedback", json!({"tourId": "", "rating": 9})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], json!("INVALID_ARGUMENT"));
        assert_eq!(body["message"], json!("Request validation failed."));

        let violations = body["validationErrors"].as_array().unwrap();
        assert_eq!(violations.len(), 2);
        let properties: Vec<&str> =
            violations.iter().map(|v| v["property"].as_str().unwrap()).collect();
        assert!(properties.contains(&"tourId"));
        assert!(properties.contains(&"rating"));

        let messages = body["errors"].as_array().unwrap();
        assert!(messages.iter().any(|m| m.as_str().unwrap().contains("between 1 and 5")));
    });
}

#[test]
fn valid_feedback_is_accepted_with_localized_message() {
    test_runtime().block_on(async {
        let router = make_router();
        let (status, body) = post_json(
            &router,
            "/api/feedback",
            json!({"tourId": "tour-001", "rating": 5, "comment": "great"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["accepted"], json!(true));
        assert_eq!(body["message"], json!("Thanks for your feedback."));
    });
}

#[test]
fn concurrent_requests_keep_languages_isolated() {
    test_runtime().block_on(async {
        let router = make_router();

        let english = get_json(&router, "/api/welcome?name=Ana", &[("x-lang", "en_US")]);
        let filipino = get_json(&router, "/api/welcome?name=Ana", &[("x-lang", "ph_PH")]);
        let (en, ph) = tokio::join!(english, filipino);

        assert_eq!(en.1["message"], json!("Welcome, Ana!"));
        assert_eq!(ph.1["message"], json!("Maligayang pagdating, Ana!"));
    });
}
