//! RPC surface: line-delimited JSON over a local socket.
//!
//! Every request carries a method, params, and a metadata map. Responses use
//! the status/error/data/metadata envelope; the `requestId` metadata entry,
//! when present, is echoed back so callers can correlate replies.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use interprocess::local_socket::traits::tokio::Listener as _;
use interprocess::local_socket::{
    GenericFilePath, ListenerOptions, ToFsName, tokio::prelude::LocalSocketStream,
};

use crate::{
    context::{self, RequestContext, RequestSnapshot, Surface},
    error::AppError,
    i18n::{
        language::Language,
        project::EntityProjector,
        translate::{MessageDescriptor, TranslationEngine},
        walker,
    },
    normalize::{self, ErrorEnvelope},
    status::RpcCode,
    store::{TOUR_PROJECTION, TourStore},
};

/// One RPC call, tagged by method.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    #[serde(flatten)]
    pub method: RpcMethod,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", content = "params")]
pub enum RpcMethod {
    GetTour { id: String },
    ListTours,
    Ping,
}

/// Status block carried on every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcStatus {
    pub code: i32,
    pub message: String,
    #[serde(rename = "isSuccess")]
    pub is_success: bool,
}

/// Error block present only on failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorDetail {
    pub code: String,
    pub message: String,
    pub timestamp: String,
}

/// Wire envelope for one response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    pub status: RpcStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcErrorDetail>,
    pub data: Option<Value>,
    pub metadata: BTreeMap<String, String>,
}

impl RpcResponse {
    fn success(data: Value, metadata: BTreeMap<String, String>) -> Self {
        RpcResponse {
            status: RpcStatus {
                code: RpcCode::Ok.code(),
                message: RpcCode::Ok.name().to_string(),
                is_success: true,
            },
            error: None,
            data: Some(data),
            metadata,
        }
    }

    fn failure(envelope: ErrorEnvelope, metadata: BTreeMap<String, String>) -> Self {
        let timestamp = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default();
        RpcResponse {
            status: RpcStatus {
                code: envelope.code.code(),
                message: envelope.message.clone(),
                is_success: false,
            },
            error: Some(RpcErrorDetail {
                code: envelope.code.name().to_string(),
                message: envelope.message,
                timestamp,
            }),
            data: None,
            metadata,
        }
    }
}

#[derive(Clone)]
pub struct RpcState {
    pub engine: Arc<TranslationEngine>,
    pub projector: EntityProjector,
    pub tours: Arc<TourStore>,
}

impl RpcState {
    pub fn new(engine: Arc<TranslationEngine>, tours: Arc<TourStore>) -> Self {
        let projector = EntityProjector::new(engine.default_language());
        RpcState { engine, projector, tours }
    }
}

/// RPC server listening on a local socket.
pub struct RpcServer {
    state: RpcState,
    socket_path: PathBuf,
}

impl RpcServer {
    pub fn new(state: RpcState, socket_path: PathBuf) -> Self {
        Self { state, socket_path }
    }

    pub async fn start(self) -> anyhow::Result<()> {
        #[cfg(unix)]
        {
            if self.socket_path.exists() {
                std::fs::remove_file(&self.socket_path)?;
            }
            if let Some(parent) = self.socket_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let socket_display = self.socket_path.to_string_lossy().into_owned();
        let listener_name = socket_display.as_str().to_fs_name::<GenericFilePath>()?;
        let listener = ListenerOptions::new().name(listener_name).create_tokio()?;
        info!("RPC server listening on {}", socket_display);

        loop {
            match listener.accept().await {
                Ok(stream) => {
                    let state = self.state.clone();
                    tokio::spawn(async move {
                        if let Err(err) = handle_connection(stream, state).await {
                            error!("RPC connection ended with error: {err}");
                        }
                    });
                }
                Err(err) => {
                    error!("RPC accept failed: {err}");
                }
            }
        }
    }
}

async fn handle_connection(stream: LocalSocketStream, state: RpcState) -> anyhow::Result<()> {
    let (reader, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    while reader.read_line(&mut line).await? > 0 {
        let response = match serde_json::from_str::<RpcRequest>(line.trim()) {
            Ok(request) => dispatch(request, &state).await,
            Err(err) => {
                debug!("malformed RPC request: {err}");
                let envelope = normalize::normalize_any(AppError::rpc(
                    RpcCode::InvalidArgument,
                    MessageDescriptor::key("errors.validation")
                        .with_default("Request validation failed."),
                ));
                RpcResponse::failure(envelope, BTreeMap::new())
            }
        };
        let payload = serde_json::to_string(&response)? + "\n";
        writer.write_all(payload.as_bytes()).await?;
        line.clear();
    }

    Ok(())
}

/// Run one request inside its own context scope and render the envelope.
pub async fn dispatch(request: RpcRequest, state: &RpcState) -> RpcResponse {
    let method_name = match &request.method {
        RpcMethod::GetTour { .. } => "GetTour",
        RpcMethod::ListTours => "ListTours",
        RpcMethod::Ping => "Ping",
    };
    let mut snapshot = RequestSnapshot::new(format!("rpc {method_name}"));
    if let Ok(params) = serde_json::to_value(&request.method) {
        snapshot.body(params);
    }
    let seed = RequestContext::new(Surface::Rpc).with_snapshot(snapshot);

    let mut metadata = BTreeMap::new();
    if let Some(request_id) = request.metadata.get("requestId") {
        metadata.insert("requestId".to_string(), request_id.clone());
    }

    context::scope(seed, async {
        if let Some(language) = request.metadata.get("lang").and_then(|raw| Language::parse(raw)) {
            context::set_language(language);
        }

        match handle_method(request.method, state).await {
            Ok(data) => {
                let data = walker::walk(&state.engine, data);
                RpcResponse::success(data, metadata)
            }
            Err(err) => RpcResponse::failure(normalize::normalize_any(err), metadata),
        }
    })
    .await
}

async fn handle_method(method: RpcMethod, state: &RpcState) -> Result<Value, AppError> {
    match method {
        RpcMethod::Ping => Ok(json!({"pong": true})),
        RpcMethod::ListTours => {
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
            Ok(json!({ "tours": tours }))
        }
        RpcMethod::GetTour { id } => {
            let tour = state.tours.get(&id).ok_or_else(|| {
                let mut args = Map::new();
                args.insert("id".into(), Value::String(id.clone()));
                AppError::rpc(
                    RpcCode::NotFound,
                    MessageDescriptor::key("errors.tour_not_found")
                        .with_args(args)
                        .with_default("Tour not found."),
                )
            })?;
            let dto =
                state.projector.project(&tour.base_fields(), &tour.translations, &TOUR_PROJECTION);
            Ok(Value::Object(dto))
        }
    }
}
