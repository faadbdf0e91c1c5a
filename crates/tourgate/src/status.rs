//! Canonical RPC status codes and the bidirectional mapping between the RPC
//! code space and HTTP status codes.
//!
//! The mapping is deliberately lossy in one direction: many HTTP statuses
//! collapse onto `Internal`, and several RPC codes share an HTTP status. The
//! invariant kept is family stability: mapping an HTTP status to an RPC code
//! and back never moves the status out of its 2xx/4xx/5xx family.

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

/// The 17 canonical RPC status codes, numerically compatible with the
/// gRPC code space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpcCode {
    Ok,
    Cancelled,
    Unknown,
    InvalidArgument,
    DeadlineExceeded,
    NotFound,
    AlreadyExists,
    PermissionDenied,
    ResourceExhausted,
    FailedPrecondition,
    Aborted,
    OutOfRange,
    Unimplemented,
    Internal,
    Unavailable,
    DataLoss,
    Unauthenticated,
}

impl RpcCode {
    /// Numeric wire value, 0 through 16.
    pub fn code(self) -> i32 {
        match self {
            RpcCode::Ok => 0,
            RpcCode::Cancelled => 1,
            RpcCode::Unknown => 2,
            RpcCode::InvalidArgument => 3,
            RpcCode::DeadlineExceeded => 4,
            RpcCode::NotFound => 5,
            RpcCode::AlreadyExists => 6,
            RpcCode::PermissionDenied => 7,
            RpcCode::ResourceExhausted => 8,
            RpcCode::FailedPrecondition => 9,
            RpcCode::Aborted => 10,
            RpcCode::OutOfRange => 11,
            RpcCode::Unimplemented => 12,
            RpcCode::Internal => 13,
            RpcCode::Unavailable => 14,
            RpcCode::DataLoss => 15,
            RpcCode::Unauthenticated => 16,
        }
    }

    pub fn from_i32(code: i32) -> Option<RpcCode> {
        Some(match code {
            0 => RpcCode::Ok,
            1 => RpcCode::Cancelled,
            2 => RpcCode::Unknown,
            3 => RpcCode::InvalidArgument,
            4 => RpcCode::DeadlineExceeded,
            5 => RpcCode::NotFound,
            6 => RpcCode::AlreadyExists,
            7 => RpcCode::PermissionDenied,
            8 => RpcCode::ResourceExhausted,
            9 => RpcCode::FailedPrecondition,
            10 => RpcCode::Aborted,
            11 => RpcCode::OutOfRange,
            12 => RpcCode::Unimplemented,
            13 => RpcCode::Internal,
            14 => RpcCode::Unavailable,
            15 => RpcCode::DataLoss,
            16 => RpcCode::Unauthenticated,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            RpcCode::Ok => "OK",
            RpcCode::Cancelled => "CANCELLED",
            RpcCode::Unknown => "UNKNOWN",
            RpcCode::InvalidArgument => "INVALID_ARGUMENT",
            RpcCode::DeadlineExceeded => "DEADLINE_EXCEEDED",
            RpcCode::NotFound => "NOT_FOUND",
            RpcCode::AlreadyExists => "ALREADY_EXISTS",
            RpcCode::PermissionDenied => "PERMISSION_DENIED",
            RpcCode::ResourceExhausted => "RESOURCE_EXHAUSTED",
            RpcCode::FailedPrecondition => "FAILED_PRECONDITION",
            RpcCode::Aborted => "ABORTED",
            RpcCode::OutOfRange => "OUT_OF_RANGE",
            RpcCode::Unimplemented => "UNIMPLEMENTED",
            RpcCode::Internal => "INTERNAL",
            RpcCode::Unavailable => "UNAVAILABLE",
            RpcCode::DataLoss => "DATA_LOSS",
            RpcCode::Unauthenticated => "UNAUTHENTICATED",
        }
    }
}

impl std::fmt::Display for RpcCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// HTTP status used when a client closed the connection before the response.
/// Not a registered status, so it is built at runtime.
fn client_closed_request() -> StatusCode {
    StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Map an RPC code onto the HTTP status a REST client should see. Total over
/// the code space.
pub fn rpc_to_http(code: RpcCode) -> StatusCode {
    match code {
        RpcCode::Ok => StatusCode::OK,
        RpcCode::Cancelled => client_closed_request(),
        RpcCode::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        RpcCode::InvalidArgument => StatusCode::BAD_REQUEST,
        RpcCode::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        RpcCode::NotFound => StatusCode::NOT_FOUND,
        RpcCode::AlreadyExists => StatusCode::CONFLICT,
        RpcCode::PermissionDenied => StatusCode::FORBIDDEN,
        RpcCode::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        RpcCode::FailedPrecondition => StatusCode::PRECONDITION_FAILED,
        RpcCode::Aborted => StatusCode::CONFLICT,
        RpcCode::OutOfRange => StatusCode::BAD_REQUEST,
        RpcCode::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        RpcCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        RpcCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        RpcCode::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
        RpcCode::Unauthenticated => StatusCode::UNAUTHORIZED,
    }
}

/// Map an HTTP status into the RPC code space. Statuses without a dedicated
/// entry collapse onto `Internal`. 408 maps to `Cancelled` rather than
/// `DeadlineExceeded` so the round trip stays inside the 4xx family.
pub fn http_to_rpc(status: StatusCode) -> RpcCode {
    match status.as_u16() {
        200 => RpcCode::Ok,
        400 => RpcCode::InvalidArgument,
        401 => RpcCode::Unauthenticated,
        403 => RpcCode::PermissionDenied,
        404 => RpcCode::NotFound,
        408 => RpcCode::Cancelled,
        409 => RpcCode::AlreadyExists,
        412 => RpcCode::FailedPrecondition,
        416 => RpcCode::OutOfRange,
        429 => RpcCode::ResourceExhausted,
        499 => RpcCode::Cancelled,
        500 => RpcCode::Internal,
        501 => RpcCode::Unimplemented,
        503 => RpcCode::Unavailable,
        504 => RpcCode::DeadlineExceeded,
        _ => RpcCode::Internal,
    }
}
