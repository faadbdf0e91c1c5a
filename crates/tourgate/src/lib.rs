//! Localization and error-normalization layer shared by the tour platform
//! HTTP and RPC surfaces.

pub mod config;
pub mod context;
pub mod error;
pub mod paths;
pub mod status;
pub mod store;

pub use config::GatewayConfig;
pub use context::{RequestContext, Surface};
pub use error::AppError;
pub use i18n::language::Language;
pub use paths::{Layout, default_root};

// Localization pipeline
pub mod i18n {
    pub mod catalog;
    pub mod language;
    pub mod project;
    pub mod translate;
    pub mod walker;
}

// Cross-protocol error normalization
pub mod normalize;

// Web / HTTP surface
pub mod web {
    pub mod http;
}

// RPC surface
pub mod rpc {
    pub mod serve;
}

// Serve command (daemon entry point)
pub mod serve;
