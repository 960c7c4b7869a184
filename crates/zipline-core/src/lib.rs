//! # Zipline Core
//!
//! Core types, traits, and error handling for zipline.
//!
//! This crate provides the host that response-rewriting middleware plugs into:
//! - Request context and response writers
//! - Middleware and handler traits
//! - A small exact-match router
//! - The engine that runs a chain for each request
//! - Error types

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]

pub mod body;
pub mod context;
pub mod engine;
pub mod error;
pub mod middleware;
pub mod router;
pub mod writer;

pub use body::Body;
pub use context::Context;
pub use engine::{Engine, EngineBuilder};
pub use error::{Error, Result};
pub use middleware::{Handler, Middleware, Next};
pub use router::Router;
pub use writer::{BodyWriter, ResponseWriter};

#[doc(hidden)]
pub use async_trait::async_trait;

// Re-export commonly used HTTP types
pub use bytes::Bytes;
pub use http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::context::Context;
    pub use crate::engine::Engine;
    pub use crate::error::{Error, Result};
    pub use crate::middleware::{Handler, Middleware, Next};
    pub use crate::router::Router;
    pub use crate::writer::ResponseWriter;
}
