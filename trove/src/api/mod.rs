//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers for all endpoints
//! - **[`models`]**: request/response structures for API communication
//!
//! The HTTP surface is form-driven: mutating routes accept urlencoded or
//! multipart bodies and answer `303 See Other` redirects, read routes return
//! JSON. Endpoints are documented with `utoipa` annotations; the rendered
//! docs are served at `/docs`.

pub mod handlers;
pub mod models;
