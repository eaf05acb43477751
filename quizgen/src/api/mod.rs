//! API layer for HTTP request handling and data models.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Request/response data structures
//!
//! The only functional endpoint is `POST /api/generate-quiz`. It is documented with `utoipa`;
//! the OpenAPI document is served at `/api-docs/openapi.json` and browsable at `/docs`.

pub mod handlers;
pub mod models;
