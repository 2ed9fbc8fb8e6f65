//! HTTP/REST API layer for Mentorline.
//!
//! Axum-based REST API at `/api/v1/` with bearer token authentication,
//! envelope response format, CORS support, and the `/ws` event socket.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
