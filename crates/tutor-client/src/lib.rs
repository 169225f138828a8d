//! HTTP client for the study analysis backend.
//!
//! Implements the `StudyBackend` and `HistoryStore` contracts over the
//! backend's JSON endpoints.

pub mod http;
pub mod wire;

pub use http::HttpBackend;
