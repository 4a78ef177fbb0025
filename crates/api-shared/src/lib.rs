//! # API Shared
//!
//! Shared request/response definitions for the ASL simulator APIs.
//!
//! Contains:
//! - Plain serde DTOs mirroring the JSON bodies the web layer exchanges
//!   (`dto` module)
//! - The shared `HealthService`
//!
//! Used by `api-rest` and the root `asl-run` binary.

pub mod dto;
pub mod health;

pub use dto::*;
pub use health::HealthService;
