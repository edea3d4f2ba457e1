use std::time::SystemTime;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

/// Shared phase/question/outcome projections.
pub mod common;
/// Request and response payloads for the game routes.
pub mod game;
/// Health endpoint payloads.
pub mod health;
/// Publicly visible phase projection.
pub mod phase;
/// SSE event payloads.
pub mod sse;
/// Validation helpers for DTOs.
pub mod validation;

fn format_system_time(time: SystemTime) -> String {
    OffsetDateTime::from(time)
        .format(&Rfc3339)
        .unwrap_or_else(|_| "invalid-timestamp".into())
}
