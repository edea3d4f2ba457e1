/// Countdown timer task driving per-question timeouts.
pub mod countdown;
/// OpenAPI documentation generation.
pub mod documentation;
/// Core game logic and state management.
pub mod game_service;
/// Health check service.
pub mod health_service;
/// Lifeline draws and their advisory events.
pub mod lifeline_service;
/// Completion webhook notifications.
pub mod notification;
/// Read-only projections of the current game.
pub mod public_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Storage persistence coordinator with reconnect backoff.
pub mod storage_supervisor;
