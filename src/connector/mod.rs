//! # Connector Layer
//!
//! External integrations implementing application interfaces:
//! - Stream sources (Groq chat completions over SSE, scripted mock)
//! - CLI wiring (container, router, controllers)

pub mod adapter;
pub mod api;

pub use adapter::*;
