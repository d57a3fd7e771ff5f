//! # Domain Layer
//!
//! Query state, fragments, the error taxonomy, and text transforms.
//! This layer is independent of any runtime or transport.

pub mod models;
pub mod services;

pub use models::*;
pub use services::*;
