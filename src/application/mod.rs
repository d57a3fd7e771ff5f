//! # Application Layer
//!
//! The stream source port and the controller orchestrating query sessions.

pub mod interfaces;
pub mod use_cases;

pub use interfaces::*;
pub use use_cases::*;
