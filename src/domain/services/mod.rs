//! Domain services: the error taxonomy and text transforms applied to fragments.

mod branding;
mod error;

pub use branding::*;
pub use error::*;
