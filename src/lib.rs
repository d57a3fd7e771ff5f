pub mod application;
pub mod cli;
pub mod connector;
pub mod domain;

pub use application::{FragmentStream, StreamSource, StreamingQueryController};

pub use cli::Commands;

pub use connector::{GroqConfig, GroqStreamSource, MockStreamSource};

pub use domain::{
    BrandingFilter, ContentPart, Fragment, QueryError, QueryState, QueryStatus,
    TranslationRequest,
};
