use std::pin::Pin;

use async_trait::async_trait;
use futures_util::stream::Stream;

use crate::domain::{Fragment, QueryError};

/// Lazy, finite sequence of fragments for one request. Ends when the source
/// signals completion; an `Err` item is terminal.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<Fragment, QueryError>> + Send>>;

/// Produces an incremental answer for a query.
///
/// Implementors own transport, framing, and credentials. Configuration is
/// supplied at construction; `open` must fail with
/// [`QueryError::Configuration`] before contacting anything when it is
/// incomplete.
#[async_trait]
pub trait StreamSource: Send + Sync {
    async fn open(&self, query: &str) -> Result<FragmentStream, QueryError>;
}
