use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt};
use tracing::debug;

use crate::application::{FragmentStream, StreamSource};
use crate::domain::{Fragment, QueryError};

/// Replays a scripted answer. Useful offline and in tests.
pub struct MockStreamSource {
    fragments: Vec<Fragment>,
    delay: Option<Duration>,
    stream_error: Option<QueryError>,
    open_error: Option<QueryError>,
    opens: AtomicUsize,
}

impl MockStreamSource {
    pub fn new<I, F>(fragments: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Fragment>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
            delay: None,
            stream_error: None,
            open_error: None,
            opens: AtomicUsize::new(0),
        }
    }

    /// Split `text` into word-sized fragments, keeping the whitespace.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.split_inclusive(' '))
    }

    /// A source whose `open` always fails with `error`.
    pub fn failing_open(error: QueryError) -> Self {
        let mut source = Self::new(Vec::<Fragment>::new());
        source.open_error = Some(error);
        source
    }

    /// Wait this long before emitting each fragment.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// End the stream with `error` after the scripted fragments.
    pub fn with_stream_error(mut self, error: QueryError) -> Self {
        self.stream_error = Some(error);
        self
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StreamSource for MockStreamSource {
    async fn open(&self, query: &str) -> Result<FragmentStream, QueryError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        debug!("MockStreamSource: opening stream for {} byte query", query.len());

        if let Some(error) = &self.open_error {
            return Err(error.clone());
        }

        let items: Vec<Result<Fragment, QueryError>> = self
            .fragments
            .iter()
            .cloned()
            .map(Ok)
            .chain(self.stream_error.clone().map(Err))
            .collect();

        let delay = self.delay;
        Ok(stream::iter(items)
            .then(move |item| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                item
            })
            .boxed())
    }
}
