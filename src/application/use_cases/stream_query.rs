use std::sync::Arc;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::application::StreamSource;
use crate::domain::{BrandingFilter, QueryError, QueryState};

/// Drives one streaming request at a time against a [`StreamSource`] and
/// publishes the evolving answer as a [`QueryState`].
///
/// Every call to [`observe`](Self::observe) with a new query, and every call
/// to [`retry`](Self::retry), starts a fresh session with a higher
/// generation. Only the newest session may write to the published state;
/// older sessions are cancelled and any fragment they still deliver is
/// dropped.
///
/// Sessions run as tokio tasks, so the controller must be used from within a
/// tokio runtime.
pub struct StreamingQueryController {
    source: Arc<dyn StreamSource>,
    branding: Arc<BrandingFilter>,
    state_tx: Arc<watch::Sender<QueryState>>,
    generation: u64,
    live: Option<LiveSession>,
}

struct LiveSession {
    query: String,
    cancel: CancellationToken,
}

impl StreamingQueryController {
    pub fn new(source: Arc<dyn StreamSource>) -> Self {
        let (state_tx, _) = watch::channel(QueryState::idle(0));
        Self {
            source,
            branding: Arc::new(BrandingFilter::default()),
            state_tx: Arc::new(state_tx),
            generation: 0,
            live: None,
        }
    }

    pub fn with_branding(mut self, branding: BrandingFilter) -> Self {
        self.branding = Arc::new(branding);
        self
    }

    /// Latest published state.
    pub fn state(&self) -> QueryState {
        self.state_tx.borrow().clone()
    }

    /// Receiver that observes every published state. Intermediate states may
    /// be coalesced when the receiver falls behind; the latest one never is.
    pub fn subscribe(&self) -> watch::Receiver<QueryState> {
        self.state_tx.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn current_query(&self) -> Option<&str> {
        self.live.as_ref().map(|session| session.query.as_str())
    }

    /// Activate the controller for `query`.
    ///
    /// An empty query cancels any live session and leaves the controller
    /// idle. The query of the live session is a no-op; anything else starts a
    /// new session.
    pub fn observe(&mut self, query: impl Into<String>) {
        let query = query.into();

        if query.is_empty() {
            if self.live.is_some() {
                let generation = self.supersede();
                self.state_tx.send_replace(QueryState::idle(generation));
                info!(generation, "Query cleared, controller idle");
            }
            return;
        }

        if self.current_query() == Some(query.as_str()) {
            debug!("Query unchanged, keeping session {}", self.generation);
            return;
        }

        self.start_session(query);
    }

    /// Re-issue the current query as a brand-new session, whatever state the
    /// previous one reached.
    pub fn retry(&mut self) {
        let Some(query) = self.current_query().map(str::to_string) else {
            debug!("Retry ignored: no active query");
            return;
        };

        info!("Retrying query (previous session {})", self.generation);
        self.start_session(query);
    }

    fn supersede(&mut self) -> u64 {
        if let Some(previous) = self.live.take() {
            previous.cancel.cancel();
            debug!("Session {} superseded", self.generation);
        }
        self.generation += 1;
        self.generation
    }

    fn start_session(&mut self, query: String) {
        let generation = self.supersede();
        let cancel = CancellationToken::new();

        // Published before the task is spawned: the reset is visible before
        // any fragment of the new session can arrive.
        self.state_tx
            .send_replace(QueryState::loading(generation, query.clone()));

        info!(generation, "Starting query session ({} bytes)", query.len());

        let session = Session {
            generation,
            query: query.clone(),
            source: Arc::clone(&self.source),
            branding: Arc::clone(&self.branding),
            state_tx: Arc::clone(&self.state_tx),
            cancel: cancel.clone(),
        };
        tokio::spawn(session.run());

        self.live = Some(LiveSession { query, cancel });
    }
}

impl Drop for StreamingQueryController {
    fn drop(&mut self) {
        if let Some(session) = self.live.take() {
            session.cancel.cancel();
        }
    }
}

enum SessionEnd {
    Completed { fragments: usize },
    Superseded,
}

struct Session {
    generation: u64,
    query: String,
    source: Arc<dyn StreamSource>,
    branding: Arc<BrandingFilter>,
    state_tx: Arc<watch::Sender<QueryState>>,
    cancel: CancellationToken,
}

impl Session {
    async fn run(self) {
        let outcome = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Ok(SessionEnd::Superseded),
            outcome = self.consume() => outcome,
        };

        match outcome {
            Ok(SessionEnd::Completed { fragments }) => {
                if self.publish(QueryState::succeed) {
                    info!(
                        generation = self.generation,
                        "Query session succeeded after {fragments} fragments"
                    );
                }
            }
            Ok(SessionEnd::Superseded) => {
                debug!("Session {} stopped: superseded", self.generation);
            }
            Err(err) => {
                let message = err.user_message();
                if self.publish(|state| state.fail(message)) {
                    warn!(
                        generation = self.generation,
                        kind = err.kind(),
                        "Query session failed: {err}"
                    );
                } else {
                    debug!(
                        "Session {} failed after supersession, discarding: {err}",
                        self.generation
                    );
                }
            }
        }
    }

    async fn consume(&self) -> Result<SessionEnd, QueryError> {
        let mut stream = self.source.open(&self.query).await?;
        let mut fragments = 0usize;

        while let Some(item) = stream.next().await {
            let fragment = item?;
            let text = self.branding.apply(&fragment.plain_text());
            fragments += 1;

            if !self.publish(|state| state.append(&text)) {
                return Ok(SessionEnd::Superseded);
            }
        }

        Ok(SessionEnd::Completed { fragments })
    }

    /// Apply `change` only while this session owns the published state.
    ///
    /// The generation comparison and the mutation happen under the channel's
    /// write lock, which makes the publish a compare-and-set on the
    /// generation. Returns false once the session has been superseded.
    fn publish(&self, change: impl FnOnce(&mut QueryState) -> bool) -> bool {
        let mut owned = false;
        self.state_tx.send_if_modified(|state| {
            if state.generation() != self.generation {
                return false;
            }
            owned = true;
            change(state)
        });
        owned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::MockStreamSource;
    use crate::domain::QueryStatus;

    fn session(generation: u64, state_tx: Arc<watch::Sender<QueryState>>) -> Session {
        Session {
            generation,
            query: "q".to_string(),
            source: Arc::new(MockStreamSource::new(["x"])),
            branding: Arc::new(BrandingFilter::default()),
            state_tx,
            cancel: CancellationToken::new(),
        }
    }

    #[test]
    fn stale_session_cannot_publish() {
        let (tx, _) = watch::channel(QueryState::loading(2, "q"));
        let tx = Arc::new(tx);

        let stale = session(1, Arc::clone(&tx));
        assert!(!stale.publish(|state| state.append("old")));
        assert!(!stale.publish(QueryState::succeed));

        let live = session(2, Arc::clone(&tx));
        assert!(live.publish(|state| state.append("new")));

        let state = tx.borrow().clone();
        assert_eq!(state.text(), "new");
        assert_eq!(state.status(), QueryStatus::Loading);
    }

    #[tokio::test]
    async fn run_on_cancelled_session_leaves_state_untouched() {
        let (tx, _) = watch::channel(QueryState::loading(1, "q"));
        let tx = Arc::new(tx);

        let cancelled = session(1, Arc::clone(&tx));
        cancelled.cancel.cancel();
        cancelled.run().await;

        let state = tx.borrow().clone();
        assert_eq!(state.text(), "");
        assert!(state.is_loading());
    }

    #[tokio::test]
    async fn observe_publishes_loading_synchronously() {
        let mut controller = StreamingQueryController::new(Arc::new(MockStreamSource::new(["x"])));
        controller.observe("hello");

        let state = controller.state();
        assert_eq!(state.status(), QueryStatus::Loading);
        assert_eq!(state.generation(), 1);
        assert_eq!(state.query(), Some("hello"));
        assert_eq!(controller.current_query(), Some("hello"));
    }
}
