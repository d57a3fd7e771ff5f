use std::io::Write;

use anyhow::{bail, Context, Result};
use tracing::{debug, warn};

use crate::domain::{QueryState, QueryStatus};

use super::super::Container;

/// Runs one query to completion, echoing the answer to `out` as it grows.
///
/// A failed query is re-issued through the controller's `retry` while the
/// container's retry budget lasts.
pub struct QueryRunner<'a> {
    container: &'a Container,
}

impl<'a> QueryRunner<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn run(&self, query: String, out: &mut impl Write) -> Result<QueryState> {
        let mut controller = self.container.query_controller();
        let mut state_rx = controller.subscribe();
        controller.observe(query);

        let mut retries_left = self.container.retries();
        let mut generation = controller.generation();
        let mut printed = 0usize;

        loop {
            let state = state_rx.borrow_and_update().clone();

            if state.generation() != generation {
                generation = state.generation();
                if printed > 0 {
                    writeln!(out)?;
                }
                printed = 0;
            }

            if state.text().len() > printed {
                out.write_all(state.text()[printed..].as_bytes())?;
                out.flush()?;
                printed = state.text().len();
            }

            match state.status() {
                QueryStatus::Failed if retries_left > 0 => {
                    retries_left -= 1;
                    warn!(
                        "Query failed: {}. Retrying ({retries_left} retries left)",
                        state.error_message().unwrap_or_default()
                    );
                    controller.retry();
                    continue;
                }
                // Only an empty query leaves the controller idle.
                QueryStatus::Idle => bail!("query controller is idle: no query was started"),
                QueryStatus::Succeeded | QueryStatus::Failed => {
                    if printed > 0 {
                        writeln!(out)?;
                    }
                    debug!("Query finished with status {}", state.status());
                    return Ok(state);
                }
                QueryStatus::Loading => {}
            }

            state_rx
                .changed()
                .await
                .context("query controller stopped publishing")?;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::connector::api::ContainerConfig;
    use crate::connector::MockStreamSource;
    use crate::domain::QueryError;

    fn config(retries: u32) -> ContainerConfig {
        ContainerConfig {
            mock: true,
            model: None,
            base_url: None,
            temperature: None,
            retries,
        }
    }

    #[tokio::test]
    async fn echoes_branded_answer() {
        let source = Arc::new(MockStreamSource::new(["Hello from ", "DeepSeek"]));
        let container = Container::with_stream_source(source, config(0));

        let mut out = Vec::new();
        let state = QueryRunner::new(&container)
            .run("q".to_string(), &mut out)
            .await
            .unwrap();

        assert_eq!(state.status(), QueryStatus::Succeeded);
        assert_eq!(String::from_utf8(out).unwrap(), "Hello from Code Lab Bot\n");
    }

    #[tokio::test]
    async fn retries_within_budget_then_reports_failure() {
        let source = Arc::new(MockStreamSource::failing_open(QueryError::transport(
            "connection refused",
        )));
        let container = Container::with_stream_source(source.clone(), config(2));

        let mut out = Vec::new();
        let state = QueryRunner::new(&container)
            .run("q".to_string(), &mut out)
            .await
            .unwrap();

        assert_eq!(state.status(), QueryStatus::Failed);
        assert_eq!(state.error_message(), Some("connection refused"));
        assert_eq!(state.generation(), 3);
        assert_eq!(source.open_count(), 3);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn mock_container_streams_canned_answer() {
        let container = Container::new(config(0)).unwrap();

        let mut out = Vec::new();
        let state = QueryRunner::new(&container)
            .run("q".to_string(), &mut out)
            .await
            .unwrap();

        assert_eq!(state.status(), QueryStatus::Succeeded);
        assert!(state.text().starts_with("Hello from Code Lab Bot."));
    }

    #[tokio::test]
    async fn empty_query_is_reported_instead_of_returned_as_finished() {
        let source = Arc::new(MockStreamSource::new(["unused"]));
        let container = Container::with_stream_source(source.clone(), config(1));

        let mut out = Vec::new();
        let err = QueryRunner::new(&container)
            .run(String::new(), &mut out)
            .await
            .unwrap_err();

        assert!(err.to_string().contains("idle"));
        assert_eq!(source.open_count(), 0);
        assert!(out.is_empty());
    }
}
