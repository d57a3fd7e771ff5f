use std::fmt::Display;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::sse::SseDecoder;
use crate::application::{FragmentStream, StreamSource};
use crate::domain::{Fragment, QueryError};

pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai";
pub const DEFAULT_MODEL: &str = "deepseek-r1-distill-llama-70b";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
const COMPLETIONS_PATH: &str = "/v1/chat/completions";
const DONE_SENTINEL: &str = "[DONE]";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for [`GroqStreamSource`].
///
/// The API key is optional here so that a missing key is reported as a
/// configuration failure of the query, not as a construction failure.
#[derive(Debug, Clone, PartialEq)]
pub struct GroqConfig {
    api_key: Option<String>,
    model: String,
    base_url: String,
    temperature: f32,
}

impl Default for GroqConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

impl GroqConfig {
    /// Read configuration once from the environment:
    ///
    /// | Variable           | Default                          |
    /// |--------------------|----------------------------------|
    /// | `GROQ_API_KEY`     | none (queries fail until set)    |
    /// | `GROQ_MODEL`       | `deepseek-r1-distill-llama-70b`  |
    /// | `GROQ_BASE_URL`    | `https://api.groq.com/openai`    |
    /// | `GROQ_TEMPERATURE` | `0.7`                            |
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.api_key = std::env::var("GROQ_API_KEY").ok();
        if let Ok(model) = std::env::var("GROQ_MODEL") {
            config.model = model;
        }
        if let Ok(base_url) = std::env::var("GROQ_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(raw) = std::env::var("GROQ_TEMPERATURE") {
            match raw.parse() {
                Ok(temperature) => config.temperature = temperature,
                Err(_) => warn!("Ignoring invalid GROQ_TEMPERATURE value: {raw}"),
            }
        }
        config
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// The API key, if one is set and not blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    fn completions_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), COMPLETIONS_PATH)
    }
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    temperature: f32,
    stream: bool,
    messages: Vec<ApiMessage<'a>>,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// One `data:` payload of the chat-completions stream.
#[derive(Deserialize)]
struct ChunkPayload {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ApiError>,
}

#[derive(Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Deserialize, Default)]
struct ChunkDelta {
    content: Option<Value>,
}

#[derive(Deserialize)]
struct ApiError {
    message: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: ApiError,
}

#[derive(Debug, PartialEq)]
enum ChunkEvent {
    Fragment(Fragment),
    Done,
}

/// Streams chat completions from Groq, or any OpenAI-compatible endpoint.
///
/// The query is sent as a single user message with `stream: true`; every
/// `choices[0].delta.content` of the event stream becomes one [`Fragment`].
pub struct GroqStreamSource {
    client: reqwest::Client,
    config: GroqConfig,
    url: String,
}

impl GroqStreamSource {
    pub fn new(config: GroqConfig) -> Self {
        let url = config.completions_url();
        Self {
            // No overall timeout: answers may stream for minutes.
            client: reqwest::Client::builder()
                .connect_timeout(CONNECT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            config,
            url,
        }
    }

    fn decode_event(data: &str) -> Result<ChunkEvent, QueryError> {
        if data.trim() == DONE_SENTINEL {
            return Ok(ChunkEvent::Done);
        }

        let payload: ChunkPayload = serde_json::from_str(data)
            .map_err(|e| QueryError::source(format!("malformed stream payload: {e}")))?;

        if let Some(error) = payload.error {
            return Err(QueryError::source(error.message.unwrap_or_default()));
        }

        let content = payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content);
        Ok(ChunkEvent::Fragment(Fragment::from_content(content)))
    }

    fn error_message(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|body| body.error.message)
            .filter(|msg| !msg.trim().is_empty())
    }

    /// Decode a chat-completions event stream into fragments.
    ///
    /// Ends at `[DONE]`, at the end of the body, or after the first error.
    fn fragment_stream<S, B, E>(body: S) -> FragmentStream
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]> + Send + 'static,
        E: Display + Send + 'static,
    {
        Box::pin(async_stream::stream! {
            let mut body = std::pin::pin!(body);
            let mut decoder = SseDecoder::new();

            while let Some(chunk) = body.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(QueryError::transport(format!("stream read failed: {e}")));
                        return;
                    }
                };

                let events = match decoder.push(chunk.as_ref()) {
                    Ok(events) => events,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                for event in events {
                    if let Some(name) = event.event.as_deref().filter(|name| *name != "message") {
                        debug!("GroqStreamSource: received `{name}` event");
                    }
                    match Self::decode_event(&event.data) {
                        Ok(ChunkEvent::Fragment(fragment)) => {
                            yield Ok(fragment);
                        }
                        Ok(ChunkEvent::Done) => return,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }

                if let Some(e) = decoder.error().cloned() {
                    yield Err(e);
                    return;
                }
            }

            match decoder.finish() {
                Ok(Some(event)) => match Self::decode_event(&event.data) {
                    Ok(ChunkEvent::Fragment(fragment)) => {
                        yield Ok(fragment);
                    }
                    Ok(ChunkEvent::Done) => {}
                    Err(e) => {
                        yield Err(e);
                    }
                },
                Ok(None) => {}
                Err(e) => {
                    yield Err(e);
                }
            }
        })
    }
}

#[async_trait]
impl StreamSource for GroqStreamSource {
    async fn open(&self, query: &str) -> Result<FragmentStream, QueryError> {
        let api_key = self
            .config
            .api_key()
            .ok_or_else(|| QueryError::configuration("GROQ API key is not configured"))?;

        let request = ApiRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            stream: true,
            messages: vec![ApiMessage {
                role: "user",
                content: query,
            }],
        };

        debug!(
            "GroqStreamSource: opening stream at {} with model {}",
            self.url, self.config.model
        );

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| QueryError::transport(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!("GroqStreamSource: API returned {status}: {body}");
            return Err(match Self::error_message(&body) {
                Some(msg) => QueryError::source(format!("API returned {status}: {msg}")),
                None => QueryError::transport(format!("API returned {status}")),
            });
        }

        Ok(Self::fragment_stream(response.bytes_stream()))
    }
}

#[cfg(test)]
mod tests {
    use futures_util::stream;

    use super::*;

    fn delta(content: &str) -> String {
        format!("data: {{\"choices\":[{{\"delta\":{{\"content\":\"{content}\"}}}}]}}\n\n")
    }

    async fn decode_body(
        chunks: Vec<Result<Vec<u8>, String>>,
    ) -> Vec<Result<Fragment, QueryError>> {
        GroqStreamSource::fragment_stream(stream::iter(chunks))
            .collect()
            .await
    }

    #[test]
    fn config_defaults() {
        let config = GroqConfig::default();
        assert_eq!(config.model(), DEFAULT_MODEL);
        assert_eq!(config.base_url(), DEFAULT_BASE_URL);
        assert_eq!(config.temperature(), DEFAULT_TEMPERATURE);
        assert!(config.api_key().is_none());
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config = GroqConfig::default().with_api_key("   ");
        assert!(config.api_key().is_none());
    }

    #[test]
    fn completions_url_trims_trailing_slash() {
        let config = GroqConfig::default().with_base_url("http://localhost:8080/");
        assert_eq!(
            config.completions_url(),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn open_without_api_key_is_a_configuration_error() {
        let source = GroqStreamSource::new(GroqConfig::default());
        let err = source.open("hello").await.err().unwrap();
        assert!(err.is_configuration());
        assert_eq!(err.user_message(), "GROQ API key is not configured");
    }

    #[test]
    fn decodes_text_delta() {
        let data = r#"{"choices":[{"index":0,"delta":{"content":"Here"}}]}"#;
        assert_eq!(
            GroqStreamSource::decode_event(data).unwrap(),
            ChunkEvent::Fragment(Fragment::text("Here"))
        );
    }

    #[test]
    fn role_only_delta_is_empty_fragment() {
        let data = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(
            GroqStreamSource::decode_event(data).unwrap(),
            ChunkEvent::Fragment(Fragment::Empty)
        );
    }

    #[test]
    fn usage_chunk_without_choices_is_empty_fragment() {
        let data = r#"{"choices":[],"x_groq":{"usage":{"total_tokens":12}}}"#;
        assert_eq!(
            GroqStreamSource::decode_event(data).unwrap(),
            ChunkEvent::Fragment(Fragment::Empty)
        );
    }

    #[test]
    fn done_sentinel_ends_stream() {
        assert_eq!(
            GroqStreamSource::decode_event("[DONE]").unwrap(),
            ChunkEvent::Done
        );
    }

    #[test]
    fn error_payload_is_source_error() {
        let data = r#"{"error":{"message":"rate limit reached"}}"#;
        let err = GroqStreamSource::decode_event(data).unwrap_err();
        assert!(err.is_source());
        assert_eq!(err.user_message(), "rate limit reached");
    }

    #[test]
    fn malformed_payload_is_source_error() {
        let err = GroqStreamSource::decode_event("{not json").unwrap_err();
        assert!(err.is_source());
    }

    #[test]
    fn extracts_error_message_from_body() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        assert_eq!(
            GroqStreamSource::error_message(body).as_deref(),
            Some("Invalid API Key")
        );
        assert!(GroqStreamSource::error_message("<html>").is_none());
    }

    #[tokio::test]
    async fn done_sentinel_mid_chunk_drops_later_events() {
        let body = format!("{}data: [DONE]\n\n{}", delta("a"), delta("b"));
        let items = decode_body(vec![Ok(body.into_bytes())]).await;
        assert_eq!(items, vec![Ok(Fragment::text("a"))]);
    }

    #[tokio::test]
    async fn trailing_event_without_blank_line_is_flushed() {
        let last = delta("b");
        let items = decode_body(vec![
            Ok(delta("a").into_bytes()),
            Ok(last.trim_end().as_bytes().to_vec()),
        ])
        .await;
        assert_eq!(
            items,
            vec![Ok(Fragment::text("a")), Ok(Fragment::text("b"))]
        );
    }

    #[tokio::test]
    async fn body_read_failure_is_transport_error() {
        let items = decode_body(vec![
            Ok(delta("a").into_bytes()),
            Err("connection reset".to_string()),
            Ok(delta("b").into_bytes()),
        ])
        .await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok(Fragment::text("a")));
        let err = items[1].clone().unwrap_err();
        assert!(err.is_transport());
        assert!(err.message().contains("connection reset"));
    }

    #[tokio::test]
    async fn error_payload_mid_stream_ends_after_earlier_fragments() {
        let body = format!(
            "{}data: {{\"error\":{{\"message\":\"model overloaded\"}}}}\n\n{}",
            delta("a"),
            delta("b")
        );
        let items = decode_body(vec![Ok(body.into_bytes())]).await;
        assert_eq!(
            items,
            vec![
                Ok(Fragment::text("a")),
                Err(QueryError::source("model overloaded")),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_keeps_fragments_completed_before_it() {
        let mut body = delta("a").into_bytes();
        body.extend_from_slice(b"data: \xFF\n\n");
        let items = decode_body(vec![Ok(body), Ok(delta("b").into_bytes())]).await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Ok(Fragment::text("a")));
        assert!(items[1].clone().unwrap_err().is_source());
    }

    #[tokio::test]
    async fn named_events_are_decoded_like_plain_ones() {
        let body = format!("event: message\n{}event: chunk\n{}", delta("a"), delta("b"));
        let items = decode_body(vec![Ok(body.into_bytes())]).await;
        assert_eq!(
            items,
            vec![Ok(Fragment::text("a")), Ok(Fragment::text("b"))]
        );
    }
}
