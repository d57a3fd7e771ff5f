//! Incremental Server-Sent Events decoding.
//!
//! Network chunks may end anywhere, including inside a line or inside a
//! multi-byte UTF-8 sequence, so raw bytes are buffered until a full line is
//! available.

use crate::domain::QueryError;

/// One dispatched SSE event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    failed: Option<QueryError>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the response body and return every event it completes.
    ///
    /// Decoding stops at the first line that is not valid UTF-8. Events
    /// completed before that line are still returned; the failure is then
    /// available from [`error`](Self::error) and is returned by
    /// every later `push` or `finish`.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, QueryError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=newline).collect();
            let line = match std::str::from_utf8(&raw[..newline]) {
                Ok(line) => line,
                Err(e) => {
                    self.fail(e);
                    break;
                }
            };
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// The decoding failure hit by the last `push`, if any.
    pub fn error(&self) -> Option<&QueryError> {
        self.failed.as_ref()
    }

    /// Flush an event left pending when the body ends without a blank line.
    pub fn finish(&mut self) -> Result<Option<SseEvent>, QueryError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8(raw)
                .map_err(|e| QueryError::source(format!("stream is not valid UTF-8: {e}")))?;
            if let Some(event) = self.process_line(line.trim_end_matches('\r')) {
                return Ok(Some(event));
            }
        }
        Ok(self.dispatch())
    }

    fn fail(&mut self, err: std::str::Utf8Error) {
        self.buffer.clear();
        self.data.clear();
        self.failed = Some(QueryError::source(format!("stream is not valid UTF-8: {err}")));
    }

    fn process_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            return self.dispatch();
        }

        // Comment lines (keep-alives) start with a colon.
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseEvent { event, data })
    }
}
