use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One element of a structured fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ContentPart {
    Text(String),
    /// Anything that is not text (images, tool calls, metadata). Kept opaque.
    Other(Value),
}

impl ContentPart {
    /// Accepts a bare string or a `{"type": "text", "text": "..."}` object as text.
    pub fn from_value(value: Value) -> Self {
        let text = match &value {
            Value::String(text) => Some(text.clone()),
            Value::Object(map) if map.get("type").and_then(Value::as_str) == Some("text") => {
                map.get("text").and_then(Value::as_str).map(str::to_string)
            }
            _ => None,
        };

        match text {
            Some(text) => Self::Text(text),
            None => Self::Other(value),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Other(_) => None,
        }
    }
}

/// A unit emitted by a stream source.
///
/// Fragments without text (control or metadata units) are valid and simply
/// contribute nothing to the accumulated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Fragment {
    Text(String),
    Parts(Vec<ContentPart>),
    Empty,
}

impl Fragment {
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text(content.into())
    }

    /// Build a fragment from a chat-completion `content` field.
    pub fn from_content(content: Option<Value>) -> Self {
        match content {
            Some(Value::String(text)) => Self::Text(text),
            Some(Value::Array(items)) => {
                Self::Parts(items.into_iter().map(ContentPart::from_value).collect())
            }
            _ => Self::Empty,
        }
    }

    /// Plain-text view of the fragment. Non-text parts contribute "".
    pub fn plain_text(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text),
            Self::Parts(parts) => Cow::Owned(parts.iter().filter_map(ContentPart::as_text).collect()),
            Self::Empty => Cow::Borrowed(""),
        }
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Fragment {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn string_content_is_text() {
        let fragment = Fragment::from_content(Some(json!("Hello")));
        assert_eq!(fragment.plain_text(), "Hello");
    }

    #[test]
    fn array_content_keeps_only_text_parts() {
        let fragment = Fragment::from_content(Some(json!([
            "Hel",
            {"type": "image_url", "image_url": {"url": "x"}},
            {"type": "text", "text": "lo"},
            42
        ])));
        assert_eq!(fragment.plain_text(), "Hello");
    }

    #[test]
    fn missing_or_null_content_is_empty() {
        assert_eq!(Fragment::from_content(None), Fragment::Empty);
        assert_eq!(Fragment::from_content(Some(Value::Null)), Fragment::Empty);
        assert_eq!(Fragment::Empty.plain_text(), "");
    }

    #[test]
    fn text_object_without_text_field_is_opaque() {
        let part = ContentPart::from_value(json!({"type": "text"}));
        assert!(part.as_text().is_none());
    }
}
