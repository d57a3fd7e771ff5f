use serde::{Deserialize, Serialize};

pub const DEFAULT_TARGET_LANGUAGE: &str = "Python";

/// A request to translate a snippet of code into another language, library,
/// or framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    code: String,
    language: String,
}

impl TranslationRequest {
    /// A blank language falls back to [`DEFAULT_TARGET_LANGUAGE`].
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        let language: String = language.into();
        let language = match language.trim() {
            "" => DEFAULT_TARGET_LANGUAGE.to_string(),
            trimmed => trimmed.to_string(),
        };
        Self {
            code: code.into(),
            language,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn to_prompt(&self) -> String {
        format!(
            "Translate the following code into {}:\n\n{}\n\n",
            self.language, self.code
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_translation_prompt() {
        let request = TranslationRequest::new("fn x(){}", "Rust");
        assert_eq!(
            request.to_prompt(),
            "Translate the following code into Rust:\n\nfn x(){}\n\n"
        );
    }

    #[test]
    fn blank_language_defaults_to_python() {
        let request = TranslationRequest::new("print(1)", "  ");
        assert_eq!(request.language(), DEFAULT_TARGET_LANGUAGE);
    }
}
