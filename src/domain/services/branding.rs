use regex::{NoExpand, Regex, RegexBuilder};

use super::QueryError;

/// Vendor name that must not reach the user verbatim.
pub const RESERVED_VENDOR_TERM: &str = "DeepSeek";
/// Product name substituted for [`RESERVED_VENDOR_TERM`].
pub const PRODUCT_NAME: &str = "Code Lab Bot";

/// Replaces every case-insensitive occurrence of a reserved term with a fixed
/// product name.
///
/// The filter works on one fragment at a time. A term split across two
/// fragments (`"Deep"` + `"Seek"`) is left untouched.
#[derive(Debug, Clone)]
pub struct BrandingFilter {
    pattern: Regex,
    replacement: String,
}

impl BrandingFilter {
    /// The term is matched literally; regex metacharacters carry no meaning.
    pub fn new(term: &str, replacement: impl Into<String>) -> Result<Self, QueryError> {
        if term.is_empty() {
            return Err(QueryError::configuration("branding term must not be empty"));
        }

        let pattern = RegexBuilder::new(&regex::escape(term))
            .case_insensitive(true)
            .build()
            .map_err(|e| QueryError::configuration(format!("invalid branding term: {e}")))?;

        Ok(Self {
            pattern,
            replacement: replacement.into(),
        })
    }

    pub fn apply(&self, text: &str) -> String {
        self.pattern
            .replace_all(text, NoExpand(&self.replacement))
            .into_owned()
    }
}

impl Default for BrandingFilter {
    fn default() -> Self {
        Self::new(RESERVED_VENDOR_TERM, PRODUCT_NAME)
            .expect("escaped literal always compiles")
    }
}
