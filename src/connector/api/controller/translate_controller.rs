use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::domain::{QueryState, TranslationRequest};

use super::super::Container;
use super::QueryRunner;

pub struct TranslateController<'a> {
    container: &'a Container,
}

impl<'a> TranslateController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    /// Code comes from `code`, then `file`, then stdin.
    pub async fn translate(
        &self,
        language: String,
        file: Option<PathBuf>,
        code: Option<String>,
    ) -> Result<QueryState> {
        let code = match (code, file) {
            (Some(code), _) => code,
            (None, Some(path)) => std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?,
            (None, None) => {
                std::io::read_to_string(std::io::stdin()).context("failed to read code from stdin")?
            }
        };

        if code.trim().is_empty() {
            bail!("No code to translate");
        }

        let request = TranslationRequest::new(code, language);
        QueryRunner::new(self.container)
            .run(request.to_prompt(), &mut std::io::stdout())
            .await
    }
}
