use anyhow::{bail, Result};

use crate::domain::QueryState;

use super::super::Container;
use super::QueryRunner;

pub struct AskController<'a> {
    container: &'a Container,
}

impl<'a> AskController<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self { container }
    }

    pub async fn ask(&self, prompt: String) -> Result<QueryState> {
        if prompt.trim().is_empty() {
            bail!("Prompt must not be empty");
        }

        QueryRunner::new(self.container)
            .run(prompt, &mut std::io::stdout())
            .await
    }
}
