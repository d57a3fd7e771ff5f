use anyhow::Result;

use crate::domain::QueryState;
use crate::Commands;

use super::container::Container;
use super::controller::{AskController, TranslateController};

pub struct Router<'a> {
    translate_controller: TranslateController<'a>,
    ask_controller: AskController<'a>,
}

impl<'a> Router<'a> {
    pub fn new(container: &'a Container) -> Self {
        Self {
            translate_controller: TranslateController::new(container),
            ask_controller: AskController::new(container),
        }
    }

    pub async fn route(&self, command: Commands) -> Result<QueryState> {
        match command {
            Commands::Translate {
                language,
                file,
                code,
            } => self.translate_controller.translate(language, file, code).await,
            Commands::Ask { prompt } => self.ask_controller.ask(prompt.join(" ")).await,
        }
    }
}
