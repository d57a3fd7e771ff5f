pub mod ask_controller;
pub mod query_runner;
pub mod translate_controller;

pub use ask_controller::AskController;
pub use query_runner::QueryRunner;
pub use translate_controller::TranslateController;
