use std::path::PathBuf;

use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Translate code into another language, library, or framework
    Translate {
        /// Target language
        #[arg(short = 'L', long, default_value = "Python")]
        language: String,

        /// Read the code from a file
        #[arg(short, long, conflicts_with = "code")]
        file: Option<PathBuf>,

        /// Pass the code inline (stdin is read when neither is given)
        #[arg(short, long)]
        code: Option<String>,
    },

    /// Ask a free-form coding question
    Ask {
        #[arg(required = true, num_args = 1..)]
        prompt: Vec<String>,
    },
}
