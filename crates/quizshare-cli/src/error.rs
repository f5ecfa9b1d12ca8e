use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] quizshare_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No quiz provided. Pass a quiz JSON file or pipe one on stdin")]
    MissingQuiz,
    #[error("Invalid quiz file: {0}")]
    InvalidQuiz(String),
    #[error("No user name. Pass --user or run `quizshare user set <name>`")]
    MissingUserName,
    #[error("Quiz ID cannot be empty")]
    EmptyQuizId,
    #[error("Search query cannot be empty")]
    EmptySearchQuery,
    #[error("Configuration error: {0}")]
    Config(String),
}
