//! Data models for QuizShare

mod cached;
mod quiz;

pub use cached::CachedEntry;
pub use quiz::{
    ActiveQuiz, Question, QuizId, QuizOption, QuizRecord, SharedAt, SourceQuiz,
    DEFAULT_DESCRIPTION,
};
