//! Taking a quiz: navigation, answers, progress and scoring.

mod render;

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{ActiveQuiz, Question};

pub use render::{QuizRenderer, TextRenderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub answered: usize,
    pub total: usize,
    pub percent: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
}

/// State of one attempt at an [`ActiveQuiz`].
#[derive(Debug)]
pub struct QuizSession {
    quiz: ActiveQuiz,
    current: usize,
    answers: BTreeMap<usize, String>,
    started: Instant,
    auto_advance: bool,
}

impl QuizSession {
    pub fn new(quiz: ActiveQuiz) -> Self {
        Self {
            quiz,
            current: 0,
            answers: BTreeMap::new(),
            started: Instant::now(),
            auto_advance: false,
        }
    }

    /// Move to the next question after answering the current one.
    #[must_use]
    pub const fn with_auto_advance(mut self, enabled: bool) -> Self {
        self.auto_advance = enabled;
        self
    }

    pub const fn quiz(&self) -> &ActiveQuiz {
        &self.quiz
    }

    pub const fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.questions.get(self.current)
    }

    pub fn len(&self) -> usize {
        self.quiz.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quiz.questions.is_empty()
    }

    pub fn go_to(&mut self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(Error::Validation(format!(
                "question {} does not exist (quiz has {})",
                index + 1,
                self.len()
            )));
        }
        self.current = index;
        Ok(())
    }

    pub const fn can_go_back(&self) -> bool {
        self.current > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.current + 1 < self.len()
    }

    /// Returns `false` when already at the last question.
    pub fn next(&mut self) -> bool {
        if self.can_go_forward() {
            self.current += 1;
            true
        } else {
            false
        }
    }

    /// Returns `false` when already at the first question.
    pub fn previous(&mut self) -> bool {
        if self.can_go_back() {
            self.current -= 1;
            true
        } else {
            false
        }
    }

    /// Record `letter` (case-insensitive) as the answer to question `index`.
    pub fn answer(&mut self, index: usize, letter: &str) -> Result<()> {
        let question = self.quiz.questions.get(index).ok_or_else(|| {
            Error::Validation(format!("question {} does not exist", index + 1))
        })?;

        let letter = letter.trim();
        let option = question
            .options
            .iter()
            .find(|option| option.letter.eq_ignore_ascii_case(letter))
            .ok_or_else(|| {
                Error::Validation(format!(
                    "'{letter}' is not an option for question {}",
                    index + 1
                ))
            })?;

        self.answers.insert(index, option.letter.clone());
        if self.auto_advance && index == self.current {
            self.next();
        }
        Ok(())
    }

    pub fn answer_for(&self, index: usize) -> Option<&str> {
        self.answers.get(&index).map(String::as_str)
    }

    pub fn progress(&self) -> Progress {
        let total = self.len();
        let answered = self.answers.len();
        let percent = if total == 0 {
            0
        } else {
            u8::try_from(answered * 100 / total).unwrap_or(100)
        };
        Progress {
            answered,
            total,
            percent,
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.is_empty() && self.answers.len() == self.len()
    }

    /// Number of correct answers, or `None` when some question carries no key.
    pub fn score(&self) -> Option<Score> {
        let mut correct = 0;
        for (index, question) in self.quiz.questions.iter().enumerate() {
            let key = question
                .answer_key()
                .map(str::trim)
                .filter(|key| !key.is_empty())?;
            if self
                .answer_for(index)
                .is_some_and(|given| given.eq_ignore_ascii_case(key))
            {
                correct += 1;
            }
        }
        Some(Score {
            correct,
            total: self.len(),
        })
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn elapsed_formatted(&self) -> String {
        format_elapsed(self.elapsed())
    }
}

/// `HH:MM:SS`; hours keep growing past 99.
pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{QuizId, QuizOption};
    use pretty_assertions::assert_eq;
    use serde_json::Map;

    pub(crate) fn question(text: &str, correct: Option<&str>) -> Question {
        Question {
            question: text.to_string(),
            options: ["A", "B", "C", "D"]
                .iter()
                .map(|letter| QuizOption {
                    letter: (*letter).to_string(),
                    text: format!("Option {letter}"),
                })
                .collect(),
            correct_answer: correct.map(str::to_string),
            extra: Map::new(),
        }
    }

    pub(crate) fn active(questions: Vec<Question>) -> ActiveQuiz {
        ActiveQuiz {
            id: QuizId::from("q"),
            title: "Capitals".to_string(),
            description: "Geography".to_string(),
            total_questions: questions.len(),
            questions,
            shared_by: "ana".to_string(),
            is_offline: false,
        }
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut session = QuizSession::new(active(vec![
            question("one", None),
            question("two", None),
        ]));
        assert!(!session.can_go_back());
        assert!(!session.previous());
        assert!(session.next());
        assert!(!session.can_go_forward());
        assert!(!session.next());
        assert_eq!(session.current_index(), 1);
        assert!(session.go_to(2).is_err());
        session.go_to(0).unwrap();
        assert_eq!(session.current_question().unwrap().question, "one");
    }

    #[test]
    fn answer_rejects_unknown_letter_and_index() {
        let mut session = QuizSession::new(active(vec![question("one", None)]));
        assert!(matches!(session.answer(0, "E"), Err(Error::Validation(_))));
        assert!(matches!(session.answer(3, "A"), Err(Error::Validation(_))));
        session.answer(0, " b ").unwrap();
        assert_eq!(session.answer_for(0), Some("B"));
    }

    #[test]
    fn auto_advance_moves_forward() {
        let mut session = QuizSession::new(active(vec![
            question("one", None),
            question("two", None),
        ]))
        .with_auto_advance(true);
        session.answer(0, "A").unwrap();
        assert_eq!(session.current_index(), 1);
        session.answer(1, "A").unwrap();
        assert_eq!(session.current_index(), 1);
    }

    #[test]
    fn progress_counts_distinct_answers() {
        let mut session = QuizSession::new(active(vec![
            question("one", None),
            question("two", None),
            question("three", None),
        ]));
        session.answer(0, "A").unwrap();
        session.answer(0, "C").unwrap();
        assert_eq!(
            session.progress(),
            Progress {
                answered: 1,
                total: 3,
                percent: 33
            }
        );
        assert!(!session.is_complete());
    }

    #[test]
    fn score_requires_answer_keys() {
        let mut session = QuizSession::new(active(vec![
            question("one", Some("A")),
            question("two", Some("b")),
        ]));
        session.answer(0, "A").unwrap();
        session.answer(1, "C").unwrap();
        assert_eq!(session.score(), Some(Score { correct: 1, total: 2 }));

        let session = QuizSession::new(active(vec![question("one", Some("A")), question("two", None)]));
        assert_eq!(session.score(), None);
    }

    #[test]
    fn score_reads_legacy_answer_key() {
        let mut legacy = question("one", None);
        legacy
            .extra
            .insert("answer".to_string(), serde_json::Value::from("c"));
        let mut session = QuizSession::new(active(vec![legacy]));
        session.answer(0, "C").unwrap();
        assert_eq!(session.score(), Some(Score { correct: 1, total: 1 }));
    }

    #[test]
    fn elapsed_formats_as_clock() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(3_725)), "01:02:05");
        assert_eq!(format_elapsed(Duration::from_secs(360_000)), "100:00:00");
    }
}
