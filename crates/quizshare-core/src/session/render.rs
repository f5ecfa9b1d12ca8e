use std::fmt::Write;

use super::QuizSession;

/// Presentation of a running session.
pub trait QuizRenderer {
    fn render_question(&self, session: &QuizSession) -> String;
    fn render_progress(&self, session: &QuizSession) -> String;
}

/// Plain-text rendering for terminals.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl QuizRenderer for TextRenderer {
    fn render_question(&self, session: &QuizSession) -> String {
        let index = session.current_index();
        let Some(question) = session.current_question() else {
            return "This quiz has no questions.".to_string();
        };

        let chosen = session.answer_for(index);
        let mut out = format!("Question {}/{}: {}\n", index + 1, session.len(), question.question);
        for option in &question.options {
            let marker = if chosen == Some(option.letter.as_str()) { '*' } else { ' ' };
            let _ = writeln!(out, " {marker} {}. {}", option.letter, option.text);
        }
        out
    }

    fn render_progress(&self, session: &QuizSession) -> String {
        let progress = session.progress();
        format!(
            "Answered {}/{} ({}%) | {}",
            progress.answered,
            progress.total,
            progress.percent,
            session.elapsed_formatted()
        )
    }
}
