use std::io::{self, BufRead, Write};

use quizshare_core::models::QuizId;
use quizshare_core::session::{QuizRenderer, QuizSession, TextRenderer};
use quizshare_core::state::ConnectionMode;

use crate::commands::common::{normalize_quiz_identifier, AppContext};
use crate::error::CliError;

const HELP: &str = "Answer with a letter. Other commands: n(ext), p(rev), g <number>, s(ubmit), q(uit)";

pub async fn run_start(
    ctx: &AppContext,
    id: &str,
    auto_advance: bool,
    as_json: bool,
) -> Result<(), CliError> {
    let id = QuizId::from(normalize_quiz_identifier(id)?);
    let service = ctx.sharing_service()?;
    let started = service.start_quiz(&id).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&started)?);
    } else {
        if started.source == ConnectionMode::Offline {
            println!("Server unavailable; using the copy saved on this device.");
        }
        let mut session = QuizSession::new(started.quiz).with_auto_advance(auto_advance);
        let stdin = io::stdin();
        let mut stdout = io::stdout();
        run_session(&mut session, &TextRenderer, &mut stdin.lock(), &mut stdout)?;
    }

    service.dispose().await;
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
pub enum SessionInput {
    Answer(String),
    Next,
    Previous,
    GoTo(usize),
    Submit,
    Quit,
    Unknown,
}

pub fn parse_session_input(line: &str) -> SessionInput {
    let line = line.trim();
    let mut parts = line.split_whitespace();
    let command = parts.next().unwrap_or_default().to_ascii_lowercase();

    match command.as_str() {
        "n" | "next" => SessionInput::Next,
        "p" | "prev" | "previous" => SessionInput::Previous,
        "s" | "submit" => SessionInput::Submit,
        "q" | "quit" => SessionInput::Quit,
        "g" | "go" => parts
            .next()
            .and_then(|number| number.parse::<usize>().ok())
            .filter(|number| *number > 0)
            .map_or(SessionInput::Unknown, |number| SessionInput::GoTo(number - 1)),
        letter if letter.len() == 1 && letter.chars().all(|c| c.is_ascii_alphabetic()) => {
            SessionInput::Answer(letter.to_ascii_uppercase())
        }
        _ => SessionInput::Unknown,
    }
}

/// Drive a session from line input until submit, quit or end of input.
///
/// Returns `true` when the session was submitted.
pub fn run_session<R: BufRead, W: Write>(
    session: &mut QuizSession,
    renderer: &impl QuizRenderer,
    input: &mut R,
    output: &mut W,
) -> io::Result<bool> {
    writeln!(output, "{} by {}", session.quiz().title, session.quiz().shared_by)?;
    writeln!(output, "{HELP}")?;

    let mut line = String::new();
    loop {
        writeln!(output)?;
        write!(output, "{}", renderer.render_question(session))?;
        writeln!(output, "{}", renderer.render_progress(session))?;
        write!(output, "> ")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(false);
        }

        match parse_session_input(&line) {
            SessionInput::Answer(letter) => {
                if let Err(error) = session.answer(session.current_index(), &letter) {
                    writeln!(output, "{error}")?;
                }
            }
            SessionInput::Next => {
                if !session.next() {
                    writeln!(output, "Already at the last question")?;
                }
            }
            SessionInput::Previous => {
                if !session.previous() {
                    writeln!(output, "Already at the first question")?;
                }
            }
            SessionInput::GoTo(index) => {
                if let Err(error) = session.go_to(index) {
                    writeln!(output, "{error}")?;
                }
            }
            SessionInput::Submit => {
                write_summary(session, output)?;
                return Ok(true);
            }
            SessionInput::Quit => return Ok(false),
            SessionInput::Unknown => writeln!(output, "{HELP}")?,
        }
    }
}

fn write_summary<W: Write>(session: &QuizSession, output: &mut W) -> io::Result<()> {
    let progress = session.progress();
    writeln!(output)?;
    writeln!(
        output,
        "Answered {}/{} in {}",
        progress.answered,
        progress.total,
        session.elapsed_formatted()
    )?;
    match session.score() {
        Some(score) => writeln!(output, "Score: {}/{}", score.correct, score.total),
        None => writeln!(output, "This quiz has no answer key; no score available."),
    }
}
