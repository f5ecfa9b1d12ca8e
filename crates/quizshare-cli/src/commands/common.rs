use std::env;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use chrono::Utc;
use quizshare_core::config::ClientConfig;
use quizshare_core::db::{Database, QuizCollections, SqliteRecordStore};
use quizshare_core::models::{QuizRecord, SharedAt, SourceQuiz};
use quizshare_core::sharing::{QuizListing, SharingService};
use quizshare_core::sync::CloudSyncClient;
use serde::Serialize;

use crate::error::CliError;

const APP_DIR: &str = "quizshare";
const ENV_DB_PATH: &str = "QUIZSHARE_DB_PATH";
const ENV_CONFIG_PATH: &str = "QUIZSHARE_CONFIG";

/// Store and configuration shared by every command.
pub struct AppContext {
    pub store: SqliteRecordStore,
    pub config: ClientConfig,
}

impl AppContext {
    pub fn open(db_path: &Path, config_path: &Path) -> Result<Self, CliError> {
        let config = load_config(config_path)?;
        let store = SqliteRecordStore::new(Database::open(db_path)?);
        Ok(Self { store, config })
    }

    pub fn sharing_service(&self) -> Result<SharingService, CliError> {
        Ok(SharingService::new(self.store.clone(), self.config.clone())?)
    }

    pub fn cloud_client(&self) -> Result<CloudSyncClient, CliError> {
        Ok(CloudSyncClient::new(
            self.config.cloud_sync_url.clone(),
            self.config.timeouts.cloud(),
            QuizCollections::new(self.store.clone()),
        )?)
    }
}

pub fn load_config(path: &Path) -> Result<ClientConfig, CliError> {
    let config = ClientConfig::load_from_path(path)?.with_env_overrides();
    config.validate()?;
    Ok(config)
}

#[derive(Debug, Serialize)]
pub struct QuizListItem {
    pub id: String,
    pub title: String,
    pub description: String,
    pub user_name: String,
    pub total_questions: usize,
    pub views: u64,
    pub attempts: u64,
    pub shared_at: String,
    pub relative_time: String,
    pub offline: bool,
}

#[derive(Debug, Serialize)]
pub struct ListingOutput {
    pub mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub quizzes: Vec<QuizListItem>,
}

pub fn quiz_to_list_item(quiz: &QuizRecord) -> QuizListItem {
    let now_ms = Utc::now().timestamp_millis();
    QuizListItem {
        id: quiz.id.to_string(),
        title: quiz.title.clone(),
        description: quiz.description.clone(),
        user_name: quiz.user_name.clone(),
        total_questions: quiz.questions.len().max(quiz.total_questions),
        views: quiz.views,
        attempts: quiz.attempts,
        shared_at: quiz.shared_at.to_string(),
        relative_time: format_shared_at(&quiz.shared_at, now_ms),
        offline: quiz.is_offline,
    }
}

pub fn format_quiz_lines(quizzes: &[QuizRecord]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    quizzes
        .iter()
        .map(|quiz| {
            let id = quiz.id.to_string();
            let short_id = truncate(&id, 22);
            let title = truncate(&quiz.title, 32);
            let author = truncate(&quiz.user_name, 16);
            let questions = quiz.questions.len().max(quiz.total_questions);
            let relative_time = format_shared_at(&quiz.shared_at, now_ms);
            let offline = if quiz.is_offline { "  [offline]" } else { "" };
            format!(
                "{short_id:<22}  {title:<32}  {author:<16}  {questions:>3}q  {:>4} tries  {relative_time}{offline}",
                quiz.attempts
            )
        })
        .collect()
}

/// Print a listing in text or JSON form, keeping at most `limit` quizzes.
pub fn print_listing(listing: &QuizListing, limit: usize, as_json: bool) -> Result<(), CliError> {
    let quizzes = &listing.quizzes[..listing.quizzes.len().min(limit)];

    if as_json {
        let output = ListingOutput {
            mode: listing.mode.to_string(),
            notice: listing.notice.as_ref().map(ToString::to_string),
            quizzes: quizzes.iter().map(quiz_to_list_item).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Mode: {}", listing.mode);
    if let Some(notice) = &listing.notice {
        eprintln!("{notice}");
    }
    if quizzes.is_empty() {
        println!("No quizzes found.");
    }
    for line in format_quiz_lines(quizzes) {
        println!("{line}");
    }
    Ok(())
}

pub fn format_shared_at(shared_at: &SharedAt, now_ms: i64) -> String {
    shared_at.parsed().map_or_else(
        || "unknown".to_string(),
        |date_time| format_relative_time(date_time.timestamp_millis(), now_ms),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.chars().count() <= max_chars {
        collapsed
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = collapsed.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn normalize_search_query(query: &str) -> Result<String, CliError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptySearchQuery)
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_quiz_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyQuizId)
    } else {
        Ok(trimmed.to_string())
    }
}

/// Read a quiz from `file`, or from piped stdin when no file is given.
pub fn read_source_quiz(file: Option<&Path>) -> Result<SourceQuiz, CliError> {
    let raw = match file {
        Some(path) if path != Path::new("-") => std::fs::read_to_string(path)?,
        _ => read_piped_stdin()?.ok_or(CliError::MissingQuiz)?,
    };
    parse_source_quiz(&raw)
}

pub fn parse_source_quiz(raw: &str) -> Result<SourceQuiz, CliError> {
    let quiz = serde_json::from_str::<SourceQuiz>(raw)
        .map_err(|error| CliError::InvalidQuiz(error.to_string()))?;
    if quiz.questions.is_empty() {
        return Err(CliError::InvalidQuiz("quiz has no questions".to_string()));
    }
    Ok(quiz)
}

pub fn read_piped_stdin() -> Result<Option<String>, CliError> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }

    let mut buffer = String::new();
    stdin.lock().read_to_string(&mut buffer)?;
    let trimmed = buffer.trim();
    Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
}

/// Explicit `--user`, else the saved name.
pub fn resolve_user_name(
    explicit: Option<String>,
    saved: Option<String>,
) -> Result<String, CliError> {
    quizshare_core::util::normalize_text_option(explicit)
        .or(saved)
        .ok_or(CliError::MissingUserName)
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_db_path.or_else(|| env::var_os(ENV_DB_PATH).map(PathBuf::from)) {
        return Ok(path);
    }
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR).join("quizshare.db"))
        .ok_or_else(|| CliError::Config("failed to resolve data directory".to_string()))
}

pub fn resolve_config_path(cli_config: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(path) = cli_config.or_else(|| env::var_os(ENV_CONFIG_PATH).map(PathBuf::from)) {
        return Ok(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join("config.json"))
        .ok_or_else(|| CliError::Config("failed to resolve config directory".to_string()))
}
