//! Shared quiz model

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::util::contains_ignore_case;

/// Description used when the author leaves it blank.
pub const DEFAULT_DESCRIPTION: &str = "No description";

const ID_SUFFIX_LEN: usize = 9;

/// Identifier of a shared quiz: unix millis followed by a random suffix.
///
/// Ids received from other clients are kept verbatim, whatever their shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct QuizId(String);

impl QuizId {
    /// Generate a fresh id.
    #[must_use]
    pub fn generate() -> Self {
        let millis = Utc::now().timestamp_millis();
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!("{millis}{}", &suffix[..ID_SUFFIX_LEN]))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for QuizId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for QuizId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for QuizId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        LenientId::deserialize(deserializer).map(|id| Self(id.into_string()))
    }
}

/// Accepts both `"123"` and `123` for identifiers written by other clients.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientId {
    Text(String),
    Number(serde_json::Number),
}

impl LenientId {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Number(number) => number.to_string(),
        }
    }
}

fn deserialize_optional_id<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<LenientId>::deserialize(deserializer)?.map(LenientId::into_string))
}

/// Creation timestamp of a shared quiz, kept exactly as written.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharedAt(String);

impl SharedAt {
    /// Current time in the `toISOString` shape (`2024-01-01T00:00:00.000Z`).
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse leniently: RFC 3339, naive date-time (UTC), or bare date (midnight UTC).
    #[must_use]
    pub fn parsed(&self) -> Option<DateTime<Utc>> {
        let raw = self.0.trim();
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// Ordering key; unparseable timestamps sort before every valid one.
    #[must_use]
    pub fn sort_key(&self) -> Option<DateTime<Utc>> {
        self.parsed()
    }

    /// Strictly later than `other`. False when either side cannot be parsed.
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        match (self.parsed(), other.parsed()) {
            (Some(mine), Some(theirs)) => mine > theirs,
            _ => false,
        }
    }
}

impl From<&str> for SharedAt {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for SharedAt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One answer option of a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub letter: String,
    pub text: String,
}

/// A question; fields this layer does not interpret are carried along untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub question: String,
    #[serde(default)]
    pub options: Vec<QuizOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Question {
    /// Letter of the correct option. Older quizzes store it under `answer`.
    #[must_use]
    pub fn answer_key(&self) -> Option<&str> {
        self.correct_answer
            .as_deref()
            .or_else(|| self.extra.get("answer").and_then(Value::as_str))
    }
}

/// A private quiz owned by the author, the input to sharing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceQuiz {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
}

/// A quiz published for community consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub id: QuizId,
    #[serde(
        default,
        deserialize_with = "deserialize_optional_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub original_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default)]
    pub total_questions: usize,
    #[serde(default)]
    pub user_name: String,
    pub shared_at: SharedAt,
    #[serde(default)]
    pub views: u64,
    #[serde(default)]
    pub attempts: u64,
    /// Saved on this device only; never sent to a remote store.
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_offline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_shared: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_false(value: &bool) -> bool {
    !*value
}

impl QuizRecord {
    /// Build a new record from the author's quiz with a fresh id and timestamp.
    #[must_use]
    pub fn from_source(
        source: &SourceQuiz,
        title: impl Into<String>,
        description: Option<String>,
        user_name: impl Into<String>,
    ) -> Self {
        let description = crate::util::normalize_text_option(description)
            .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string());
        Self {
            id: QuizId::generate(),
            original_id: source.id.clone(),
            title: title.into(),
            description,
            questions: source.questions.clone(),
            total_questions: source.questions.len(),
            user_name: user_name.into(),
            shared_at: SharedAt::now(),
            views: 0,
            attempts: 0,
            is_offline: false,
            is_shared: false,
            extra: Map::new(),
        }
    }

    /// Copy without local-only annotation flags, as sent to remote stores.
    #[must_use]
    pub fn canonical(&self) -> Self {
        Self {
            is_offline: false,
            is_shared: false,
            ..self.clone()
        }
    }

    /// Case-insensitive keyword match on title, description and author.
    ///
    /// `keyword_lower` must already be lowercased.
    #[must_use]
    pub fn matches_keyword(&self, keyword_lower: &str) -> bool {
        contains_ignore_case(&self.title, keyword_lower)
            || contains_ignore_case(&self.description, keyword_lower)
            || contains_ignore_case(&self.user_name, keyword_lower)
    }

    /// Convert into the shape handed to a quiz session.
    #[must_use]
    pub fn to_active(&self, from_offline_copy: bool) -> ActiveQuiz {
        ActiveQuiz {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            questions: self.questions.clone(),
            total_questions: self.questions.len(),
            shared_by: self.user_name.clone(),
            is_offline: from_offline_copy,
        }
    }
}

/// Quiz currently being taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveQuiz {
    pub id: QuizId,
    pub title: String,
    pub description: String,
    pub questions: Vec<Question>,
    pub total_questions: usize,
    pub shared_by: String,
    pub is_offline: bool,
}
