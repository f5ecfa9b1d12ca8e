//! Quiz sharing orchestration across the LAN server and the offline cache.

mod service;

use std::fmt;

use serde::Serialize;

use crate::lan::ServerUrl;
use crate::models::{ActiveQuiz, QuizRecord};
use crate::state::{ConnectionMode, ConnectionState};

pub use service::SharingService;

/// Author input for a share.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareRequest {
    pub title: String,
    pub description: Option<String>,
    pub user_name: String,
}

/// Where a shared quiz ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ShareOutcome {
    Published { record: QuizRecord },
    SavedOffline { record: QuizRecord, reason: String },
}

impl ShareOutcome {
    pub const fn record(&self) -> &QuizRecord {
        match self {
            Self::Published { record } | Self::SavedOffline { record, .. } => record,
        }
    }

    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published { .. })
    }
}

/// Soft condition attached to a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Notice {
    /// No server reachable and nothing cached offline.
    ServerSetupRequired,
    /// Search needs the server; carries the failure reason.
    SearchUnavailable(String),
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ServerSetupRequired => write!(
                f,
                "No quiz server reachable and no offline quizzes yet. Configure a server with `quizshare server set <address>` or `quizshare server discover`."
            ),
            Self::SearchUnavailable(reason) => {
                write!(f, "Search needs the quiz server, which is unavailable: {reason}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizListing {
    pub quizzes: Vec<QuizRecord>,
    pub mode: ConnectionMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartedQuiz {
    pub quiz: ActiveQuiz,
    pub source: ConnectionMode,
}

/// Result of [`SharingService::initialize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InitReport {
    pub state: ConnectionState,
    pub server: String,
    pub user_name: Option<String>,
    /// Never onboarded and no server answered; show setup guidance.
    pub first_run: bool,
}

impl InitReport {
    pub(crate) fn new(
        state: ConnectionState,
        server: &ServerUrl,
        user_name: Option<String>,
        first_run: bool,
    ) -> Self {
        Self {
            state,
            server: server.to_string(),
            user_name,
            first_run,
        }
    }
}
