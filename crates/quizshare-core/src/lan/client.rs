//! REST client for a quiz server on the local network.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use super::url::ServerUrl;
use crate::config::Timeouts;
use crate::error::{Error, Result};
use crate::models::{QuizId, QuizRecord};
use crate::util::compact_text;

/// Addresses a server reports for itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfo {
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub ip_addresses: Vec<String>,
}

/// Response shape shared by the quiz routes.
#[derive(Debug, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    quizzes: Option<Vec<QuizRecord>>,
    #[serde(default)]
    quiz: Option<QuizRecord>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    quiz: QuizRecord,
    user_name: &'a str,
}

#[derive(Clone)]
pub struct LanServerClient {
    server: ServerUrl,
    client: reqwest::Client,
    timeouts: Timeouts,
}

impl LanServerClient {
    pub fn new(server: ServerUrl, timeouts: Timeouts) -> Result<Self> {
        Ok(Self {
            server,
            client: build_http_client()?,
            timeouts,
        })
    }

    pub const fn server(&self) -> &ServerUrl {
        &self.server
    }

    /// Whether the server answers the listing route in time.
    pub async fn check_status(&self) -> bool {
        let result = self
            .client
            .get(self.server.endpoint("/shared-quizzes"))
            .timeout(self.timeouts.status())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::debug!(
                    "Server status check at {} returned HTTP {}",
                    self.server,
                    response.status().as_u16()
                );
                false
            }
            Err(error) => {
                tracing::debug!("Server status check at {} failed: {error}", self.server);
                false
            }
        }
    }

    pub async fn server_info(&self) -> Result<ServerInfo> {
        fetch_server_info(&self.client, &self.server, self.timeouts.server_info()).await
    }

    pub async fn list(&self) -> Result<Vec<QuizRecord>> {
        let request = self
            .client
            .get(self.server.endpoint("/shared-quizzes"))
            .timeout(self.timeouts.list());
        Ok(send(request).await?.quizzes.unwrap_or_default())
    }

    /// Server-side keyword search; the keyword travels as one path segment.
    pub async fn search(&self, keyword: &str) -> Result<Vec<QuizRecord>> {
        let route = format!(
            "/shared-quizzes/search/{}",
            urlencoding::encode(keyword.trim())
        );
        let request = self
            .client
            .get(self.server.endpoint(&route))
            .timeout(self.timeouts.list());
        Ok(send(request).await?.quizzes.unwrap_or_default())
    }

    pub async fn get_by_id(&self, id: &QuizId) -> Result<QuizRecord> {
        let request = self
            .client
            .get(self.server.endpoint(&quiz_route(id)))
            .timeout(self.timeouts.request());

        match send(request).await {
            Ok(envelope) => envelope
                .quiz
                .ok_or_else(|| Error::Server(format!("response for quiz {id} has no quiz"))),
            Err(Error::NotFound(_)) => Err(Error::NotFound(id.to_string())),
            Err(error) => Err(error),
        }
    }

    /// Publish a quiz; returns the record as stored by the server.
    pub async fn create(&self, quiz: &QuizRecord, user_name: &str) -> Result<QuizRecord> {
        let body = CreateRequest {
            quiz: quiz.canonical(),
            user_name,
        };
        let request = self
            .client
            .post(self.server.endpoint("/shared-quizzes"))
            .timeout(self.timeouts.request())
            .json(&body);

        send(request)
            .await?
            .quiz
            .ok_or_else(|| Error::Server("create response has no quiz".to_string()))
    }

    pub async fn increment_attempt(&self, id: &QuizId) -> Result<()> {
        let route = format!("{}/attempt", quiz_route(id));
        let response = self
            .client
            .post(self.server.endpoint(&route))
            .timeout(self.timeouts.request())
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::Server(format!(
                "attempt update returned HTTP {}",
                response.status().as_u16()
            )))
        }
    }
}

pub(crate) fn build_http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .build()
        .map_err(|error| Error::Config(format!("failed to build LAN HTTP client: {error}")))
}

/// GET `<server>/api/server-info` with an explicit timeout.
pub(crate) async fn fetch_server_info(
    client: &reqwest::Client,
    server: &ServerUrl,
    timeout: Duration,
) -> Result<ServerInfo> {
    let response = client
        .get(server.endpoint("/server-info"))
        .timeout(timeout)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(Error::Server(format!(
            "server-info returned HTTP {}",
            response.status().as_u16()
        )));
    }

    Ok(response.json::<ServerInfo>().await?)
}

fn quiz_route(id: &QuizId) -> String {
    format!("/shared-quizzes/{}", urlencoding::encode(id.as_str()))
}

async fn send(request: reqwest::RequestBuilder) -> Result<ApiEnvelope> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    let envelope = serde_json::from_str::<ApiEnvelope>(&body).ok();

    if status == StatusCode::NOT_FOUND {
        let message = envelope
            .and_then(|envelope| envelope.error.or(envelope.message))
            .unwrap_or_else(|| "resource".to_string());
        return Err(Error::NotFound(message));
    }

    match envelope {
        Some(envelope) if status.is_success() && envelope.success => Ok(envelope),
        Some(envelope) => Err(Error::Server(
            envelope
                .error
                .or(envelope.message)
                .unwrap_or_else(|| format!("request failed with HTTP {}", status.as_u16())),
        )),
        None => Err(Error::Server(format!(
            "HTTP {}: unexpected response: {}",
            status.as_u16(),
            compact_text(&body)
        ))),
    }
}
