//! Cloud document sync client.
//!
//! The cloud endpoint stores one JSON document holding the whole community
//! collection. Every push replaces that document, so two concurrent pushers
//! race and the later one wins.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;

use crate::db::{QuizCollections, RecordKey};
use crate::error::{Error, Result};
use crate::models::{QuizId, QuizRecord, SourceQuiz};
use crate::util::{compact_text, is_http_url, normalize_text_option};

use super::merge::merge;

#[derive(Debug, Deserialize)]
struct CloudDocument {
    #[serde(default)]
    quizzes: Vec<serde_json::Value>,
}

impl CloudDocument {
    /// Decode entries one by one; an entry that does not decode is skipped.
    fn into_records(self) -> Vec<QuizRecord> {
        self.quizzes
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(error) => {
                    tracing::warn!("Skipping malformed cloud quiz at index {index}: {error}");
                    None
                }
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
struct CloudUpload<'a> {
    quizzes: &'a [QuizRecord],
    updated: String,
}

/// Client for the fixed cloud JSON endpoint.
#[derive(Clone)]
pub struct CloudSyncClient {
    endpoint: String,
    client: reqwest::Client,
    collections: QuizCollections,
}

impl CloudSyncClient {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        collections: QuizCollections,
    ) -> Result<Self> {
        let endpoint = normalize_endpoint(endpoint.into())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Config(format!("failed to build cloud HTTP client: {error}")))?;
        Ok(Self {
            endpoint,
            client,
            collections,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Local community cache, without touching the network.
    pub fn local(&self) -> Result<Vec<QuizRecord>> {
        self.collections.load(RecordKey::CommunityQuizzes)
    }

    /// Fetch the cloud document, merge it into the local cache and persist.
    ///
    /// Network failures are logged and answered with the local cache; only
    /// local storage failures are returned as errors.
    pub async fn pull(&self) -> Result<Vec<QuizRecord>> {
        match self.reconcile().await {
            Ok(merged) => Ok(merged),
            Err(error) if !error.is_recoverable() => Err(error),
            Err(error) => {
                tracing::warn!("Cloud sync failed, using local data: {error}");
                self.local()
            }
        }
    }

    /// Like [`pull`](Self::pull), but a failed fetch is returned instead of
    /// answered with the local cache.
    pub async fn reconcile(&self) -> Result<Vec<QuizRecord>> {
        let local = self.local()?;
        let remote = self.fetch_remote().await?;
        let merged = merge(&local, &remote);
        self.collections.save(RecordKey::CommunityQuizzes, &merged)?;
        tracing::info!("Synced with cloud: {} quizzes", merged.len());
        Ok(merged)
    }

    async fn fetch_remote(&self) -> Result<Vec<QuizRecord>> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Server(format!(
                "cloud endpoint returned HTTP {status}: {}",
                compact_text(&body)
            )));
        }

        let document = response.json::<CloudDocument>().await?;
        Ok(document.into_records())
    }

    /// Upload the whole collection in the background.
    ///
    /// Failures are logged only. The returned handle may be dropped.
    pub fn push(&self, records: Vec<QuizRecord>) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(error) = client.push_now(&records).await {
                tracing::warn!("Upload to cloud failed: {error}");
            }
        })
    }

    /// Upload the whole collection and wait for the response.
    pub async fn push_now(&self, records: &[QuizRecord]) -> Result<()> {
        let canonical = records.iter().map(QuizRecord::canonical).collect::<Vec<_>>();
        let upload = CloudUpload {
            quizzes: &canonical,
            updated: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        };

        let response = self.client.post(&self.endpoint).json(&upload).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Server(format!(
                "cloud upload returned HTTP {status}: {}",
                compact_text(&body)
            )));
        }

        tracing::debug!("Uploaded {} quizzes to cloud", canonical.len());
        Ok(())
    }

    /// Publish a quiz to the community collection.
    ///
    /// The local write happens first; the upload is fire-and-forget.
    pub async fn share(&self, source: &SourceQuiz, user_name: &str) -> Result<QuizRecord> {
        let (record, written) = self.share_local(source, user_name).await?;
        self.push(written);
        Ok(record)
    }

    /// Pull, then add a quiz to the local community collection without
    /// uploading. Returns the new record and the collection to upload.
    pub async fn share_local(
        &self,
        source: &SourceQuiz,
        user_name: &str,
    ) -> Result<(QuizRecord, Vec<QuizRecord>)> {
        let user_name = normalize_text_option(Some(user_name.to_string()))
            .ok_or_else(|| Error::Validation("user name is required".to_string()))?;
        let title = normalize_text_option(Some(source.title.clone()))
            .ok_or_else(|| Error::Validation("quiz title is required".to_string()))?;

        self.pull().await?;
        let record =
            QuizRecord::from_source(source, title, Some(source.description.clone()), user_name);
        let written = self
            .collections
            .insert_capped(RecordKey::CommunityQuizzes, record.clone())?;
        Ok((record, written))
    }

    /// Read one quiz, counting the view.
    pub async fn get_by_id(&self, id: &QuizId) -> Result<QuizRecord> {
        self.pull().await?;
        let (records, quiz) = self
            .collections
            .update_record(RecordKey::CommunityQuizzes, id, |record| record.views += 1)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.push(records);
        Ok(quiz)
    }

    /// Count an attempt on a quiz.
    pub async fn increment_attempts(&self, id: &QuizId) -> Result<QuizRecord> {
        self.pull().await?;
        let (records, quiz) = self
            .collections
            .update_record(RecordKey::CommunityQuizzes, id, |record| {
                record.attempts += 1;
            })?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.push(records);
        Ok(quiz)
    }

    /// Keyword search over title, description and author.
    pub async fn search(&self, keyword: &str) -> Result<Vec<QuizRecord>> {
        let quizzes = self.pull().await?;
        let keyword = keyword.trim().to_lowercase();
        if keyword.is_empty() {
            return Ok(quizzes);
        }
        Ok(quizzes
            .into_iter()
            .filter(|quiz| quiz.matches_keyword(&keyword))
            .collect())
    }
}

fn normalize_endpoint(raw: String) -> Result<String> {
    let endpoint = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::Config("cloud endpoint must not be empty".to_string()))?;
    if is_http_url(&endpoint) {
        Ok(endpoint)
    } else {
        Err(Error::Config(
            "cloud endpoint must include http:// or https://".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteRecordStore;
    use crate::models::SharedAt;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn collections() -> QuizCollections {
        QuizCollections::new(SqliteRecordStore::in_memory().unwrap())
    }

    fn client(url: &str, collections: QuizCollections) -> CloudSyncClient {
        CloudSyncClient::new(url, Duration::from_secs(2), collections).unwrap()
    }

    fn record_json(id: &str, shared_at: &str) -> serde_json::Value {
        json!({
            "id": id,
            "title": format!("Quiz {id}"),
            "description": "about rust",
            "questions": [],
            "totalQuestions": 0,
            "userName": "ana",
            "sharedAt": shared_at,
            "views": 0,
            "attempts": 0
        })
    }

    fn source() -> SourceQuiz {
        SourceQuiz {
            id: Some("private-1".to_string()),
            title: "Borrow checker".to_string(),
            description: String::new(),
            questions: Vec::new(),
        }
    }

    #[test]
    fn normalize_endpoint_rejects_invalid_values() {
        assert!(normalize_endpoint(String::new()).is_err());
        assert!(normalize_endpoint("api.npoint.io/abc".to_string()).is_err());
        assert!(normalize_endpoint(" https://api.npoint.io/abc ".to_string()).is_ok());
    }

    #[tokio::test]
    async fn pull_merges_remote_into_local_and_persists() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/doc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quizzes": [record_json("remote", "2024-01-01T00:00:00Z")]
            })))
            .mount(&server)
            .await;

        let collections = collections();
        let local: QuizRecord =
            serde_json::from_value(record_json("local", "2024-03-01T00:00:00Z")).unwrap();
        collections
            .save(RecordKey::CommunityQuizzes, &[local])
            .unwrap();

        let client = client(&format!("{}/doc", server.uri()), collections.clone());
        let merged = client.pull().await.unwrap();

        let ids = merged.iter().map(|r| r.id.to_string()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["local", "remote"]);
        assert_eq!(collections.load(RecordKey::CommunityQuizzes).unwrap(), merged);
    }

    #[tokio::test]
    async fn pull_falls_back_to_local_on_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let collections = collections();
        let local: QuizRecord =
            serde_json::from_value(record_json("local", "2024-03-01T00:00:00Z")).unwrap();
        collections
            .save(RecordKey::CommunityQuizzes, std::slice::from_ref(&local))
            .unwrap();

        let merged = client(&server.uri(), collections).pull().await.unwrap();
        assert_eq!(merged, vec![local]);
    }

    #[tokio::test]
    async fn pull_falls_back_to_local_when_unreachable() {
        // Port 9 (discard) on loopback is closed on test machines.
        let client = client("http://127.0.0.1:9/doc", collections());
        assert!(client.pull().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_entry_is_skipped_and_the_rest_survive() {
        let server = MockServer::start().await;
        let mut untitled = record_json("broken", "2024-01-03T00:00:00Z");
        untitled.as_object_mut().unwrap().remove("title");
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quizzes": [
                    record_json("a", "2024-01-02T00:00:00Z"),
                    untitled,
                    "not a quiz",
                    record_json("b", "2024-01-01T00:00:00Z")
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let collections = collections();
        let client = client(&server.uri(), collections.clone());
        let pulled = client.pull().await.unwrap();
        let ids = pulled.iter().map(|r| r.id.to_string()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);

        let (record, written) = client.share_local(&source(), "ana").await.unwrap();
        let written_ids = written.iter().map(|r| r.id.to_string()).collect::<Vec<_>>();
        assert_eq!(written_ids, vec![record.id.to_string(), "a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn reconcile_reports_fetch_failure_without_touching_cache() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let collections = collections();
        let local: QuizRecord =
            serde_json::from_value(record_json("local", "2024-03-01T00:00:00Z")).unwrap();
        collections
            .save(RecordKey::CommunityQuizzes, std::slice::from_ref(&local))
            .unwrap();

        let client = client(&server.uri(), collections.clone());
        let error = client.reconcile().await.unwrap_err();
        assert!(matches!(error, Error::Server(_)));
        assert_eq!(collections.load(RecordKey::CommunityQuizzes).unwrap(), vec![local]);
    }

    #[tokio::test]
    async fn push_now_strips_local_flags() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut record: QuizRecord =
            serde_json::from_value(record_json("a", "2024-01-01T00:00:00Z")).unwrap();
        record.is_offline = true;

        let client = client(&server.uri(), collections());
        client.push_now(&[record]).await.unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body["quizzes"][0].get("isOffline").is_none());
        assert!(body["updated"].is_string());
    }

    #[tokio::test]
    async fn share_writes_locally_then_uploads() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "quizzes": [] })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let collections = collections();
        let client = client(&server.uri(), collections.clone());
        let record = client.share(&source(), "ana").await.unwrap();

        assert_eq!(record.original_id.as_deref(), Some("private-1"));
        let stored = collections.load(RecordKey::CommunityQuizzes).unwrap();
        assert_eq!(stored[0].id, record.id);
    }

    #[tokio::test]
    async fn share_local_does_not_upload() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "quizzes": [] })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client(&server.uri(), collections());
        let (record, written) = client.share_local(&source(), "ana").await.unwrap();
        assert_eq!(written, vec![record]);
    }

    #[tokio::test]
    async fn share_rejects_blank_user_name_before_network() {
        let server = MockServer::start().await;
        let client = client(&server.uri(), collections());
        let error = client.share(&source(), "  ").await.unwrap_err();
        assert!(matches!(error, Error::Validation(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_by_id_counts_views_and_reports_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quizzes": [record_json("a", "2024-01-01T00:00:00Z")]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = client(&server.uri(), collections());
        let quiz = client.get_by_id(&QuizId::from("a")).await.unwrap();
        assert_eq!(quiz.views, 1);

        let error = client.get_by_id(&QuizId::from("zz")).await.unwrap_err();
        assert!(matches!(error, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn search_filters_case_insensitively() {
        let server = MockServer::start().await;
        let mut other = record_json("b", "2024-01-02T00:00:00Z");
        other["description"] = json!("about go");
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quizzes": [record_json("a", "2024-01-01T00:00:00Z"), other]
            })))
            .mount(&server)
            .await;

        let client = client(&server.uri(), collections());
        let found = client.search("RUST").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "a");
        assert_eq!(client.search(" ").await.unwrap().len(), 2);
    }

    #[test]
    fn shared_at_of_new_records_is_iso() {
        assert!(SharedAt::now().as_str().ends_with('Z'));
    }
}
