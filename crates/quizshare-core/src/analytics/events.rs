use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::models::QuizId;
use crate::util::compact_text;

/// One tracked user action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub name: String,
    pub data: Value,
    pub created_at: String,
}

impl AnalyticsEvent {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: "event".to_string(),
            name: name.into(),
            data,
            created_at: chrono::Utc::now()
                .to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

struct Sink {
    client: reqwest::Client,
    endpoint: String,
}

/// Buffer of events waiting to be delivered.
///
/// Delivery is best effort: a failed post is logged and the event dropped.
pub struct EventQueue {
    session_id: String,
    pending: Mutex<Vec<AnalyticsEvent>>,
    sink: Option<Sink>,
}

impl EventQueue {
    /// Queue that logs and discards events.
    pub fn disabled() -> Self {
        Self {
            session_id: new_session_id(),
            pending: Mutex::new(Vec::new()),
            sink: None,
        }
    }

    /// Queue posting each event as JSON to `endpoint`.
    pub fn with_sink(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| {
                Error::Config(format!("failed to build analytics HTTP client: {error}"))
            })?;
        Ok(Self {
            sink: Some(Sink {
                client,
                endpoint: endpoint.into(),
            }),
            ..Self::disabled()
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub const fn has_sink(&self) -> bool {
        self.sink.is_some()
    }

    /// Enqueue an event; `data` fields are merged with the session id.
    pub fn track(&self, name: &str, data: Value) {
        let mut fields = match data {
            Value::Object(fields) => fields,
            Value::Null => Map::new(),
            other => Map::from_iter([("value".to_string(), other)]),
        };
        fields.insert(
            "sessionId".to_string(),
            Value::String(self.session_id.clone()),
        );

        let event = AnalyticsEvent::new(name, Value::Object(fields));
        match self.pending.lock() {
            Ok(mut pending) => pending.push(event),
            Err(_) => tracing::warn!("Analytics queue poisoned, dropping {name}"),
        }
    }

    pub fn track_quiz_shared(&self, id: &QuizId, title: &str, offline: bool) {
        self.track(
            "quiz_shared",
            serde_json::json!({ "quizId": id, "title": title, "offline": offline }),
        );
    }

    pub fn track_quiz_started(&self, id: &QuizId, offline: bool) {
        self.track(
            "quiz_started",
            serde_json::json!({ "quizId": id, "offline": offline }),
        );
    }

    pub fn len(&self) -> usize {
        self.pending.lock().map_or(0, |pending| pending.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver and clear every queued event. Returns how many were delivered.
    pub async fn flush(&self) -> usize {
        let events = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return 0,
        };
        if events.is_empty() {
            return 0;
        }

        let Some(sink) = &self.sink else {
            for event in &events {
                tracing::debug!("Analytics event (no sink): {}", event.name);
            }
            return 0;
        };

        let mut delivered = 0;
        for event in &events {
            match post_event(sink, event).await {
                Ok(()) => delivered += 1,
                Err(error) => tracing::warn!("Failed to deliver {} event: {error}", event.name),
            }
        }
        tracing::debug!("Flushed {delivered}/{} analytics events", events.len());
        delivered
    }
}

async fn post_event(sink: &Sink, event: &AnalyticsEvent) -> Result<()> {
    let response = sink.client.post(&sink.endpoint).json(event).send().await?;
    if response.status().is_success() {
        return Ok(());
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(Error::Server(format!(
        "analytics sink returned HTTP {status}: {}",
        compact_text(&body)
    )))
}

fn new_session_id() -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("session_{}_{}", crate::util::unix_millis_now(), &suffix[..9])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn track_adds_session_id() {
        let queue = EventQueue::disabled();
        queue.track("quiz_started", json!({ "quizId": "q1" }));
        assert_eq!(queue.len(), 1);

        let pending = queue.pending.lock().unwrap();
        assert_eq!(pending[0].data["quizId"], "q1");
        assert_eq!(pending[0].data["sessionId"], queue.session_id());
        assert_eq!(pending[0].event_type, "event");
    }

    #[test]
    fn session_id_has_expected_shape() {
        let queue = EventQueue::disabled();
        assert!(queue.session_id().starts_with("session_"));
        assert_eq!(queue.session_id().rsplit('_').next().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn flush_without_sink_drops_events() {
        let queue = EventQueue::disabled();
        queue.track("quiz_shared", Value::Null);
        assert_eq!(queue.flush().await, 0);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn flush_posts_each_event() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "type": "event" })))
            .respond_with(ResponseTemplate::new(204))
            .expect(2)
            .mount(&server)
            .await;

        let queue = EventQueue::with_sink(server.uri(), Duration::from_secs(2)).unwrap();
        queue.track_quiz_shared(&QuizId::from("a"), "Rust", false);
        queue.track_quiz_started(&QuizId::from("a"), true);

        assert_eq!(queue.flush().await, 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn failed_delivery_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let queue = EventQueue::with_sink(server.uri(), Duration::from_secs(2)).unwrap();
        queue.track("quiz_started", json!({}));
        assert_eq!(queue.flush().await, 0);
        assert_eq!(queue.flush().await, 0);
    }
}
