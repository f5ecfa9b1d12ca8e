//! Periodic cloud sync.

use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::cloud::CloudSyncClient;

/// Background task that pulls from the cloud on a fixed interval.
///
/// The first pull runs immediately. `shutdown` stops the timer, pulls once
/// more and uploads the merged collection before the task ends; when that
/// last fetch fails nothing is uploaded. Dropping the poller without calling
/// `shutdown` cancels it without a final upload.
pub struct SyncPoller {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SyncPoller {
    pub fn start(client: CloudSyncClient, interval: Duration) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {
                        tracing::debug!("Cloud sync tick: interval={}s", interval.as_secs());
                        if let Err(error) = client.pull().await {
                            tracing::error!("Periodic cloud sync failed: {error}");
                        }
                    }
                }
            }

            flush(&client).await;
        });

        Self {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Stop polling, flush the local collection, and wait for the task.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(error) = task.await {
                tracing::warn!("Cloud sync task ended abnormally: {error}");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for SyncPoller {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

async fn flush(client: &CloudSyncClient) {
    // Uploading without a fresh merge would drop records shared since the last tick.
    match client.reconcile().await {
        Ok(records) if records.is_empty() => {
            tracing::debug!("Nothing to flush to cloud");
        }
        Ok(records) => {
            if let Err(error) = client.push_now(&records).await {
                tracing::warn!("Final cloud flush failed: {error}");
            }
        }
        Err(error) => tracing::warn!("Skipping final cloud flush: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{QuizCollections, RecordKey, SqliteRecordStore};
    use serde_json::json;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn wait_for_requests(server: &MockServer, verb: &str, count: usize) {
        for _ in 0..100 {
            let seen = server
                .received_requests()
                .await
                .unwrap()
                .iter()
                .filter(|request| request.method.as_str() == verb)
                .count();
            if seen >= count {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("timed out waiting for {count} {verb} request(s)");
    }

    #[tokio::test]
    async fn pulls_immediately_and_flushes_on_shutdown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quizzes": [{
                    "id": "a",
                    "title": "A",
                    "sharedAt": "2024-01-01T00:00:00Z"
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let collections = QuizCollections::new(SqliteRecordStore::in_memory().unwrap());
        let client =
            CloudSyncClient::new(server.uri(), Duration::from_secs(2), collections.clone())
                .unwrap();

        let poller = SyncPoller::start(client, Duration::from_secs(3600));
        wait_for_requests(&server, "GET", 1).await;
        assert!(poller.is_running());

        poller.shutdown().await;
        assert_eq!(
            collections.load(RecordKey::CommunityQuizzes).unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn flush_keeps_records_shared_elsewhere_since_last_tick() {
        let server = MockServer::start().await;
        let quiz = |id: &str, shared_at: &str| {
            json!({ "id": id, "title": id.to_uppercase(), "sharedAt": shared_at })
        };
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "quizzes": [quiz("a", "2024-01-01T00:00:00Z")] })),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "quizzes": [
                    quiz("b", "2024-02-01T00:00:00Z"),
                    quiz("a", "2024-01-01T00:00:00Z")
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let collections = QuizCollections::new(SqliteRecordStore::in_memory().unwrap());
        let client = CloudSyncClient::new(server.uri(), Duration::from_secs(2), collections).unwrap();

        let poller = SyncPoller::start(client, Duration::from_secs(3600));
        wait_for_requests(&server, "GET", 1).await;
        poller.shutdown().await;

        let requests = server.received_requests().await.unwrap();
        let upload = requests
            .iter()
            .find(|request| request.method.as_str() == "POST")
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&upload.body).unwrap();
        let ids = body["quizzes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|quiz| quiz["id"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn shutdown_skips_flush_when_final_fetch_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let collections = QuizCollections::new(SqliteRecordStore::in_memory().unwrap());
        let local = serde_json::from_value(json!({
            "id": "local",
            "title": "Local",
            "sharedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        collections.save(RecordKey::CommunityQuizzes, &[local]).unwrap();
        let client =
            CloudSyncClient::new(server.uri(), Duration::from_secs(2), collections).unwrap();

        let poller = SyncPoller::start(client, Duration::from_secs(3600));
        wait_for_requests(&server, "GET", 1).await;
        poller.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_skips_flush_for_empty_collection() {
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

        let collections = QuizCollections::new(SqliteRecordStore::in_memory().unwrap());
        let client =
            CloudSyncClient::new(server.uri(), Duration::from_secs(2), collections).unwrap();

        let poller = SyncPoller::start(client, Duration::from_secs(3600));
        wait_for_requests(&server, "GET", 1).await;
        poller.shutdown().await;
    }
}
