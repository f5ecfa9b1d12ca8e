use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::{InitReport, Notice, QuizListing, ShareOutcome, ShareRequest, StartedQuiz};
use crate::analytics::{EventQueue, IpInfoResolver};
use crate::config::ClientConfig;
use crate::db::{QuizCollections, RecordKey, RecordStore, SqliteRecordStore};
use crate::error::{Error, Result};
use crate::lan::{
    AddressProbe, DiscoveredServer, LanServerClient, ServerDiscovery, ServerInfo, ServerUrl,
    UdpRouteProbe,
};
use crate::models::{QuizId, QuizRecord, SourceQuiz};
use crate::state::{ConnectionMode, ConnectionState};
use crate::util::normalize_text_option;

/// Sharing, browsing and starting community quizzes.
///
/// Reads fall back from the LAN server to the offline cache; shares retry
/// and then fall back to an offline save. Only validation failures and a
/// quiz missing from every tier surface as errors.
pub struct SharingService<P = UdpRouteProbe> {
    config: ClientConfig,
    store: SqliteRecordStore,
    collections: QuizCollections,
    lan: RwLock<LanServerClient>,
    state: Mutex<ConnectionState>,
    discovery: ServerDiscovery<P>,
    analytics: EventQueue,
    ip_info: IpInfoResolver,
    background: Mutex<Vec<JoinHandle<()>>>,
}

impl SharingService<UdpRouteProbe> {
    pub fn new(store: SqliteRecordStore, config: ClientConfig) -> Result<Self> {
        let probe = UdpRouteProbe::new(config.timeouts.address_probe());
        Self::with_probe(store, config, probe)
    }
}

impl<P: AddressProbe> SharingService<P> {
    /// Build a service with a custom local address source for discovery.
    pub fn with_probe(store: SqliteRecordStore, config: ClientConfig, probe: P) -> Result<Self> {
        config.validate()?;

        let server = match store.get_text(RecordKey::ServerUrl)? {
            Some(saved) => ServerUrl::parse(&saved)?,
            None => ServerUrl::parse(&config.server_url)?,
        };
        let lan = LanServerClient::new(server, config.timeouts)?;
        let discovery =
            ServerDiscovery::new(probe, config.discovery_port, config.timeouts.probe())?;
        let analytics = match &config.analytics_url {
            Some(url) => EventQueue::with_sink(url.clone(), config.timeouts.request())?,
            None => EventQueue::disabled(),
        };
        let ip_info = IpInfoResolver::new(store.clone(), config.timeouts.server_info())?;

        Ok(Self {
            collections: QuizCollections::new(store.clone()),
            store,
            lan: RwLock::new(lan),
            state: Mutex::new(ConnectionState::Unconfigured),
            discovery,
            analytics,
            ip_info,
            background: Mutex::new(Vec::new()),
            config,
        })
    }

    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub const fn collections(&self) -> &QuizCollections {
        &self.collections
    }

    pub const fn analytics(&self) -> &EventQueue {
        &self.analytics
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.lock().await
    }

    pub async fn server_url(&self) -> ServerUrl {
        self.lan.read().await.server().clone()
    }

    /// Check the server and report whether setup guidance is due.
    pub async fn initialize(&self) -> Result<InitReport> {
        let user_name = self.user_name()?;
        let state = self.check_status().await;
        let onboarded = self.store.has_flag(RecordKey::HasConfiguredServer)?;
        let server = self.server_url().await;
        tracing::info!("Sharing service ready: server={server} state={state:?}");

        if self.analytics.has_sink() {
            let location = self.ip_info.resolve().await;
            self.analytics.track(
                "session_start",
                serde_json::json!({ "ip": location, "mode": state.mode() }),
            );
        }

        Ok(InitReport::new(
            state,
            &server,
            user_name,
            !onboarded && !state.is_online(),
        ))
    }

    pub fn mark_onboarded(&self) -> Result<()> {
        self.store.set_flag(RecordKey::HasConfiguredServer)
    }

    /// Wait for background work and deliver queued analytics.
    pub async fn dispose(&self) {
        let tasks = std::mem::take(&mut *self.background.lock().await);
        for task in tasks {
            if let Err(error) = task.await {
                tracing::warn!("Background task ended abnormally: {error}");
            }
        }
        self.analytics.flush().await;
    }

    /// Probe the server and record the resulting state.
    pub async fn check_status(&self) -> ConnectionState {
        self.set_state(ConnectionState::CheckingServer).await;
        let client = self.lan.read().await.clone();
        let state = if client.check_status().await {
            ConnectionState::Online
        } else {
            ConnectionState::Offline
        };
        self.set_state(state).await;
        state
    }

    async fn ensure_status(&self) -> ConnectionState {
        let state = self.state().await;
        if state.is_online() {
            state
        } else {
            self.check_status().await
        }
    }

    async fn set_state(&self, state: ConnectionState) {
        let mut current = self.state.lock().await;
        if *current != state {
            tracing::debug!("Connection state {:?} -> {state:?}", *current);
            *current = state;
        }
    }

    async fn client(&self) -> LanServerClient {
        self.lan.read().await.clone()
    }

    /// Publish a quiz, or keep it on this device when the server is unreachable.
    pub async fn share(&self, source: &SourceQuiz, request: ShareRequest) -> Result<ShareOutcome> {
        let user_name = normalize_text_option(Some(request.user_name))
            .ok_or_else(|| Error::Validation("user name is required".to_string()))?;
        let title = normalize_text_option(Some(request.title))
            .ok_or_else(|| Error::Validation("quiz title is required".to_string()))?;
        self.store.put_raw(RecordKey::UserName, &user_name)?;

        let record = QuizRecord::from_source(source, title, request.description, &user_name);

        if !self.ensure_status().await.is_online() {
            return self.save_offline(record, "server offline".to_string());
        }

        let client = self.client().await;
        let attempts = self.config.share_max_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match client.create(&record, &user_name).await {
                Ok(created) => {
                    self.set_state(ConnectionState::Online).await;
                    self.collections.upsert_offline(created.clone())?;
                    self.analytics
                        .track_quiz_shared(&created.id, &created.title, false);
                    tracing::info!("Shared quiz {} ({})", created.title, created.id);
                    return Ok(ShareOutcome::Published { record: created });
                }
                Err(error) => {
                    tracing::warn!("Share attempt {attempt}/{attempts} failed: {error}");
                    last_error = Some(error);
                    if attempt < attempts {
                        tokio::time::sleep(self.config.share_retry_delay()).await;
                    }
                }
            }
        }

        self.set_state(ConnectionState::Offline).await;
        let reason = last_error.map_or_else(|| "share failed".to_string(), |error| error.to_string());
        self.save_offline(record, reason)
    }

    /// Keep a quiz on this device only.
    pub fn save_offline(&self, mut record: QuizRecord, reason: String) -> Result<ShareOutcome> {
        record.id = QuizId::generate();
        record.is_offline = true;
        self.collections.upsert_offline(record.clone())?;
        self.analytics
            .track_quiz_shared(&record.id, &record.title, true);
        tracing::info!("Saved quiz {} offline: {reason}", record.title);
        Ok(ShareOutcome::SavedOffline { record, reason })
    }

    /// Community quizzes from the server, or the offline cache.
    pub async fn list(&self) -> Result<QuizListing> {
        if self.ensure_status().await.is_online() {
            match self.client().await.list().await {
                Ok(quizzes) => {
                    self.set_state(ConnectionState::Online).await;
                    return Ok(online_listing(quizzes));
                }
                Err(error) => {
                    tracing::warn!("Listing from server failed, using offline cache: {error}");
                    self.set_state(ConnectionState::Offline).await;
                }
            }
        }
        self.offline_listing()
    }

    fn offline_listing(&self) -> Result<QuizListing> {
        let quizzes = self.collections.load(RecordKey::OfflineSharedQuizzes)?;
        let notice = quizzes.is_empty().then_some(Notice::ServerSetupRequired);
        Ok(QuizListing {
            quizzes,
            mode: ConnectionMode::Offline,
            notice,
        })
    }

    /// Keyword search; a blank keyword lists everything.
    pub async fn search(&self, keyword: &str) -> Result<QuizListing> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return self.list().await;
        }

        let reason = if self.ensure_status().await.is_online() {
            match self.client().await.search(keyword).await {
                Ok(quizzes) => {
                    self.set_state(ConnectionState::Online).await;
                    return Ok(online_listing(quizzes));
                }
                Err(error) => {
                    tracing::warn!("Search on server failed: {error}");
                    self.set_state(ConnectionState::Offline).await;
                    error.to_string()
                }
            }
        } else {
            "server offline".to_string()
        };

        if self.config.offline_search {
            let keyword_lower = keyword.to_lowercase();
            let quizzes = self
                .collections
                .load(RecordKey::OfflineSharedQuizzes)?
                .into_iter()
                .filter(|quiz| quiz.matches_keyword(&keyword_lower))
                .collect();
            return Ok(QuizListing {
                quizzes,
                mode: ConnectionMode::Offline,
                notice: None,
            });
        }

        Ok(QuizListing {
            quizzes: Vec::new(),
            mode: ConnectionMode::Offline,
            notice: Some(Notice::SearchUnavailable(reason)),
        })
    }

    /// Load a quiz for taking, from the server or the offline copy.
    pub async fn start_quiz(&self, id: &QuizId) -> Result<StartedQuiz> {
        if self.ensure_status().await.is_online() {
            let client = self.client().await;
            match client.get_by_id(id).await {
                Ok(record) => {
                    self.set_state(ConnectionState::Online).await;
                    self.spawn_attempt_update(client, record.id.clone()).await;
                    if let Err(error) = self.collections.upsert_offline(record.clone()) {
                        tracing::warn!("Could not cache quiz {id} offline: {error}");
                    }
                    self.analytics.track_quiz_started(&record.id, false);
                    return Ok(StartedQuiz {
                        quiz: record.to_active(false),
                        source: ConnectionMode::Online,
                    });
                }
                Err(error) => {
                    tracing::warn!("Loading quiz {id} from server failed: {error}");
                    if error.is_recoverable() {
                        self.set_state(ConnectionState::Offline).await;
                    }
                }
            }
        }

        let record = self
            .collections
            .find_offline(id)?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        self.analytics.track_quiz_started(&record.id, true);
        Ok(StartedQuiz {
            quiz: record.to_active(true),
            source: ConnectionMode::Offline,
        })
    }

    async fn spawn_attempt_update(&self, client: LanServerClient, id: QuizId) {
        let task = tokio::spawn(async move {
            if let Err(error) = client.increment_attempt(&id).await {
                tracing::warn!("Could not update attempt count for {id}: {error}");
            }
        });
        let mut background = self.background.lock().await;
        background.retain(|task| !task.is_finished());
        background.push(task);
    }

    /// Test and persist a server address. The previous address is kept on failure.
    pub async fn configure_server_url(&self, raw: &str) -> Result<ServerInfo> {
        let server = ServerUrl::parse(raw)?;
        let client = LanServerClient::new(server.clone(), self.config.timeouts)?;
        let info = client.server_info().await?;
        self.adopt_server(client).await?;
        tracing::info!("Configured quiz server {server}");
        Ok(info)
    }

    /// Forget the saved address and go back to the configured default.
    pub async fn clear_server_url(&self) -> Result<ServerUrl> {
        self.store.remove(RecordKey::ServerUrl)?;
        let server = ServerUrl::parse(&self.config.server_url)?;
        *self.lan.write().await = LanServerClient::new(server.clone(), self.config.timeouts)?;
        self.set_state(ConnectionState::Unconfigured).await;
        Ok(server)
    }

    /// Look for a server on the local network and adopt the first one found.
    pub async fn discover_server(&self) -> Result<Option<DiscoveredServer>> {
        let Some(found) = self.discovery.discover().await else {
            return Ok(None);
        };
        let client = LanServerClient::new(found.server.clone(), self.config.timeouts)?;
        self.adopt_server(client).await?;
        Ok(Some(found))
    }

    async fn adopt_server(&self, client: LanServerClient) -> Result<()> {
        self.store
            .put_raw(RecordKey::ServerUrl, &client.server().api_base())?;
        self.store.set_flag(RecordKey::HasConfiguredServer)?;
        *self.lan.write().await = client;
        self.set_state(ConnectionState::Online).await;
        Ok(())
    }

    pub fn user_name(&self) -> Result<Option<String>> {
        Ok(normalize_text_option(self.store.get_text(RecordKey::UserName)?))
    }

    pub fn set_user_name(&self, name: &str) -> Result<String> {
        let name = normalize_text_option(Some(name.to_string()))
            .ok_or_else(|| Error::Validation("user name is required".to_string()))?;
        self.store.put_raw(RecordKey::UserName, &name)?;
        Ok(name)
    }
}

fn online_listing(quizzes: Vec<QuizRecord>) -> QuizListing {
    QuizListing {
        quizzes,
        mode: ConnectionMode::Online,
        notice: None,
    }
}
