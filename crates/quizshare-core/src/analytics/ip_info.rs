//! Public IP and coarse location lookup with a cached fallback.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::{RecordKey, RecordStore, SqliteRecordStore};
use crate::error::{Error, Result};
use crate::models::CachedEntry;
use crate::util::unix_millis_now;

/// Age after which a cached lookup is no longer used as a fallback.
pub const IP_INFO_MAX_AGE: Duration = Duration::from_secs(60 * 60);

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpInfo {
    pub ip: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub country_code: String,
    pub timezone: String,
    pub isp: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub postal: String,
}

impl IpInfo {
    pub fn unknown() -> Self {
        Self {
            ip: UNKNOWN.to_string(),
            city: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            country_code: UNKNOWN.to_string(),
            timezone: UNKNOWN.to_string(),
            isp: UNKNOWN.to_string(),
            latitude: None,
            longitude: None,
            postal: UNKNOWN.to_string(),
        }
    }
}

/// Lookup service and the JSON dialect it answers in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpInfoProvider {
    /// ipapi.co style (`country_name`, `org`, `postal`)
    IpApiCo { url: String },
    /// ip-api.com style (`status`, `query`, `regionName`, `zip`)
    IpApiCom { url: String },
}

impl IpInfoProvider {
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::IpApiCo {
                url: "https://ipapi.co/json/".to_string(),
            },
            Self::IpApiCom {
                url: "http://ip-api.com/json/?fields=status,message,country,countryCode,region,regionName,city,zip,lat,lon,timezone,isp,org,as,query".to_string(),
            },
        ]
    }

    const fn name(&self) -> &'static str {
        match self {
            Self::IpApiCo { .. } => "ipapi.co",
            Self::IpApiCom { .. } => "ip-api.com",
        }
    }

    const fn url(&self) -> &String {
        match self {
            Self::IpApiCo { url } | Self::IpApiCom { url } => url,
        }
    }

    fn parse(&self, body: &Value) -> Result<IpInfo> {
        match self {
            Self::IpApiCo { .. } => {
                if body.get("error").and_then(Value::as_bool) == Some(true) {
                    return Err(Error::Server(text_field(body, &["reason"])));
                }
                Ok(IpInfo {
                    ip: text_field(body, &["ip"]),
                    city: text_field(body, &["city"]),
                    region: text_field(body, &["region"]),
                    country: text_field(body, &["country_name"]),
                    country_code: text_field(body, &["country_code"]),
                    timezone: text_field(body, &["timezone"]),
                    isp: text_field(body, &["org"]),
                    latitude: body.get("latitude").and_then(Value::as_f64),
                    longitude: body.get("longitude").and_then(Value::as_f64),
                    postal: text_field(body, &["postal"]),
                })
            }
            Self::IpApiCom { .. } => {
                if body.get("status").and_then(Value::as_str) != Some("success") {
                    return Err(Error::Server(text_field(body, &["message"])));
                }
                Ok(IpInfo {
                    ip: text_field(body, &["query"]),
                    city: text_field(body, &["city"]),
                    region: text_field(body, &["regionName"]),
                    country: text_field(body, &["country"]),
                    country_code: text_field(body, &["countryCode"]),
                    timezone: text_field(body, &["timezone"]),
                    isp: text_field(body, &["isp", "org"]),
                    latitude: body.get("lat").and_then(Value::as_f64),
                    longitude: body.get("lon").and_then(Value::as_f64),
                    postal: text_field(body, &["zip"]),
                })
            }
        }
    }
}

/// First non-empty string among `keys`, else `Unknown`.
fn text_field(body: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| body.get(*key).and_then(Value::as_str))
        .find(|value| !value.trim().is_empty())
        .unwrap_or(UNKNOWN)
        .to_string()
}

pub struct IpInfoResolver {
    client: reqwest::Client,
    providers: Vec<IpInfoProvider>,
    store: SqliteRecordStore,
}

impl IpInfoResolver {
    pub fn new(store: SqliteRecordStore, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| Error::Config(format!("failed to build IP lookup client: {error}")))?;
        Ok(Self {
            client,
            providers: IpInfoProvider::defaults(),
            store,
        })
    }

    #[must_use]
    pub fn with_providers(mut self, providers: Vec<IpInfoProvider>) -> Self {
        self.providers = providers;
        self
    }

    /// Ask each provider in turn. The first answer is cached; when all fail
    /// a cached answer younger than an hour is used, else `IpInfo::unknown`.
    pub async fn resolve(&self) -> IpInfo {
        for provider in &self.providers {
            match self.query(provider).await {
                Ok(info) => {
                    tracing::debug!("IP lookup via {} succeeded", provider.name());
                    if let Err(error) = self.store.save_json(RecordKey::CachedIpInfo, &CachedEntry::now(&info)) {
                        tracing::warn!("Failed to cache IP info: {error}");
                    }
                    return info;
                }
                Err(error) => tracing::warn!("IP lookup via {} failed: {error}", provider.name()),
            }
        }

        match self.cached(unix_millis_now()) {
            Some(info) => {
                tracing::debug!("Using cached IP info");
                info
            }
            None => {
                tracing::warn!("All IP lookups failed, location unknown");
                IpInfo::unknown()
            }
        }
    }

    /// Cached lookup if it is fresh at `now_ms`.
    pub fn cached(&self, now_ms: i64) -> Option<IpInfo> {
        match self.store.load_json::<CachedEntry<IpInfo>>(RecordKey::CachedIpInfo) {
            Ok(Some(entry)) if entry.is_fresh(IP_INFO_MAX_AGE, now_ms) => Some(entry.data),
            Ok(_) => None,
            Err(error) => {
                tracing::warn!("Unreadable IP info cache: {error}");
                None
            }
        }
    }

    async fn query(&self, provider: &IpInfoProvider) -> Result<IpInfo> {
        let response = self.client.get(provider.url()).send().await?;
        if !response.status().is_success() {
            return Err(Error::Server(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }
        let body = response.json::<Value>().await?;
        provider.parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn resolver(store: SqliteRecordStore, providers: Vec<IpInfoProvider>) -> IpInfoResolver {
        IpInfoResolver::new(store, Duration::from_secs(2))
            .unwrap()
            .with_providers(providers)
    }

    fn sample(ip: &str) -> IpInfo {
        IpInfo {
            ip: ip.to_string(),
            ..IpInfo::unknown()
        }
    }

    #[tokio::test]
    async fn falls_through_to_second_provider_and_caches() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/co"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/com"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "query": "203.0.113.9",
                "city": "Hanoi",
                "regionName": "",
                "country": "Vietnam",
                "countryCode": "VN",
                "org": "Example ISP",
                "lat": 21.0,
                "lon": 105.8
            })))
            .mount(&server)
            .await;

        let store = SqliteRecordStore::in_memory().unwrap();
        let resolver = resolver(
            store.clone(),
            vec![
                IpInfoProvider::IpApiCo {
                    url: format!("{}/co", server.uri()),
                },
                IpInfoProvider::IpApiCom {
                    url: format!("{}/com", server.uri()),
                },
            ],
        );

        let info = resolver.resolve().await;
        assert_eq!(info.ip, "203.0.113.9");
        assert_eq!(info.region, UNKNOWN);
        assert_eq!(info.isp, "Example ISP");
        assert_eq!(info.latitude, Some(21.0));
        assert_eq!(resolver.cached(unix_millis_now()), Some(info));
    }

    #[tokio::test]
    async fn uses_fresh_cache_when_all_providers_fail() {
        let store = SqliteRecordStore::in_memory().unwrap();
        store
            .save_json(RecordKey::CachedIpInfo, &CachedEntry::now(sample("198.51.100.1")))
            .unwrap();

        let resolver = resolver(store, Vec::new());
        assert_eq!(resolver.resolve().await.ip, "198.51.100.1");
    }

    #[tokio::test]
    async fn stale_cache_yields_unknown() {
        let store = SqliteRecordStore::in_memory().unwrap();
        let stale = CachedEntry {
            data: sample("198.51.100.1"),
            timestamp: unix_millis_now() - 2 * 60 * 60 * 1000,
        };
        store.save_json(RecordKey::CachedIpInfo, &stale).unwrap();

        let resolver = resolver(store, Vec::new());
        assert_eq!(resolver.resolve().await, IpInfo::unknown());
    }

    #[test]
    fn ip_api_com_failure_status_is_error() {
        let provider = IpInfoProvider::IpApiCom { url: String::new() };
        let body = json!({ "status": "fail", "message": "reserved range" });
        assert!(matches!(provider.parse(&body), Err(Error::Server(m)) if m == "reserved range"));
    }
}
