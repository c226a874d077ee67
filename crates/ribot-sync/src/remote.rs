//! # Ribot API Client
//!
//! The remote API surface the data manager depends on, and its HTTP
//! implementation.
//!
//! ## Endpoints
//! ```text
//! ┌──────────────────────────────┬───────────────────────────────────────────┐
//! │ RibotService method          │ HTTP                                      │
//! ├──────────────────────────────┼───────────────────────────────────────────┤
//! │ list_venues                  │ GET  venues                               │
//! │ check_in                     │ POST check-ins          {venueId|label}   │
//! │ update_check_in              │ PUT  check-ins/{id}     {checkedOut}      │
//! │ perform_beacon_encounter     │ POST beacons/{id}/encounters              │
//! │ list_registered_beacons      │ GET  beacons                              │
//! │ list_ribots                  │ GET  ribots?embed=latestCheckIn           │
//! └──────────────────────────────┴───────────────────────────────────────────┘
//! ```
//!
//! Identifiers are appended as percent-encoded path segments, so `?`, `#`
//! or `%` in an id never change the request target.
//!
//! Every call carries `Authorization: Bearer <token>`. A 401 is reported on
//! the [`EventBus`] as [`BusEvent::AuthenticationError`] before the call fails.

use async_trait::async_trait;
use reqwest::{header, Client, Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RibotConfig;
use crate::error::{ApiError, ApiResult, SyncError, SyncResult};
use crate::events::EventBus;
use ribot_core::{
    BusEvent, CheckIn, CheckInRequest, Encounter, RegisteredBeacon, Ribot, UpdateCheckInRequest,
    Venue,
};

/// Builds the `Authorization` header value for an access token.
pub fn build_authorization(token: &str) -> String {
    format!("Bearer {token}")
}

// =============================================================================
// Service Trait
// =============================================================================

/// The ribot API as seen by [`DataManager`](crate::DataManager).
///
/// `auth` is the full header value from [`build_authorization`].
#[async_trait]
pub trait RibotService: Send + Sync {
    async fn list_venues(&self, auth: &str) -> ApiResult<Vec<Venue>>;

    async fn check_in(&self, auth: &str, request: &CheckInRequest) -> ApiResult<CheckIn>;

    async fn update_check_in(
        &self,
        auth: &str,
        check_in_id: &str,
        request: &UpdateCheckInRequest,
    ) -> ApiResult<CheckIn>;

    async fn perform_beacon_encounter(&self, auth: &str, beacon_id: &str) -> ApiResult<Encounter>;

    async fn list_registered_beacons(&self, auth: &str) -> ApiResult<Vec<RegisteredBeacon>>;

    /// `embed` names related resources to inline, e.g. `latestCheckIn`.
    async fn list_ribots(&self, auth: &str, embed: &str) -> ApiResult<Vec<Ribot>>;
}

// =============================================================================
// HTTP Implementation
// =============================================================================

/// [`RibotService`] over HTTPS with reqwest.
///
/// Clone is cheap; reqwest::Client shares its connection pool.
#[derive(Debug, Clone)]
pub struct HttpRibotService {
    client: Client,
    base_url: Url,
    events: EventBus,
}

impl HttpRibotService {
    /// Creates a client for `base_url` with a whole-request `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration, events: EventBus) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;

        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| SyncError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(SyncError::InvalidUrl(base_url.to_string()));
        }

        Ok(HttpRibotService {
            client,
            base_url,
            events,
        })
    }

    /// Creates a client from the `[api]` section of `config`.
    pub fn from_config(config: &RibotConfig, events: EventBus) -> SyncResult<Self> {
        Self::new(config.base_url(), config.request_timeout(), events)
    }

    /// Joins `segments` onto the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str], auth: &str) -> RequestBuilder {
        self.client
            .request(method, self.endpoint(segments))
            .header(header::AUTHORIZATION, auth)
            .header(header::ACCEPT, "application/json")
    }

    /// Sends `request` and decodes a JSON body, classifying failures.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> ApiResult<T> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json().await?);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_status(status, &body);

        if matches!(err, ApiError::Unauthorized) {
            warn!("API rejected access token");
            self.events.post(BusEvent::AuthenticationError);
        } else {
            debug!(%status, "API call failed");
        }

        Err(err)
    }
}

#[async_trait]
impl RibotService for HttpRibotService {
    async fn list_venues(&self, auth: &str) -> ApiResult<Vec<Venue>> {
        self.send(self.request(Method::GET, &["venues"], auth)).await
    }

    async fn check_in(&self, auth: &str, request: &CheckInRequest) -> ApiResult<CheckIn> {
        self.send(self.request(Method::POST, &["check-ins"], auth).json(request))
            .await
    }

    async fn update_check_in(
        &self,
        auth: &str,
        check_in_id: &str,
        request: &UpdateCheckInRequest,
    ) -> ApiResult<CheckIn> {
        let path = ["check-ins", check_in_id];
        self.send(self.request(Method::PUT, &path, auth).json(request))
            .await
    }

    async fn perform_beacon_encounter(&self, auth: &str, beacon_id: &str) -> ApiResult<Encounter> {
        let path = ["beacons", beacon_id, "encounters"];
        self.send(self.request(Method::POST, &path, auth)).await
    }

    async fn list_registered_beacons(&self, auth: &str) -> ApiResult<Vec<RegisteredBeacon>> {
        self.send(self.request(Method::GET, &["beacons"], auth)).await
    }

    async fn list_ribots(&self, auth: &str, embed: &str) -> ApiResult<Vec<Ribot>> {
        self.send(
            self.request(Method::GET, &["ribots"], auth)
                .query(&[("embed", embed)]),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serves one canned HTTP response and hands back the request head.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });

        (format!("http://{addr}/"), handle)
    }

    fn service(base_url: &str, events: EventBus) -> HttpRibotService {
        HttpRibotService::new(base_url, Duration::from_secs(5), events).unwrap()
    }

    #[test]
    fn test_build_authorization() {
        assert_eq!(build_authorization("abc"), "Bearer abc");
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let service =
            HttpRibotService::new("http://localhost:9000", Duration::from_secs(1), EventBus::default())
                .unwrap();
        assert_eq!(service.endpoint(&["venues"]).as_str(), "http://localhost:9000/venues");
    }

    #[test]
    fn test_base_url_path_is_kept() {
        let service =
            HttpRibotService::new("https://api.ribot.io/v2/", Duration::from_secs(1), EventBus::default())
                .unwrap();
        assert_eq!(
            service.endpoint(&["check-ins", "c1"]).as_str(),
            "https://api.ribot.io/v2/check-ins/c1"
        );
    }

    #[test]
    fn test_ids_are_encoded_as_one_segment() {
        let service =
            HttpRibotService::new("http://localhost:9000/", Duration::from_secs(1), EventBus::default())
                .unwrap();
        let url = service.endpoint(&["beacons", "b1?x=1#frag%2F", "encounters"]);

        assert_eq!(url.path(), "/beacons/b1%3Fx=1%23frag%252F/encounters");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn test_rejects_unparseable_base_url() {
        let result = HttpRibotService::new("not a url", Duration::from_secs(1), EventBus::default());
        assert!(matches!(result, Err(SyncError::InvalidUrl(_))));
    }

    #[test]
    fn test_from_config() {
        let service =
            HttpRibotService::from_config(&RibotConfig::default(), EventBus::default()).unwrap();
        assert_eq!(
            service.endpoint(&["beacons", "b1", "encounters"]).as_str(),
            "https://api.ribot.io/beacons/b1/encounters"
        );
    }

    #[tokio::test]
    async fn test_list_venues_decodes_body() {
        let (url, server) =
            serve_once("200 OK", r#"[{"id":"v1","label":"Studio"}]"#).await;

        let venues = service(&url, EventBus::default())
            .list_venues(&build_authorization("tok"))
            .await
            .unwrap();

        assert_eq!(venues.len(), 1);
        assert_eq!(venues[0].id, "v1");

        let request = server.await.unwrap();
        assert!(request.starts_with("GET /venues "));
        assert!(request.to_lowercase().contains("authorization: bearer tok"));
    }

    #[tokio::test]
    async fn test_list_ribots_sends_embed() {
        let (url, server) = serve_once("200 OK", "[]").await;

        let ribots = service(&url, EventBus::default())
            .list_ribots(&build_authorization("tok"), "latestCheckIn")
            .await
            .unwrap();

        assert!(ribots.is_empty());
        assert!(server
            .await
            .unwrap()
            .starts_with("GET /ribots?embed=latestCheckIn "));
    }

    #[tokio::test]
    async fn test_update_check_in_encodes_id() {
        let (url, server) =
            serve_once("200 OK", r#"{"id":"c1","checkedInDate":"2016-03-01T09:30:00Z","checkedOut":true}"#)
                .await;

        service(&url, EventBus::default())
            .update_check_in(&build_authorization("tok"), "c1?admin#x", &UpdateCheckInRequest::check_out())
            .await
            .unwrap();

        assert!(server
            .await
            .unwrap()
            .starts_with("PUT /check-ins/c1%3Fadmin%23x "));
    }

    #[tokio::test]
    async fn test_unauthorized_posts_event() {
        let (url, _server) = serve_once("401 Unauthorized", "{}").await;
        let events = EventBus::default();
        let mut subscription = events.subscribe();

        let result = service(&url, events)
            .list_registered_beacons(&build_authorization("expired"))
            .await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(subscription.try_recv(), Some(BusEvent::AuthenticationError));
    }

    #[tokio::test]
    async fn test_server_error_does_not_post_event() {
        let (url, _server) = serve_once("503 Service Unavailable", "down").await;
        let events = EventBus::default();
        let mut subscription = events.subscribe();

        let result = service(&url, events)
            .perform_beacon_encounter(&build_authorization("t"), "b1")
            .await;

        assert!(matches!(result, Err(ApiError::ServerError(body)) if body == "down"));
        assert_eq!(subscription.try_recv(), None);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let service = HttpRibotService::new(
            "http://127.0.0.1:9/",
            Duration::from_millis(500),
            EventBus::default(),
        )
        .unwrap();

        let result = service.list_venues(&build_authorization("t")).await;
        assert!(matches!(result, Err(ApiError::Transport(_))));
    }
}
