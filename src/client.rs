use std::{
    num::NonZeroU32,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use bon::Builder;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{header, Url};
use tracing::{debug, error, info, instrument, warn};

use crate::{
    api::{feed::FeedController, login::SessionManager},
    error::{ClientError, ResponseError},
    http::{status_error, AuthLevel, HttpClient, HttpRequest},
    paths::DEFAULT_BASE_URL,
    session::Session,
    storage::TokenStore,
};

pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 12;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub authenticated: bool,
    pub last_successful_request: Option<Instant>,
    pub total_requests: u64,
    pub failed_requests: u64,
    pub last_error: Option<(Instant, String)>,
}

fn rate_limiter(requests_per_second: u32) -> Arc<DefaultDirectRateLimiter> {
    let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
    Arc::new(RateLimiter::direct(Quota::per_second(per_second)))
}

fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ClientError> {
    reqwest::ClientBuilder::new()
        .timeout(timeout)
        .build()
        .map_err(|e| ClientError::MissingConfig(format!("Failed to build HTTP client: {e}")))
}

/// Builder default. A failed build is logged and replaced by a client without
/// the timeout; `load_from_env` reports the same failure as `MissingConfig`.
fn http_client(timeout: Duration) -> reqwest::Client {
    build_http_client(timeout).unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to a plain HTTP client");
        reqwest::Client::new()
    })
}

/// reqwest-backed gateway to the news backend.
#[derive(Clone, Builder)]
pub struct Khabar {
    #[builder(default)]
    pub session: Session,
    #[builder(into, default = DEFAULT_BASE_URL.to_string())]
    pub(crate) base_url: String,
    #[builder(default = http_client(DEFAULT_TIMEOUT))]
    pub(crate) http_client: reqwest::Client,
    #[builder(default = rate_limiter(DEFAULT_REQUESTS_PER_SECOND))]
    pub(crate) rate_limiter: Arc<DefaultDirectRateLimiter>,
    #[builder(skip)]
    total_requests: Arc<AtomicU64>,
    #[builder(skip)]
    failed_requests: Arc<AtomicU64>,
    #[builder(skip)]
    last_successful_request: Arc<parking_lot::RwLock<Option<Instant>>>,
    #[builder(skip)]
    last_error: Arc<parking_lot::RwLock<Option<(Instant, String)>>>,
}

impl Khabar {
    /// Reads `KHABAR_BASE_URL`, `KHABAR_REQUESTS_PER_SECOND` and `KHABAR_TIMEOUT_SECS`.
    pub fn load_from_env() -> Result<Self, ClientError> {
        let base_url = std::env::var("KHABAR_BASE_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Url::parse(&base_url)
            .map_err(|e| ClientError::MissingConfig(format!("KHABAR_BASE_URL is not a valid URL: {e}")))?;

        let requests_per_second = env_number("KHABAR_REQUESTS_PER_SECOND")?
            .unwrap_or(u64::from(DEFAULT_REQUESTS_PER_SECOND));
        let requests_per_second = u32::try_from(requests_per_second).map_err(|_| {
            ClientError::MissingConfig("KHABAR_REQUESTS_PER_SECOND is out of range".to_string())
        })?;
        let timeout = env_number("KHABAR_TIMEOUT_SECS")?
            .map_or(DEFAULT_TIMEOUT, Duration::from_secs);

        let http_client = build_http_client(timeout)?;

        Ok(Self::builder()
            .base_url(base_url)
            .http_client(http_client)
            .rate_limiter(rate_limiter(requests_per_second))
            .build())
    }

    /// Feed controller sharing this gateway.
    pub fn feed(&self) -> FeedController<Khabar> {
        FeedController::new(self.clone())
    }

    /// Session manager sharing this gateway and its session.
    pub fn session_manager<S: TokenStore>(&self, store: S) -> SessionManager<Khabar, S> {
        SessionManager::new(self.clone(), store, self.session.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated()
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url, ClientError> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base)
            .map_err(|e| ResponseError::invalid(format!("Invalid base URL: {e}")))?
            .join(path.trim_start_matches('/'))
            .map_err(|e| ResponseError::invalid(format!("Invalid path '{path}': {e}")).into())
    }

    /// Record a successful request
    pub(crate) fn record_success(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        *self.last_successful_request.write() = Some(Instant::now());
    }

    /// Record a failed request
    pub(crate) fn record_failure(&self, error: &str) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        *self.last_error.write() = Some((Instant::now(), error.to_string()));
    }

    pub fn health_status(&self) -> HealthStatus {
        HealthStatus {
            authenticated: self.session.is_authenticated(),
            last_successful_request: *self.last_successful_request.read(),
            total_requests: self.total_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            last_error: self.last_error.read().clone(),
        }
    }

    pub fn reset_health_metrics(&self) {
        self.total_requests.store(0, Ordering::Relaxed);
        self.failed_requests.store(0, Ordering::Relaxed);
        *self.last_successful_request.write() = None;
        *self.last_error.write() = None;
    }

    async fn execute_request(&self, req: &HttpRequest) -> Result<String, ClientError> {
        let url = self.url(&req.path_and_query())?;

        debug!("Built request URL: {}", url);

        let mut request_builder = self
            .http_client
            .request(req.method.clone(), url)
            .header(header::ACCEPT, mime::APPLICATION_JSON.as_ref());

        if req.auth_level == AuthLevel::Authenticated {
            let token = self.session.access_token().ok_or(ClientError::Unauthorized)?;
            request_builder = request_builder.bearer_auth(token);
        }

        if let Some(body) = &req.body {
            debug!("Adding JSON body to request");
            request_builder = request_builder.json(body);
        }

        self.rate_limiter.until_ready().await;

        debug!("Sending HTTP request");
        let res = request_builder.send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }

        debug!("HTTP request completed with status: {}", status);
        Ok(res.text().await?)
    }
}

fn env_number(name: &str) -> Result<Option<u64>, ClientError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => value
            .parse()
            .map(Some)
            .map_err(|e| ClientError::MissingConfig(format!("{name} must be a number: {e}"))),
        _ => Ok(None),
    }
}

#[async_trait::async_trait]
impl HttpClient for Khabar {
    #[instrument(skip(self, req), fields(method = %req.method, path = %req.path, auth_level = ?req.auth_level))]
    async fn request_text(&self, req: HttpRequest) -> Result<String, ClientError> {
        match self.execute_request(&req).await {
            Ok(body) => {
                info!("HTTP request completed successfully");
                self.record_success();
                Ok(body)
            }
            Err(e) => {
                error!("HTTP request failed: {}", e);
                self.record_failure(&e.to_string());
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use axum::{
        extract::{Path, Query},
        http::{HeaderMap, StatusCode},
        routing::{get, post},
        Json, Router,
    };
    use serde_json::{json, Value};

    use super::*;
    use crate::http::mock::serve;
    use crate::models::{fixtures::token_pair, SessionIdentity};

    fn backend() -> Router {
        Router::new()
            .route(
                "/api/news/newslist/",
                get(|Query(params): Query<HashMap<String, String>>| async move {
                    Json(json!({ "search": params.get("search") }))
                }),
            )
            .route(
                "/api/news/comments/create/:pk",
                post(|Path(pk): Path<i64>, headers: HeaderMap, Json(body): Json<Value>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    Json(json!({ "pk": pk, "authorization": auth, "body": body }))
                }),
            )
            .route(
                "/api/account/token/",
                post(|| async {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "detail": "No active account found with the given credentials" })),
                    )
                }),
            )
    }

    #[tokio::test]
    async fn sends_query_params() {
        let client = Khabar::builder().base_url(serve(backend()).await).build();
        let res = client
            .request_json(HttpRequest::get("news/newslist/").query("search", "online khabar"))
            .await
            .unwrap();
        assert_eq!(res, json!({ "search": "online khabar" }));

        let res = client
            .request_json(HttpRequest::get("/news/newslist/").query("search", "a&b=c"))
            .await
            .unwrap();
        assert_eq!(res, json!({ "search": "a&b=c" }));

        let health = client.health_status();
        assert_eq!(health.total_requests, 2);
        assert_eq!(health.failed_requests, 0);
        assert!(health.last_successful_request.is_some());
    }

    #[tokio::test]
    async fn authenticated_requests_carry_bearer_token() {
        let client = Khabar::builder().base_url(serve(backend()).await).build();
        let req = HttpRequest::post("news/comments/create/4")
            .authenticated()
            .json(&json!({ "comment": "hi" }))
            .unwrap();

        let err = client.request_json(req.clone()).await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized));

        let tokens = token_pair(2);
        let identity = SessionIdentity::decode(tokens.access()).unwrap();
        client.session.authenticate(tokens.clone(), identity);

        let res = client.request_json(req).await.unwrap();
        assert_eq!(res["pk"], 4);
        assert_eq!(res["authorization"], format!("Bearer {}", tokens.access()));
        assert_eq!(res["body"]["comment"], "hi");
    }

    #[tokio::test]
    async fn failed_status_is_classified_and_recorded() {
        let client = Khabar::builder().base_url(serve(backend()).await).build();
        let err = client
            .request_json(HttpRequest::post("account/token/"))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized));

        let health = client.health_status();
        assert_eq!(health.failed_requests, 1);
        assert!(health.last_error.is_some());

        client.reset_health_metrics();
        assert_eq!(client.health_status().total_requests, 0);
    }

    #[tokio::test]
    async fn connection_failure_is_a_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = Khabar::builder().base_url(format!("http://{addr}/api/")).build();
        let err = client
            .request_text(HttpRequest::get("news/newslist/"))
            .await
            .unwrap_err();
        assert!(err.is_network());
    }

    #[tokio::test]
    async fn configured_timeout_is_applied() {
        let router = Router::new().route(
            "/api/news/newslist/",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Json(json!([]))
            }),
        );
        let client = Khabar::builder()
            .base_url(serve(router).await)
            .http_client(build_http_client(Duration::from_millis(200)).unwrap())
            .build();

        let err = client
            .request_json(HttpRequest::get("news/newslist/"))
            .await
            .unwrap_err();
        assert!(err.is_network());
        assert_eq!(client.health_status().failed_requests, 1);
    }

    #[test]
    fn joins_paths_onto_base_url() {
        let client = Khabar::builder().base_url("http://127.0.0.1:8000/api").build();
        assert_eq!(
            client.url("news/ekanscraper/").unwrap().as_str(),
            "http://127.0.0.1:8000/api/news/ekanscraper/"
        );
        assert_eq!(
            client.url("/account/token/").unwrap().as_str(),
            "http://127.0.0.1:8000/api/account/token/"
        );
    }
}
