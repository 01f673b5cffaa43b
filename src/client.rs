use std::env;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::StreamExt;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use crate::backend::AssistantBackend;
use crate::client_logger::ClientLogger;
use crate::error::{Error, Result};
use crate::ndjson::{EventStream, process_ndjson};
use crate::observability::{CLIENT_REQUEST_DURATION, CLIENT_REQUEST_ERRORS, CLIENT_REQUESTS};
use crate::types::{
    CreateSessionResponse, DirectoryListing, HealthStatus, QueryRequest, QueryResponse,
    SessionHistory, SessionInfo, SessionList, Settings, SettingsUpdate, SettingsUpdateResponse,
    StatusResponse,
};

/// Base URL used when neither an explicit URL nor `DEVCONSOLE_URL` is given.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/";
/// Environment variable consulted for the base URL.
pub const BASE_URL_ENV: &str = "DEVCONSOLE_URL";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// HTTP client for the developer-assistant backend.
///
/// Non-streaming calls are bounded by `timeout`. Streaming calls have no
/// overall deadline; instead each chunk must arrive within `idle_timeout`.
#[derive(Clone)]
pub struct DevAssistant {
    client: ReqwestClient,
    base_url: Url,
    timeout: Duration,
    idle_timeout: Option<Duration>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl std::fmt::Debug for DevAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DevAssistant")
            .field("base_url", &self.base_url.as_str())
            .field("timeout", &self.timeout)
            .field("idle_timeout", &self.idle_timeout)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

impl DevAssistant {
    /// Create a new client.
    ///
    /// The base URL can be provided directly or read from the DEVCONSOLE_URL
    /// environment variable; otherwise `http://localhost:8000/` is used.
    pub fn new(base_url: Option<String>) -> Result<Self> {
        Self::with_options(base_url, None, None)
    }

    /// Create a new client with custom timeouts.
    pub fn with_options(
        base_url: Option<String>,
        timeout: Option<Duration>,
        idle_timeout: Option<Duration>,
    ) -> Result<Self> {
        let base_url = base_url
            .or_else(|| env::var(BASE_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = normalize_base_url(&base_url)?;

        let client = ReqwestClient::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {e}"),
                    Some(Box::new(e)),
                )
            })?;

        Ok(Self {
            client,
            base_url,
            timeout: timeout.unwrap_or(DEFAULT_TIMEOUT),
            idle_timeout: Some(idle_timeout.unwrap_or(DEFAULT_IDLE_TIMEOUT)),
            logger: None,
        })
    }

    /// Attach a logger that sees every query response and stream event.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the URL for a path under the base URL, escaping each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::url(format!("Cannot use {} as a base URL", self.base_url), None))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Create and return default headers for API requests.
    fn default_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::timeout(
                format!("Request timed out: {e}"),
                Some(self.timeout.as_secs_f64()),
            )
        } else if e.is_connect() {
            Error::connection(e.to_string(), Some(Box::new(e)))
        } else {
            Error::http_client(e.to_string(), Some(Box::new(e)))
        }
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();
        let resource_id = response
            .url()
            .path_segments()
            .and_then(|mut segments| match segments.next() {
                Some("session") => segments.next().map(String::from),
                _ => None,
            });

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response: {e}"),
                    Some(Box::new(e)),
                );
            }
        };
        let detail = extract_detail(&error_body).unwrap_or_else(|| {
            if error_body.trim().is_empty() {
                format!("HTTP {status_code}")
            } else {
                error_body.clone()
            }
        });

        match status_code {
            400 | 422 => Error::bad_request(detail),
            404 => Error::not_found(detail, resource_id),
            408 => Error::timeout(detail, None),
            500 => Error::internal_server(detail),
            502..=504 => Error::service_unavailable(detail),
            _ => Error::api(status_code, detail),
        }
    }

    /// Send a request, mapping transport failures and error statuses.
    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        CLIENT_REQUESTS.click();
        let start = Instant::now();
        let result = request.send().await;
        CLIENT_REQUEST_DURATION.add(start.elapsed().as_secs_f64());

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                CLIENT_REQUEST_ERRORS.click();
                return Err(self.transport_error(e));
            }
        };
        if !response.status().is_success() {
            CLIENT_REQUEST_ERRORS.click();
            return Err(Self::process_error_response(response).await);
        }
        Ok(response)
    }

    async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
        response.json::<T>().await.map_err(|e| {
            Error::serialization(format!("Failed to parse response: {e}"), Some(Box::new(e)))
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let request = self
            .client
            .get(url)
            .headers(self.default_headers())
            .timeout(self.timeout);
        Self::read_json(self.execute(request).await?).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        url: Url,
        body: Option<&B>,
    ) -> Result<T> {
        let mut request = self
            .client
            .post(url)
            .headers(self.default_headers())
            .timeout(self.timeout);
        if let Some(body) = body {
            request = request.json(body);
        }
        Self::read_json(self.execute(request).await?).await
    }

    async fn delete<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let request = self
            .client
            .delete(url)
            .headers(self.default_headers())
            .timeout(self.timeout);
        Self::read_json(self.execute(request).await?).await
    }
}

#[async_trait::async_trait]
impl AssistantBackend for DevAssistant {
    async fn health(&self) -> Result<HealthStatus> {
        self.get(self.endpoint(&["health"])?).await
    }

    async fn create_session(&self) -> Result<CreateSessionResponse> {
        self.post::<Value, _>(self.endpoint(&["session", "create"])?, None)
            .await
    }

    async fn session_info(&self, session_id: &str) -> Result<SessionInfo> {
        self.get(self.endpoint(&["session", session_id])?).await
    }

    async fn session_history(&self, session_id: &str) -> Result<SessionHistory> {
        self.get(self.endpoint(&["session", session_id, "history"])?)
            .await
    }

    async fn clear_session(&self, session_id: &str) -> Result<StatusResponse> {
        self.post::<Value, _>(self.endpoint(&["session", session_id, "clear"])?, None)
            .await
    }

    async fn delete_session(&self, session_id: &str) -> Result<StatusResponse> {
        self.delete(self.endpoint(&["session", session_id])?).await
    }

    async fn list_sessions(&self) -> Result<SessionList> {
        self.get(self.endpoint(&["sessions"])?).await
    }

    /// Send a query and wait for the complete response.
    async fn query(&self, mut request: QueryRequest) -> Result<QueryResponse> {
        request.stream = Some(false);
        let response: QueryResponse = self
            .post(self.endpoint(&["query"])?, Some(&request))
            .await?;
        if let Some(logger) = &self.logger {
            logger.log_response(&response);
        }
        Ok(response)
    }

    /// Send a query and get a streaming response.
    ///
    /// Returns a stream of StreamEvent objects that can be processed incrementally.
    async fn query_stream(&self, mut request: QueryRequest) -> Result<EventStream> {
        request.stream = None;

        let mut headers = self.default_headers();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/x-ndjson"),
        );
        let request = self
            .client
            .post(self.endpoint(&["query", "stream"])?)
            .headers(headers)
            .json(&request);
        let response = self.execute(request).await?;

        let bytes = response.bytes_stream().map(|result| {
            result.map_err(|e| {
                Error::streaming(format!("Error in HTTP stream: {e}"), Some(Box::new(e)))
            })
        });
        let events = process_ndjson(bytes, self.idle_timeout);

        match self.logger.clone() {
            Some(logger) => Ok(Box::pin(events.inspect(move |item| match item {
                Ok(event) => logger.log_stream_event(event),
                Err(err) => logger.log_stream_error(err),
            }))),
            None => Ok(Box::pin(events)),
        }
    }

    async fn settings(&self) -> Result<Settings> {
        self.get(self.endpoint(&["settings"])?).await
    }

    async fn update_settings(&self, update: &SettingsUpdate) -> Result<SettingsUpdateResponse> {
        self.post(self.endpoint(&["settings"])?, Some(update)).await
    }

    async fn browse_directory(&self, path: Option<&str>) -> Result<DirectoryListing> {
        let mut url = self.endpoint(&["browse-directory"])?;
        if let Some(path) = path.filter(|p| !p.is_empty()) {
            url.query_pairs_mut().append_pair("path", path);
        }
        self.get(url).await
    }
}

/// Parse a base URL, making sure it ends with a slash so joins append.
fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() {
        return Err(Error::url(format!("Cannot use {raw} as a base URL"), None));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Pull the FastAPI-style `detail` out of an error body.
fn extract_detail(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("detail")? {
        Value::String(detail) => Some(detail.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = DevAssistant::new(Some("http://assistant.internal:9000".to_string())).unwrap();
        assert_eq!(client.base_url.as_str(), "http://assistant.internal:9000/");
        assert_eq!(client.timeout, DEFAULT_TIMEOUT);
        assert_eq!(client.idle_timeout, Some(DEFAULT_IDLE_TIMEOUT));

        let client = DevAssistant::with_options(
            Some("http://localhost:8000/api".to_string()),
            Some(Duration::from_secs(30)),
            Some(Duration::from_secs(5)),
        )
        .unwrap();
        assert_eq!(client.base_url.as_str(), "http://localhost:8000/api/");
        assert_eq!(client.timeout, Duration::from_secs(30));
        assert_eq!(client.idle_timeout, Some(Duration::from_secs(5)));
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(DevAssistant::new(Some("not a url".to_string())).is_err());
        assert!(DevAssistant::new(Some("mailto:dev@example.com".to_string())).is_err());
    }

    #[test]
    fn endpoints_escape_session_ids() {
        let client = DevAssistant::new(Some("http://localhost:8000/api/".to_string())).unwrap();
        let url = client.endpoint(&["session", "a/b c", "history"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8000/api/session/a%2Fb%20c/history"
        );
        let url = client.endpoint(&["query", "stream"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/query/stream");
    }

    #[test]
    fn detail_extraction() {
        assert_eq!(
            extract_detail(r#"{"detail": "Session not found or expired"}"#),
            Some("Session not found or expired".to_string())
        );
        assert_eq!(
            extract_detail(r#"{"detail": [{"loc": ["body", "query"], "msg": "field required"}]}"#)
                .map(|d| d.contains("field required")),
            Some(true)
        );
        assert_eq!(extract_detail("Internal Server Error"), None);
        assert_eq!(extract_detail(r#"{"message": "x"}"#), None);
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_connection_error() {
        let client = DevAssistant::new(Some("http://127.0.0.1:1/".to_string())).unwrap();
        let err = client.health().await.unwrap_err();
        assert!(err.is_connection(), "unexpected error: {err:?}");
        let message = err.user_message();
        assert!(message.starts_with("Connection error: "));
        assert_eq!(message.matches("Connection error").count(), 1, "{message}");
    }

    #[tokio::test]
    #[ignore] // Requires a running backend at DEVCONSOLE_URL
    async fn test_create_session_live() {
        if env::var(BASE_URL_ENV).is_err() {
            println!("Skipping test_create_session_live: {BASE_URL_ENV} not set");
            return;
        }
        let client = DevAssistant::new(None).unwrap();
        let created = client.create_session().await.unwrap();
        assert!(!created.session_id.is_empty());
    }
}
