use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use hyper::client::HttpConnector;
use hyper::header::{ACCEPT, CONTENT_TYPE};
use hyper::{Body, Client, Method, Request, Uri};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::identity::{Identity, RegisteredUser};
use crate::record::{MetricsSubmission, PersistedRecord, TestRecord};
use crate::settings::Settings;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("invalid backend url '{0}'")]
    InvalidUrl(String),
    #[error("failed to start http runtime: {0}")]
    Runtime(std::io::Error),
    #[error("failed to build request: {0}")]
    Request(#[from] hyper::http::Error),
    #[error("http transport error: {0}")]
    Transport(#[from] hyper::Error),
    #[error("request to {path} timed out after {timeout:?}")]
    Timeout { path: String, timeout: Duration },
    #[error("{path} answered with status {status}")]
    Status { path: String, status: u16 },
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Remote collaborator supplying reference text and settings and storing
/// identities and results.
pub trait Backend {
    fn fetch_settings(&self) -> Result<Settings, BackendError>;
    fn save_settings(&self, settings: &Settings) -> Result<(), BackendError>;
    fn fetch_random_text(&self) -> Result<String, BackendError>;
    fn register_user(&self, identity: &Identity) -> Result<RegisteredUser, BackendError>;
    fn submit_metrics(&self, metrics: &MetricsSubmission) -> Result<(), BackendError>;
    fn submit_test(&self, record: &TestRecord) -> Result<PersistedRecord, BackendError>;
}

#[derive(Debug, Deserialize)]
struct RandomText {
    content: String,
}

/// JSON-over-HTTP backend. Requests block the caller on a private
/// current-thread runtime.
pub struct HttpBackend {
    base_url: String,
    client: Client<HttpConnector>,
    runtime: Runtime,
    timeout: Duration,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpBackend {
    pub fn new(base_url: &str) -> Result<Self, BackendError> {
        Self::with_timeout(base_url, Duration::from_millis(DEFAULT_TIMEOUT_MS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        let uri: Uri = base_url
            .parse()
            .map_err(|_| BackendError::InvalidUrl(base_url.clone()))?;
        // plain HTTP/1 connector only
        if uri.scheme_str() != Some("http") || uri.host().is_none() {
            return Err(BackendError::InvalidUrl(base_url));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(BackendError::Runtime)?;

        Ok(Self {
            base_url,
            client: Client::new(),
            runtime,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn uri(&self, path: &str) -> Result<Uri, BackendError> {
        let full = format!("{}{}", self.base_url, path);
        full.parse().map_err(|_| BackendError::InvalidUrl(full))
    }

    fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, BackendError> {
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(self.uri(path)?)
            .header(ACCEPT, "application/json");
        let body = match body {
            Some(bytes) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(bytes)
            }
            None => Body::empty(),
        };
        let request = builder.body(body)?;

        let started = Instant::now();
        let exchange = async {
            let response = self.client.request(request).await?;
            let status = response.status();
            let bytes = hyper::body::to_bytes(response.into_body()).await?;
            Ok::<_, BackendError>((status, bytes))
        };
        let (status, bytes) = self
            .runtime
            .block_on(async { tokio::time::timeout(self.timeout, exchange).await })
            .map_err(|_| BackendError::Timeout {
                path: path.to_string(),
                timeout: self.timeout,
            })??;

        debug!(
            method = %method,
            path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "backend request finished"
        );

        if !status.is_success() {
            return Err(BackendError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(bytes.to_vec())
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BackendError> {
        let bytes = self.send(Method::GET, path, None)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn post_json<B: Serialize>(&self, path: &str, body: &B) -> Result<Vec<u8>, BackendError> {
        let payload = serde_json::to_vec(body)?;
        self.send(Method::POST, path, Some(payload))
    }
}

impl Backend for HttpBackend {
    fn fetch_settings(&self) -> Result<Settings, BackendError> {
        self.get_json("/settings")
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), BackendError> {
        self.post_json("/settings", settings).map(|_| ())
    }

    fn fetch_random_text(&self) -> Result<String, BackendError> {
        let text: RandomText = self.get_json("/texts/random")?;
        Ok(text.content)
    }

    fn register_user(&self, identity: &Identity) -> Result<RegisteredUser, BackendError> {
        let bytes = self.post_json("/users", identity)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn submit_metrics(&self, metrics: &MetricsSubmission) -> Result<(), BackendError> {
        self.post_json("/metrics", metrics).map(|_| ())
    }

    fn submit_test(&self, record: &TestRecord) -> Result<PersistedRecord, BackendError> {
        let bytes = self.post_json("/tests", record)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(PersistedRecord::default());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Calls observed by [`RecordingBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    FetchSettings,
    SaveSettings(Settings),
    FetchRandomText,
    RegisterUser(Identity),
    SubmitMetrics(MetricsSubmission),
    SubmitTest(TestRecord),
}

/// In-memory backend for tests and headless runs: serves canned responses and
/// records every call.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    settings: Option<Settings>,
    texts: RefCell<VecDeque<String>>,
    reject_registration: bool,
    reject_submissions: bool,
    calls: RefCell<Vec<BackendCall>>,
}

impl RecordingBackend {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: Some(settings),
            ..Self::default()
        }
    }

    /// Every fetch fails; the session must fall back to its defaults
    pub fn unreachable() -> Self {
        Self::default()
    }

    pub fn with_texts<I, S>(self, texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.texts
            .borrow_mut()
            .extend(texts.into_iter().map(Into::into));
        self
    }

    pub fn rejecting_registration(mut self) -> Self {
        self.reject_registration = true;
        self
    }

    pub fn rejecting_submissions(mut self) -> Self {
        self.reject_submissions = true;
        self
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.borrow().clone()
    }

    pub fn submitted_tests(&self) -> Vec<TestRecord> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                BackendCall::SubmitTest(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn submitted_metrics(&self) -> Vec<MetricsSubmission> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                BackendCall::SubmitMetrics(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: BackendCall) {
        self.calls.borrow_mut().push(call);
    }

    fn unavailable(path: &str) -> BackendError {
        BackendError::Status {
            path: path.to_string(),
            status: 503,
        }
    }
}

impl Backend for RecordingBackend {
    fn fetch_settings(&self) -> Result<Settings, BackendError> {
        self.record(BackendCall::FetchSettings);
        self.settings.ok_or_else(|| Self::unavailable("/settings"))
    }

    fn save_settings(&self, settings: &Settings) -> Result<(), BackendError> {
        self.record(BackendCall::SaveSettings(*settings));
        Ok(())
    }

    fn fetch_random_text(&self) -> Result<String, BackendError> {
        self.record(BackendCall::FetchRandomText);
        self.texts
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| Self::unavailable("/texts/random"))
    }

    fn register_user(&self, identity: &Identity) -> Result<RegisteredUser, BackendError> {
        self.record(BackendCall::RegisterUser(identity.clone()));
        if self.reject_registration {
            return Err(Self::unavailable("/users"));
        }
        Ok(RegisteredUser {
            id: format!("user-{}", identity.registration_number),
        })
    }

    fn submit_metrics(&self, metrics: &MetricsSubmission) -> Result<(), BackendError> {
        self.record(BackendCall::SubmitMetrics(metrics.clone()));
        if self.reject_submissions {
            return Err(Self::unavailable("/metrics"));
        }
        Ok(())
    }

    fn submit_test(&self, record: &TestRecord) -> Result<PersistedRecord, BackendError> {
        self.record(BackendCall::SubmitTest(record.clone()));
        if self.reject_submissions {
            return Err(Self::unavailable("/tests"));
        }
        Ok(PersistedRecord {
            id: Some(format!("test-{}", self.submitted_tests().len())),
        })
    }
}
