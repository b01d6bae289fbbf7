//! HTTP boundary: a minimal blocking GET abstraction plus the ureq client.

use std::io::Read;
use std::time::Duration;

use url::Url;

use crate::error::SyncError;

/// A response with any status code. Non-2xx statuses are not errors at this
/// layer; callers decide what a status means.
pub struct Response {
    pub status: u16,
    pub body: Box<dyn Read + Send>,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn into_string(mut self) -> std::io::Result<String> {
        let mut buf = String::new();
        self.body.read_to_string(&mut buf)?;
        Ok(buf)
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Blocking GET. `Err` is reserved for requests that produced no response.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url) -> Result<Response, SyncError>;
}

/// [`Transport`] backed by a shared `ureq::Agent`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(120))
            .user_agent(concat!("apx/", env!("CARGO_PKG_VERSION")))
            .build();
        Self { agent }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url) -> Result<Response, SyncError> {
        tracing::debug!(%url, "GET");
        match self.agent.get(url.as_str()).call() {
            Ok(resp) => Ok(Response {
                status: resp.status(),
                body: Box::new(resp.into_reader()),
            }),
            Err(ureq::Error::Status(status, resp)) => Ok(Response {
                status,
                body: Box::new(resp.into_reader()),
            }),
            Err(ureq::Error::Transport(t)) => Err(SyncError::Transport {
                url: url.to_string(),
                reason: t.to_string(),
            }),
        }
    }
}
