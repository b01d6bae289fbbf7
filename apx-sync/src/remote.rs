//! Remote endpoints exposed by a mod server.
//!
//! ```text
//! GET <target>/mod                               -> {"mod": ModDescriptor, "port": n}
//! GET <target>/files/<component>/<version>        -> ["file", ...]
//! GET <target>/files/<component>/<version>/<file> -> raw bytes
//! ```

use url::Url;

use apx_core::{CoreError, ModEnvelope};

use crate::error::SyncError;
use crate::transport::Transport;

/// A validated `http(s)://host[:port][/prefix]` target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    base: Url,
    host: String,
}

impl RemoteTarget {
    pub fn parse(target: &str) -> Result<Self, SyncError> {
        let invalid = |reason: &str| SyncError::InvalidTarget {
            target: target.to_string(),
            reason: reason.to_string(),
        };
        let mut base = Url::parse(target).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("expected an http:// or https:// URL"));
        }
        let host = match base.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(invalid("URL has no host")),
        };
        if base.cannot_be_a_base() {
            return Err(invalid("URL cannot carry a path"));
        }
        base.set_query(None);
        base.set_fragment(None);
        Ok(Self { base, host })
    }

    /// Host name (or IP literal) of the target, without port.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn as_url(&self) -> &Url {
        &self.base
    }

    pub fn mod_url(&self) -> Url {
        self.endpoint(&["mod"])
    }

    pub fn listing_url(&self, component: &str, version: &str) -> Url {
        self.endpoint(&["files", component, version])
    }

    pub fn file_url(&self, component: &str, version: &str, file: &str) -> Url {
        self.endpoint(&["files", component, version, file])
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// `GET <target>/mod`.
pub fn fetch_envelope(
    transport: &dyn Transport,
    target: &RemoteTarget,
) -> Result<ModEnvelope, SyncError> {
    let url = target.mod_url();
    let body = get_ok_body(transport, &url)?;
    ModEnvelope::from_json(&body).map_err(|e| match e {
        CoreError::Json(source) => protocol(&url, format!("invalid JSON: {source}")),
        CoreError::MalformedDescriptor { reason } => SyncError::MalformedDescriptor { reason },
        other => SyncError::Core(other),
    })
}

/// `GET <target>/files/<component>/<version>`: must be a JSON array of
/// file names.
pub fn fetch_listing(
    transport: &dyn Transport,
    target: &RemoteTarget,
    component: &str,
    version: &str,
) -> Result<Vec<String>, SyncError> {
    let url = target.listing_url(component, version);
    let body = get_ok_body(transport, &url)?;
    serde_json::from_str::<Vec<String>>(&body)
        .map_err(|e| protocol(&url, format!("expected a JSON array of file names: {e}")))
}

fn get_ok_body(transport: &dyn Transport, url: &Url) -> Result<String, SyncError> {
    let response = transport.get(url)?;
    if !response.is_ok() {
        return Err(protocol(url, format!("HTTP status {}", response.status)));
    }
    response
        .into_string()
        .map_err(|e| protocol(url, format!("failed to read body: {e}")))
}

fn protocol(url: &Url, reason: String) -> SyncError {
    SyncError::Protocol {
        url: url.to_string(),
        reason,
    }
}
