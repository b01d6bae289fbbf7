//! In-memory collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use url::Url;

use apx_core::{paths, Category};
use apx_installer::{InstallError, Installer, PresenceOracle};

use crate::error::SyncError;
use crate::transport::{Response, Transport};

/// Serves canned bodies by exact URL; everything else is a 404.
#[derive(Default)]
pub struct FakeTransport {
    routes: HashMap<String, (u16, Vec<u8>)>,
    pub requests: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, status: u16, body: Vec<u8>) -> Self {
        self.routes.insert(url.to_string(), (status, body));
        self
    }

    pub fn with_json(self, url: &str, json: serde_json::Value) -> Self {
        self.with_body(url, 200, json.to_string().into_bytes())
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for FakeTransport {
    fn get(&self, url: &Url) -> Result<Response, SyncError> {
        self.requests.lock().unwrap().push(url.to_string());
        let (status, body) = self
            .routes
            .get(url.as_str())
            .cloned()
            .unwrap_or((404, Vec::new()));
        Ok(Response {
            status,
            body: Box::new(Cursor::new(body)),
        })
    }
}

/// Records calls and, like the real installer, materialises the base
/// directory of what it installed under `root` when `root` is set.
#[derive(Default)]
pub struct FakeInstaller {
    pub root: Option<(PathBuf, Category, String)>,
    pub calls: Mutex<Vec<(PathBuf, String, String)>>,
}

impl FakeInstaller {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl Installer for FakeInstaller {
    fn install(&self, package: &Path, name: &str, version: &str) -> Result<(), InstallError> {
        self.calls
            .lock()
            .unwrap()
            .push((package.to_path_buf(), name.to_string(), version.to_string()));
        if let Some((root, category, base)) = &self.root {
            let dir = paths::component_dir(root, *category, name, base);
            std::fs::create_dir_all(&dir).map_err(|e| InstallError::Io {
                path: dir,
                source: e,
            })?;
        }
        Ok(())
    }
}

/// Fixed presence set.
#[derive(Default)]
pub struct StaticPresence(pub HashSet<(Category, String, String)>);

impl StaticPresence {
    pub fn with(mut self, category: Category, name: &str, version: &str) -> Self {
        self.0
            .insert((category, name.to_string(), version.to_string()));
        self
    }
}

impl PresenceOracle for StaticPresence {
    fn exists(&self, category: Category, name: &str, version: &str) -> bool {
        self.0
            .contains(&(category, name.to_string(), version.to_string()))
    }
}
