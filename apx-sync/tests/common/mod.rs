//! Shared fixtures: an in-memory mod server, a recording installer that
//! unpacks into the installation tree, and temp installation roots.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use apx_core::{paths, types::base_version, ApxConfig, Category};
use apx_installer::{InstallError, Installer};
use apx_sync::{CancellationToken, Response, SyncError, Transport};
use serde_json::{json, Value};
use tempfile::TempDir;
use url::Url;

pub const TARGET: &str = "http://srv.example:8080";

// ---------------------------------------------------------------------------
// Mod server
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeServer {
    routes: HashMap<String, (u16, Vec<u8>)>,
    requests: Mutex<Vec<String>>,
    cancel_on: Option<(String, CancellationToken)>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, path: &str, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.routes
            .insert(format!("{TARGET}{path}"), (status, body.into()));
        self
    }

    pub fn envelope(self, envelope: Value) -> Self {
        self.route("/mod", 200, envelope.to_string())
    }

    /// Serve a listing plus one 200 route per file.
    pub fn update_files(mut self, name: &str, version: &str, files: &[(&str, &[u8])]) -> Self {
        let names: Vec<_> = files.iter().map(|(f, _)| *f).collect();
        self = self.route(
            &format!("/files/{name}/{version}"),
            200,
            json!(names).to_string(),
        );
        for (file, body) in files {
            self = self.route(&format!("/files/{name}/{version}/{file}"), 200, body.to_vec());
        }
        self
    }

    /// Cancel `token` when `path` is requested.
    pub fn cancel_on(mut self, path: &str, token: CancellationToken) -> Self {
        self.cancel_on = Some((format!("{TARGET}{path}"), token));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn file_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.contains("/files/"))
            .collect()
    }
}

impl Transport for FakeServer {
    fn get(&self, url: &Url) -> Result<Response, SyncError> {
        self.requests.lock().unwrap().push(url.to_string());
        if let Some((trigger, token)) = &self.cancel_on {
            if trigger == url.as_str() {
                token.cancel();
            }
        }
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

// ---------------------------------------------------------------------------
// Installer
// ---------------------------------------------------------------------------

/// Records every call. Unless `broken`, materialises the base version
/// directory of what it installed, as the real package manager does.
/// Components are vehicles unless registered with [`Self::location`].
pub struct UnpackingInstaller {
    root: PathBuf,
    locations: Vec<String>,
    broken: bool,
    calls: Mutex<Vec<(PathBuf, String, String)>>,
}

impl UnpackingInstaller {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            locations: Vec::new(),
            broken: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn broken(root: &Path) -> Self {
        Self {
            broken: true,
            ..Self::new(root)
        }
    }

    pub fn location(mut self, name: &str) -> Self {
        self.locations.push(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<(PathBuf, String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl Installer for UnpackingInstaller {
    fn install(&self, package: &Path, name: &str, version: &str) -> Result<(), InstallError> {
        self.calls
            .lock()
            .unwrap()
            .push((package.to_path_buf(), name.to_string(), version.to_string()));
        if self.broken {
            return Ok(());
        }
        let category = if self.locations.iter().any(|l| l == name) {
            Category::Locations
        } else {
            Category::Vehicles
        };
        let dir = paths::component_dir(&self.root, category, name, base_version(version, ".9apx"));
        std::fs::create_dir_all(&dir).map_err(|e| InstallError::Io { path: dir, source: e })
    }
}

// ---------------------------------------------------------------------------
// Installation roots
// ---------------------------------------------------------------------------

pub struct Rig {
    pub root: TempDir,
    pub workshop: TempDir,
    pub config: ApxConfig,
}

impl Rig {
    pub fn new() -> Self {
        let root = TempDir::new().expect("install root");
        let workshop = TempDir::new().expect("workshop root");
        let config = ApxConfig {
            install_root: root.path().to_path_buf(),
            workshop_root: workshop.path().to_path_buf(),
            fetch_workers: 3,
            ..ApxConfig::default()
        };
        Self {
            root,
            workshop,
            config,
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    pub fn workshop_item(&self, source_ref: &str, files: &[&str]) {
        let dir = self.workshop.path().join(source_ref);
        std::fs::create_dir_all(&dir).expect("workshop item dir");
        for f in files {
            std::fs::write(dir.join(f), b"rfcmp").expect("workshop package");
        }
    }

    pub fn install_dir(&self, category: Category, name: &str, version: &str) -> PathBuf {
        paths::component_dir(self.root(), category, name, version)
    }

    pub fn mark_installed(&self, category: Category, name: &str, version: &str) {
        std::fs::create_dir_all(self.install_dir(category, name, version)).expect("mark installed");
    }
}

// ---------------------------------------------------------------------------
// Descriptors
// ---------------------------------------------------------------------------

pub fn entry(name: &str, version: &str, update: bool) -> Value {
    json!({"component": {"name": name, "version": version, "update": update}})
}

pub fn envelope(name: &str, version: &str, cars: Value, track: Value) -> Value {
    json!({
        "mod": {"mod": {"name": name, "version": version}, "cars": cars, "track": track},
        "port": 64297
    })
}

/// Snapshot of every file under `dir` with its contents.
pub fn tree(dir: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut out = Vec::new();
    walk(dir, dir, &mut out);
    out.sort();
    out
}

fn walk(base: &Path, dir: &Path, out: &mut Vec<(PathBuf, Vec<u8>)>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_dir() {
            out.push((path.strip_prefix(base).unwrap().to_path_buf(), Vec::new()));
            walk(base, &path, out);
        } else {
            let bytes = std::fs::read(&path).unwrap();
            out.push((path.strip_prefix(base).unwrap().to_path_buf(), bytes));
        }
    }
}
