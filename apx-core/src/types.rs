//! Domain types for mod descriptors.
//!
//! A [`ModDescriptor`] is an immutable value once fetched. Its `cars` and
//! `track` sections map a [`SourceRef`] (the workshop cache key, or a
//! file-based identifier carrying a `-`) to a [`ComponentEntry`].
//! Map order is the insertion order of the source document.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::paths;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Opaque identifier used to locate install-source content.
///
/// Workshop items are plain numeric ids; file-based sources carry a `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRef(pub String);

impl SourceRef {
    /// `true` for file-based sources, which cannot be installed from the
    /// workshop cache.
    pub fn is_file_based(&self) -> bool {
        self.0.contains('-')
    }

    pub fn kind(&self) -> SourceKind {
        if self.is_file_based() {
            SourceKind::FileBased
        } else {
            SourceKind::Workshop
        }
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for SourceRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SourceRef {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Where a component's source content comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Workshop,
    FileBased,
}

/// Installed content category, named after the directory under `Installed/`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Vehicles,
    Locations,
}

impl Category {
    /// Cars are reconciled before tracks.
    pub fn all() -> &'static [Category] {
        &[Category::Vehicles, Category::Locations]
    }

    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Vehicles => "Vehicles",
            Category::Locations => "Locations",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

// ---------------------------------------------------------------------------
// Components
// ---------------------------------------------------------------------------

/// A single car or track entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub version: String,
    /// `true` if this entry is an update layer over a base install.
    #[serde(default)]
    pub update: bool,
}

impl Component {
    /// `true` if the version carries the modifier suffix (a derived build).
    pub fn is_modified(&self, suffix: &str) -> bool {
        !suffix.is_empty() && self.version.ends_with(suffix)
    }

    /// The installable base version: the version with the modifier suffix
    /// stripped, or the version itself.
    pub fn base_version(&self, suffix: &str) -> &str {
        base_version(&self.version, suffix)
    }
}

/// Strip `suffix` from `version` if present.
pub fn base_version<'a>(version: &'a str, suffix: &str) -> &'a str {
    if suffix.is_empty() {
        return version;
    }
    version.strip_suffix(suffix).unwrap_or(version)
}

/// Wire wrapper around a [`Component`]: `{"component": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentEntry {
    pub component: Component,
}

impl From<Component> for ComponentEntry {
    fn from(component: Component) -> Self {
        Self { component }
    }
}

/// A borrowed view over one component together with its key and category.
#[derive(Debug, Clone, Copy)]
pub struct ComponentRef<'a> {
    pub category: Category,
    pub source_ref: &'a SourceRef,
    pub component: &'a Component,
}

// ---------------------------------------------------------------------------
// Descriptor
// ---------------------------------------------------------------------------

/// Identity of a mod release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModIdentity {
    pub name: String,
    pub version: String,
}

impl ModIdentity {
    /// `<name>_<version-with-dots-stripped>`, the stem shared by the mod's
    /// manifest and rFm package files.
    pub fn artifact_stem(&self) -> String {
        format!("{}_{}", self.name, self.version.replace('.', ""))
    }
}

impl fmt::Display for ModIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.version)
    }
}

pub type ComponentMap = IndexMap<SourceRef, ComponentEntry>;

/// The declared desired mod state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModDescriptor {
    #[serde(rename = "mod")]
    pub identity: ModIdentity,
    pub cars: ComponentMap,
    pub track: ComponentMap,
    /// APX build information, carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comp: Option<Value>,
}

impl ModDescriptor {
    pub fn section(&self, category: Category) -> &ComponentMap {
        match category {
            Category::Vehicles => &self.cars,
            Category::Locations => &self.track,
        }
    }

    /// All components, cars first, each section in descriptor order.
    pub fn components(&self) -> impl Iterator<Item = ComponentRef<'_>> {
        Category::all().iter().flat_map(move |&category| {
            self.section(category)
                .iter()
                .map(move |(source_ref, entry)| ComponentRef {
                    category,
                    source_ref,
                    component: &entry.component,
                })
        })
    }

    /// `true` if `category` declares an update-flagged component with this
    /// exact name and version.
    pub fn declares_update(&self, category: Category, name: &str, version: &str) -> bool {
        self.section(category).values().any(|entry| {
            entry.component.update
                && entry.component.name == name
                && entry.component.version == version
        })
    }
}

/// The `/mod` response envelope, also persisted as the local cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModEnvelope {
    #[serde(rename = "mod")]
    pub descriptor: ModDescriptor,
    pub port: u16,
}

impl ModEnvelope {
    /// Parse and validate a `/mod` envelope.
    ///
    /// A body that is not JSON yields [`CoreError::Json`]; JSON that does not
    /// match the schema (including a descriptor without `cars` or `track`)
    /// yields [`CoreError::MalformedDescriptor`].
    pub fn from_json(body: &str) -> Result<Self, CoreError> {
        let value: Value = serde_json::from_str(body)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        let Some(descriptor) = value.get("mod").and_then(Value::as_object) else {
            return Err(CoreError::MalformedDescriptor {
                reason: "envelope has no `mod` object".to_string(),
            });
        };
        for key in ["cars", "track"] {
            if !descriptor.contains_key(key) {
                return Err(CoreError::MalformedDescriptor {
                    reason: format!("descriptor is missing `{key}`"),
                });
            }
        }
        let envelope: Self =
            serde_json::from_value(value).map_err(|e| CoreError::MalformedDescriptor {
                reason: e.to_string(),
            })?;
        envelope.check_path_names()?;
        Ok(envelope)
    }

    /// Every name that ends up in a filesystem path must be a single plain
    /// path component.
    fn check_path_names(&self) -> Result<(), CoreError> {
        let identity = self.identity();
        let mut fields = vec![
            ("mod name", identity.name.as_str()),
            ("mod version", identity.version.as_str()),
        ];
        for c in self.descriptor.components() {
            fields.push(("source ref", c.source_ref.0.as_str()));
            fields.push(("component name", c.component.name.as_str()));
            fields.push(("component version", c.component.version.as_str()));
        }
        match fields.into_iter().find(|(_, v)| !paths::is_plain_component(v)) {
            Some((field, value)) => Err(CoreError::MalformedDescriptor {
                reason: format!("{field} {value:?} is not a plain path component"),
            }),
            None => Ok(()),
        }
    }

    pub fn identity(&self) -> &ModIdentity {
        &self.descriptor.identity
    }
}
