//! APX core library: descriptor types, configuration, paths, cache.
//!
//! - [`types`]: [`ModDescriptor`], [`Component`], [`ModEnvelope`]
//! - [`config`]: [`ApxConfig`] load / save
//! - [`paths`]: installation-root path templates
//! - [`store`]: [`DescriptorStore`]
//! - [`error`]: [`CoreError`]

pub mod config;
pub mod error;
pub mod paths;
pub mod store;
pub mod types;

pub use config::ApxConfig;
pub use error::CoreError;
pub use store::DescriptorStore;
pub use types::{
    Category, Component, ComponentEntry, ComponentMap, ComponentRef, ModDescriptor, ModEnvelope,
    ModIdentity, SourceKind, SourceRef,
};
