//! # apx-installer
//!
//! Boundary around the external package installer.
//!
//! The installer is opaque: [`InstallerAdapter`] invokes an [`Installer`] per
//! package file and judges the outcome only through a [`PresenceOracle`].

pub mod adapter;
mod error;
pub mod modmgr;
pub mod presence;

pub use adapter::InstallerAdapter;
pub use error::InstallError;
pub use modmgr::{Installer, ModMgrInstaller};
pub use presence::{FsPresence, PresenceOracle};
