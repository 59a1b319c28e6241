//! Release map index and POM version drift checking for plugin workspaces.
//!
//! The map index reads `kind@project=tag` map documents from a designated
//! folder and keeps them in step with workspace changes. The validation
//! engine compares each project's `pom.xml` version with its manifest's
//! `Bundle-Version` and reports located diagnostics.

pub mod change;
pub mod commands;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod locator;
pub mod manifest;
pub mod mapfile;
pub mod mapindex;
pub mod types;
pub mod validation;
pub mod vcs;
pub mod version;
pub mod watch;
pub mod workspace;

pub use error::Error;
