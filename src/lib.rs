//! Library interface for orbrew, the orchat formula installer
//!
//! Exposes the formula model and the install lifecycle so they can be driven
//! from tests and from the `orbrew` binary.

pub mod catalog;
pub mod cellar;
pub mod config;
pub mod deps;
pub mod doctor;
pub mod download;
pub mod error;
pub mod extract;
pub mod formula;
pub mod installer;
pub mod launcher;
pub mod manifest;
pub mod receipt;
pub mod smoke;
pub mod symlink;

// Re-export commonly used items
pub use error::{OrbrewError, Result};
pub use formula::Formula;
pub use installer::{InstallOptions, InstallState, install_formula};
