//! The formula install lifecycle.
//!
//! `install_formula` runs the fixed sequence
//! dependencies → fetch → verify → extract → manifest → link → receipt → test,
//! strictly one step after another. Nothing is written into the prefix
//! before the archive has been fetched, verified and found to contain every
//! manifest source.
//!
//! # Examples
//!
//! ```no_run
//! use orbrew::config::Config;
//! use orbrew::installer::{self, InstallOptions, InstallState};
//!
//! #[tokio::main]
//! async fn main() -> orbrew::Result<()> {
//!     let config = Config::resolve(None, None);
//!     let formula = orbrew::catalog::find("orchat")?;
//!     let options = InstallOptions { allow_unverified: true, ..Default::default() };
//!
//!     if let InstallState::Installed(report) =
//!         installer::install_formula(&formula, &config, &options).await?
//!     {
//!         println!("Installed into {}", report.keg.path().display());
//!     }
//!     Ok(())
//! }
//! ```

use crate::cellar::{self, Keg};
use crate::config::Config;
use crate::deps;
use crate::download::{self, FetchedArchive};
use crate::error::{OrbrewError, Result};
use crate::extract;
use crate::formula::Formula;
use crate::manifest::{self, InstallOutcome};
use crate::receipt::InstallReceipt;
use crate::smoke::{self, StepResult};
use crate::symlink;
use anyhow::Context;
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Install even though the formula's checksum is a placeholder
    pub allow_unverified: bool,
    /// Continue when required dependencies are missing
    pub ignore_dependencies: bool,
    /// Reinstall over an existing keg of the same version
    pub force: bool,
    pub skip_test: bool,
    pub link: bool,
}

impl Default for InstallOptions {
    fn default() -> Self {
        Self {
            allow_unverified: false,
            ignore_dependencies: false,
            force: false,
            skip_test: false,
            link: true,
        }
    }
}

#[derive(Debug)]
pub struct InstallReport {
    pub keg: Keg,
    pub archive: FetchedArchive,
    pub outcome: InstallOutcome,
    pub linked: Vec<PathBuf>,
    pub missing_recommended: Vec<String>,
    /// None when the smoke test was skipped
    pub test_results: Option<Vec<StepResult>>,
    pub caveats: Option<String>,
}

#[derive(Debug)]
pub enum InstallState {
    Installed(Box<InstallReport>),
    AlreadyInstalled(Keg),
}

pub async fn install_formula(
    formula: &Formula,
    config: &Config,
    options: &InstallOptions,
) -> Result<InstallState> {
    formula.validate()?;
    let version = formula.version()?;
    let keg = Keg::new(&config.prefix, &formula.name, &version);

    if keg.exists() && !options.force {
        return Ok(InstallState::AlreadyInstalled(keg));
    }

    let missing_recommended =
        deps::enforce(&deps::check(formula), options.ignore_dependencies)?;

    info!("Fetching {} {}", formula.name, version);
    let archive =
        download::fetch_source(formula, &config.cache_dir, options.allow_unverified).await?;

    let staging = tempfile::TempDir::new().context("Failed to create staging directory")?;
    let source_root = extract::extract_source(&archive.path, staging.path())?;

    info!("Installing {} into {}", formula.name, keg.path().display());
    if keg.exists() {
        symlink::unlink_keg(&keg)?;
    }
    let outcome = manifest::install(formula, &source_root, &keg)?;

    let linked = if options.link {
        symlink::link_keg(&keg)?
    } else {
        vec![]
    };

    let mut receipt = InstallReceipt::new(formula, &version, &archive.sha256, archive.verified);
    receipt.installed_files = to_strings(&outcome.files);
    receipt.etc_files = to_strings(&outcome.etc_files);
    receipt.missing_recommended = missing_recommended.clone();
    receipt.write(&keg.path())?;

    let test_results = if options.skip_test {
        None
    } else {
        info!("Testing {}", formula.name);
        Some(smoke::run(formula, &keg)?)
    };

    Ok(InstallState::Installed(Box::new(InstallReport {
        caveats: render_caveats(formula, &keg),
        keg,
        archive,
        outcome,
        linked,
        missing_recommended,
        test_results,
    })))
}

/// Caveats text with layout placeholders expanded
pub fn render_caveats(formula: &Formula, keg: &Keg) -> Option<String> {
    formula.caveats.as_ref().map(|text| keg.expand(text))
}

/// Run the smoke test against the newest installed keg
pub fn test_installed(formula: &Formula, config: &Config) -> Result<(Keg, Vec<StepResult>)> {
    let keg = newest_keg(config, &formula.name)?;
    let results = smoke::run(formula, &keg)?;
    Ok((keg, results))
}

pub fn newest_keg(config: &Config, name: &str) -> Result<Keg> {
    cellar::get_installed_versions(&config.prefix, name)?
        .into_iter()
        .next()
        .map(|package| package.keg)
        .ok_or_else(|| OrbrewError::NotInstalled(name.to_string()))
}

/// Unlink and remove every installed version of a formula.
///
/// Files under `<prefix>/etc` are left in place.
pub fn uninstall(config: &Config, name: &str) -> Result<Vec<Keg>> {
    let installed = cellar::get_installed_versions(&config.prefix, name)?;
    if installed.is_empty() {
        return Err(OrbrewError::NotInstalled(name.to_string()));
    }

    let mut removed = Vec::new();
    for package in installed {
        let keg = package.keg;
        let unlinked = symlink::unlink_keg(&keg)?;
        info!("Unlinked {} files for {} {}", unlinked.len(), name, keg.version);

        fs::remove_dir_all(keg.path())
            .with_context(|| format!("Failed to remove {}", keg.path().display()))?;
        removed.push(keg);
    }

    let formula_dir = cellar::cellar_path(&config.prefix).join(name);
    if formula_dir.exists() && fs::read_dir(&formula_dir)?.next().is_none() {
        fs::remove_dir(&formula_dir)?;
    }

    Ok(removed)
}

fn to_strings(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect()
}
