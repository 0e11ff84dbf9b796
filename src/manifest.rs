//! Install manifest execution.
//!
//! Copies each `InstallStep` from the extracted source tree into the keg (or
//! `<prefix>/etc`), then produces the launcher. The keg is rebuilt from
//! scratch on every run so a reinstall never leaves stale files behind.
//!
//! Files under `etc` are user-editable and outlive the keg. When an existing
//! config file differs from the new template, the user's copy is kept and the
//! template is written beside it as `<file>.default`.

use crate::cellar::Keg;
use crate::error::{OrbrewError, Result};
use crate::formula::{Formula, InstallDir, InstallStep};
use crate::launcher;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// What an install run put on disk
#[derive(Debug, Clone, Default)]
pub struct InstallOutcome {
    /// Every file in the keg, relative to the keg root
    pub files: Vec<PathBuf>,
    /// Files written under `<prefix>/etc`, relative to the prefix
    pub etc_files: Vec<PathBuf>,
    /// Existing etc files that were kept instead of overwritten
    pub preserved_etc: Vec<PathBuf>,
    pub launcher: Option<PathBuf>,
}

/// Check that every manifest source exists before touching the keg
pub fn check_sources(formula: &Formula, source_root: &Path) -> Result<()> {
    for step in &formula.install {
        let source = source_root.join(&step.source);
        if source.symlink_metadata().is_err() {
            return Err(OrbrewError::MissingSourcePath {
                path: step.source.clone(),
            });
        }
    }
    Ok(())
}

/// Run the install manifest and launcher step into `keg`
pub fn install(formula: &Formula, source_root: &Path, keg: &Keg) -> Result<InstallOutcome> {
    check_sources(formula, source_root)?;

    let keg_path = keg.path();
    if keg_path.exists() {
        info!("Removing previous keg {}", keg_path.display());
        fs::remove_dir_all(&keg_path)
            .with_context(|| format!("Failed to remove {}", keg_path.display()))?;
    }
    fs::create_dir_all(&keg_path)
        .with_context(|| format!("Failed to create keg {}", keg_path.display()))?;

    let mut outcome = InstallOutcome::default();

    for step in &formula.install {
        let source = source_root.join(&step.source);
        let target = keg.dir(step.dir).join(step.target());
        debug!("{}.install {} -> {}", step.dir, step.source, target.display());

        match step.dir {
            InstallDir::Etc => install_etc(&source, &target, keg, &mut outcome)?,
            InstallDir::Bin => {
                copy_path(&source, &target)?;
                mark_executables(&target)?;
            }
            _ => copy_path(&source, &target)?,
        }
    }

    if let Some(launcher) = &formula.launcher {
        outcome.launcher = Some(launcher::apply(launcher, keg)?);
    }

    outcome.files = keg_files(&keg_path)?;
    info!(
        "Installed {} files into {}",
        outcome.files.len(),
        keg_path.display()
    );

    Ok(outcome)
}

/// Paths a manifest step would produce, for dry runs and reporting
pub fn planned_target(step: &InstallStep, keg: &Keg) -> PathBuf {
    keg.dir(step.dir).join(step.target())
}

fn install_etc(
    source: &Path,
    target: &Path,
    keg: &Keg,
    outcome: &mut InstallOutcome,
) -> Result<()> {
    let files: Vec<(PathBuf, PathBuf)> = if source.is_dir() {
        WalkDir::new(source)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = e.path().strip_prefix(source).ok()?.to_path_buf();
                Some((e.path().to_path_buf(), target.join(rel)))
            })
            .collect()
    } else {
        vec![(source.to_path_buf(), target.to_path_buf())]
    };

    for (from, to) in files {
        let written = if to.exists() && fs::read(&to)? != fs::read(&from)? {
            let default = default_path(&to);
            copy_path(&from, &default)?;
            info!(
                "Kept existing {}; new template at {}",
                to.display(),
                default.display()
            );
            outcome.preserved_etc.push(relative_to(&to, &keg.prefix));
            default
        } else {
            copy_path(&from, &to)?;
            let stale = default_path(&to);
            if stale.symlink_metadata().is_ok() {
                fs::remove_file(&stale)
                    .with_context(|| format!("Failed to remove {}", stale.display()))?;
            }
            to
        };
        outcome.etc_files.push(relative_to(&written, &keg.prefix));
    }

    Ok(())
}

fn default_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".default");
    path.with_file_name(name)
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base).unwrap_or(path).to_path_buf()
}

/// Copy a file, symlink or directory tree to `target`
fn copy_path(source: &Path, target: &Path) -> Result<()> {
    let metadata = source
        .symlink_metadata()
        .with_context(|| format!("Failed to stat {}", source.display()))?;

    if metadata.is_dir() {
        for entry in WalkDir::new(source) {
            let entry = entry.context("Failed to walk source tree")?;
            let rel = entry
                .path()
                .strip_prefix(source)
                .context("Source entry outside tree")?;
            copy_entry(entry.path(), &target.join(rel))?;
        }
        Ok(())
    } else {
        copy_entry(source, target)
    }
}

fn copy_entry(source: &Path, target: &Path) -> Result<()> {
    let file_type = source.symlink_metadata()?.file_type();

    if file_type.is_dir() {
        fs::create_dir_all(target)
            .with_context(|| format!("Failed to create {}", target.display()))?;
        return Ok(());
    }

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    if target.symlink_metadata().is_ok() {
        fs::remove_file(target)?;
    }

    #[cfg(unix)]
    {
        if file_type.is_symlink() {
            let link = fs::read_link(source)?;
            std::os::unix::fs::symlink(&link, target)
                .with_context(|| format!("Failed to link {}", target.display()))?;
            return Ok(());
        }
    }

    fs::copy(source, target).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            source.display(),
            target.display()
        )
    })?;
    Ok(())
}

/// `bin.install` always yields executables
fn mark_executables(target: &Path) -> Result<()> {
    for entry in WalkDir::new(target).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file() {
            launcher::set_executable(entry.path())?;
        }
    }
    Ok(())
}

/// Every non-directory path under the keg, sorted, relative to it
pub fn keg_files(keg_path: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = WalkDir::new(keg_path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .filter_map(|e| e.path().strip_prefix(keg_path).ok().map(Path::to_path_buf))
        .collect();
    files.sort();
    Ok(files)
}
