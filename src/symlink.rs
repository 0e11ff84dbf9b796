//! Symlink management for installed kegs

use crate::cellar::{Keg, cellar_path};
use anyhow::{Context, Result};
use std::fs;
use std::os::unix::fs as unix_fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Keg directories linked into the prefix; `libexec` stays private
const LINKABLE_DIRS: &[&str] = &["bin", "share"];

/// Link a keg's public directories into its prefix
pub fn link_keg(keg: &Keg) -> Result<Vec<PathBuf>> {
    let keg_path = keg.path();
    let mut linked_files = Vec::new();

    for dir_name in LINKABLE_DIRS {
        let source_dir = keg_path.join(dir_name);

        if !source_dir.is_dir() {
            continue;
        }

        let target_dir = keg.prefix.join(dir_name);
        fs::create_dir_all(&target_dir)
            .with_context(|| format!("Failed to create directory: {}", target_dir.display()))?;

        link_directory(&source_dir, &target_dir, keg, &mut linked_files)?;
    }

    Ok(linked_files)
}

fn link_directory(
    source: &Path,
    target: &Path,
    keg: &Keg,
    linked_files: &mut Vec<PathBuf>,
) -> Result<()> {
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let source_path = entry.path();
        let target_path = target.join(entry.file_name());

        if source_path.is_dir() && !source_path.is_symlink() {
            fs::create_dir_all(&target_path)?;
            link_directory(&source_path, &target_path, keg, linked_files)?;
        } else if create_relative_symlink(&source_path, &target_path, keg)? {
            linked_files.push(target_path);
        }
    }

    Ok(())
}

/// Relative path from the directory containing `target` to `source`
fn relative_link(source: &Path, target: &Path) -> PathBuf {
    let from: Vec<Component> = target
        .parent()
        .map(|p| p.components().collect())
        .unwrap_or_default();
    let to: Vec<Component> = source.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut path = PathBuf::new();
    for _ in common..from.len() {
        path.push("..");
    }
    for component in &to[common..] {
        path.push(component.as_os_str());
    }
    path
}

/// Resolve a link target against the link's directory, without touching disk
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                normalized.pop();
            }
            Component::CurDir => {}
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

fn resolve_link(link_path: &Path) -> Option<PathBuf> {
    let link_target = fs::read_link(link_path).ok()?;
    if link_target.is_relative() {
        Some(normalize_path(&link_path.parent()?.join(link_target)))
    } else {
        Some(link_target)
    }
}

/// Returns false when an unrelated file already occupies `target`
fn create_relative_symlink(source: &Path, target: &Path, keg: &Keg) -> Result<bool> {
    let relative_source = relative_link(source, target);

    if target.symlink_metadata().is_ok() {
        match resolve_link(target) {
            Some(existing) if existing == source => return Ok(true),
            // Another version of the same formula: take the link over
            Some(existing) if existing.starts_with(cellar_path(&keg.prefix).join(&keg.name)) => {
                fs::remove_file(target)?;
            }
            _ => {
                warn!(
                    "Not linking {}: target exists and is not managed by {}",
                    target.display(),
                    keg.name
                );
                return Ok(false);
            }
        }
    }

    unix_fs::symlink(&relative_source, target).with_context(|| {
        format!(
            "Failed to create symlink: {} -> {}",
            target.display(),
            relative_source.display()
        )
    })?;
    debug!("Linked {} -> {}", target.display(), relative_source.display());

    Ok(true)
}

/// Remove all prefix symlinks pointing into a keg
pub fn unlink_keg(keg: &Keg) -> Result<Vec<PathBuf>> {
    let keg_path = keg.path();
    let mut unlinked_files = Vec::new();

    for dir_name in LINKABLE_DIRS {
        let source_dir = keg_path.join(dir_name);
        let target_dir = keg.prefix.join(dir_name);

        if !source_dir.exists() || !target_dir.exists() {
            continue;
        }

        unlink_directory(&source_dir, &target_dir, &keg_path, &mut unlinked_files)?;
    }

    Ok(unlinked_files)
}

fn unlink_directory(
    source: &Path,
    target: &Path,
    keg_path: &Path,
    unlinked_files: &mut Vec<PathBuf>,
) -> Result<()> {
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let source_path = entry.path();
        let target_path = target.join(entry.file_name());

        if source_path.is_dir() && !source_path.is_symlink() {
            if target_path.is_dir() && !target_path.is_symlink() {
                unlink_directory(&source_path, &target_path, keg_path, unlinked_files)?;
                // Drop directories we emptied
                if fs::read_dir(&target_path)?.next().is_none() {
                    fs::remove_dir(&target_path)?;
                }
            }
        } else if target_path.is_symlink()
            && resolve_link(&target_path).is_some_and(|resolved| resolved.starts_with(keg_path))
        {
            fs::remove_file(&target_path)?;
            unlinked_files.push(target_path);
        }
    }

    Ok(())
}
