//! Source archive extraction into a staging directory.
//!
//! Release archives from GitHub wrap their contents in a single top-level
//! directory named after the tag:
//!
//! ```text
//! v0.3.0.tar.gz
//!   orchat-0.3.0/
//!     bin/orchat
//!     src/bootstrap.sh
//!     config/orchat.toml
//! ```
//!
//! [`extract_source`] unpacks the archive and returns that inner directory as
//! the source root, so install manifests can use paths like `bin/orchat`.

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tar::Archive;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Extract a `.tar.gz` (or plain `.tar`) archive and return its source root
pub fn extract_source(archive_path: &Path, staging: &Path) -> Result<PathBuf> {
    fs::create_dir_all(staging)
        .with_context(|| format!("Failed to create staging directory: {}", staging.display()))?;

    let mut magic = [0u8; 2];
    let is_gzip = fs::File::open(archive_path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| magic == GZIP_MAGIC)
        .unwrap_or(false);

    let file = fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let reader = BufReader::new(file);

    if is_gzip {
        unpack(Archive::new(GzDecoder::new(reader)), staging)?;
    } else {
        unpack(Archive::new(reader), staging)?;
    }

    source_root(staging)
}

fn unpack<R: Read>(mut archive: Archive<R>, staging: &Path) -> Result<()> {
    archive.set_preserve_permissions(true);
    archive
        .unpack(staging)
        .with_context(|| format!("Failed to extract archive to: {}", staging.display()))
}

/// The single top-level directory if there is exactly one, else the staging dir
fn source_root(staging: &Path) -> Result<PathBuf> {
    let entries: Vec<_> = fs::read_dir(staging)
        .with_context(|| format!("Failed to read {}", staging.display()))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            // macOS tar leaves AppleDouble files next to the real tree
            !name.starts_with("._") && name != "pax_global_header"
        })
        .collect();

    match entries.as_slice() {
        [only] if only.path().is_dir() => Ok(only.path()),
        [] => anyhow::bail!("Archive is empty"),
        _ => Ok(staging.to_path_buf()),
    }
}
