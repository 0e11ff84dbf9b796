//! Source archive fetching and checksum verification

use crate::error::{OrbrewError, Result};
use crate::formula::{Checksum, Formula};
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Where a formula's archive comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote(String),
    Local(PathBuf),
}

impl SourceLocation {
    pub fn parse(url: &str) -> Self {
        if let Some(path) = url.strip_prefix("file://") {
            SourceLocation::Local(PathBuf::from(path))
        } else if url.starts_with("http://") || url.starts_with("https://") {
            SourceLocation::Remote(url.to_string())
        } else {
            SourceLocation::Local(PathBuf::from(url))
        }
    }
}

/// A fetched archive and its computed digest
#[derive(Debug, Clone)]
pub struct FetchedArchive {
    pub path: PathBuf,
    pub sha256: String,
    /// True when the digest matched a resolved formula checksum
    pub verified: bool,
}

/// SHA256 digest of a file, lowercase hex
pub async fn sha256_file(file_path: &Path) -> Result<String> {
    use sha2::{Digest, Sha256};
    use tokio::io::AsyncReadExt;

    let mut file = fs::File::open(file_path)
        .await
        .with_context(|| format!("Failed to open {}", file_path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0; 8192];

    loop {
        let n = file.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Cache file name for a formula's archive
pub fn cache_file_name(formula: &Formula) -> Result<String> {
    Ok(format!("{}--{}.tar.gz", formula.name, formula.version()?))
}

/// Fetch a formula's source archive and check it against the declared checksum.
///
/// An unresolved checksum fails with [`OrbrewError::UnresolvedChecksum`]
/// unless `allow_unverified` is set. A digest mismatch always fails, and a
/// mismatching download is removed from the cache.
pub async fn fetch_source(
    formula: &Formula,
    cache_dir: &Path,
    allow_unverified: bool,
) -> Result<FetchedArchive> {
    let path = match SourceLocation::parse(&formula.url) {
        SourceLocation::Local(path) => {
            if !path.is_file() {
                return Err(OrbrewError::MissingSourcePath {
                    path: path.display().to_string(),
                });
            }
            debug!("Using local archive {}", path.display());
            path
        }
        SourceLocation::Remote(url) => {
            fs::create_dir_all(cache_dir)
                .await
                .context("Failed to create cache directory")?;
            let output_path = cache_dir.join(cache_file_name(formula)?);

            if output_path.exists() {
                if let Checksum::Sha256(expected) = &formula.sha256
                    && &sha256_file(&output_path).await? == expected
                {
                    info!("Using cached {}", output_path.display());
                    return Ok(FetchedArchive {
                        path: output_path,
                        sha256: expected.clone(),
                        verified: true,
                    });
                }
                fs::remove_file(&output_path).await?;
            }

            download(&formula.name, &url, &output_path).await?;
            output_path
        }
    };

    let actual = sha256_file(&path).await?;

    match &formula.sha256 {
        Checksum::Sha256(expected) if *expected == actual => Ok(FetchedArchive {
            path,
            sha256: actual,
            verified: true,
        }),
        Checksum::Sha256(expected) => {
            if path.starts_with(cache_dir) {
                fs::remove_file(&path).await?;
            }
            Err(OrbrewError::ChecksumMismatch {
                formula: formula.name.clone(),
                expected: expected.clone(),
                actual,
            })
        }
        Checksum::Unresolved(placeholder) if allow_unverified => {
            warn!(
                "{} declares no checksum ('{}'); archive sha256 is {}",
                formula.name, placeholder, actual
            );
            Ok(FetchedArchive {
                path,
                sha256: actual,
                verified: false,
            })
        }
        Checksum::Unresolved(placeholder) => Err(OrbrewError::UnresolvedChecksum {
            formula: formula.name.clone(),
            placeholder: placeholder.clone(),
            actual,
        }),
    }
}

async fn download(name: &str, url: &str, output_path: &Path) -> Result<()> {
    info!("Downloading {}", url);

    let is_tty = std::io::IsTerminal::is_terminal(&std::io::stderr());
    let pb = if is_tty {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})",
                )
                .context("Invalid progress template")?
                .progress_chars("#>-"),
        );
        pb.set_message(format!("⬇ {}", name));
        pb
    } else {
        ProgressBar::hidden()
    };

    let client = reqwest::Client::new();
    let mut response = client
        .get(url)
        .send()
        .await?
        .error_for_status()?;

    if let Some(total) = response.content_length() {
        pb.set_length(total);
    }

    let mut file = fs::File::create(output_path)
        .await
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let mut downloaded: u64 = 0;

    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        downloaded += chunk.len() as u64;
        pb.set_position(downloaded);
    }

    file.flush().await?;
    pb.finish_with_message(format!("✓ {}", name));

    Ok(())
}
