//! Install receipts.
//!
//! Every keg gets an `INSTALL_RECEIPT.json` recording what was installed and
//! from where:
//!
//! ```text
//! <prefix>/Cellar/orchat/0.3.0/
//!   INSTALL_RECEIPT.json
//!   bin/
//!   libexec/
//! ```
//!
//! Files under `<prefix>/etc` live outside the keg, so they are listed
//! separately; uninstall leaves them in place like Homebrew does.

use crate::formula::Formula;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub const RECEIPT_FILE: &str = "INSTALL_RECEIPT.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallReceipt {
    pub orbrew_version: String,
    pub formula: String,
    pub version: String,
    pub source_url: String,
    /// Digest of the archive that was installed
    pub source_sha256: String,
    /// False when installed with an unresolved formula checksum
    pub checksum_verified: bool,
    pub time: i64,
    /// Paths relative to the keg
    #[serde(default)]
    pub installed_files: Vec<String>,
    /// Paths relative to the prefix
    #[serde(default)]
    pub etc_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launcher: Option<String>,
    #[serde(default)]
    pub missing_recommended: Vec<String>,
}

impl InstallReceipt {
    pub fn new(
        formula: &Formula,
        version: &str,
        source_sha256: &str,
        checksum_verified: bool,
    ) -> Self {
        Self {
            orbrew_version: format!("orbrew/{}", env!("CARGO_PKG_VERSION")),
            formula: formula.name.clone(),
            version: version.to_string(),
            source_url: formula.url.clone(),
            source_sha256: source_sha256.to_string(),
            checksum_verified,
            time: chrono::Utc::now().timestamp(),
            installed_files: vec![],
            etc_files: vec![],
            launcher: formula.launcher.as_ref().map(|l| l.kind().to_string()),
            missing_recommended: vec![],
        }
    }

    /// Read an existing INSTALL_RECEIPT.json file
    pub fn read(keg_path: &Path) -> Result<Self> {
        let receipt_path = keg_path.join(RECEIPT_FILE);
        let contents = fs::read_to_string(&receipt_path)
            .with_context(|| format!("Failed to read receipt: {}", receipt_path.display()))?;

        let receipt: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse receipt: {}", receipt_path.display()))?;

        Ok(receipt)
    }

    /// Write receipt to INSTALL_RECEIPT.json
    pub fn write(&self, keg_path: &Path) -> Result<()> {
        let receipt_path = keg_path.join(RECEIPT_FILE);
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize install receipt")?;

        fs::write(&receipt_path, json)
            .with_context(|| format!("Failed to write receipt: {}", receipt_path.display()))?;

        Ok(())
    }

    /// Installation time formatted for display
    pub fn installed_at(&self) -> String {
        chrono::DateTime::from_timestamp(self.time, 0)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use tempfile::TempDir;

    #[test]
    fn test_receipt_round_trip() {
        let temp = TempDir::new().unwrap();
        let formula = catalog::orchat();
        let mut receipt = InstallReceipt::new(&formula, "0.3.0", "abc123", false);
        receipt.installed_files = vec!["bin/orchat".to_string()];
        receipt.write(temp.path()).unwrap();

        let read = InstallReceipt::read(temp.path()).unwrap();
        assert_eq!(read, receipt);
        assert_eq!(read.launcher.as_deref(), Some("inreplace"));
        assert!(!read.checksum_verified);
    }

    #[test]
    fn test_missing_receipt_is_error() {
        let temp = TempDir::new().unwrap();
        assert!(InstallReceipt::read(temp.path()).is_err());
    }

    #[test]
    fn test_installed_at_formatting() {
        let mut receipt =
            InstallReceipt::new(&catalog::orchat_enterprise(), "0.8.0", "abc", true);
        receipt.time = 0;
        assert_eq!(receipt.installed_at(), "1970-01-01 00:00:00 UTC");
    }
}
