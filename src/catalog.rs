//! Built-in orchat formulae.
//!
//! Two variants of the same packaging contract are shipped:
//!
//! - `orchat`: the OpenRouter CLI (v0.3.0). Installs `orchat` and
//!   `orchat-robust`, the module tree, a config template, a JSON schema and a
//!   data directory, then points the launcher at the module tree by rewriting
//!   its `SCRIPT_DIR=` line.
//! - `orchat-enterprise`: the enterprise assistant (v0.8.0). Installs the
//!   module tree and docs, and replaces `bin/orchat` with a generated wrapper
//!   exporting `ORCHAT_HOME`.
//!
//! Neither release has a published digest yet, so both carry unresolved
//! checksums.

use crate::error::{OrbrewError, Result};
use crate::formula::{
    Checksum, DependencyStrength, Formula, InstallDir, InstallStep, Launcher, SmokeStep,
};
use std::collections::BTreeMap;

const ORCHAT_CAVEATS: &str = r#"ORCHAT has been installed!

To get started:
1. Set your OpenRouter API key:
   mkdir -p ~/.config/orchat
   echo 'your-api-key-here' > ~/.config/orchat/config
   chmod 600 ~/.config/orchat/config

2. Test the installation:
   orchat "Hello from Homebrew!" --no-stream

3. For interactive mode:
   orchat -i

Optional dependencies:
- python3: For advanced JSON handling and TOML parsing
- jq: For JSON processing fallback

Documentation: {doc}
"#;

/// The OpenRouter CLI with multi-turn chat and streaming
pub fn orchat() -> Formula {
    let dependencies = BTreeMap::from([
        ("bash".to_string(), DependencyStrength::Required),
        ("python".to_string(), DependencyStrength::Recommended),
        ("jq".to_string(), DependencyStrength::Recommended),
        ("curl".to_string(), DependencyStrength::Required),
    ]);

    Formula {
        name: "orchat".to_string(),
        desc: "OpenRouter CLI with multi-turn chat and streaming".to_string(),
        homepage: "https://github.com/orchat/orchat".to_string(),
        url: "https://github.com/orchat/orchat/archive/refs/tags/v0.3.0.tar.gz".to_string(),
        sha256: Checksum::parse("TODO: CALCULATE_ACTUAL_SHA256"),
        license: "MIT".to_string(),
        version: None,
        dependencies,
        install: vec![
            InstallStep::new(InstallDir::Bin, "bin/orchat"),
            InstallStep::renamed(InstallDir::Bin, "bin/orchat.robust", "orchat-robust"),
            InstallStep::new(InstallDir::Libexec, "src"),
            InstallStep::renamed(InstallDir::Etc, "config/orchat.toml", "orchat/orchat.toml"),
            InstallStep::new(InstallDir::Doc, "config/schema.json"),
            InstallStep::new(InstallDir::Pkgshare, "data"),
        ],
        launcher: Some(Launcher::Inreplace {
            file: "bin/orchat".to_string(),
            pattern: "SCRIPT_DIR=.*".to_string(),
            replacement: "SCRIPT_DIR=\"{libexec}/src\"".to_string(),
        }),
        caveats: Some(ORCHAT_CAVEATS.to_string()),
        test: vec![
            SmokeStep::Run {
                program: "{bin}/orchat".to_string(),
                args: vec!["--help".to_string()],
            },
            SmokeStep::Run {
                program: "{bin}/orchat".to_string(),
                args: vec!["config".to_string(), "list".to_string()],
            },
            SmokeStep::AssertExists {
                path: "{libexec}/src/bootstrap.sh".to_string(),
            },
        ],
    }
}

/// The enterprise assistant packaging of orchat
pub fn orchat_enterprise() -> Formula {
    let dependencies = ["curl", "jq", "python@3.12"]
        .into_iter()
        .map(|name| (name.to_string(), DependencyStrength::Required))
        .collect();

    Formula {
        name: "orchat-enterprise".to_string(),
        desc: "ORCHAT Enterprise AI Assistant".to_string(),
        homepage: "https://orchat.ai".to_string(),
        url: "https://github.com/orchat/enterprise/archive/v0.8.0.tar.gz".to_string(),
        sha256: Checksum::parse("to_be_calculated"),
        license: "MIT".to_string(),
        version: None,
        dependencies,
        install: vec![
            InstallStep::new(InstallDir::Bin, "bin/orchat"),
            InstallStep::new(InstallDir::Libexec, "src"),
            InstallStep::new(InstallDir::Doc, "docs"),
        ],
        launcher: Some(Launcher::Wrapper {
            name: "orchat".to_string(),
            env: BTreeMap::from([("ORCHAT_HOME".to_string(), "{libexec}".to_string())]),
            exec: "{libexec}/src/bootstrap.sh".to_string(),
        }),
        caveats: None,
        test: vec![SmokeStep::Run {
            program: "{bin}/orchat".to_string(),
            args: vec!["--version".to_string()],
        }],
    }
}

/// All built-in formulae
pub fn builtin() -> Vec<Formula> {
    vec![orchat(), orchat_enterprise()]
}

/// Look up a built-in formula, suggesting the closest name on a miss
pub fn find(name: &str) -> Result<Formula> {
    let name = name.strip_prefix("orchat/").unwrap_or(name);
    let formulae = builtin();

    if let Some(formula) = formulae.iter().find(|f| f.name == name) {
        return Ok(formula.clone());
    }

    let suggestion = formulae
        .iter()
        .map(|f| (f.name.as_str(), strsim::jaro_winkler(name, &f.name)))
        .filter(|(_, score)| *score > 0.8)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate.to_string());

    Err(OrbrewError::FormulaNotFound {
        name: name.to_string(),
        suggestion,
    })
}
