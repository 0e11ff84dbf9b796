use super::load_formula;
use crate::InstallFlags;
use colored::Colorize;
use orbrew::cellar::Keg;
use orbrew::config::Config;
use orbrew::download;
use orbrew::error::Result;
use orbrew::installer::{self, InstallOptions, InstallReport, InstallState};
use orbrew::manifest;

pub async fn install(config: &Config, name: &str, flags: &InstallFlags, force: bool) -> Result<()> {
    let formula = load_formula(name)?;
    let version = formula.version()?;

    if flags.dry_run {
        let keg = Keg::new(&config.prefix, &formula.name, &version);
        println!("Dry run mode - no files will be written");
        println!(
            "{} {} {}",
            "==>".bold().green(),
            formula.name.bold(),
            version.dimmed()
        );
        for step in &formula.install {
            println!(
                "  {} {} -> {}",
                step.dir.to_string().dimmed(),
                step.source,
                manifest::planned_target(step, &keg).display().to_string().cyan()
            );
        }
        if let Some(launcher) = &formula.launcher {
            println!("  {} {}", "launcher".dimmed(), launcher.kind());
        }
        return Ok(());
    }

    println!(
        "Installing {} {}...",
        formula.name.bold(),
        version.dimmed()
    );

    let options = InstallOptions {
        allow_unverified: flags.allow_unverified,
        ignore_dependencies: flags.ignore_dependencies,
        force,
        skip_test: flags.skip_test,
        link: !flags.no_link,
    };

    match installer::install_formula(&formula, config, &options).await? {
        InstallState::AlreadyInstalled(keg) => {
            println!(
                "  {} {} {} is already installed",
                "ℹ".cyan(),
                formula.name.bold(),
                keg.version.dimmed()
            );
            println!("  Use {} to reinstall", "--force".dimmed());
        }
        InstallState::Installed(report) => print_report(&formula.name, &report),
    }

    Ok(())
}

fn print_report(name: &str, report: &InstallReport) {
    if report.archive.verified {
        println!("    ├ {} Verified sha256 {}", "✓".green(), report.archive.sha256.dimmed());
    } else {
        println!(
            "    ├ {} Unverified archive, sha256 {}",
            "⚠".yellow(),
            report.archive.sha256.bold()
        );
    }

    println!(
        "    ├ {} Installed {} files",
        "✓".green(),
        report.outcome.files.len().to_string().dimmed()
    );
    for preserved in &report.outcome.preserved_etc {
        println!(
            "    ├ {} Kept existing {} (new version saved as .default)",
            "ℹ".cyan(),
            preserved.display()
        );
    }
    if !report.linked.is_empty() {
        println!(
            "    ├ {} Linked {} files",
            "✓".green(),
            report.linked.len().to_string().dimmed()
        );
    }
    for dep in &report.missing_recommended {
        println!(
            "    ├ {} Recommended dependency {} is not installed",
            "⚠".yellow(),
            dep.bold()
        );
    }
    if let Some(results) = &report.test_results {
        for result in results {
            println!("    ├ {} {}", "✓".green(), result.description.dimmed());
        }
    }

    println!(
        "    └ {} Installed {} {}",
        "✓".green(),
        name.bold().green(),
        report.keg.version.dimmed()
    );

    if let Some(caveats) = &report.caveats {
        println!("\n{}", "==> Caveats".bold().yellow());
        println!("{}", caveats.trim_end());
    }
}

pub fn uninstall(config: &Config, name: &str) -> Result<()> {
    let formula = load_formula(name)?;
    let removed = installer::uninstall(config, &formula.name)?;

    for keg in removed {
        println!(
            "  {} Uninstalled {} {}",
            "✓".green(),
            formula.name.bold(),
            keg.version.dimmed()
        );
    }
    Ok(())
}

pub async fn fetch(
    config: &Config,
    name: &str,
    allow_unverified: bool,
    print_sha256: bool,
) -> Result<()> {
    let formula = load_formula(name)?;
    // Printing the digest is how a placeholder checksum gets filled in
    let archive =
        download::fetch_source(&formula, &config.cache_dir, allow_unverified || print_sha256)
            .await?;

    if print_sha256 {
        println!("{}", archive.sha256);
        return Ok(());
    }

    let marker = if archive.verified {
        "✓".green()
    } else {
        "⚠".yellow()
    };
    println!("{} {}", marker, archive.path.display());
    println!("  sha256 {}", archive.sha256);
    Ok(())
}

pub fn test(config: &Config, name: &str) -> Result<()> {
    let formula = load_formula(name)?;
    println!("Testing {}...", formula.name.bold());

    let (keg, results) = installer::test_installed(&formula, config)?;
    for result in &results {
        println!("  {} {}", "✓".green(), result.description);
    }
    println!(
        "{} {} {} passed",
        "✓".green().bold(),
        formula.name.bold(),
        keg.version.dimmed()
    );
    Ok(())
}
