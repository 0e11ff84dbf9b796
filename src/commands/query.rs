//! Formula and installation queries.

use super::load_formula;
use colored::Colorize;
use orbrew::cellar::{self, Keg};
use orbrew::config::Config;
use orbrew::deps as dependency;
use orbrew::error::Result;
use orbrew::formula::{DependencyStrength, Launcher};
use orbrew::installer;
use orbrew::launcher;

/// Display formula metadata and what is installed
pub fn info(config: &Config, name: &str, json: bool) -> Result<()> {
    let formula = load_formula(name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&formula)?);
        return Ok(());
    }

    let version = formula.version()?;
    println!(
        "{} {}",
        format!("==> {}", formula.name).bold().green(),
        version.dimmed()
    );
    println!("{}", formula.desc);
    println!("{}: {}", "Homepage".bold(), formula.homepage);
    println!("{}: {}", "License".bold(), formula.license);
    println!("{}: {}", "Source".bold(), formula.url);
    println!("{}: {}", "sha256".bold(), formula.sha256);

    for (label, strength) in [
        ("Required", DependencyStrength::Required),
        ("Recommended", DependencyStrength::Recommended),
    ] {
        let names = formula.dependencies_with(strength);
        if !names.is_empty() {
            println!("{}: {}", label.bold(), names.join(", "));
        }
    }

    let installed = cellar::get_installed_versions(&config.prefix, &formula.name)?;
    if installed.is_empty() {
        println!("{}: no", "Installed".bold());
    } else {
        println!("{}:", "Installed".bold());
        for package in &installed {
            let detail = package
                .receipt
                .as_ref()
                .map(|r| {
                    let verified = if r.checksum_verified { "" } else { ", unverified" };
                    format!(
                        "({} files, {}{})",
                        r.installed_files.len(),
                        r.installed_at(),
                        verified
                    )
                })
                .unwrap_or_default();
            println!(
                "  {} {}",
                package.keg.path().display().to_string().cyan(),
                detail.dimmed()
            );
        }
    }

    Ok(())
}

/// Show dependencies with their strength and whether they resolve
pub fn deps(name: &str) -> Result<()> {
    let formula = load_formula(name)?;

    for status in dependency::check(&formula) {
        let marker = if status.found.is_some() {
            "✓".green()
        } else if status.strength == DependencyStrength::Required {
            "✗".red()
        } else {
            "⚠".yellow()
        };
        let location = status
            .found
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "not found".to_string());
        println!(
            "{} {} {} {}",
            marker,
            status.name.bold(),
            format!("({})", status.strength).dimmed(),
            location.dimmed()
        );
    }

    Ok(())
}

/// Print a formula's caveats, expanded for the current prefix
pub fn caveats(config: &Config, name: &str) -> Result<()> {
    let formula = load_formula(name)?;
    let keg = Keg::new(&config.prefix, &formula.name, &formula.version()?);

    match installer::render_caveats(&formula, &keg) {
        Some(text) => {
            println!("{}", format!("==> {}: Caveats", formula.name).bold().yellow());
            println!("{}", text.trim_end());
        }
        None => println!("{} has no caveats", formula.name),
    }
    Ok(())
}

/// List installed kegs
pub fn list(config: &Config) -> Result<()> {
    let packages = cellar::list_installed(&config.prefix)?;

    if packages.is_empty() {
        println!("No formulae installed under {}", config.prefix.display());
        return Ok(());
    }

    for package in packages {
        print!("{} {}", package.keg.name.bold(), package.keg.version.dimmed());
        if let Some(receipt) = &package.receipt
            && !receipt.checksum_verified
        {
            print!(" {}", "(unverified)".yellow());
        }
        println!();
    }
    Ok(())
}

/// Print the launcher a formula would produce under the current prefix
pub fn wrapper(config: &Config, name: &str) -> Result<()> {
    let formula = load_formula(name)?;
    let keg = Keg::new(&config.prefix, &formula.name, &formula.version()?);

    match &formula.launcher {
        Some(Launcher::Wrapper { env, exec, .. }) => {
            print!("{}", launcher::render_wrapper(env, exec, &keg));
        }
        Some(Launcher::Inreplace {
            file,
            pattern,
            replacement,
        }) => {
            println!(
                "# {} rewrites /{}/ in {}",
                formula.name,
                pattern,
                keg.path().join(file).display()
            );
            println!("{}", keg.expand(replacement));
        }
        None => println!("{} installs its executables unchanged", formula.name),
    }
    Ok(())
}
