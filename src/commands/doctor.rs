use super::load_formula;
use colored::Colorize;
use orbrew::config::Config;
use orbrew::doctor::{self, Section, Severity};
use orbrew::error::Result;

/// Print a diagnosis and return the process exit code
pub fn doctor(config: &Config, name: &str) -> Result<i32> {
    let formula = load_formula(name)?;
    let diagnosis = doctor::diagnose(&formula, config)?;

    for section in Section::ALL {
        println!("\n{}", format!("==> {section}").bold());
        for finding in diagnosis.in_section(section) {
            let marker = match finding.severity {
                Severity::Ok => "✓".green(),
                Severity::Warning => "⚠".yellow(),
                Severity::Error => "✗".red(),
            };
            println!("  {} {}", marker, finding.message);
        }
    }

    println!("\n{}", "==> DIAGNOSTIC SUMMARY".bold());
    let errors = diagnosis.count(Severity::Error);
    let warnings = diagnosis.count(Severity::Warning);
    match diagnosis.worst() {
        Severity::Ok => println!("  {} {} looks healthy", "✓".green(), formula.name.bold()),
        _ => println!(
            "  {} error(s), {} warning(s)",
            errors.to_string().red().bold(),
            warnings.to_string().yellow().bold()
        ),
    }

    Ok(diagnosis.exit_code())
}
