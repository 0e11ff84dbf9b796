mod colors;
mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use orbrew::config::Config;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "orbrew")]
#[command(author, version, about = "Install the orchat OpenRouter CLI from its Homebrew formulae", long_about = None)]
pub(crate) struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Install prefix (defaults to ORBREW_PREFIX, HOMEBREW_PREFIX, then the platform prefix)
    #[arg(long, global = true)]
    prefix: Option<PathBuf>,

    /// Download cache directory (defaults to ORBREW_CACHE or ~/.cache/orbrew/downloads)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,
}

#[derive(clap::Args, Clone, Debug)]
pub(crate) struct InstallFlags {
    /// Install even if the formula's checksum is a placeholder
    #[arg(long)]
    allow_unverified: bool,

    /// Continue when required dependencies are missing
    #[arg(long)]
    ignore_dependencies: bool,

    /// Skip the post-install smoke test
    #[arg(long)]
    skip_test: bool,

    /// Do not link executables into the prefix
    #[arg(long)]
    no_link: bool,

    /// Show what would be installed without installing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install a formula (built-in name or path to a JSON formula)
    Install {
        formula: String,

        #[command(flatten)]
        flags: InstallFlags,

        /// Reinstall even if this version is already installed
        #[arg(short, long)]
        force: bool,
    },

    /// Reinstall a formula from a fresh archive
    Reinstall {
        formula: String,

        #[command(flatten)]
        flags: InstallFlags,
    },

    /// Uninstall every version of a formula
    Uninstall { formula: String },

    /// Download and verify a formula's source archive
    Fetch {
        formula: String,

        /// Accept an unresolved checksum
        #[arg(long)]
        allow_unverified: bool,

        /// Print only the archive's SHA-256
        #[arg(long)]
        print_sha256: bool,
    },

    /// Run the post-install smoke test for an installed formula
    Test { formula: String },

    /// Show formula metadata and install status
    Info {
        formula: String,

        /// Output the formula as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show dependencies and whether they are present
    Deps { formula: String },

    /// Show post-install notes
    Caveats { formula: String },

    /// List installed formulae
    List,

    /// Diagnose an installation
    Doctor {
        #[arg(default_value = "orchat")]
        formula: String,
    },

    /// Print the launcher script a formula would generate
    Wrapper { formula: String },

    /// Generate shell completions
    Completions { shell: clap_complete::Shell },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    colors::init_colors(cli.no_color);

    let config = Config::resolve(cli.prefix, cli.cache_dir);

    match cli.command {
        Some(Commands::Install {
            formula,
            flags,
            force,
        }) => {
            commands::install(&config, &formula, &flags, force).await?;
        }
        Some(Commands::Reinstall { formula, flags }) => {
            commands::install(&config, &formula, &flags, true).await?;
        }
        Some(Commands::Uninstall { formula }) => {
            commands::uninstall(&config, &formula)?;
        }
        Some(Commands::Fetch {
            formula,
            allow_unverified,
            print_sha256,
        }) => {
            commands::fetch(&config, &formula, allow_unverified, print_sha256).await?;
        }
        Some(Commands::Test { formula }) => {
            commands::test(&config, &formula)?;
        }
        Some(Commands::Info { formula, json }) => {
            commands::info(&config, &formula, json)?;
        }
        Some(Commands::Deps { formula }) => {
            commands::deps(&formula)?;
        }
        Some(Commands::Caveats { formula }) => {
            commands::caveats(&config, &formula)?;
        }
        Some(Commands::List) => {
            commands::list(&config)?;
        }
        Some(Commands::Doctor { formula }) => {
            let code = commands::doctor(&config, &formula)?;
            std::process::exit(code);
        }
        Some(Commands::Wrapper { formula }) => {
            commands::wrapper(&config, &formula)?;
        }
        Some(Commands::Completions { shell }) => {
            commands::completions(shell);
        }
        None => {
            println!(
                "{} - installer for the orchat OpenRouter CLI",
                "orbrew".bold()
            );
            println!("\nRun {} to get started.", "orbrew install orchat".cyan());
            println!("Run {} to see available commands.", "orbrew --help".cyan());
        }
    }

    Ok(())
}
