//! Command implementations for the orbrew CLI
//!
//! - **install**: install, reinstall, uninstall, fetch and test
//! - **query**: info, deps, caveats, list and wrapper
//! - **doctor**: installation diagnostics
//! - **completions**: shell completion scripts

pub mod completions;
pub mod doctor;
pub mod install;
pub mod query;

pub use completions::completions;
pub use doctor::doctor;
pub use install::{fetch, install, test, uninstall};
pub use query::{caveats, deps, info, list, wrapper};

use orbrew::catalog;
use orbrew::error::Result;
use orbrew::formula::Formula;
use std::path::Path;

/// Resolve a formula argument: a built-in name, or a path to a JSON formula
pub(crate) fn load_formula(arg: &str) -> Result<Formula> {
    if is_formula_path(arg) {
        return Formula::load(Path::new(arg));
    }
    catalog::find(arg)
}

/// A bare name never refers to a file, even if one exists in the cwd.
/// `orchat/orchat` stays a tap-qualified name unless such a file exists.
fn is_formula_path(arg: &str) -> bool {
    arg.ends_with(".json")
        || (arg.contains(std::path::MAIN_SEPARATOR) && Path::new(arg).is_file())
}
