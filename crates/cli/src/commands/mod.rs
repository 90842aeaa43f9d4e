//! Command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_simulation;
pub use validate::run_validate;

use std::path::Path;

use config_loader::{ConfigLoader, ConfigTable};

use crate::error::{CliError, Result};

/// Load the override file when given, otherwise the built-in table
pub(crate) fn load_table(path: Option<&Path>) -> Result<ConfigTable> {
    if let Some(path) = path {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()));
        }
    }
    Ok(ConfigLoader::load_or_builtin(path)?)
}
