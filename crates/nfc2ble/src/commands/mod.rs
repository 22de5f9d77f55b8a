//! Subcommand handlers.

pub mod check;
pub mod config_cmd;
pub mod run;

use nfc2ble_config::Config;

use crate::cli::{GlobalOpts, IdArgs};
use crate::error::CliError;

/// Load the layered config and apply the identifier-file flag.
fn load_config(global: &GlobalOpts, ids: &IdArgs) -> Result<Config, CliError> {
    let mut config = nfc2ble_config::load_config(global.config.as_deref())?;
    if let Some(ref path) = ids.id_file {
        config.ids.file = Some(path.clone());
    }
    Ok(config)
}
