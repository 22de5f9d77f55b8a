//! `config`: show the configuration the bridge would run with.

use nfc2ble_config::Config;

use crate::cli::{ConfigArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = if args.default {
        Config::default()
    } else {
        nfc2ble_config::load_config(global.config.as_deref())?
    };
    output::print_output(&config.to_toml()?);
    Ok(())
}
