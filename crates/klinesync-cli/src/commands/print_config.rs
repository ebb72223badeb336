use crate::config::{resolve_config, Overrides};
use klinesync_application::config::to_toml_pretty;

pub(super) fn run_print_config(overrides: &Overrides) -> Result<(), String> {
    let config = resolve_config(overrides)?;
    print!("{}", to_toml_pretty(&config)?);
    Ok(())
}
