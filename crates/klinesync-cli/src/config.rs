use klinesync_application::config::{load_config, Config, SymbolErrorPolicy};
use klinesync_domain::repositories::warehouse::WriteMode;
use std::path::PathBuf;

pub const CONFIG_ENV: &str = "KLINESYNC_CONFIG";

/// Command-line values layered over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub project_id: Option<String>,
    pub dataset: Option<String>,
    pub credentials: Option<String>,
    pub skip_failed_symbols: bool,
    pub write_mode: Option<WriteMode>,
}

pub fn resolve_config(overrides: &Overrides) -> Result<Config, String> {
    let path = overrides.config_path.clone().or_else(|| {
        std::env::var(CONFIG_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    });
    let mut config = match path {
        Some(path) => load_config(&path)?,
        None => Config::default(),
    };
    apply_overrides(&mut config, overrides);
    Ok(config)
}

pub fn apply_overrides(config: &mut Config, overrides: &Overrides) {
    if let Some(project_id) = &overrides.project_id {
        config.warehouse.project_id = Some(project_id.clone());
    }
    if let Some(dataset) = &overrides.dataset {
        config.warehouse.dataset = Some(dataset.clone());
    }
    if let Some(credentials) = &overrides.credentials {
        config.warehouse.credentials = Some(credentials.clone());
    }
    if overrides.skip_failed_symbols {
        config.fetch.on_symbol_error = SymbolErrorPolicy::Skip;
    }
    if let Some(mode) = overrides.write_mode {
        config.warehouse.write_mode = mode;
    }
}
