use serde::Deserialize;
use std::fs;
use std::path::Path;

pub const WAREHOUSE_URL_ENV: &str = "KLINESYNC_WAREHOUSE_URL";

fn default_port() -> u16 {
    5432
}

/// Service credentials file for the Postgres warehouse.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct WarehouseCredentials {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    File(WarehouseCredentials),
    Url(String),
}

impl CredentialSource {
    /// Connection settings targeting `database`, which always wins over any
    /// database named in a URL.
    pub fn postgres_config(&self, database: &str) -> Result<postgres::Config, String> {
        let mut config = match self {
            CredentialSource::File(creds) => {
                let mut config = postgres::Config::new();
                config.host(&creds.host).port(creds.port).user(&creds.user);
                if let Some(password) = &creds.password {
                    config.password(password);
                }
                config
            }
            CredentialSource::Url(url) => url
                .parse::<postgres::Config>()
                .map_err(|err| format!("invalid postgres db url: {err}"))?,
        };
        config.dbname(database);
        Ok(config)
    }

    pub fn describe(&self) -> String {
        match self {
            CredentialSource::File(creds) => format!("{}@{}:{}", creds.user, creds.host, creds.port),
            CredentialSource::Url(_) => format!("${WAREHOUSE_URL_ENV}"),
        }
    }
}

pub fn load_credentials_file(path: &Path) -> Result<WarehouseCredentials, String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read credentials {}: {}", path.display(), err))?;
    serde_json::from_str(&contents)
        .map_err(|err| format!("failed to parse credentials {}: {}", path.display(), err))
}

/// An explicit credentials file takes precedence over the environment.
pub fn resolve_credentials(path: Option<&Path>) -> Result<CredentialSource, String> {
    resolve_credentials_with_env(path, std::env::var(WAREHOUSE_URL_ENV).ok())
}

fn resolve_credentials_with_env(
    path: Option<&Path>,
    env_url: Option<String>,
) -> Result<CredentialSource, String> {
    if let Some(path) = path {
        return load_credentials_file(path).map(CredentialSource::File);
    }
    match env_url.filter(|url| !url.trim().is_empty()) {
        Some(url) => Ok(CredentialSource::Url(url)),
        None => Err(format!(
            "no warehouse credentials: pass --credentials or set {WAREHOUSE_URL_ENV}"
        )),
    }
}
