use std::{env, fmt::Display, net::SocketAddr, path::PathBuf, str::FromStr};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),

    #[error("invalid {key} value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Only required when serving from or loading into Postgres.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub bind_address: SocketAddr,
    pub secret_key: String,
    pub session_lifetime_hours: i64,
    pub font_path: PathBuf,
    pub media_root: PathBuf,
    pub media_url: String,
}

impl Config {
    /// Reads the process environment, honouring a `.env` file when present.
    pub fn load() -> Result<Self, ConfigError> {
        if dotenv::dotenv().is_ok() {
            log::info!("Loaded environment from .env");
        }
        Self::from_source(|key| env::var(key).ok())
    }

    pub fn from_source<F>(source: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            database_url: source("DATABASE_URL"),
            database_max_connections: try_load(&source, "DATABASE_MAX_CONNECTIONS", "5")?,
            bind_address: try_load(&source, "BIND_ADDRESS", "0.0.0.0:8000")?,
            secret_key: source("SECRET_KEY")
                .filter(|key| !key.is_empty())
                .ok_or(ConfigError::Missing("SECRET_KEY"))?,
            session_lifetime_hours: try_load(&source, "SESSION_LIFETIME_HOURS", "24")?,
            font_path: try_load(&source, "FONT_PATH", "data/fonts/DejaVuSans.ttf")?,
            media_root: try_load(&source, "MEDIA_ROOT", "media")?,
            media_url: try_load(&source, "MEDIA_URL", "/media/")?,
        })
    }

    pub fn require_database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }
}

fn try_load<F, T>(source: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    let value = source(key).unwrap_or_else(|| {
        log::info!("{key} not set, using default: {default}");
        default.to_string()
    });

    match value.parse() {
        Ok(parsed) => Ok(parsed),
        Err(e) => Err(ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::from_source(source(&[("SECRET_KEY", "s")])).unwrap();

        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.bind_address.port(), 8000);
        assert_eq!(config.session_lifetime_hours, 24);
        assert_eq!(config.media_url, "/media/");
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn secret_is_required() {
        let error = Config::from_source(source(&[])).unwrap_err();
        assert!(matches!(error, ConfigError::Missing("SECRET_KEY")));
    }

    #[test]
    fn malformed_values_are_errors() {
        let error = Config::from_source(source(&[
            ("SECRET_KEY", "s"),
            ("DATABASE_MAX_CONNECTIONS", "many"),
        ]))
        .unwrap_err();

        assert!(matches!(
            error,
            ConfigError::Invalid {
                key: "DATABASE_MAX_CONNECTIONS",
                ..
            }
        ));
    }
}
