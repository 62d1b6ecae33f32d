use core::fmt::{Debug, Display};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "hackmatch.toml";
pub const ENV_PREFIX: &str = "HACKMATCH_";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct TeamConfig {
    /// Capacity of a team that is not linked to a hackathon and did not ask for one.
    pub default_max_members: u32,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            default_max_members: 5,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub listen: SocketAddr,
    /// Without a database url everything is kept in memory.
    pub database_url: Option<String>,
    pub log_filter: String,
    pub cors_origins: Vec<String>,
    pub teams: TeamConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 5000)),
            database_url: None,
            log_filter: "info,tower_http=debug".to_owned(),
            cors_origins: Vec::new(),
            teams: TeamConfig::default(),
        }
    }
}

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Figment(#[from] Box<figment::Error>),
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

pub fn figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(CONFIG_FILE))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn get_config() -> Result<Config, ConfigError> {
    figment().extract().map_err(|error| Box::new(error).into())
}

#[cfg(test)]
mod tests {
    use figment::Jail;

    use super::*;

    #[test]
    fn defaults_without_file_or_env() {
        Jail::expect_with(|_jail| {
            let config = get_config().map_err(|error| error.to_string())?;
            assert_eq!(config, Config::default());
            assert_eq!(config.teams.default_max_members, 5);
            Ok(())
        });
    }

    #[test]
    fn env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                CONFIG_FILE,
                r#"
                listen = "127.0.0.1:8080"
                database_url = "postgres://localhost/hackmatch"

                [teams]
                default_max_members = 4
                "#,
            )?;
            jail.set_env("HACKMATCH_TEAMS__DEFAULT_MAX_MEMBERS", "6");
            jail.set_env("HACKMATCH_LOG_FILTER", "debug");

            let config = get_config().map_err(|error| error.to_string())?;
            assert_eq!(config.listen.port(), 8080);
            assert_eq!(
                config.database_url.as_deref(),
                Some("postgres://localhost/hackmatch")
            );
            assert_eq!(config.teams.default_max_members, 6);
            assert_eq!(config.log_filter, "debug");
            Ok(())
        });
    }

    #[test]
    fn malformed_listen_address_is_an_error() {
        Jail::expect_with(|jail| {
            jail.set_env("HACKMATCH_LISTEN", "not an address");
            assert!(get_config().is_err());
            Ok(())
        });
    }
}
