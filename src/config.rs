use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::ConfigError;
use crate::exchange::MAX_OPTIMAL_BALANCES;

pub const DEFAULT_DATABASE: &str = "TripSplit";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_OPTIMAL_LIMIT: usize = 16;

/// Service settings, read once from the environment at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub mongodb_uri: String,
    pub database: String,
    pub bind: SocketAddr,
    /// Origins allowed by CORS. Empty allows any origin.
    pub allowed_origins: Vec<String>,
    /// Largest number of open balances the optimal strategy will search.
    pub optimal_limit: usize,
    pub log_json: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mongodb_uri = var("MONGODB_URI").ok_or(ConfigError::Missing("MONGODB_URI"))?;
        let database = var("TRIPSPLIT_DATABASE").unwrap_or_else(|| DEFAULT_DATABASE.to_string());
        let bind = parse(
            "TRIPSPLIT_BIND",
            var("TRIPSPLIT_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
        )?;
        let allowed_origins = var("TRIPSPLIT_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let optimal_limit = match var("TRIPSPLIT_OPTIMAL_LIMIT") {
            Some(value) => {
                let limit: usize = parse("TRIPSPLIT_OPTIMAL_LIMIT", value.clone())?;
                if limit > MAX_OPTIMAL_BALANCES {
                    return Err(ConfigError::Invalid {
                        name: "TRIPSPLIT_OPTIMAL_LIMIT",
                        value,
                    });
                }
                limit
            }
            None => DEFAULT_OPTIMAL_LIMIT,
        };
        let log_json = match var("TRIPSPLIT_LOG_JSON") {
            Some(value) => parse_flag("TRIPSPLIT_LOG_JSON", value)?,
            None => false,
        };

        Ok(Config {
            mongodb_uri,
            database,
            bind,
            allowed_origins,
            optimal_limit,
            log_json,
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_flag(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid { name, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[("MONGODB_URI", "mongodb://localhost:27017")]).unwrap();
        assert_eq!(config.mongodb_uri, "mongodb://localhost:27017");
        assert_eq!(config.database, DEFAULT_DATABASE);
        assert_eq!(config.bind, DEFAULT_BIND.parse().unwrap());
        assert!(config.allowed_origins.is_empty());
        assert_eq!(config.optimal_limit, DEFAULT_OPTIMAL_LIMIT);
        assert!(!config.log_json);
    }

    #[test]
    fn mongodb_uri_is_required() {
        assert_eq!(config(&[]), Err(ConfigError::Missing("MONGODB_URI")));
        assert_eq!(
            config(&[("MONGODB_URI", "  ")]),
            Err(ConfigError::Missing("MONGODB_URI"))
        );
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("MONGODB_URI", "mongodb://db"),
            ("TRIPSPLIT_DATABASE", "Trips"),
            ("TRIPSPLIT_BIND", "127.0.0.1:9000"),
            ("TRIPSPLIT_ALLOWED_ORIGINS", "http://localhost:5173, ,https://trips.example"),
            ("TRIPSPLIT_OPTIMAL_LIMIT", "12"),
            ("TRIPSPLIT_LOG_JSON", "true"),
        ])
        .unwrap();
        assert_eq!(config.database, "Trips");
        assert_eq!(config.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(
            config.allowed_origins,
            vec!["http://localhost:5173", "https://trips.example"]
        );
        assert_eq!(config.optimal_limit, 12);
        assert!(config.log_json);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert_eq!(
            config(&[("MONGODB_URI", "mongodb://db"), ("TRIPSPLIT_OPTIMAL_LIMIT", "many")]),
            Err(ConfigError::Invalid {
                name: "TRIPSPLIT_OPTIMAL_LIMIT",
                value: "many".to_string()
            })
        );
        assert!(config(&[("MONGODB_URI", "mongodb://db"), ("TRIPSPLIT_LOG_JSON", "maybe")]).is_err());
        assert!(config(&[("MONGODB_URI", "mongodb://db"), ("TRIPSPLIT_BIND", "nowhere")]).is_err());
    }

    #[test]
    fn optimal_limit_is_bounded() {
        assert_eq!(
            config(&[("MONGODB_URI", "mongodb://db"), ("TRIPSPLIT_OPTIMAL_LIMIT", "60")]),
            Err(ConfigError::Invalid {
                name: "TRIPSPLIT_OPTIMAL_LIMIT",
                value: "60".to_string()
            })
        );
        let max = MAX_OPTIMAL_BALANCES.to_string();
        let config = config(&[
            ("MONGODB_URI", "mongodb://db"),
            ("TRIPSPLIT_OPTIMAL_LIMIT", max.as_str()),
        ])
        .unwrap();
        assert_eq!(config.optimal_limit, MAX_OPTIMAL_BALANCES);
    }
}
