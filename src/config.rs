// src/config.rs

use std::{env, str::FromStr, time::Duration};

use dotenvy::dotenv;
use url::Url;

/// Deployment environment. Only `Production` changes runtime behaviour
/// (session cookies get the `Secure` attribute).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Development,
    Staging,
    Production,
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(AppEnv::Development),
            "staging" => Ok(AppEnv::Staging),
            "production" => Ok(AppEnv::Production),
            other => Err(format!(
                "APP_ENV must be one of development, staging, production (got '{}')",
                other
            )),
        }
    }
}

/// Credentials for the external chat service. Absent means chat sync is disabled.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When unset the server runs on the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// Upper bound for every single store call.
    pub store_timeout: Duration,
    pub jwt_secret: String,
    /// Session lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub app_env: AppEnv,
    pub port: u16,
    pub cors_origins: Vec<String>,
    pub stream: Option<StreamConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());

        let jwt_secret = env::var("JWT_SECRET").expect("JWT_SECRET must be set");

        let jwt_expiration = parse_or("JWT_EXPIRATION", 7 * 24 * 60 * 60);
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", 10);
        let store_timeout = Duration::from_secs(parse_or("STORE_TIMEOUT_SECS", 3));
        let port = parse_or("PORT", 4000);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let app_env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .parse::<AppEnv>()
            .unwrap_or_else(|e| panic!("{}", e));

        let cors_origins = env::var("CORS_ORIGINS")
            .map(|raw| parse_origins(&raw))
            .unwrap_or_else(|_| Ok(vec!["http://localhost:5173".to_string()]))
            .unwrap_or_else(|e| panic!("{}", e));

        let stream = match (env::var("STREAM_API_KEY"), env::var("STREAM_API_SECRET")) {
            (Ok(api_key), Ok(api_secret)) if !api_key.is_empty() && !api_secret.is_empty() => {
                Some(StreamConfig {
                    api_key,
                    api_secret,
                })
            }
            _ => None,
        };

        Self {
            database_url,
            db_max_connections,
            store_timeout,
            jwt_secret,
            jwt_expiration,
            rust_log,
            app_env,
            port,
            cors_origins,
            stream,
        }
    }

    pub fn is_production(&self) -> bool {
        self.app_env == AppEnv::Production
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{} has an invalid value: '{}'", key, raw)),
        Err(_) => default,
    }
}

/// Splits a comma separated origin list, rejecting anything that is not a URL.
pub fn parse_origins(raw: &str) -> Result<Vec<String>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|origin| {
            Url::parse(origin)
                .map(|_| origin.trim_end_matches('/').to_string())
                .map_err(|_| format!("Each CORS_ORIGINS item must be a valid url (got '{}')", origin))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origins_are_split_and_validated() {
        let origins = parse_origins("http://localhost:5173, https://app.example.com/").unwrap();
        assert_eq!(origins, vec!["http://localhost:5173", "https://app.example.com"]);

        assert!(parse_origins("http://ok.dev,not a url").is_err());
    }

    #[test]
    fn app_env_parses_known_values_only() {
        assert_eq!("production".parse::<AppEnv>(), Ok(AppEnv::Production));
        assert!("prod".parse::<AppEnv>().is_err());
    }
}
