use std::env;
use std::fmt;

use catalog::rest::{DEFAULT_POINTS_TABLE, DEFAULT_SETTINGS_TABLE, RestConfig};
use scene::{MAX_ZOOM, MIN_ZOOM, ZoomLimits};

#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{key} is not set"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rest: RestConfig,
    pub credentials: Option<Credentials>,
    pub zoom_limits: ZoomLimits,
}

impl AppConfig {
    /// Command-line values win over the environment.
    pub fn load(api_url: Option<String>, api_key: Option<String>) -> Result<Self, ConfigError> {
        let api_url = api_url
            .or_else(|| env::var("CAMPSITES_API_URL").ok())
            .ok_or(ConfigError::Missing("CAMPSITES_API_URL"))?;
        let api_key = api_key
            .or_else(|| env::var("CAMPSITES_API_KEY").ok())
            .ok_or(ConfigError::Missing("CAMPSITES_API_KEY"))?;

        let mut rest = RestConfig::new(api_url, api_key);
        rest.points_table = env_var_string("CAMPSITES_POINTS_TABLE", DEFAULT_POINTS_TABLE);
        rest.settings_table = env_var_string("CAMPSITES_SETTINGS_TABLE", DEFAULT_SETTINGS_TABLE);

        let credentials = match (env::var("CAMPSITES_EMAIL"), env::var("CAMPSITES_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(Credentials { email, password }),
            _ => None,
        };

        Ok(Self {
            rest,
            credentials,
            zoom_limits: ZoomLimits::new(
                env_var_f64("CAMPSITES_MIN_ZOOM", MIN_ZOOM),
                env_var_f64("CAMPSITES_MAX_ZOOM", MAX_ZOOM),
            ),
        })
    }
}

fn env_var_string(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_var_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
