//! # Configuration
//!
//! Service settings come from three places, later ones winning:
//!
//! 1. Compiled defaults
//! 2. A TOML file (`bizdash.toml` unless `--config` names another)
//! 3. Environment variables
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! api_key = "change-me"
//! cors_origins = ["https://dash.example.com"]
//! rate_limit = 100
//!
//! [navigation]
//! sign_in_route = "/login"
//! default_route = "/dashboard"
//!
//! [[routes]]
//! path = "/reports"
//! resource = "dashboard"
//! action = "view"
//! ```
//!
//! A non-empty `[[routes]]` list replaces the compiled route table entirely.
//!
//! ## Environment Overrides
//!
//! - `BIZDASH_API_KEY`: API key required on every request except `/health`
//! - `BIZDASH_CORS_ORIGINS`: comma-separated origins, or `*` for all
//! - `BIZDASH_RATE_LIMIT`: requests per second, `0` disables limiting

use bizdash_core::primitives::{DEFAULT_ROUTE, SIGN_IN_ROUTE};
use bizdash_core::{Action, DashError, RouteEntry, RouteTable};
use serde::Deserialize;
use std::path::Path;

/// File read when `--config` is not given. Its absence is not an error.
pub const DEFAULT_CONFIG_FILE: &str = "bizdash.toml";

pub const API_KEY_ENV: &str = "BIZDASH_API_KEY";
pub const CORS_ORIGINS_ENV: &str = "BIZDASH_CORS_ORIGINS";
pub const RATE_LIMIT_ENV: &str = "BIZDASH_RATE_LIMIT";

/// Default rate limit in requests per second.
pub const DEFAULT_RATE_LIMIT: u32 = 100;

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` (or empty) disables API key authentication.
    pub api_key: Option<String>,
    /// `None` means localhost only; `["*"]` allows every origin.
    pub cors_origins: Option<Vec<String>>,
    /// Requests per second; `0` disables rate limiting.
    pub rate_limit: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            api_key: None,
            cors_origins: None,
            rate_limit: DEFAULT_RATE_LIMIT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavigationConfig {
    pub sign_in_route: String,
    pub default_route: String,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            sign_in_route: SIGN_IN_ROUTE.to_string(),
            default_route: DEFAULT_ROUTE.to_string(),
        }
    }
}

/// One `[[routes]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub path: String,
    pub resource: String,
    pub action: Action,
}

// =============================================================================
// CONFIG
// =============================================================================

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub navigation: NavigationConfig,
    pub routes: Vec<RouteConfig>,
}

impl Config {
    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, DashError> {
        toml::from_str(text).map_err(|e| DashError::Config(format!("invalid config: {}", e)))
    }

    /// Read a config file.
    ///
    /// An explicitly named file must exist. Without one, `bizdash.toml` in
    /// the working directory is used if present, defaults otherwise.
    pub fn load(explicit: Option<&Path>) -> Result<Self, DashError> {
        let path = match explicit {
            Some(path) => path,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = std::fs::read_to_string(path).map_err(|e| {
            DashError::Io(format!("cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// [`Config::load`] followed by the process environment.
    pub fn load_with_env(explicit: Option<&Path>) -> Result<Self, DashError> {
        let mut config = Self::load(explicit)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment-style overrides read through `lookup`.
    ///
    /// Empty values are ignored; an unparsable rate limit is logged and
    /// ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(API_KEY_ENV) {
            self.server.api_key = Some(key);
        }
        if let Some(origins) = get(CORS_ORIGINS_ENV) {
            self.server.cors_origins = Some(
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
            );
        }
        if let Some(raw) = get(RATE_LIMIT_ENV) {
            match raw.trim().parse() {
                Ok(rps) => self.server.rate_limit = rps,
                Err(_) => tracing::warn!("Ignoring {}={:?}: not a number", RATE_LIMIT_ENV, raw),
            }
        }
    }

    /// The configured API key, if authentication is on.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.server
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
    }

    /// `host:port` for the listener.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// The route-permission table: the `[[routes]]` list when given, the
    /// compiled table otherwise. Duplicate paths are a config error.
    pub fn route_table(&self) -> Result<RouteTable, DashError> {
        if self.routes.is_empty() {
            return Ok(RouteTable::builtin());
        }
        RouteTable::new(
            self.routes
                .iter()
                .map(|r| RouteEntry::new(r.path.clone(), r.resource.clone(), r.action))
                .collect(),
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").expect("parse");
        assert_eq!(config, Config::default());
        assert_eq!(config.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.navigation.sign_in_route, "/login");
        assert!(config.api_key().is_none());
    }

    #[test]
    fn sections_parse() {
        let config = Config::from_toml_str(
            r#"
            [server]
            port = 9000
            api_key = "k"
            cors_origins = ["https://dash.example.com"]
            rate_limit = 0

            [navigation]
            default_route = "/home"

            [[routes]]
            path = "/reports"
            resource = "dashboard"
            action = "view"
            "#,
        )
        .expect("parse");

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.api_key(), Some("k"));
        assert_eq!(config.server.rate_limit, 0);
        assert_eq!(config.navigation.default_route, "/home");
        assert_eq!(config.navigation.sign_in_route, "/login");

        let table = config.route_table().expect("table");
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.lookup("/reports").map(|r| r.action),
            Some(Action::View)
        );
        assert!(table.lookup("/products").is_none());
    }

    #[test]
    fn unknown_keys_and_actions_are_rejected() {
        assert!(Config::from_toml_str("[server]\nprot = 1").is_err());
        assert!(
            Config::from_toml_str("[[routes]]\npath=\"/x\"\nresource=\"x\"\naction=\"approve\"")
                .is_err()
        );
    }

    #[test]
    fn duplicate_route_is_a_config_error() {
        let config = Config::from_toml_str(
            r#"
            [[routes]]
            path = "/a"
            resource = "x"
            action = "view"

            [[routes]]
            path = "/a/"
            resource = "y"
            action = "edit"
            "#,
        )
        .expect("parse");
        assert!(matches!(config.route_table(), Err(DashError::Config(_))));
    }

    #[test]
    fn no_routes_means_builtin_table() {
        let table = Config::default().route_table().expect("table");
        assert_eq!(table, RouteTable::builtin());
    }

    #[test]
    fn overrides_win_over_file() {
        let mut config = Config::from_toml_str("[server]\napi_key = \"file\"\nrate_limit = 5")
            .expect("parse");
        let env: BTreeMap<&str, &str> = [
            (API_KEY_ENV, "env"),
            (CORS_ORIGINS_ENV, "http://a.test, ,http://b.test"),
            (RATE_LIMIT_ENV, "fast"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_key(), Some("env"));
        assert_eq!(
            config.server.cors_origins,
            Some(vec!["http://a.test".to_string(), "http://b.test".to_string()])
        );
        // Unparsable value leaves the file setting alone.
        assert_eq!(config.server.rate_limit, 5);
    }

    #[test]
    fn empty_api_key_disables_auth() {
        let mut config = Config::default();
        config.server.api_key = Some(String::new());
        assert!(config.api_key().is_none());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("nope.toml");
        assert!(matches!(Config::load(Some(&missing)), Err(DashError::Io(_))));

        let present = dir.path().join("bizdash.toml");
        std::fs::write(&present, "[server]\nport = 7000\n").expect("write");
        assert_eq!(Config::load(Some(&present)).expect("load").server.port, 7000);
    }
}
