//! Server configuration.
//!
//! ```toml
//! bind = "0.0.0.0:3000"
//!
//! # Status sent when a request halts without supplying a response.
//! # Leave unset to treat such requests as unhandled failures.
//! halt_status = 204
//!
//! catch_all = true
//! request_timeout_ms = 30000
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::concern::Concern;
use crate::error::ConfigError;
use crate::middleware;

/// Transport-level settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Response status for requests that halt with no response of their own.
    ///
    /// When unset, such requests are logged as unhandled and answered with a
    /// bare `500`.
    #[serde(default)]
    pub halt_status: Option<u16>,

    /// Whether the concern returned by
    /// [`error_handling`](ServerConfig::error_handling) converts failures into
    /// `500` responses.
    #[serde(default)]
    pub catch_all: bool,

    /// Deadline for a whole pipeline run, applied by the application through
    /// [`middleware::timeout`](crate::middleware::timeout).
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_owned()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            halt_status: None,
            catch_all: false,
            request_timeout_ms: None,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - the TOML is invalid
    /// - `bind` is not a `host:port` socket address
    /// - `halt_status` is not a valid HTTP status code
    /// - `request_timeout_ms` is zero
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.socket_addr()?;
        self.halt_status()?;
        if self.request_timeout_ms == Some(0) {
            return Err(ConfigError::Validation("request_timeout_ms must be positive".into()));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .parse()
            .map_err(|_| ConfigError::Validation(format!("invalid bind address `{}`", self.bind)))
    }

    pub fn halt_status(&self) -> Result<Option<StatusCode>, ConfigError> {
        self.halt_status
            .map(|code| {
                StatusCode::from_u16(code)
                    .map_err(|_| ConfigError::Validation(format!("invalid halt_status {code}")))
            })
            .transpose()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// The `ErrorHandling` concern: [`middleware::catch_all`] in the mode
    /// `catch_all` selects, then [`middleware::timeout`] when
    /// `request_timeout_ms` is set. Include it in the application's base
    /// controller.
    pub fn error_handling(&self) -> Concern {
        let concern = Concern::new("ErrorHandling").around(middleware::catch_all(self.catch_all));
        match self.request_timeout() {
            Some(limit) => concern.around(middleware::timeout(limit)),
            None => concern,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concern::Controller;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.halt_status().unwrap(), None);
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn full_toml() {
        let config = ServerConfig::from_toml(
            r#"
            bind = "127.0.0.1:8080"
            halt_status = 204
            catch_all = true
            request_timeout_ms = 1500
            "#,
        )
        .unwrap();
        assert_eq!(config.socket_addr().unwrap(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(config.halt_status().unwrap(), Some(StatusCode::NO_CONTENT));
        assert!(config.catch_all);
        assert_eq!(config.request_timeout(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn rejects_bad_status() {
        let err = ServerConfig::from_toml("halt_status = 42").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_bad_bind() {
        let err = ServerConfig::from_toml(r#"bind = "localhost""#).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn rejects_zero_timeout() {
        assert!(ServerConfig::from_toml("request_timeout_ms = 0").is_err());
    }

    async fn boom(_: crate::Context) -> Result<crate::Response, crate::Failure> {
        Err(crate::Failure::new("boom"))
    }

    fn pages(config: &ServerConfig) -> crate::Handlers {
        let pages = Controller::new("pages")
            .include(&config.error_handling())
            .action("show", boom);
        crate::Registry::new().mount(&pages).build().unwrap()
    }

    #[tokio::test]
    async fn error_handling_follows_catch_all() {
        let on = ServerConfig::from_toml("catch_all = true").unwrap();
        let outcome = pages(&on).handle("pages#show", crate::Context::new()).await.unwrap();
        assert_eq!(
            outcome.response().map(crate::Response::status_code),
            Some(StatusCode::INTERNAL_SERVER_ERROR),
        );

        let off = ServerConfig::default();
        let failure = pages(&off).handle("pages#show", crate::Context::new()).await.unwrap_err();
        assert_eq!(failure.message(), "boom");
    }

    #[test]
    fn error_handling_adds_timeout_when_configured() {
        let config = ServerConfig::from_toml("request_timeout_ms = 250").unwrap();
        let handlers = pages(&config);
        assert_eq!(handlers.get("pages#show").unwrap().wrapping_hooks().len(), 2);
        assert_eq!(config.error_handling().name(), "ErrorHandling");
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = ServerConfig::from_toml("bind = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
