//! Application configuration management.
//!
//! Startup settings come from `config/default`, `config/{RUN_MODE}` and
//! `MAILBACKUP__*` environment variables. The bearer secret is the bare
//! `TOKEN` variable. SMTP parameters are not part of this struct: they are
//! re-read on every send, see [`crate::smtp::SmtpSettings`].

use serde::Deserialize;

/// Environment variable holding the bearer secret.
pub const TOKEN_VAR: &str = "TOKEN";

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Shape of upload responses.
    #[serde(default)]
    pub response_format: ResponseFormat,
    /// Shared secret expected after `Bearer `. `None` when `TOKEN` is unset.
    #[serde(default)]
    pub token: Option<String>,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// How the upload endpoint renders its responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// `{code, msg, data}` envelope.
    #[default]
    Json,
    /// Bare confirmation phrase or `msg: detail`.
    Plain,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let token = std::env::var(TOKEN_VAR).ok().filter(|t| !t.is_empty());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("MAILBACKUP").separator("__"))
            .set_override_option("token", token)?
            .build()?;

        config.try_deserialize()
    }

    /// Returns the socket address string the server binds to.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_defaults() {
        temp_env::with_vars(
            [
                (TOKEN_VAR, None::<&str>),
                ("MAILBACKUP__SERVER__PORT", None),
                ("MAILBACKUP__RESPONSE_FORMAT", None),
            ],
            || {
                let config = AppConfig::load().expect("config");
                assert_eq!(config.bind_addr(), "0.0.0.0:8080");
                assert_eq!(config.response_format, ResponseFormat::Json);
                assert!(config.token.is_none());
            },
        );
    }

    #[test]
    fn test_load_reads_token_and_overrides() {
        temp_env::with_vars(
            [
                (TOKEN_VAR, Some("s3cret")),
                ("MAILBACKUP__SERVER__PORT", Some("9000")),
                ("MAILBACKUP__RESPONSE_FORMAT", Some("plain")),
            ],
            || {
                let config = AppConfig::load().expect("config");
                assert_eq!(config.token.as_deref(), Some("s3cret"));
                assert_eq!(config.server.port, 9000);
                assert_eq!(config.response_format, ResponseFormat::Plain);
            },
        );
    }

    #[test]
    fn test_empty_token_counts_as_unset() {
        temp_env::with_var(TOKEN_VAR, Some(""), || {
            let config = AppConfig::load().expect("config");
            assert!(config.token.is_none());
        });
    }
}
