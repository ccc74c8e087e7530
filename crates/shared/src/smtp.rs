//! SMTP connection settings and the lettre-backed transport.
//!
//! Settings are read from the unprefixed process environment:
//!
//! | Variable | Required | Description |
//! |----------|----------|-------------|
//! | `MAIL_HOST` | Yes | SMTP server hostname |
//! | `MAIL_PORT` | Yes | Port |
//! | `MAIL_MAIL` | Yes | Username for authentication |
//! | `MAIL_PASS` | Yes | Password for authentication |
//! | `MAIL_FROM` | Yes | Sender address |
//! | `MAIL_TO`   | Yes | Recipient address |
//! | `MAIL_SSL`  | No  | `ssl`/`tls`, `none`/empty, anything else means STARTTLS |

use std::time::Duration;

use async_trait::async_trait;
use lettre::{
    Message,
    transport::smtp::{
        authentication::{Credentials, Mechanism},
        client::{AsyncSmtpConnection, TlsParameters},
        extension::ClientId,
    },
};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::email::MailError;

/// Transport encryption for the SMTP session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encryption {
    /// Implicit TLS from the first byte.
    SslTls,
    /// Plaintext.
    None,
    /// Plaintext upgraded with STARTTLS.
    StartTls,
}

impl Encryption {
    /// Maps the `MAIL_SSL` value to a mode. Matching is case-insensitive.
    #[must_use]
    pub fn from_setting(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "ssl" | "tls" => Self::SslTls,
            "none" | "" => Self::None,
            _ => Self::StartTls,
        }
    }

    /// Short label used in log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SslTls => "ssl/tls",
            Self::None => "none",
            Self::StartTls => "starttls",
        }
    }
}

/// The variables [`SmtpSettings::from_env`] reads, spelled exactly.
const MAIL_VARS: [&str; 7] = [
    "MAIL_HOST",
    "MAIL_PORT",
    "MAIL_MAIL",
    "MAIL_PASS",
    "MAIL_FROM",
    "MAIL_TO",
    "MAIL_SSL",
];

/// Same as lettre's transport default.
const SMTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Raw `MAIL_*` values as they come out of the environment.
#[derive(Debug, Default, Deserialize)]
struct MailEnv {
    #[serde(default)]
    mail_host: String,
    #[serde(default)]
    mail_port: String,
    #[serde(default)]
    mail_mail: String,
    #[serde(default)]
    mail_pass: String,
    #[serde(default)]
    mail_from: String,
    #[serde(default)]
    mail_to: String,
    #[serde(default)]
    mail_ssl: String,
}

/// Resolved SMTP parameters for a single send.
#[derive(Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    /// Server hostname.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Auth username.
    pub username: String,
    /// Auth password.
    pub password: String,
    /// Envelope and header `From`.
    pub from: String,
    /// Single recipient.
    pub to: String,
    /// Transport encryption.
    pub encryption: Encryption,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("encryption", &self.encryption)
            .finish()
    }
}

impl SmtpSettings {
    /// Reads settings from the process environment.
    ///
    /// Only the upper-case `MAIL_*` names count; `mail_host` and friends are
    /// ignored.
    pub fn from_env() -> Result<Self, MailError> {
        let vars: config::Map<String, String> = MAIL_VARS
            .into_iter()
            .filter_map(|name| std::env::var(name).ok().map(|value| (name.to_string(), value)))
            .collect();

        Self::from_environment(config::Environment::default().source(Some(vars)))
    }

    /// Reads settings from the given environment source.
    ///
    /// Tests pass `Environment::default().source(Some(map))` to avoid touching
    /// the real process environment.
    pub fn from_environment(env: config::Environment) -> Result<Self, MailError> {
        let raw: MailEnv = config::Config::builder()
            .add_source(env)
            .build()
            .and_then(|config| config.try_deserialize::<MailEnv>())
            .map_err(MailError::Config)?;

        Self::resolve(raw)
    }

    fn resolve(raw: MailEnv) -> Result<Self, MailError> {
        let missing: Vec<&'static str> = [
            ("MAIL_HOST", &raw.mail_host),
            ("MAIL_PORT", &raw.mail_port),
            ("MAIL_MAIL", &raw.mail_mail),
            ("MAIL_PASS", &raw.mail_pass),
            ("MAIL_FROM", &raw.mail_from),
            ("MAIL_TO", &raw.mail_to),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(MailError::IncompleteConfig(missing));
        }

        let port = raw.mail_port.parse::<u16>().map_err(MailError::InvalidPort)?;

        Ok(Self {
            host: raw.mail_host,
            port,
            username: raw.mail_mail,
            password: raw.mail_pass,
            from: raw.mail_from,
            to: raw.mail_to,
            encryption: Encryption::from_setting(&raw.mail_ssl),
        })
    }
}

/// Opens SMTP sessions.
#[async_trait]
pub trait SmtpConnector: Send + Sync {
    /// Connects to the server described by `settings`.
    async fn connect(&self, settings: &SmtpSettings) -> Result<Box<dyn SmtpSession>, MailError>;
}

/// An open SMTP session, owned by a single send.
#[async_trait]
pub trait SmtpSession: Send {
    /// Sends one message.
    async fn send(&mut self, message: Message) -> Result<(), MailError>;

    /// Releases the session. Called exactly once per connected session.
    async fn close(&mut self);
}

/// Real connector holding one lettre SMTP connection per session.
#[derive(Debug, Clone, Copy, Default)]
pub struct LettreConnector;

/// TLS parameters for the handshake on connect and for a STARTTLS upgrade.
struct TlsPlan {
    implicit: Option<TlsParameters>,
    starttls: Option<TlsParameters>,
}

impl LettreConnector {
    fn tls_plan(settings: &SmtpSettings) -> Result<TlsPlan, MailError> {
        let params = || TlsParameters::new(settings.host.clone()).map_err(connect_error);

        Ok(match settings.encryption {
            Encryption::SslTls => TlsPlan {
                implicit: Some(params()?),
                starttls: None,
            },
            Encryption::StartTls => TlsPlan {
                implicit: None,
                starttls: Some(params()?),
            },
            Encryption::None => TlsPlan {
                implicit: None,
                starttls: None,
            },
        })
    }

    async fn negotiate(
        connection: &mut AsyncSmtpConnection,
        settings: &SmtpSettings,
        hello: &ClientId,
        starttls: Option<TlsParameters>,
    ) -> Result<(), MailError> {
        if let Some(params) = starttls {
            connection
                .starttls(params, hello)
                .await
                .map_err(connect_error)?;
        }

        let credentials = Credentials::new(settings.username.clone(), settings.password.clone());
        connection
            .auth(&[Mechanism::Plain, Mechanism::Login], &credentials)
            .await
            .map_err(connect_error)?;
        Ok(())
    }
}

fn connect_error(err: lettre::transport::smtp::Error) -> MailError {
    MailError::ConnectError(err.to_string())
}

#[async_trait]
impl SmtpConnector for LettreConnector {
    async fn connect(&self, settings: &SmtpSettings) -> Result<Box<dyn SmtpSession>, MailError> {
        let plan = Self::tls_plan(settings)?;
        let hello = ClientId::default();

        let mut connection = AsyncSmtpConnection::connect_tokio1(
            (settings.host.as_str(), settings.port),
            Some(SMTP_TIMEOUT),
            &hello,
            plan.implicit,
            None,
        )
        .await
        .map_err(connect_error)?;

        if let Err(e) = Self::negotiate(&mut connection, settings, &hello, plan.starttls).await {
            connection.abort().await;
            return Err(e);
        }
        debug!(encrypted = connection.is_encrypted(), "SMTP session ready");

        Ok(Box::new(LettreSession {
            connection: Some(connection),
        }))
    }
}

struct LettreSession {
    connection: Option<AsyncSmtpConnection>,
}

#[async_trait]
impl SmtpSession for LettreSession {
    async fn send(&mut self, message: Message) -> Result<(), MailError> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(MailError::SendError("session already closed".to_string()));
        };

        connection
            .send(message.envelope(), &message.formatted())
            .await
            .map_err(|e| MailError::SendError(e.to_string()))?;
        Ok(())
    }

    async fn close(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            warn!("SMTP session closed twice");
            return;
        };

        // lettre aborts the connection itself after a failed command.
        if connection.has_broken() {
            return;
        }
        if let Err(e) = connection.quit().await {
            warn!(error = %e, "SMTP QUIT failed, dropping connection");
            connection.abort().await;
        }
    }
}
