//! mailbackup server
//!
//! Main entry point: accepts authenticated uploads and mails them as attachments.

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mailbackup_api::{AppState, create_router};
use mailbackup_shared::{AppConfig, SmtpSettings};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // JSON lines on stdout
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "mailbackup=info,mailbackup_api=info,mailbackup_shared=info,tower_http=info".into()
        }))
        .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stdout))
        .init();

    let config = AppConfig::load()?;

    if config.token.is_none() {
        warn!("TOKEN is not set; every upload will be rejected with 500");
    }
    // SMTP settings are re-read per send; this only surfaces problems early.
    match SmtpSettings::from_env() {
        Ok(settings) => info!(
            smtp_host = %settings.host,
            smtp_port = settings.port,
            encryption = settings.encryption.as_str(),
            "SMTP configured"
        ),
        Err(e) => warn!(error = %e, "SMTP configuration currently unusable"),
    }

    let state = AppState::from_config(&config);
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!(response_format = ?config.response_format, "Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
