//! # Forum Chat
//!
//! The forum's real-time chat service.
//!
//! This is the application entry point that initializes:
//! - Tracing/logging subsystem
//! - Configuration loading (including `.env`)
//! - Database connection pool and migrations
//! - HTTP/WebSocket server with graceful shutdown

use anyhow::Result;
use tracing::info;

use forum_chat::config::Settings;
use forum_chat::startup::Application;

#[tokio::main]
async fn main() -> Result<()> {
    forum_chat::telemetry::init_tracing();

    info!("Starting forum chat...");

    let settings = Settings::load()?;
    info!(
        host = %settings.server.host,
        port = %settings.server.port,
        environment = %settings.environment,
        history_limit = settings.chat.history_limit,
        "Configuration loaded"
    );

    let application = Application::build(settings).await?;

    info!("Server ready to accept connections");
    application.run_until_stopped().await?;

    Ok(())
}
