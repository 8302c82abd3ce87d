//! Application Startup
//!
//! Application building, server initialization and graceful shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::{ChatService, TokenVerifier};
use crate::config::Settings;
use crate::domain::{ChatMessageRepository, UserDirectory};
use crate::infrastructure::database;
use crate::infrastructure::repositories::{PgChatMessageRepository, PgUserDirectory};
use crate::presentation::http::handlers::health;
use crate::presentation::http::routes;
use crate::presentation::websocket::ChatHub;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub chat: ChatHub,
    pub auth: TokenVerifier,
    pub settings: Arc<Settings>,
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
    chat: ChatHub,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        let db = database::create_pool(&settings.database).await?;
        tracing::info!("Database connection pool created");

        if settings.database.run_migrations {
            database::run_migrations(&db).await?;
            tracing::info!("Database migrations applied");
        }

        let messages: Arc<dyn ChatMessageRepository> =
            Arc::new(PgChatMessageRepository::new(db.clone()));
        let users: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(db.clone()));

        Self::build_with(settings, db, messages, users).await
    }

    /// Build around explicit data access collaborators.
    pub async fn build_with(
        settings: Settings,
        db: PgPool,
        messages: Arc<dyn ChatMessageRepository>,
        users: Arc<dyn UserDirectory>,
    ) -> Result<Self> {
        let service = ChatService::new(messages, users, &settings.chat);
        let chat = ChatHub::new(service, settings.chat.clone());

        let state = AppState {
            db,
            chat: chat.clone(),
            auth: TokenVerifier::new(settings.jwt.clone()),
            settings: Arc::new(settings.clone()),
        };
        let router = routes::create_router(state);

        let listener = TcpListener::bind(settings.server_addr()).await?;
        tracing::info!(addr = %listener.local_addr()?, "Listening");
        health::init_server_start();

        Ok(Self {
            listener,
            router,
            chat,
        })
    }

    /// Run the server until SIGINT or SIGTERM
    pub async fn run_until_stopped(self) -> Result<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run the server until `signal` resolves, then drain chat sessions
    /// before the listener closes.
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let chat = self.chat.clone();
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                signal.await;
                tracing::info!("Shutdown signal received");
                if !chat.shutdown().await {
                    tracing::warn!("Closing with chat sessions still open");
                }
            })
            .await?;

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn chat(&self) -> &ChatHub {
        &self.chat
    }

    /// A handle to the router, sharing this application's state
    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
