use crate::config::Settings;
use crate::proxy::RelayService;
use crate::Result;
use axum::Router;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, instrument};

/// Main application struct that owns the listener and the relay router
pub struct Application {
    settings: Settings,
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the relay and bind its listener
    ///
    /// Port 0 binds an ephemeral port; see [`Application::local_addr`].
    #[instrument(skip(settings), fields(address = %settings.bind_address()))]
    pub async fn build(settings: Settings) -> Result<Self> {
        let relay_config = settings.relay_config()?;
        let signing_enabled = relay_config.credentials.is_some();
        let router = RelayService::new(relay_config)?.into_router();

        let listener = TcpListener::bind(settings.bind_address()).await?;

        info!(
            upstream = %settings.binance.base_url,
            signing_enabled,
            "Relay application built"
        );

        Ok(Self {
            settings,
            listener,
            router,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    #[instrument(skip(self))]
    pub async fn run(self) -> Result<()> {
        info!(
            "Starting Binance relay on {} ({})",
            self.local_addr()?,
            self.settings.application.environment
        );

        axum::serve(self.listener, self.router).await?;

        Ok(())
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
