use std::sync::Arc;

use clap::Args;
use tablegate_gateway::{build_application, AppState};
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::args::{connect_source, GatewayArgs};

#[derive(Args)]
pub struct ServeCommand {
    /// Address the HTTP server binds to
    #[arg(long, default_value = "127.0.0.1:8000", env = "TABLEGATE_ADDRESS")]
    pub address: String,

    #[command(flatten)]
    pub gateway: GatewayArgs,
}

impl ServeCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let config = self.gateway.load()?;
        let source = connect_source(&config).await?;

        // The gateway still starts when the store is down; /health reports it
        match source.ping().await {
            Ok(()) => info!("Backend {} is reachable", config.backend),
            Err(e) => warn!("Backend {} is not reachable yet: {}", config.backend, e),
        }

        let state = Arc::new(AppState::new(&config, source));
        let app = build_application(state, &config);

        let listener = TcpListener::bind(&self.address).await?;
        info!(
            "tablegate listening on {} exposing {} table(s)",
            self.address,
            config.tables.len()
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        info!("tablegate server exited");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
    }
}
