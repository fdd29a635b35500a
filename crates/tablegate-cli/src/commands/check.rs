use clap::Args;
use tracing::{error, info};

use super::args::{connect_source, GatewayArgs};

/// Validate settings, reach the backend and describe every exposed table
#[derive(Args)]
pub struct CheckCommand {
    #[command(flatten)]
    pub gateway: GatewayArgs,
}

impl CheckCommand {
    pub fn execute(self) -> anyhow::Result<()> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.run())
    }

    async fn run(self) -> anyhow::Result<()> {
        let config = self.gateway.load()?;
        let source = connect_source(&config).await?;

        source
            .ping()
            .await
            .map_err(|e| anyhow::anyhow!("Backend {} is not reachable: {}", config.backend, e))?;
        info!("Backend {} is reachable", config.backend);

        let mut failures = 0usize;
        for table in &config.tables {
            match source.probe_schema(table).await {
                Ok(schema) if schema.columns.is_empty() => {
                    error!("{}: no columns found", table);
                    failures += 1;
                }
                Ok(schema) => {
                    let columns: Vec<&str> =
                        schema.columns.iter().map(|c| c.name.as_str()).collect();
                    info!("{}: {} column(s): {}", table, columns.len(), columns.join(", "));
                }
                Err(e) => {
                    error!("{}: {}", table, e);
                    failures += 1;
                }
            }
        }

        if failures > 0 {
            anyhow::bail!(
                "{} of {} table(s) could not be described",
                failures,
                config.tables.len()
            );
        }

        info!("All {} table(s) are readable", config.tables.len());
        Ok(())
    }
}
