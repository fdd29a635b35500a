//! tablegate CLI
//!
//! Serves read-only HTTP access to an allow-listed set of tables, or checks a
//! configuration against the backing store without serving.

mod commands;

use clap::{Parser, Subcommand};
use commands::{CheckCommand, ServeCommand};
use tracing_subscriber::{layer::SubscriberExt, Layer};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "TABLEGATE_LOG_LEVEL", global = true)]
    log_level: String,

    /// Log format: compact, full
    #[arg(
        long,
        default_value = "compact",
        env = "TABLEGATE_LOG_FORMAT",
        global = true
    )]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve(ServeCommand),
    /// Validate configuration and probe the backend, then exit
    Check(CheckCommand),
}

fn log_filter(level: &str) -> anyhow::Result<tracing_subscriber::EnvFilter> {
    // RUST_LOG wins when set
    if std::env::var("RUST_LOG").is_ok() {
        return tracing_subscriber::EnvFilter::try_from_default_env()
            .map_err(|e| anyhow::anyhow!("Invalid RUST_LOG environment variable: {}", e));
    }

    tracing_subscriber::EnvFilter::try_new(format!(
        "tablegate={level},\
         tablegate_core={level},\
         tablegate_gateway={level},\
         tablegate_query={level},\
         tablegate_query_postgres={level},\
         tablegate_query_postgrest={level},\
         tower_http={level},\
         sqlx=warn,\
         sea_orm=warn,\
         h2=warn,\
         tower=warn,\
         hyper=warn,\
         reqwest=warn,\
         rustls=warn",
        level = level
    ))
    .map_err(|e| anyhow::anyhow!("Invalid log level '{}': {}", level, e))
}

fn init_tracing(level: &str, format: &str) -> anyhow::Result<()> {
    let filter = log_filter(level)?;

    let fmt_layer = match format {
        "full" => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
        _ => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed(),
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to set global default subscriber: {}", e))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, &cli.log_format)?;

    match cli.command {
        Commands::Serve(serve_cmd) => serve_cmd.execute(),
        Commands::Check(check_cmd) => check_cmd.execute(),
    }
}
