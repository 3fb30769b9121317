use std::sync::Arc;

use clap::Parser;
use dotenv::dotenv;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use daybook_server::db;
use daybook_server::server::config::AppConfig;
use daybook_server::web::{create_router, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to listen on, overriding LISTEN_ADDR
    #[arg(short, long)]
    listen: Option<String>,
}

fn init_logging() {
    // Log to a file with daily rotation, and human-readable stdout.
    let file_appender = rolling::daily("logs", "daybook.log");
    let file_layer = fmt::layer().with_writer(file_appender).with_ansi(false);

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx::query=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received, stopping server.");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    init_logging();
    dotenv().ok();

    let config = AppConfig::from_env()?;
    let listen_addr = args.listen.unwrap_or_else(|| config.listen_addr.clone());

    let pool = db::connect(&config.database_url).await?;
    db::init_db(&pool).await?;
    info!("Connected to database at {}", config.database_url);

    let app_state = Arc::new(AppState {
        pool,
        config: Arc::new(config),
    });
    let app = create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    info!("Listening on {}", listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
