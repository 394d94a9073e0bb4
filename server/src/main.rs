use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chartnotes_config::AppConfig;
use chartnotes_data::open_backend;
use chartnotes_server::{service_handler, AppState};
use clap::Parser;
use hyper::{server::conn::Http, service::service_fn};
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "chartnotes-server")]
#[command(about = "HTTP API for chart points, notes and settings", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the configured port
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let backend = open_backend(&config.backend_kind())?;
    let state = AppState::new(backend);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_address()))?;
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr} ({} store)", state.backend.name());

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        };
        stream.set_nodelay(true).ok();

        let state = state.clone();
        tokio::spawn(async move {
            let service = service_fn(move |req| service_handler(state.clone(), req));
            if let Err(e) = Http::new().serve_connection(stream, service).await {
                error!("Error serving connection from {peer}: {e:?}");
            }
        });
    }

    Ok(())
}
