mod config;
mod error;
mod ledger;
mod post;
mod routes;
mod seed;
mod store;
mod user;
mod utils;


use std::{error::Error, sync::Arc};

use config::Config;
use ledger::Ledger;
use log::{error, info};
use store::{MemoryStore, SqliteStore, Store};
use tokio::{net::TcpListener, signal};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = Config::parse();
    config.init_logger();
    info!("# MicroBlog #");
    info!("");

    if config.memory() {
        info!("Using in-memory store");
        serve(&config, MemoryStore::new()).await
    } else {
        let store = unit_short!("Opening database", SqliteStore::open(config.database())?);
        serve(&config, store).await
    }
}

async fn serve<S: Store>(config: &Config, store: S) -> Result<(), Box<dyn Error>> {
    let ledger = Arc::new(Ledger::new(store));
    if config.seed() {
        unit_short!("Populating sample data", seed::populate(&*ledger)?);
    }

    let app = routes::router(ledger, config.order());

    let address = config.address();
    let listener = TcpListener::bind(address).await?;
    info!("Server running on http://{}", address);
    info!("Default ranking: {}", config.order());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await
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
