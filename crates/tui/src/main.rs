mod app;
mod input;

use anyhow::Result;
use std::{
    fs::{self, OpenOptions},
    sync::Arc,
};

use holdings_core::{
    api::{ApiClient, HttpTransport},
    config::{self, AppConfig},
    holdings::HoldingsStore,
    notify::{Notification, NotificationSink},
    routes::{RouteGuard, Router},
    session::{FileSessionPersistence, SessionStore},
};
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    init_logging()?;

    config::ensure_default_config()?;
    let config = AppConfig::load()?;
    let transport = HttpTransport::new(&config)?;
    info!(api = %transport.base_url(), "Starting holdings client");
    let api = ApiClient::new(Arc::new(transport));
    let persistence = FileSessionPersistence::new(config.session_file.clone());
    let session = Arc::new(SessionStore::new(api.clone(), Arc::new(persistence)));

    let (notify_tx, notify_rx) = mpsc::unbounded_channel::<Notification>();
    let notifier: Arc<dyn NotificationSink> = Arc::new(notify_tx);
    let store = Arc::new(HoldingsStore::new(api, notifier.clone()));
    let router = Router::new(RouteGuard::new(session.clone()));

    let start_path = std::env::args().nth(1).unwrap_or_else(|| "app".to_string());
    let mut app = app::HoldingsApp::new(session, store, router, notifier, notify_rx);
    app.run(&start_path).await
}

fn init_logging() -> Result<()> {
    let log_dir = std::env::current_dir()?.join("logs");
    fs::create_dir_all(&log_dir)?;
    let log_path = log_dir.join("holdings.log");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(move || {
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(&log_path)
                .expect("failed to open log file")
        });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .init();

    Ok(())
}
