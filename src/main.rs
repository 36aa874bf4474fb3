use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use depot_status::config::Config;
use depot_status::handler::StatusHandler;
use depot_status::server::{build_router, AppState};
use depot_status::store::InMemoryStatusStore;
use depot_status::stream::StreamAdapter;
use depot_status::webhook::{HttpRegistryClient, RegistryClient, WebhookDispatcher};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "depot_status=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DEPOT_STATUS_CONFIG").ok());
    let config = match config_path.map(PathBuf::from) {
        Some(path) => match Config::load(&path) {
            Ok(config) => config,
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "failed to load config");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    let store = Arc::new(InMemoryStatusStore::new());
    let registry: Option<Arc<dyn RegistryClient>> = config
        .registry_url
        .as_deref()
        .map(|url| Arc::new(HttpRegistryClient::new(url)) as Arc<dyn RegistryClient>);
    let webhooks = Arc::new(WebhookDispatcher::new(&config.webhooks, registry));
    let handler = Arc::new(StatusHandler::new(store.clone(), webhooks));

    let (tx, rx) = mpsc::channel(1024);
    let cancel = CancellationToken::new();

    let stream = StreamAdapter::with_concurrency(handler, config.stream_concurrency);
    let stream_task = tokio::spawn(stream.run(rx, None, cancel.clone()));

    let app = build_router(AppState::new(store, tx));

    tracing::info!("listening on {}", config.listen);
    let listener = tokio::net::TcpListener::bind(config.listen).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await
        .unwrap();

    // The stream drains in-flight messages before the process exits.
    let _ = stream_task.await;
}

async fn shutdown_signal(cancel: CancellationToken) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutting down");
    cancel.cancel();
}
