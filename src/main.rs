use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use job_sheet_bot::app_state::AppState;
use job_sheet_bot::config::{AppConfig, SheetBackend};
use job_sheet_bot::routes;
use job_sheet_bot::services::{
    extractor::FieldExtractor,
    line::{LineMessagingClient, LogOnlyNotifier, ReplyNotifier},
    memory_store::MemorySheetStore,
    sheets::{GoogleSheetsClient, SheetStore, SheetsAuth, ServiceAccountKey},
    signature::SignatureVerifier,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing job-sheet-bot server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!("webhook_requests_total", "Webhook deliveries received");
    metrics::describe_counter!(
        "webhook_rejected_total",
        "Webhook deliveries rejected for a missing or invalid signature"
    );
    metrics::describe_counter!("webhook_events_total", "Text message events processed");
    metrics::describe_counter!("sheet_writes_total", "Rows written to the sheet, by operation");
    metrics::describe_counter!("sheet_errors_total", "Failed sheet reads or writes");
    metrics::describe_counter!("reply_failures_total", "Replies that could not be delivered");

    let extractor = FieldExtractor::new().expect("Failed to compile field patterns");

    // Initialize the sheet client. It lives until the server shuts down.
    let store: Arc<dyn SheetStore> = match config.sheet_backend {
        SheetBackend::Google => {
            tracing::info!(sheet = %config.sheet_name, "Initializing Google Sheets client");
            let credentials = config
                .google_credentials_json
                .as_deref()
                .expect("GOOGLE_CREDENTIALS_JSON is checked at config load");
            let spreadsheet_id = config
                .spreadsheet_id
                .as_deref()
                .expect("SPREADSHEET_ID is checked at config load");
            let key = ServiceAccountKey::from_json(credentials)
                .expect("Failed to parse Google service account credentials");
            let client = GoogleSheetsClient::new(
                &config.sheets_api_base,
                spreadsheet_id,
                &config.sheet_name,
                config.sheet_gid,
                SheetsAuth::ServiceAccount(key),
            )
            .expect("Failed to initialize Google Sheets client");
            Arc::new(client)
        }
        SheetBackend::Memory => {
            tracing::warn!("Using in-memory sheet; rows are lost on restart");
            Arc::new(MemorySheetStore::new())
        }
    };

    let notifier: Arc<dyn ReplyNotifier> = if config.replies_enabled {
        tracing::info!("Initializing LINE messaging client");
        Arc::new(
            LineMessagingClient::new(&config.line_api_base, &config.line_channel_access_token)
                .expect("Failed to initialize LINE messaging client"),
        )
    } else {
        tracing::info!("Replies disabled");
        Arc::new(LogOnlyNotifier)
    };

    let verifier = SignatureVerifier::new(&config.line_channel_secret)
        .expect("Failed to initialize webhook signature verifier");

    let state = AppState::new(
        verifier,
        extractor,
        store,
        notifier,
        config.reconcile_policy,
    );
    tracing::info!(policy = %config.reconcile_policy, "Reconcile policy");

    let app = routes::build_router(state).route(
        "/metrics",
        get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
    );

    tracing::info!("Starting job-sheet-bot on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    tracing::info!("Server stopped, sheet client released");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
