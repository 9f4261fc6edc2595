use std::sync::Arc;
use tower_http::services::ServeDir;

use vehicle_panel::adapters::{
    fs::json_repo::FsDocumentRepository,
    http::{router, state::HttpState},
    remote::document_client::HttpDocumentRepository,
    ws::tungstenite_connector::TungsteniteConnector,
};
use vehicle_panel::application::{
    ports::DocumentRepository,
    services::PanelService,
    stream_client::{ReconnectingStreamClient, StreamClientConfig},
};
use vehicle_panel::config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env();
    tracing::info!("Configuración: {config:?}");

    // 2. Adaptadores
    let public_repo = Arc::new(FsDocumentRepository::new(&config.public_dir));
    let documents: Arc<dyn DocumentRepository> = match &config.documents_url {
        Some(url) => {
            tracing::info!("Documentos remotos en {url}");
            Arc::new(HttpDocumentRepository::new(url.as_str())?)
        }
        None => public_repo.clone(),
    };

    // 3. Sesión del panel y carga inicial de documentos
    let panel = Arc::new(PanelService::new(documents));
    panel.load_documents().await;

    // 4. Cliente del stream de la cámara
    let stream = ReconnectingStreamClient::new(
        Arc::new(TungsteniteConnector),
        panel.clone(),
        StreamClientConfig {
            url: config.websocket_url.clone(),
            reconnect_delay: config.reconnect_delay,
        },
    )
    .start();

    // 5. Router de Axum y archivos estáticos
    let state = HttpState { panel, persistence: public_repo };
    let app = router(state).fallback_service(ServeDir::new(&config.public_dir));

    // 6. Lanzar el servidor
    tracing::info!("Panel escuchando en http://{}", config.bind);
    tracing::info!("Archivos estáticos servidos desde '{}'", config.public_dir.display());

    let listener = tokio::net::TcpListener::bind(&config.bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    stream.shutdown().await;
    tracing::info!("Panel detenido");
    Ok(())
}
