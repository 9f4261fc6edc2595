use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{document::DocumentKind, errors::DomainResult};

/// Origen y destino de los documentos JSON (disco local o panel remoto).
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn load(&self, kind: DocumentKind) -> DomainResult<Value>;
    async fn save(&self, filename: &str, data: &Value) -> DomainResult<()>;
}

/// Abre conexiones al stream de la cámara.
#[async_trait]
pub trait StreamConnector: Send + Sync {
    async fn connect(&self, url: &str) -> DomainResult<Box<dyn FrameConnection>>;
}

/// Una conexión viva. Cada mensaje es un frame completo.
#[async_trait]
pub trait FrameConnection: Send {
    /// `None` cuando el servidor cierra; `Some(Err)` ante un error de transporte.
    async fn next_frame(&mut self) -> Option<DomainResult<String>>;
    async fn close(&mut self);
}

/// Receptor de los eventos del cliente de stream. Se invoca desde la tarea del
/// cliente; no debe bloquear ni cerrar el propio cliente desde dentro.
pub trait StreamObserver: Send + Sync {
    fn on_frame(&self, payload: String) -> DomainResult<()>;
    fn on_open(&self) {}
    fn on_close(&self) {}
}
