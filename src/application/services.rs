use serde_json::Value;
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::{
    application::{
        ports::{DocumentRepository, StreamObserver},
        session::PanelSession,
    },
    domain::{
        document::DocumentKind,
        errors::{DomainError, DomainResult},
        stream::StreamFrame,
    },
};

/// Frames pendientes por cliente del relay antes de que empiece a perderlos.
pub const FRAME_RELAY_CAPACITY: usize = 16;

/// Casos de uso del panel sobre la sesión compartida.
///
/// La sesión vive tras un único `RwLock`; cada operación lee, modifica y
/// escribe dentro de la misma sección crítica y la última escritura gana.
/// Las llamadas al repositorio se hacen siempre fuera del cerrojo.
pub struct PanelService {
    session: Arc<RwLock<PanelSession>>,
    repository: Arc<dyn DocumentRepository>,
    frames_tx: broadcast::Sender<StreamFrame>,
}

impl PanelService {
    pub fn new(repository: Arc<dyn DocumentRepository>) -> Self {
        let (frames_tx, _) = broadcast::channel(FRAME_RELAY_CAPACITY);
        Self {
            session: Arc::new(RwLock::new(PanelSession::default())),
            repository,
            frames_tx,
        }
    }

    pub fn with_session<T>(&self, f: impl FnOnce(&PanelSession) -> T) -> DomainResult<T> {
        let guard = self
            .session
            .read()
            .map_err(|_| DomainError::OperationFailed("sesión envenenada".into()))?;
        Ok(f(&guard))
    }

    pub fn with_session_mut<T>(&self, f: impl FnOnce(&mut PanelSession) -> T) -> DomainResult<T> {
        let mut guard = self
            .session
            .write()
            .map_err(|_| DomainError::OperationFailed("sesión envenenada".into()))?;
        Ok(f(&mut guard))
    }

    /// Receptor para el relay de frames en vivo.
    pub fn subscribe_frames(&self) -> broadcast::Receiver<StreamFrame> {
        self.frames_tx.subscribe()
    }

    /// Carga inicial de ambos documentos. Un documento que no se puede leer
    /// se registra y se deja sin cargar.
    pub async fn load_documents(&self) {
        for kind in [DocumentKind::Config, DocumentKind::Vehicle] {
            if let Err(e) = self.reload(kind).await {
                warn!("No se pudo cargar {}: {e}", kind.filename());
            }
        }
    }

    /// Vuelve a leer un documento del repositorio y lo reemplaza entero.
    pub async fn reload(&self, kind: DocumentKind) -> DomainResult<()> {
        let value = self.repository.load(kind).await?;
        self.with_session_mut(|s| s.reload_document(kind, value))??;
        info!("{} cargado", kind.filename());
        Ok(())
    }

    /// Guarda el documento en memoria con su nombre fijo.
    pub async fn save(&self, kind: DocumentKind) -> DomainResult<()> {
        let doc = self
            .with_session(|s| s.documents().get(kind).cloned())?
            .ok_or_else(|| DomainError::NotFound(kind.filename().into()))?;
        match self.repository.save(kind.filename(), &doc).await {
            Ok(()) => {
                info!("{} guardado", kind.filename());
                Ok(())
            }
            Err(e) => {
                error!("Fallo al guardar {}: {e}", kind.filename());
                Err(e)
            }
        }
    }

    /// Sustituye el documento por el contenido de un fichero subido. El turno
    /// se toma antes de leer el cuerpo, así una subida lenta no pisa a una
    /// posterior que termine antes.
    pub async fn upload<F>(&self, kind: DocumentKind, body: F) -> DomainResult<bool>
    where
        F: std::future::Future<Output = DomainResult<String>>,
    {
        let token = self.with_session_mut(|s| s.begin_upload(kind))?;
        let text = body.await?;
        let applied = self.with_session_mut(|s| s.finish_upload(token, &text))?;
        if let Err(e) = &applied {
            warn!("Subida de {} ignorada: {e}", kind.filename());
        }
        applied
    }

    pub fn document(&self, kind: DocumentKind) -> DomainResult<Value> {
        self.with_session(|s| s.documents().get(kind).cloned())?
            .ok_or_else(|| DomainError::NotFound(kind.filename().into()))
    }
}

impl StreamObserver for PanelService {
    fn on_frame(&self, payload: String) -> DomainResult<()> {
        let frame = StreamFrame::new(payload);
        let shown = self.with_session_mut(|s| s.receive_frame(frame.clone()))?;
        if !shown {
            debug!("Frame retenido: modo edit");
        }
        // sin suscriptores el envío falla y no importa
        let _ = self.frames_tx.send(frame);
        Ok(())
    }

    fn on_open(&self) {
        if self.with_session_mut(|s| s.set_connected(true)).is_ok() {
            info!("Conectado al stream de la cámara");
        }
    }

    fn on_close(&self) {
        if self.with_session_mut(|s| s.set_connected(false)).is_ok() {
            info!("Desconectado del stream de la cámara");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::tests::{sample_config, sample_vehicle};
    use crate::domain::mode::AppMode;
    use crate::domain::stream::tests::jpeg_frame;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryRepository {
        files: Mutex<HashMap<String, Value>>,
    }

    impl MemoryRepository {
        fn seeded() -> Self {
            let repo = Self::default();
            {
                let mut files = repo.files.lock().unwrap();
                files.insert("config.json".into(), sample_config());
                files.insert("vehicle.json".into(), sample_vehicle());
            }
            repo
        }
    }

    #[async_trait]
    impl DocumentRepository for MemoryRepository {
        async fn load(&self, kind: DocumentKind) -> DomainResult<Value> {
            self.files
                .lock()
                .unwrap()
                .get(kind.filename())
                .cloned()
                .ok_or_else(|| DomainError::NotFound(kind.filename().into()))
        }

        async fn save(&self, filename: &str, data: &Value) -> DomainResult<()> {
            self.files.lock().unwrap().insert(filename.into(), data.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn load_documents_skips_missing_ones() {
        let repo = MemoryRepository::default();
        repo.files.lock().unwrap().insert("vehicle.json".into(), sample_vehicle());
        let svc = PanelService::new(Arc::new(repo));

        svc.load_documents().await;
        assert!(svc.document(DocumentKind::Config).is_err());
        assert_eq!(svc.document(DocumentKind::Vehicle).unwrap(), sample_vehicle());
    }

    #[tokio::test]
    async fn sparse_document_on_disk_still_loads() {
        let repo = MemoryRepository::default();
        let mut sparse = sample_vehicle();
        sparse.as_object_mut().unwrap().remove("path");
        sparse.as_object_mut().unwrap().remove("gray");
        repo.files.lock().unwrap().insert("vehicle.json".into(), sparse.clone());
        let svc = PanelService::new(Arc::new(repo));

        svc.load_documents().await;
        assert_eq!(svc.document(DocumentKind::Vehicle).unwrap(), sparse);
    }

    #[tokio::test]
    async fn upload_then_save_round_trips() {
        let repo = Arc::new(MemoryRepository::default());
        let svc = PanelService::new(repo.clone());
        let text = sample_vehicle().to_string();

        let applied = svc.upload(DocumentKind::Vehicle, async move { Ok(text) }).await.unwrap();
        assert!(applied);
        svc.save(DocumentKind::Vehicle).await.unwrap();
        assert_eq!(repo.files.lock().unwrap()["vehicle.json"], sample_vehicle());
    }

    #[tokio::test]
    async fn invalid_upload_keeps_document() {
        let svc = PanelService::new(Arc::new(MemoryRepository::seeded()));
        svc.load_documents().await;

        let res = svc.upload(DocumentKind::Config, async { Ok("{oops".to_string()) }).await;
        assert!(res.is_err());
        assert_eq!(svc.document(DocumentKind::Config).unwrap(), sample_config());
    }

    #[tokio::test]
    async fn save_without_document_is_not_found() {
        let svc = PanelService::new(Arc::new(MemoryRepository::default()));
        assert!(matches!(svc.save(DocumentKind::Config).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn reload_discards_unsaved_edits() {
        let svc = PanelService::new(Arc::new(MemoryRepository::seeded()));
        svc.load_documents().await;
        svc.with_session_mut(|s| s.merge_document(DocumentKind::Config, json!({"frame": 99})))
            .unwrap()
            .unwrap();

        svc.reload(DocumentKind::Config).await.unwrap();
        assert_eq!(svc.document(DocumentKind::Config).unwrap()["frame"], json!(10));
    }

    #[tokio::test]
    async fn frames_are_relayed_and_tracked() {
        let svc = PanelService::new(Arc::new(MemoryRepository::default()));
        let mut rx = svc.subscribe_frames();
        let frame = jpeg_frame(8, 6);

        svc.on_open();
        svc.on_frame(frame.payload().to_string()).unwrap();

        assert_eq!(rx.recv().await.unwrap(), frame);
        let snap = svc.with_session(|s| s.snapshot()).unwrap();
        assert!(snap.connected && snap.has_frame);

        svc.on_close();
        assert!(!svc.with_session(|s| s.snapshot()).unwrap().connected);
    }

    #[tokio::test]
    async fn edit_mode_holds_the_visible_frame() {
        let svc = PanelService::new(Arc::new(MemoryRepository::default()));
        let first = jpeg_frame(8, 6);
        svc.on_frame(first.payload().to_string()).unwrap();
        svc.with_session_mut(|s| s.request_mode(AppMode::Edit)).unwrap();

        svc.on_frame(jpeg_frame(4, 4).payload().to_string()).unwrap();
        let current = svc.with_session(|s| s.frames().current().cloned()).unwrap();
        assert_eq!(current, Some(first));
    }
}
