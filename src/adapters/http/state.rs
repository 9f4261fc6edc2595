use std::sync::Arc;

use crate::application::{ports::DocumentRepository, services::PanelService};

/// Estado compartido para los manejadores HTTP de Axum.
#[derive(Clone)]
pub struct HttpState {
    /// Sesión del panel y casos de uso sobre ella.
    pub panel: Arc<PanelService>,
    /// Destino de `POST /api/save-json`: siempre el directorio público local.
    pub persistence: Arc<dyn DocumentRepository>,
}
