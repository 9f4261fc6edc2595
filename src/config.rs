use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::application::stream_client::DEFAULT_RECONNECT_DELAY;

pub const DEFAULT_WEBSOCKET_URL: &str = "ws://raspi-T32CD.local:8000/ws/camera";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_PUBLIC_DIR: &str = "public";

/// Configuración del proceso, leída de variables de entorno con valores por defecto.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub websocket_url: String,
    pub bind: String,
    pub public_dir: PathBuf,
    pub reconnect_delay: Duration,
    /// Panel remoto del que leer y al que guardar los documentos.
    pub documents_url: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::default()
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let reconnect_delay = match get("PANEL_RECONNECT_MS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(ms) => Duration::from_millis(ms),
                Err(_) => {
                    warn!("PANEL_RECONNECT_MS inválido ({raw}), usando {:?}", DEFAULT_RECONNECT_DELAY);
                    DEFAULT_RECONNECT_DELAY
                }
            },
            None => DEFAULT_RECONNECT_DELAY,
        };

        Self {
            websocket_url: get("PANEL_WEBSOCKET_URL").unwrap_or_else(|| DEFAULT_WEBSOCKET_URL.into()),
            bind: get("PANEL_BIND").unwrap_or_else(|| DEFAULT_BIND.into()),
            public_dir: get("PANEL_PUBLIC_DIR").unwrap_or_else(|| DEFAULT_PUBLIC_DIR.into()).into(),
            reconnect_delay,
            documents_url: get("PANEL_DOCUMENTS_URL"),
        }
    }
}
