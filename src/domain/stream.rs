use base64::{prelude::BASE64_STANDARD, Engine};
use serde::{Deserialize, Serialize};

use super::errors::{DomainError, DomainResult};

/// Un frame tal y como llega del socket de la cámara: bytes JPEG en base64,
/// sin sobre ni número de secuencia. El último recibido gana.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StreamFrame(String);

impl StreamFrame {
    pub fn new(payload: impl Into<String>) -> Self {
        Self(payload.into())
    }

    pub fn from_jpeg(jpeg: &[u8]) -> Self {
        Self(BASE64_STANDARD.encode(jpeg))
    }

    pub fn payload(&self) -> &str {
        &self.0
    }

    /// URL lista para un `<img src>`.
    pub fn data_url(&self) -> String {
        format!("data:image/jpeg;base64,{}", self.0)
    }

    pub fn decode_jpeg(&self) -> DomainResult<Vec<u8>> {
        BASE64_STANDARD
            .decode(self.0.trim())
            .map_err(|e| DomainError::InvalidInput(format!("frame base64 inválido: {e}")))
    }

    /// Dimensiones del frame. Falla si el payload no es una imagen decodificable.
    pub fn dimensions(&self) -> DomainResult<FrameSize> {
        let bytes = self.decode_jpeg()?;
        let img = image::load_from_memory(&bytes)
            .map_err(|e| DomainError::InvalidInput(format!("imagen ilegible: {e}")))?;
        Ok(FrameSize { width: img.width(), height: img.height() })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}
