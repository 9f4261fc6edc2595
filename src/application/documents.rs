use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::domain::{
    document::{merge_one_level, part_entry_mut, DocumentKind, PartCategory, VehicleDocument},
    errors::{DomainError, DomainResult},
};

/// Turno de una subida de fichero. Se pide antes de leer el contenido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadToken {
    kind: DocumentKind,
    seq: u64,
}

impl UploadToken {
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }
}

/// `config` y `vehicle` en memoria.
///
/// Se guardan como JSON crudo para que cargar y volver a guardar produzca el
/// mismo documento; cada escritura se valida contra la vista tipada y, si no
/// pasa, el documento anterior se conserva.
#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: HashMap<DocumentKind, Value>,
    next_upload: u64,
    applied_upload: HashMap<DocumentKind, u64>,
}

impl DocumentStore {
    pub fn get(&self, kind: DocumentKind) -> Option<&Value> {
        self.docs.get(&kind)
    }

    pub fn vehicle(&self) -> Option<VehicleDocument> {
        self.get(DocumentKind::Vehicle)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Reemplazo completo (carga inicial, recarga).
    pub fn replace(&mut self, kind: DocumentKind, value: Value) -> DomainResult<()> {
        kind.validate(&value)?;
        self.docs.insert(kind, value);
        Ok(())
    }

    /// Edición de un campo del formulario: mezcla a un nivel de profundidad.
    pub fn merge(&mut self, kind: DocumentKind, patch: Value) -> DomainResult<()> {
        let mut next = self
            .get(kind)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(kind.filename().into()))?;
        merge_one_level(&mut next, patch)?;
        self.replace(kind, next)
    }

    /// Texto del editor JSON. Si no parsea, el documento no cambia.
    pub fn apply_raw_text(&mut self, kind: DocumentKind, text: &str) -> DomainResult<()> {
        let value: Value = serde_json::from_str(text)?;
        self.replace(kind, value)
    }

    pub fn begin_upload(&mut self, kind: DocumentKind) -> UploadToken {
        self.next_upload += 1;
        UploadToken { kind, seq: self.next_upload }
    }

    /// Completa una subida. Devuelve `Ok(false)` si otra subida más reciente
    /// ya se aplicó y ésta se descarta.
    pub fn finish_upload(&mut self, token: UploadToken, text: &str) -> DomainResult<bool> {
        let newest = self.applied_upload.get(&token.kind).copied().unwrap_or(0);
        if token.seq < newest {
            return Ok(false);
        }
        self.apply_raw_text(token.kind, text)?;
        self.applied_upload.insert(token.kind, token.seq);
        Ok(true)
    }

    /// Modifica una parte de vehicle.json por posición y valida el resultado.
    pub fn update_part(
        &mut self,
        category: PartCategory,
        index: usize,
        edit: impl FnOnce(&mut Map<String, Value>),
    ) -> DomainResult<()> {
        let mut next = self
            .get(DocumentKind::Vehicle)
            .cloned()
            .ok_or_else(|| DomainError::NotFound(DocumentKind::Vehicle.filename().into()))?;
        edit(part_entry_mut(&mut next, category, index)?);
        self.replace(DocumentKind::Vehicle, next)
    }

    /// Texto indentado con dos espacios, como se escribe en disco.
    pub fn pretty(&self, kind: DocumentKind) -> DomainResult<String> {
        let doc = self
            .get(kind)
            .ok_or_else(|| DomainError::NotFound(kind.filename().into()))?;
        serde_json::to_string_pretty(doc).map_err(|e| DomainError::OperationFailed(e.to_string()))
    }
}
