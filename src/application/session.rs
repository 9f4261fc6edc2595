use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::application::{
    documents::{DocumentStore, UploadToken},
    editor::{PointerButton, Scene, Selection, ShapeCommit, ShapeEditor},
};
use crate::domain::{
    document::{write_shape, DocumentKind, PartCategory, ShapeKind, ValueType},
    errors::{DomainError, DomainResult},
    geometry::Point,
    mode::{AppMode, ModeController, Transition},
    stream::StreamFrame,
};

/// Frame en vivo y frame congelado para edición.
#[derive(Debug, Default)]
pub struct FrameSlots {
    current: Option<StreamFrame>,
    reference: Option<StreamFrame>,
}

impl FrameSlots {
    /// El frame visible sólo se actualiza fuera de `edit`; devuelve si se aceptó.
    pub fn offer(&mut self, frame: StreamFrame, mode: AppMode) -> bool {
        if mode == AppMode::Edit {
            return false;
        }
        self.current = Some(frame);
        true
    }

    pub fn current(&self) -> Option<&StreamFrame> {
        self.current.as_ref()
    }

    pub fn reference(&self) -> Option<&StreamFrame> {
        self.reference.as_ref()
    }

    fn freeze(&mut self) -> Option<&StreamFrame> {
        self.reference = self.current.clone();
        self.reference.as_ref()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointerPhase {
    Down,
    Move,
    Up,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub mode: AppMode,
    pub sidebar_open: bool,
    pub connected: bool,
    pub has_frame: bool,
    pub has_reference: bool,
    pub config_loaded: bool,
    pub vehicle_loaded: bool,
    pub selection: Selection,
}

/// Estado de una sesión del panel. Lo posee la composición de nivel superior
/// y se comparte con la capa HTTP y con el cliente de stream.
#[derive(Debug, Default)]
pub struct PanelSession {
    modes: ModeController,
    frames: FrameSlots,
    documents: DocumentStore,
    editor: ShapeEditor,
    connected: bool,
}

impl PanelSession {
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            mode: self.modes.mode(),
            sidebar_open: self.modes.sidebar_open(),
            connected: self.connected,
            has_frame: self.frames.current().is_some(),
            has_reference: self.frames.reference().is_some(),
            config_loaded: self.documents.get(DocumentKind::Config).is_some(),
            vehicle_loaded: self.documents.get(DocumentKind::Vehicle).is_some(),
            selection: self.editor.selection(),
        }
    }

    pub fn mode(&self) -> AppMode {
        self.modes.mode()
    }

    pub fn frames(&self) -> &FrameSlots {
        &self.frames
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn editor(&self) -> &ShapeEditor {
        &self.editor
    }

    // --- modos -------------------------------------------------------------

    pub fn request_mode(&mut self, target: AppMode) -> Transition {
        let has_reference = self.frames.current().is_some();
        let transition = self.modes.request(target, has_reference);
        match transition {
            Transition::Entered { mode: AppMode::Edit } => {
                let reference = self.frames.freeze();
                self.editor.load_reference(reference);
                info!("Modo edit: frame de referencia congelado");
            }
            Transition::Entered { mode } => info!("Modo {mode}"),
            Transition::Refused { mode, reason } => {
                warn!("Cambio a {target} rechazado desde {mode}: {reason:?}")
            }
        }
        transition
    }

    pub fn toggle_sidebar(&mut self) -> bool {
        self.modes.toggle_sidebar()
    }

    // --- stream ------------------------------------------------------------

    pub fn receive_frame(&mut self, frame: StreamFrame) -> bool {
        self.frames.offer(frame, self.modes.mode())
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    // --- documentos --------------------------------------------------------

    pub fn replace_document(&mut self, kind: DocumentKind, value: Value) -> DomainResult<()> {
        self.documents.replace(kind, value)?;
        self.after_replace(kind);
        Ok(())
    }

    /// Recarga desde el repositorio: además de reemplazar, selecciona la
    /// primera parte de `icon`.
    pub fn reload_document(&mut self, kind: DocumentKind, value: Value) -> DomainResult<()> {
        self.documents.replace(kind, value)?;
        if kind == DocumentKind::Vehicle {
            self.editor.select_default(self.documents.vehicle().as_ref());
        }
        Ok(())
    }

    pub fn merge_document(&mut self, kind: DocumentKind, patch: Value) -> DomainResult<()> {
        self.documents.merge(kind, patch)?;
        self.after_replace(kind);
        Ok(())
    }

    /// Texto del editor JSON crudo. Un error de parseo se registra y el
    /// documento queda como estaba.
    pub fn raw_edit(&mut self, kind: DocumentKind, text: &str) -> bool {
        match self.documents.apply_raw_text(kind, text) {
            Ok(()) => {
                self.after_replace(kind);
                true
            }
            Err(e) => {
                warn!("JSON inválido en el editor de {}: {e}", kind.filename());
                false
            }
        }
    }

    pub fn begin_upload(&mut self, kind: DocumentKind) -> UploadToken {
        self.documents.begin_upload(kind)
    }

    pub fn finish_upload(&mut self, token: UploadToken, text: &str) -> DomainResult<bool> {
        let applied = self.documents.finish_upload(token, text)?;
        if applied {
            debug!("Subida aplicada a {}", token.kind().filename());
            self.after_replace(token.kind());
        } else {
            warn!("Subida descartada: ya se aplicó una más reciente");
        }
        Ok(applied)
    }

    fn after_replace(&mut self, kind: DocumentKind) {
        if kind == DocumentKind::Vehicle {
            self.editor.document_replaced(self.documents.vehicle().as_ref());
        }
    }

    // --- editor ------------------------------------------------------------

    pub fn scene(&self) -> Scene {
        self.editor.scene(self.documents.vehicle().as_ref())
    }

    pub fn select(&mut self, category: PartCategory, index: Option<usize>) -> DomainResult<Selection> {
        let doc = self.documents.vehicle();
        match index {
            Some(_) => self.editor.select(category, index, doc.as_ref()),
            None => Ok(self.editor.select_category(category, doc.as_ref())),
        }
    }

    pub fn pointer(
        &mut self,
        phase: PointerPhase,
        button: PointerButton,
        at: Point,
    ) -> DomainResult<Option<ShapeCommit>> {
        match phase {
            PointerPhase::Down => {
                let doc = self.documents.vehicle();
                self.editor.pointer_down(button, at, doc.as_ref());
                Ok(None)
            }
            PointerPhase::Move => {
                self.editor.pointer_move(at);
                Ok(None)
            }
            PointerPhase::Up => match self.editor.pointer_up(at) {
                Some(commit) => self.commit(commit).map(Some),
                None => Ok(None),
            },
        }
    }

    pub fn wheel(&mut self, at: Point, delta_y: f64) {
        self.editor.wheel(at, delta_y);
    }

    pub fn resize_active(&mut self, top_left: Point, bottom_right: Point) -> DomainResult<ShapeCommit> {
        let doc = self.documents.vehicle();
        let commit = self.editor.resize_active(top_left, bottom_right, doc.as_ref())?;
        self.commit(commit)
    }

    /// Cambia `type` y/o `shape` de la parte llamada `name` en la categoría activa.
    pub fn update_part_attributes(
        &mut self,
        name: &str,
        value_type: Option<ValueType>,
        shape: Option<ShapeKind>,
    ) -> DomainResult<()> {
        let category = self
            .editor
            .selection()
            .category
            .ok_or_else(|| DomainError::InvalidInput("no hay categoría activa".into()))?;
        let index = self
            .documents
            .vehicle()
            .and_then(|d| d.parts(category).iter().position(|p| p.name == name))
            .ok_or_else(|| DomainError::NotFound(format!("{category}/{name}")))?;
        self.documents.update_part(category, index, |part| {
            if let Some(t) = value_type {
                part.insert("type".into(), serde_json::to_value(t).unwrap_or(Value::Null));
            }
            if let Some(s) = shape {
                part.insert("shape".into(), serde_json::to_value(s).unwrap_or(Value::Null));
            }
        })
    }

    fn commit(&mut self, commit: ShapeCommit) -> DomainResult<ShapeCommit> {
        self.documents
            .update_part(commit.category, commit.index, |part| write_shape(part, &commit.shape))?;
        debug!("Geometría actualizada: {}[{}]", commit.category, commit.index);
        Ok(commit)
    }
}
