use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::adapters::{
    fs::json_repo::validate_filename,
    http::{
        error::ApiResult,
        state::HttpState,
    },
};
use crate::application::{
    dto::{
        ModeRequest, OkResponse, PartPatchRequest, PointerRequest, RawEditResponse, ResizeRequest,
        SaveJsonRequest, SelectRequest, SidebarResponse, UploadResponse, WheelRequest,
    },
    editor::{Scene, Selection, ShapeCommit},
    session::SessionSnapshot,
};
use crate::domain::{
    document::DocumentKind,
    errors::DomainError,
    geometry::Point,
    mode::Transition,
    stream::StreamFrame,
};

/// Tope para el cuerpo de una subida, el mismo que aplica axum por defecto.
const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

fn document_kind(raw: &str) -> ApiResult<DocumentKind> {
    Ok(raw.parse::<DocumentKind>()?)
}

fn jpeg_response(frame: Option<StreamFrame>, what: &str) -> ApiResult<impl IntoResponse> {
    let frame = frame.ok_or_else(|| DomainError::NotFound(what.into()))?;
    let bytes = frame.decode_jpeg()?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}

// --- sesión y modos -------------------------------------------------------

pub async fn get_session(State(st): State<HttpState>) -> ApiResult<Json<SessionSnapshot>> {
    Ok(Json(st.panel.with_session(|s| s.snapshot())?))
}

pub async fn set_mode(
    State(st): State<HttpState>,
    Json(req): Json<ModeRequest>,
) -> ApiResult<Json<Transition>> {
    Ok(Json(st.panel.with_session_mut(|s| s.request_mode(req.mode))?))
}

pub async fn toggle_sidebar(State(st): State<HttpState>) -> ApiResult<Json<SidebarResponse>> {
    let sidebar_open = st.panel.with_session_mut(|s| s.toggle_sidebar())?;
    Ok(Json(SidebarResponse { sidebar_open }))
}

pub async fn current_frame(State(st): State<HttpState>) -> ApiResult<impl IntoResponse> {
    let frame = st.panel.with_session(|s| s.frames().current().cloned())?;
    jpeg_response(frame, "frame")
}

pub async fn reference_frame(State(st): State<HttpState>) -> ApiResult<impl IntoResponse> {
    let frame = st.panel.with_session(|s| s.frames().reference().cloned())?;
    jpeg_response(frame, "frame de referencia")
}

// --- documentos -----------------------------------------------------------

pub async fn get_document(
    State(st): State<HttpState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<Value>> {
    let kind = document_kind(&kind)?;
    Ok(Json(st.panel.document(kind)?))
}

pub async fn merge_document(
    State(st): State<HttpState>,
    Path(kind): Path<String>,
    Json(patch): Json<Value>,
) -> ApiResult<Json<Value>> {
    let kind = document_kind(&kind)?;
    st.panel.with_session_mut(|s| s.merge_document(kind, patch))??;
    Ok(Json(st.panel.document(kind)?))
}

/// Subida de fichero: el cuerpo es el texto JSON completo.
pub async fn upload_document(
    State(st): State<HttpState>,
    Path(kind): Path<String>,
    body: Body,
) -> ApiResult<Json<UploadResponse>> {
    let kind = document_kind(&kind)?;
    let read = async move {
        let bytes = axum::body::to_bytes(body, MAX_UPLOAD_BYTES)
            .await
            .map_err(|e| DomainError::InvalidInput(format!("cuerpo ilegible: {e}")))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| DomainError::InvalidInput("el fichero no es UTF-8".into()))
    };
    let applied = st.panel.upload(kind, read).await?;
    Ok(Json(UploadResponse { applied }))
}

/// Texto del editor JSON crudo. Un texto que no parsea no es un error HTTP:
/// el documento queda igual y `applied` es `false`.
pub async fn raw_edit(
    State(st): State<HttpState>,
    Path(kind): Path<String>,
    text: String,
) -> ApiResult<Json<RawEditResponse>> {
    let kind = document_kind(&kind)?;
    let applied = st.panel.with_session_mut(|s| s.raw_edit(kind, &text))?;
    Ok(Json(RawEditResponse { applied }))
}

pub async fn save_document(
    State(st): State<HttpState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<OkResponse>> {
    let kind = document_kind(&kind)?;
    st.panel.save(kind).await?;
    Ok(Json(OkResponse { ok: true }))
}

pub async fn reload_document(
    State(st): State<HttpState>,
    Path(kind): Path<String>,
) -> ApiResult<Json<OkResponse>> {
    let kind = document_kind(&kind)?;
    st.panel.reload(kind).await?;
    Ok(Json(OkResponse { ok: true }))
}

// --- editor ---------------------------------------------------------------

pub async fn get_scene(State(st): State<HttpState>) -> ApiResult<Json<Scene>> {
    Ok(Json(st.panel.with_session(|s| s.scene())?))
}

pub async fn select(
    State(st): State<HttpState>,
    Json(req): Json<SelectRequest>,
) -> ApiResult<Json<Selection>> {
    Ok(Json(st.panel.with_session_mut(|s| s.select(req.category, req.index))??))
}

pub async fn pointer(
    State(st): State<HttpState>,
    Json(req): Json<PointerRequest>,
) -> ApiResult<Json<Option<ShapeCommit>>> {
    let at = req.at();
    Ok(Json(st.panel.with_session_mut(|s| s.pointer(req.phase, req.button, at))??))
}

pub async fn wheel(
    State(st): State<HttpState>,
    Json(req): Json<WheelRequest>,
) -> ApiResult<Json<Scene>> {
    let scene = st.panel.with_session_mut(|s| {
        s.wheel(Point::new(req.x, req.y), req.delta_y);
        s.scene()
    })?;
    Ok(Json(scene))
}

pub async fn resize(
    State(st): State<HttpState>,
    Json(req): Json<ResizeRequest>,
) -> ApiResult<Json<ShapeCommit>> {
    Ok(Json(st.panel.with_session_mut(|s| s.resize_active(req.top_left, req.bottom_right))??))
}

pub async fn patch_part(
    State(st): State<HttpState>,
    Json(req): Json<PartPatchRequest>,
) -> ApiResult<Json<OkResponse>> {
    st.panel
        .with_session_mut(|s| s.update_part_attributes(&req.name, req.value_type, req.shape))??;
    Ok(Json(OkResponse { ok: true }))
}

// --- persistencia ---------------------------------------------------------

/// `POST /api/save-json`. Los mensajes de respuesta son fijos: un cuerpo que
/// no es JSON es un fallo de guardado, un `filename` ausente o no textual es
/// un nombre inválido.
pub async fn save_json(
    State(st): State<HttpState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    let failed = || (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": "Failed to save file" })));
    let invalid = || (StatusCode::BAD_REQUEST, Json(json!({ "error": "Invalid filename" })));

    let body = match payload {
        Ok(Json(body)) => body,
        Err(e) => {
            warn!("save-json con cuerpo ilegible: {e}");
            return failed();
        }
    };
    let req: SaveJsonRequest = match serde_json::from_value(body) {
        Ok(req) => req,
        Err(e) => {
            warn!("save-json sin filename válido: {e}");
            return invalid();
        }
    };
    if let Err(e) = validate_filename(&req.filename) {
        warn!("save-json rechazado ({:?}): {e}", req.filename);
        return invalid();
    }
    match st.persistence.save(&req.filename, &req.data).await {
        Ok(()) => {
            info!("{} guardado", req.filename);
            (StatusCode::OK, Json(json!({ "message": "File saved successfully" })))
        }
        Err(DomainError::InvalidInput(_)) => invalid(),
        Err(_) => failed(),
    }
}
