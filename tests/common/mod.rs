#![allow(dead_code)]

use axum::{body::Body, http::Request, Router};
use http_body_util::BodyExt;
use image::{ImageFormat, RgbImage};
use serde_json::{json, Value};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

use vehicle_panel::adapters::{
    fs::json_repo::FsDocumentRepository,
    http::{router, state::HttpState},
};
use vehicle_panel::application::services::PanelService;
use vehicle_panel::domain::stream::StreamFrame;

pub fn vehicle() -> Value {
    json!({
        "name": "truck-a",
        "path": "images/truck-a.jpg",
        "threshold": 0.8,
        "gray": false,
        "offset": 3,
        "icon": [
            {"name": "fuel", "type": "bool", "shape": "box",
             "top_left": {"x": 10, "y": 10}, "bottom_right": {"x": 40, "y": 30}},
            {"name": "oil", "type": "bool", "shape": "box",
             "top_left": {"x": 100, "y": 10}, "bottom_right": {"x": 130, "y": 30}}
        ],
        "meter": [
            {"name": "speed", "type": "float", "shape": "circle",
             "center": {"x": 200, "y": 150}, "radius": 50}
        ],
        "ocr": []
    })
}

pub fn config() -> Value {
    json!({
        "mqtt": {"host": "broker.local", "port": "1883"},
        "RestAPI": {"host": "10.0.0.2", "port": "5000"},
        "camera": {"width": 1280, "height": 720, "scale": 0.5},
        "frame": 10
    })
}

pub fn jpeg_frame(width: u32, height: u32) -> StreamFrame {
    let img = RgbImage::from_pixel(width, height, image::Rgb([10, 120, 60]));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg).unwrap();
    StreamFrame::from_jpeg(buf.get_ref())
}

pub struct TestPanel {
    pub app: Router,
    pub panel: Arc<PanelService>,
}

/// Directorio público con ambos documentos y un panel que ya los ha cargado.
pub async fn panel_in(dir: &Path) -> TestPanel {
    std::fs::write(dir.join("config.json"), serde_json::to_string_pretty(&config()).unwrap()).unwrap();
    std::fs::write(dir.join("vehicle.json"), serde_json::to_string_pretty(&vehicle()).unwrap()).unwrap();

    let repo = Arc::new(FsDocumentRepository::new(dir));
    let panel = Arc::new(PanelService::new(repo.clone()));
    panel.load_documents().await;
    let app = router(HttpState { panel: panel.clone(), persistence: repo });
    TestPanel { app, panel }
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (u16, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(v) => builder
            .header("content-type", "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status().as_u16();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

pub async fn send_text(app: &Router, method: &str, uri: &str, text: &str) -> (u16, Value) {
    let req = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "text/plain")
        .body(Body::from(text.to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status().as_u16();
    let bytes = res.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}
