use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::adapters::http::state::HttpState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(st): State<HttpState>) -> impl axum::response::IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, st))
}

/// Reenvía cada frame de la cámara tal cual: un mensaje de texto, un JPEG en base64.
async fn handle_socket(mut socket: WebSocket, st: HttpState) {
    let mut rx = st.panel.subscribe_frames();
    debug!("Cliente del relay conectado");

    loop {
        tokio::select! {
            frame = rx.recv() => match frame {
                Ok(frame) => {
                    if socket.send(Message::Text(frame.payload().to_string())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(n)) => warn!("Relay lento: {n} frames descartados"),
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
        }
    }
    debug!("Cliente del relay desconectado");
}
