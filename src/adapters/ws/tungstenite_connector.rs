use async_trait::async_trait;
use base64::{prelude::BASE64_STANDARD, Engine};
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::debug;

use crate::{
    application::ports::{FrameConnection, StreamConnector},
    domain::errors::{DomainError, DomainResult},
};

/// Conector WebSocket real hacia la cámara.
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl StreamConnector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> DomainResult<Box<dyn FrameConnection>> {
        let (socket, _) = connect_async(url)
            .await
            .map_err(|e| DomainError::OperationFailed(format!("{url}: {e}")))?;
        Ok(Box::new(TungsteniteConnection { socket }))
    }
}

struct TungsteniteConnection {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FrameConnection for TungsteniteConnection {
    async fn next_frame(&mut self) -> Option<DomainResult<String>> {
        loop {
            match self.socket.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                // Binario: se reenvía como base64 de sus bytes
                Ok(Message::Binary(bytes)) => return Some(Ok(BASE64_STANDARD.encode(bytes))),
                Ok(Message::Close(frame)) => {
                    debug!("Cierre del servidor: {frame:?}");
                    return None;
                }
                Ok(_) => continue,
                Err(e) => return Some(Err(DomainError::OperationFailed(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        let _ = self.socket.close(None).await;
    }
}
