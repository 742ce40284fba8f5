// src/connection/transport.rs
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::RelayError;

/// Outbound liveness probe.
pub const PING_FRAME: &str = r#"{"type":"ping"}"#;

/// One open streaming connection carrying JSON text frames.
#[async_trait::async_trait]
pub trait Connection: Send {
    async fn send(&mut self, text: String) -> Result<(), RelayError>;
    /// Next inbound text frame. `None` once the peer closed the stream.
    /// Must be cancel-safe: the driver polls it inside `select!`.
    async fn recv(&mut self) -> Option<Result<String, RelayError>>;
    async fn close(&mut self);
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    type Conn: Connection;
    async fn connect(&self, url: &str) -> Result<Self::Conn, RelayError>;
}

/// WebSocket transport (ws:// and wss://).
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

pub struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait::async_trait]
impl Transport for WsTransport {
    type Conn = WsConnection;

    async fn connect(&self, url: &str) -> Result<WsConnection, RelayError> {
        let (stream, resp) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| RelayError::Transport(format!("connect {url}: {e}")))?;
        tracing::debug!(target: "connection", status = %resp.status(), "websocket handshake done");
        Ok(WsConnection { stream })
    }
}

#[async_trait::async_trait]
impl Connection for WsConnection {
    async fn send(&mut self, text: String) -> Result<(), RelayError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| RelayError::Transport(format!("send: {e}")))
    }

    async fn recv(&mut self) -> Option<Result<String, RelayError>> {
        loop {
            let msg = match self.stream.next().await? {
                Ok(m) => m,
                Err(e) => return Some(Err(RelayError::Transport(format!("receive: {e}")))),
            };
            match msg {
                Message::Text(t) => return Some(Ok(t.to_string())),
                Message::Binary(b) => match String::from_utf8(b.to_vec()) {
                    Ok(s) => return Some(Ok(s)),
                    Err(e) => {
                        tracing::warn!(target: "connection", error = %e, "non-UTF-8 binary frame dropped");
                    }
                },
                Message::Close(frame) => {
                    tracing::info!(target: "connection", ?frame, "server closed the stream");
                    return None;
                }
                // Control frames; tungstenite answers pings itself.
                _ => {}
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!(target: "connection", error = %e, "close handshake failed");
        }
    }
}
