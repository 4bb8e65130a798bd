// WebSocket connector for the live telemetry stream
use async_trait::async_trait;
use futures::StreamExt;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use crate::application::ports::{FrameStream, StreamConnector};
use crate::error::ChannelError;

#[derive(Debug, Clone, Default)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StreamConnector for WebSocketConnector {
    async fn connect(&self, url: &str) -> Result<FrameStream, ChannelError> {
        let (mut socket, _response) =
            connect_async(url)
                .await
                .map_err(|e| ChannelError::Connect {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        let frames = async_stream::stream! {
            while let Some(message) = socket.next().await {
                match message {
                    Ok(Message::Text(text)) => yield Ok(text),
                    Ok(Message::Binary(data)) => match String::from_utf8(data) {
                        Ok(text) => yield Ok(text),
                        Err(_) => tracing::warn!("Skipping binary frame that is not UTF-8"),
                    },
                    Ok(Message::Close(frame)) => {
                        tracing::debug!("Server closed the stream: {:?}", frame);
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        yield Err(ChannelError::Transport(e.to_string()));
                        break;
                    }
                }
            }
        };

        Ok(frames.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        // Port 9 (discard) is not expected to accept WebSocket upgrades
        let result = WebSocketConnector::new().connect("ws://127.0.0.1:9/ws").await;
        assert!(matches!(result, Err(ChannelError::Connect { .. })));
    }

    #[tokio::test]
    async fn test_secure_endpoint_attempts_tls_handshake() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            // Accept and hang up without speaking TLS
            if let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let url = format!("wss://127.0.0.1:{}/ws", port);
        match WebSocketConnector::new().connect(&url).await {
            Err(ChannelError::Connect { url: failed, reason }) => {
                assert_eq!(failed, url);
                assert!(!reason.contains("TLS support not compiled in"), "{}", reason);
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("handshake against a closed socket succeeded"),
        }
    }
}
