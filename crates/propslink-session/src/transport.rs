// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// WebSocket transport.
//
// One JSON object per text frame.  Pings are answered by tungstenite itself
// on the next read; binary frames are accepted if they hold UTF-8 text.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info};

use propslink_core::error::TransportError;

use crate::traits::{Connector, Transport};

/// Default bound on opening a connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Dials print-service WebSocket endpoints.
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(DEFAULT_CONNECT_TIMEOUT)
    }
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn Transport>, TransportError> {
        debug!(url, "opening websocket");

        let (stream, _response) = tokio::time::timeout(self.connect_timeout, connect_async(url))
            .await
            .map_err(|_| TransportError::Timeout {
                url: url.to_string(),
                secs: self.connect_timeout.as_secs(),
            })?
            .map_err(|e| TransportError::Connect {
                url: url.to_string(),
                detail: e.to_string(),
            })?;

        info!(url, "websocket open");
        Ok(Box::new(WsTransport { stream }))
    }
}

/// An open WebSocket connection.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn next_text(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            let frame = match self.stream.next().await? {
                Ok(frame) => frame,
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            };

            match frame {
                Message::Text(text) => return Some(Ok(text.as_str().to_owned())),
                Message::Binary(bytes) => {
                    return Some(String::from_utf8(bytes.to_vec()).map_err(|_| {
                        TransportError::Receive("binary frame is not UTF-8".into())
                    }));
                }
                Message::Close(frame) => {
                    debug!(?frame, "peer closed websocket");
                    return None;
                }
                // Control frames.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => continue,
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            debug!(error = %e, "websocket close");
        }
    }
}
