//! Network side of the bridge
//!
//! A [`LiveConnector`] opens a session and hands back its two halves: a
//! [`LiveLink`] for sending and a [`LiveStream`] of decoded server events.
//! [`WebSocketConnector`] is the production implementation.

use crate::config::AiConfig;
use crate::error::{BridgeError, Result};
use crate::protocol::{ClientMessage, ServerEvent, parse_server_message};
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

/// Sending half of an open session
#[async_trait]
pub trait LiveLink: Send {
    async fn send(&mut self, message: &ClientMessage) -> Result<()>;

    /// Close the session. Errors are not interesting at this point.
    async fn close(&mut self);
}

/// Receiving half of an open session
#[async_trait]
pub trait LiveStream: Send {
    /// Events carried by the next frame; `None` once the session is closed.
    async fn next_events(&mut self) -> Option<Result<Vec<ServerEvent>>>;
}

/// Both halves of a freshly opened session
pub struct LiveConnection {
    pub link: Box<dyn LiveLink>,
    pub stream: Box<dyn LiveStream>,
}

/// Opens sessions with the AI service
#[async_trait]
pub trait LiveConnector: Send + Sync {
    async fn connect(&self, config: &AiConfig) -> Result<LiveConnection>;
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Gemini Live over a TLS WebSocket
#[derive(Debug, Default, Clone)]
pub struct WebSocketConnector;

impl WebSocketConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LiveConnector for WebSocketConnector {
    async fn connect(&self, config: &AiConfig) -> Result<LiveConnection> {
        let url = config.connect_url()?;
        debug!(endpoint = %config.endpoint, "Opening Gemini Live WebSocket");

        let (ws, response) = connect_async(url)
            .await
            .map_err(|e| BridgeError::Connect(e.to_string()))?;
        debug!(status = %response.status(), "WebSocket handshake complete");

        let (sink, stream) = ws.split();
        Ok(LiveConnection {
            link: Box::new(WebSocketLink { sink }),
            stream: Box::new(WebSocketEvents { stream }),
        })
    }
}

struct WebSocketLink {
    sink: SplitSink<WsStream, Message>,
}

#[async_trait]
impl LiveLink for WebSocketLink {
    async fn send(&mut self, message: &ClientMessage) -> Result<()> {
        let json = message.to_json()?;
        self.sink
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| BridgeError::Send(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

struct WebSocketEvents {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl LiveStream for WebSocketEvents {
    async fn next_events(&mut self) -> Option<Result<Vec<ServerEvent>>> {
        loop {
            let message = match self.stream.next().await? {
                Ok(message) => message,
                Err(e) => return Some(Err(BridgeError::Transport(e.to_string()))),
            };
            match message {
                Message::Text(text) => return Some(parse_server_message(text.as_str())),
                // The service sends JSON in binary frames as well.
                Message::Binary(data) => {
                    return Some(match std::str::from_utf8(&data) {
                        Ok(text) => parse_server_message(text),
                        Err(_) => Err(BridgeError::Protocol(format!(
                            "binary frame of {} bytes is not UTF-8",
                            data.len()
                        ))),
                    });
                }
                Message::Close(frame) => {
                    debug!(?frame, "Gemini Live closed the WebSocket");
                    return None;
                }
                other => trace!("Ignoring control frame: {:?}", other),
            }
        }
    }
}
