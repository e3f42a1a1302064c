use super::codec::{self, Frame, Handshake};
use super::{JOIN_RIDE_EVENT, RIDE_STATUS_EVENT};
use crate::domain::booking::RideStatus;
use crate::domain::ports::StatusChannel;
use crate::error::{BookingError, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Url;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Ping interval assumed when the server does not announce one.
const DEFAULT_PING_WINDOW: Duration = Duration::from_secs(45);

/// Listens for `ride_status` events on the API's Socket.IO endpoint.
pub struct SocketIoStatusChannel {
    endpoint: Url,
    ride_id: Option<String>,
    stream: Option<WsStream>,
    ping_window: Duration,
    handshake_timeout: Duration,
}

impl SocketIoStatusChannel {
    /// Builds the channel for `api_url` without connecting.
    ///
    /// `http` maps to `ws` and `https` to `wss`; the Socket.IO path and
    /// transport parameters are appended.
    pub fn new(api_url: &str, ride_id: Option<String>) -> Result<Self> {
        Ok(Self {
            endpoint: websocket_endpoint(api_url)?,
            ride_id,
            stream: None,
            ping_window: DEFAULT_PING_WINDOW,
            handshake_timeout: DEFAULT_PING_WINDOW,
        })
    }

    /// Bounds the WebSocket upgrade plus the Engine.IO and namespace handshake.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn send(stream: &mut WsStream, frame: &Frame) -> Result<()> {
        stream.send(Message::Text(codec::encode(frame)?)).await?;
        Ok(())
    }

    /// Reads frames until the namespace connect is acknowledged.
    async fn await_handshake(stream: &mut WsStream) -> Result<Handshake> {
        let mut handshake = None;
        while let Some(message) = stream.next().await {
            let Message::Text(text) = message? else {
                continue;
            };
            match codec::decode(&text)? {
                Frame::Open(open) => {
                    debug!(sid = %open.sid, "engine.io session opened");
                    handshake = Some(open);
                    Self::send(stream, &Frame::Connect).await?;
                }
                Frame::Ping => Self::send(stream, &Frame::Pong).await?,
                Frame::Connect => {
                    return handshake.ok_or_else(|| {
                        BookingError::Protocol("namespace connect before open".to_string())
                    });
                }
                Frame::ConnectError(message) => return Err(BookingError::Channel(message)),
                Frame::Close | Frame::Disconnect => {
                    return Err(BookingError::Channel("closed during handshake".to_string()));
                }
                _ => {}
            }
        }
        Err(BookingError::Channel("connection dropped during handshake".to_string()))
    }
}

fn websocket_endpoint(api_url: &str) -> Result<Url> {
    let mut url = Url::parse(api_url)
        .map_err(|e| BookingError::Config(format!("invalid API URL {api_url}: {e}")))?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(BookingError::Config(format!(
                "unsupported scheme for realtime channel: {other}"
            )));
        }
    };
    url.set_scheme(scheme)
        .map_err(|_| BookingError::Config(format!("cannot use {scheme} for {api_url}")))?;
    let path = format!("{}/socket.io/", url.path().trim_end_matches('/'));
    url.set_path(&path);
    url.set_query(Some("EIO=4&transport=websocket"));
    Ok(url)
}

#[async_trait]
impl StatusChannel for SocketIoStatusChannel {
    async fn connect(&mut self) -> Result<()> {
        if let Some(mut stale) = self.stream.take() {
            let _ = stale.close(None).await;
        }

        debug!(endpoint = %self.endpoint, "connecting status channel");
        let opening = async {
            let (mut stream, _) = connect_async(self.endpoint.as_str()).await?;
            let handshake = Self::await_handshake(&mut stream).await?;
            Ok::<_, BookingError>((stream, handshake))
        };
        let (mut stream, handshake) = tokio::time::timeout(self.handshake_timeout, opening)
            .await
            .map_err(|_| BookingError::Channel("handshake timeout".to_string()))??;
        if handshake.ping_interval > 0 {
            self.ping_window =
                Duration::from_millis(handshake.ping_interval + handshake.ping_timeout);
        }

        if let Some(ride_id) = &self.ride_id {
            let join = Frame::Event {
                name: JOIN_RIDE_EVENT.to_string(),
                payload: ride_id.as_str().into(),
            };
            Self::send(&mut stream, &join).await?;
            debug!(%ride_id, "joined ride room");
        }

        self.stream = Some(stream);
        Ok(())
    }

    async fn next_status(&mut self) -> Result<Option<RideStatus>> {
        let window = self.ping_window;
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| BookingError::Channel("not connected".to_string()))?;

        loop {
            let message = match tokio::time::timeout(window, stream.next()).await {
                Ok(Some(message)) => message?,
                Ok(None) => {
                    self.stream = None;
                    return Err(BookingError::Channel("connection dropped".to_string()));
                }
                Err(_) => {
                    self.stream = None;
                    return Err(BookingError::Channel("ping timeout".to_string()));
                }
            };

            let text = match message {
                Message::Text(text) => text,
                Message::Close(_) => {
                    self.stream = None;
                    return Err(BookingError::Channel("websocket closed".to_string()));
                }
                _ => continue,
            };

            match codec::decode(&text) {
                Ok(Frame::Ping) => Self::send(stream, &Frame::Pong).await?,
                Ok(Frame::Event { name, payload }) if name == RIDE_STATUS_EVENT => {
                    match serde_json::from_value::<RideStatus>(payload) {
                        Ok(status) => return Ok(Some(status)),
                        Err(e) => warn!(error = %e, "malformed ride_status payload"),
                    }
                }
                Ok(Frame::Event { name, .. }) => debug!(%name, "ignoring event"),
                Ok(Frame::Disconnect | Frame::Close) => {
                    self.stream = None;
                    return Ok(None);
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "undecodable frame"),
            }
        }
    }

    async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(e) = Self::send(&mut stream, &Frame::Disconnect).await {
                debug!(error = %e, "could not send disconnect");
            }
            if let Err(e) = stream.close(None).await {
                debug!(error = %e, "websocket close failed");
            }
        }
    }
}
