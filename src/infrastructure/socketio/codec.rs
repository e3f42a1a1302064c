use crate::error::{BookingError, Result};
use serde::Deserialize;
use serde_json::Value;

/// Engine.IO open packet body.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Handshake {
    pub sid: String,
    #[serde(default)]
    pub ping_interval: u64,
    #[serde(default)]
    pub ping_timeout: u64,
}

/// One text frame on the wire, flattened across the Engine.IO and
/// Socket.IO layers. Only what a status listener needs is modelled.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Open(Handshake),
    Close,
    Ping,
    Pong,
    Noop,
    Connect,
    Disconnect,
    ConnectError(String),
    Event { name: String, payload: Value },
    /// Acks, binary attachments, upgrades. Read and dropped.
    Unsupported(String),
}

pub fn decode(text: &str) -> Result<Frame> {
    let mut chars = text.chars();
    let kind = chars
        .next()
        .ok_or_else(|| BookingError::Protocol("empty frame".to_string()))?;
    let rest = chars.as_str();

    match kind {
        '0' => Ok(Frame::Open(serde_json::from_str(rest)?)),
        '1' => Ok(Frame::Close),
        '2' => Ok(Frame::Ping),
        '3' => Ok(Frame::Pong),
        '4' => decode_message(rest),
        '5' => Ok(Frame::Unsupported(text.to_string())),
        '6' => Ok(Frame::Noop),
        other => Err(BookingError::Protocol(format!(
            "unknown engine.io packet type {other:?}"
        ))),
    }
}

fn decode_message(body: &str) -> Result<Frame> {
    let mut chars = body.chars();
    let kind = chars
        .next()
        .ok_or_else(|| BookingError::Protocol("empty socket.io packet".to_string()))?;
    let rest = skip_namespace(chars.as_str());

    match kind {
        '0' => Ok(Frame::Connect),
        '1' => Ok(Frame::Disconnect),
        '2' => decode_event(rest),
        '4' => {
            let message = serde_json::from_str::<Value>(rest)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| rest.to_string());
            Ok(Frame::ConnectError(message))
        }
        '3' | '5' | '6' => Ok(Frame::Unsupported(body.to_string())),
        other => Err(BookingError::Protocol(format!(
            "unknown socket.io packet type {other:?}"
        ))),
    }
}

/// Drops a leading `/namespace,` if present.
fn skip_namespace(body: &str) -> &str {
    if body.starts_with('/') {
        match body.find(',') {
            Some(idx) => &body[idx + 1..],
            None => "",
        }
    } else {
        body
    }
}

fn decode_event(body: &str) -> Result<Frame> {
    // Optional ack id precedes the array.
    let body = body.trim_start_matches(|c: char| c.is_ascii_digit());
    let mut items = match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => items.into_iter(),
        other => {
            return Err(BookingError::Protocol(format!(
                "event body is not an array: {other}"
            )));
        }
    };
    let name = match items.next() {
        Some(Value::String(name)) => name,
        _ => return Err(BookingError::Protocol("event without a name".to_string())),
    };
    let payload = items.next().unwrap_or(Value::Null);
    Ok(Frame::Event { name, payload })
}

/// Encodes a frame the client sends. Server-only frames encode to their
/// wire form as well so tests can play the server side.
pub fn encode(frame: &Frame) -> Result<String> {
    Ok(match frame {
        Frame::Open(handshake) => format!(
            "0{}",
            serde_json::json!({
                "sid": handshake.sid,
                "upgrades": [],
                "pingInterval": handshake.ping_interval,
                "pingTimeout": handshake.ping_timeout,
            })
        ),
        Frame::Close => "1".to_string(),
        Frame::Ping => "2".to_string(),
        Frame::Pong => "3".to_string(),
        Frame::Noop => "6".to_string(),
        Frame::Connect => "40".to_string(),
        Frame::Disconnect => "41".to_string(),
        Frame::ConnectError(message) => {
            format!("44{}", serde_json::json!({ "message": message }))
        }
        Frame::Event { name, payload } => {
            format!("42{}", serde_json::to_string(&[Value::from(name.as_str()), payload.clone()])?)
        }
        Frame::Unsupported(raw) => raw.clone(),
    })
}
