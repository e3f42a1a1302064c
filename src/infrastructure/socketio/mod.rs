//! Ride-status channel speaking Socket.IO (v5) over an Engine.IO (v4) WebSocket.

pub mod client;
pub mod codec;

pub use client::SocketIoStatusChannel;

/// Event carrying `{ status }` updates.
pub const RIDE_STATUS_EVENT: &str = "ride_status";
/// Event asking the server to scope updates to one ride.
pub const JOIN_RIDE_EVENT: &str = "join_ride";
