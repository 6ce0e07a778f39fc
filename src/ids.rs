use uuid::Uuid;
use serde::{Deserialize, Serialize};

/// A room's id: the client-chosen code under which peers meet up.
/// Joining an unknown code creates the room, so any string is a valid id.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Deserialize, Serialize)]
pub struct RoomId(String);
impl RoomId {
	pub fn new(code: impl Into<String>) -> Self {
		RoomId(code.into())
	}
}
impl std::fmt::Display for RoomId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(&self.0, f)
	}
}

/// Server-assigned identity of one live connection. Doubles as the user id
/// for the session's lifetime; not stable across reconnects.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Deserialize, Serialize, Copy)]
pub struct ConnectionId(Uuid);
impl ConnectionId {
	pub fn new() -> Self {
		ConnectionId(Uuid::new_v4())
	}
}
impl std::fmt::Display for ConnectionId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(&self.0, f)
	}
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Deserialize, Serialize, Copy)]
pub struct MonitorId(Uuid);
impl MonitorId {
	pub fn new() -> Self {
		MonitorId(Uuid::new_v4())
	}
}
impl std::fmt::Display for MonitorId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(&self.0, f)
	}
}

/// A voice channel's name, unique within its room.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Deserialize, Serialize)]
pub struct ChannelName(String);
impl ChannelName {
	pub fn new(name: impl Into<String>) -> Self {
		ChannelName(name.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl std::fmt::Display for ChannelName {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Display::fmt(&self.0, f)
	}
}
