use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ids::{ChannelName, ConnectionId, RoomId};
use crate::room::User;
use crate::websocket::WsMessageKind;

/// Everything a client may ask of the relay. The `event` tag carries the
/// wire event name, `data` the payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
	#[serde(rename_all = "camelCase")]
	JoinRoom {
		room_id: RoomId,
		nickname: String,
	},
	#[serde(rename_all = "camelCase")]
	CreateChannel {
		room_id: RoomId,
		channel_name: ChannelName,
	},
	#[serde(rename_all = "camelCase")]
	DeleteChannel {
		room_id: RoomId,
		channel_name: ChannelName,
	},
	/// Moves the sender itself; `channelName: null` returns to the lobby.
	#[serde(rename_all = "camelCase")]
	JoinChannel {
		room_id: RoomId,
		channel_name: Option<ChannelName>,
	},
	#[serde(rename_all = "camelCase")]
	KickUser {
		room_id: RoomId,
		target_id: ConnectionId,
	},
	#[serde(rename_all = "camelCase")]
	MuteUser {
		room_id: RoomId,
		target_id: ConnectionId,
	},
	#[serde(rename_all = "camelCase")]
	SendMessage {
		room_id: RoomId,
		nickname: String,
		message: String,
	},
	/// Opaque peer negotiation payload, relayed verbatim to `to`.
	Signal {
		to: ConnectionId,
		from: ConnectionId,
		signal: Value,
	},
	#[serde(rename_all = "camelCase")]
	VoiceState {
		room_id: RoomId,
		is_speaking: bool,
	},
	#[serde(rename_all = "camelCase")]
	ScreenShareStarted {
		room_id: RoomId,
		channel_name: ChannelName,
	},
	#[serde(rename_all = "camelCase")]
	ScreenShareStopped {
		room_id: RoomId,
		#[serde(default)]
		channel_name: Option<ChannelName>,
	},
}

/// Full room state as shipped to clients. Sent wholesale; clients replace
/// their cached copy rather than merging deltas.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSnapshot {
	pub users: Vec<User>,
	pub channels: Vec<ChannelName>,
	pub owner_id: Option<ConnectionId>,
}

/// Message types intended to be sent to the client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
	InitRoomState(RoomSnapshot),
	#[serde(rename_all = "camelCase")]
	UserListUpdate {
		users: Vec<User>,
	},
	#[serde(rename_all = "camelCase")]
	NewMessage {
		id: u64,
		nickname: String,
		text: String,
		timestamp: String,
	},
	Signal {
		from: ConnectionId,
		signal: Value,
	},
	#[serde(rename_all = "camelCase")]
	VoiceStateUpdate {
		id: ConnectionId,
		is_speaking: bool,
	},
	Kicked,
	Muted,
	#[serde(rename_all = "camelCase")]
	UserScreenShareStarted {
		id: ConnectionId,
		#[serde(skip_serializing_if = "Option::is_none")]
		nickname: Option<String>,
		channel_name: ChannelName,
	},
	#[serde(rename_all = "camelCase")]
	UserScreenShareStopped {
		id: ConnectionId,
	},
	Warning(String),
}

/// Internal server messages to facilitate interactions between tasks
/// These won't be sent to the client
pub enum Internal {
	Close,
}

/// Different types of messages that can travel on a connection's channel
pub enum Message {
	WebSocket(WsMessageKind),
	Internal(Internal),
	Server(ServerMessage),
}

impl From<Internal> for Message {
	fn from(value: Internal) -> Self {
		Message::Internal(value)
	}
}

impl From<WsMessageKind> for Message {
	fn from(value: WsMessageKind) -> Self {
		Message::WebSocket(value)
	}
}

impl From<ServerMessage> for Message {
	fn from(value: ServerMessage) -> Self {
		Message::Server(value)
	}
}
