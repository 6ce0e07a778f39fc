use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

use crate::ids::{ConnectionId, RoomId};
use crate::message::ServerMessage;
use crate::room::OutboundSender;

struct ConnectionEntry {
	sender: OutboundSender,
	/// The room this connection last joined, so a dropped connection finds
	/// the room to leave without scanning the whole registry of rooms.
	room_id: Option<RoomId>,
}

/// Every live connection, keyed by its server-assigned id. Serves the
/// room-unscoped `signal` sends and the disconnect-to-room lookup; targeted
/// sends within a room (`kicked`, `muted`) go through the room's own
/// member senders.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
	connections: Arc<Mutex<HashMap<ConnectionId, ConnectionEntry>>>,
}

impl ConnectionRegistry {
	pub fn new() -> Self {
		ConnectionRegistry {
			connections: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	pub fn register(&self, id: ConnectionId, sender: OutboundSender) {
		self.connections
			.lock()
			.insert(id, ConnectionEntry { sender, room_id: None });
	}

	/// Records which room the connection belongs to from here on.
	pub fn bind_room(&self, id: ConnectionId, room_id: RoomId) {
		if let Some(entry) = self.connections.lock().get_mut(&id) {
			entry.room_id = Some(room_id);
		}
	}

	pub fn clear_room(&self, id: ConnectionId) {
		if let Some(entry) = self.connections.lock().get_mut(&id) {
			entry.room_id = None;
		}
	}

	pub fn room_of(&self, id: ConnectionId) -> Option<RoomId> {
		self.connections
			.lock()
			.get(&id)
			.and_then(|entry| entry.room_id.clone())
	}

	/// Forgets the connection, returning the room it belonged to so the
	/// caller can run the leave transition there.
	pub fn unregister(&self, id: ConnectionId) -> Option<RoomId> {
		self.connections
			.lock()
			.remove(&id)
			.and_then(|entry| entry.room_id)
	}

	/// Targeted best-effort send. Returns false when the target id is not a
	/// live connection; the relay surfaces no error for that.
	pub fn send_to(&self, id: ConnectionId, msg: ServerMessage) -> bool {
		match self.connections.lock().get(&id) {
			Some(entry) => entry.sender.send(msg).is_ok(),
			None => false,
		}
	}

	pub fn len(&self) -> usize {
		self.connections.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.connections.lock().is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::sync::mpsc;

	#[test]
	fn targeted_send_reaches_only_the_target() {
		let registry = ConnectionRegistry::new();
		let (tx_a, mut rx_a) = mpsc::unbounded_channel();
		let (tx_b, mut rx_b) = mpsc::unbounded_channel();
		let a = ConnectionId::new();
		let b = ConnectionId::new();
		registry.register(a, tx_a);
		registry.register(b, tx_b);

		assert!(registry.send_to(a, ServerMessage::Muted));

		assert!(matches!(rx_a.try_recv(), Ok(ServerMessage::Muted)));
		assert!(rx_b.try_recv().is_err());
	}

	#[test]
	fn send_to_unknown_connection_reports_failure() {
		let registry = ConnectionRegistry::new();
		assert!(!registry.send_to(ConnectionId::new(), ServerMessage::Kicked));
	}

	#[test]
	fn unregister_yields_the_bound_room() {
		let registry = ConnectionRegistry::new();
		let (tx, _rx) = mpsc::unbounded_channel();
		let id = ConnectionId::new();
		registry.register(id, tx);
		registry.bind_room(id, RoomId::new("R1"));

		assert_eq!(registry.unregister(id), Some(RoomId::new("R1")));
		assert!(registry.is_empty());
	}

	#[test]
	fn room_binding_can_be_cleared() {
		let registry = ConnectionRegistry::new();
		let (tx, _rx) = mpsc::unbounded_channel();
		let id = ConnectionId::new();
		registry.register(id, tx);
		registry.bind_room(id, RoomId::new("R1"));
		registry.clear_room(id);

		assert_eq!(registry.room_of(id), None);
	}
}
