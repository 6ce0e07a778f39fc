use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

use crate::ids::RoomId;
use crate::room::Room;

/// The process-wide room table. Cloning shares the same map; the inner lock
/// only guards lookup and insertion, each room serializes its own mutations.
///
/// Rooms are kept for the lifetime of the process: an emptied room retains
/// its channel set and is reclaimed by whoever joins its code next.
#[derive(Default, Clone)]
pub struct RoomsRegistry {
	rooms: Arc<Mutex<HashMap<RoomId, Room>>>,
}

impl RoomsRegistry {
	pub fn new() -> Self {
		RoomsRegistry {
			rooms: Arc::new(Mutex::new(HashMap::new())),
		}
	}

	/// Fetches the room for this id, creating it with the default channels
	/// on first join. The boolean is true when this call created the room.
	/// Atomic under the registry lock, so two concurrent first-joins of the
	/// same code end up in the same room.
	pub fn get_or_create(&self, room_id: &RoomId) -> (Room, bool) {
		let mut rooms = self.rooms.lock();

		match rooms.entry(room_id.clone()) {
			Entry::Occupied(entry) => (entry.get().clone(), false),
			Entry::Vacant(entry) => {
				log::info!("Room {room_id} opened");
				let room = Room::new(room_id.clone());
				entry.insert(room.clone());
				(room, true)
			}
		}
	}

	/// Lookup without creation, for operations that are no-ops on unknown
	/// rooms.
	pub fn get(&self, room_id: &RoomId) -> Option<Room> {
		self.rooms.lock().get(room_id).cloned()
	}

	pub fn remove(&self, room_id: &RoomId) -> Option<Room> {
		self.rooms.lock().remove(room_id)
	}

	pub fn len(&self) -> usize {
		self.rooms.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.rooms.lock().is_empty()
	}
}
