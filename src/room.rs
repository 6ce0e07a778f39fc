use std::collections::HashMap;
use std::sync::Arc;

use chrono::Local;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

use crate::ids::{ChannelName, ConnectionId, RoomId};
use crate::message::{RoomSnapshot, ServerMessage};

/// Channels every freshly created room starts with, in this order.
pub const DEFAULT_CHANNELS: [&str; 3] = ["Genel", "Oyun", "Müzik"];

/// Outbound half of a member's connection. Sends never block; the connection
/// task drains the channel onto the websocket.
pub type OutboundSender = UnboundedSender<ServerMessage>;

/// One present user. `channel: None` means in the room but in no voice
/// channel (the lobby).
#[derive(Debug, Clone, Serialize)]
pub struct User {
	pub id: ConnectionId,
	pub nickname: String,
	pub channel: Option<ChannelName>,
}

/// Why an operation changed nothing. The wire protocol stays silent on all
/// of these; they exist so callers can log and tests can assert the no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
	NotOwner,
	ChannelExists,
	NoSuchChannel,
	NoSuchUser,
}

/// What a user's departure (leave or kick) did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
	/// The departed user held ownership, which moved to the earliest
	/// remaining joiner, or lapsed if the room emptied.
	pub owner_changed: bool,
}

/// The mutable state of a single room. All methods are plain transitions,
/// no I/O; `Room` holds one of these behind a mutex and does the sending.
pub struct RoomState {
	users: Vec<User>,
	channels: Vec<ChannelName>,
	owner_id: Option<ConnectionId>,
	members: HashMap<ConnectionId, OutboundSender>,
}

impl RoomState {
	pub fn new() -> Self {
		RoomState {
			users: Vec::new(),
			channels: DEFAULT_CHANNELS.iter().map(|name| ChannelName::new(*name)).collect(),
			owner_id: None,
			members: HashMap::new(),
		}
	}

	/// The one place owner-gated operations check authorization: bare
	/// connection-identity equality, no secondary credential.
	pub fn is_owner(&self, id: ConnectionId) -> bool {
		self.owner_id == Some(id)
	}

	pub fn owner_id(&self) -> Option<ConnectionId> {
		self.owner_id
	}

	pub fn users(&self) -> &[User] {
		&self.users
	}

	pub fn channels(&self) -> &[ChannelName] {
		&self.channels
	}

	pub fn snapshot(&self) -> RoomSnapshot {
		RoomSnapshot {
			users: self.users.clone(),
			channels: self.channels.clone(),
			owner_id: self.owner_id,
		}
	}

	pub fn nickname_of(&self, id: ConnectionId) -> Option<String> {
		self.users
			.iter()
			.find(|u| u.id == id)
			.map(|u| u.nickname.clone())
	}

	/// Adds a user, or refreshes their nickname when the same connection
	/// joins twice. An ownerless room is claimed by whoever joins it.
	pub fn join(&mut self, id: ConnectionId, nickname: String, sender: OutboundSender) {
		match self.users.iter_mut().find(|u| u.id == id) {
			Some(user) => user.nickname = nickname,
			None => self.users.push(User {
				id,
				nickname,
				channel: None,
			}),
		}

		self.members.insert(id, sender);

		if self.owner_id.is_none() {
			self.owner_id = Some(id);
		}
	}

	pub fn create_channel(
		&mut self,
		requester: ConnectionId,
		name: ChannelName,
	) -> Result<(), Rejection> {
		if !self.is_owner(requester) {
			return Err(Rejection::NotOwner);
		}
		if self.channels.contains(&name) {
			return Err(Rejection::ChannelExists);
		}

		self.channels.push(name);
		Ok(())
	}

	/// Removes a channel and evicts its occupants to the lobby, keeping the
	/// invariant that no user references a channel the room doesn't have.
	pub fn delete_channel(
		&mut self,
		requester: ConnectionId,
		name: &ChannelName,
	) -> Result<(), Rejection> {
		if !self.is_owner(requester) {
			return Err(Rejection::NotOwner);
		}
		let idx = self
			.channels
			.iter()
			.position(|c| c == name)
			.ok_or(Rejection::NoSuchChannel)?;

		self.channels.remove(idx);
		for user in self.users.iter_mut() {
			if user.channel.as_ref() == Some(name) {
				user.channel = None;
			}
		}

		Ok(())
	}

	/// Any member may move themself. The target channel is not validated
	/// against the channel list; the protocol trusts the client here.
	pub fn change_channel(
		&mut self,
		id: ConnectionId,
		channel: Option<ChannelName>,
	) -> Result<(), Rejection> {
		let user = self
			.users
			.iter_mut()
			.find(|u| u.id == id)
			.ok_or(Rejection::NoSuchUser)?;

		user.channel = channel;
		Ok(())
	}

	/// Removes a user and settles ownership. Shared by leave and kick so an
	/// owner's departure always transfers ownership the same way: earliest
	/// remaining joiner, or nobody if the room emptied.
	fn remove_user(&mut self, id: ConnectionId) -> Result<(Departure, Option<OutboundSender>), Rejection> {
		let idx = self
			.users
			.iter()
			.position(|u| u.id == id)
			.ok_or(Rejection::NoSuchUser)?;

		self.users.remove(idx);
		let sender = self.members.remove(&id);

		let mut owner_changed = false;
		if self.owner_id == Some(id) {
			self.owner_id = self.users.first().map(|u| u.id);
			owner_changed = true;
		}

		Ok((Departure { owner_changed }, sender))
	}

	pub fn leave(&mut self, id: ConnectionId) -> Result<Departure, Rejection> {
		self.remove_user(id).map(|(departure, _)| departure)
	}

	pub fn kick(
		&mut self,
		requester: ConnectionId,
		target: ConnectionId,
	) -> Result<(Departure, Option<OutboundSender>), Rejection> {
		if !self.is_owner(requester) {
			return Err(Rejection::NotOwner);
		}
		self.remove_user(target)
	}

	/// Owner-gated lookup of the target's outbound sender; mute is a
	/// one-shot directive, the room keeps no muted flag.
	pub fn mute(
		&self,
		requester: ConnectionId,
		target: ConnectionId,
	) -> Result<OutboundSender, Rejection> {
		if !self.is_owner(requester) {
			return Err(Rejection::NotOwner);
		}
		self.members.get(&target).cloned().ok_or(Rejection::NoSuchUser)
	}

	fn send_to(&self, id: ConnectionId, msg: ServerMessage) {
		if let Some(sender) = self.members.get(&id) {
			if sender.send(msg).is_err() {
				log::warn!("Dropping message for {id}: connection channel closed");
			}
		}
	}

	fn broadcast(&self, msg: ServerMessage) {
		for (id, sender) in self.members.iter() {
			if sender.send(msg.clone()).is_err() {
				log::warn!("Dropping broadcast for {id}: connection channel closed");
			}
		}
	}

	fn broadcast_except(&self, excluded: ConnectionId, msg: ServerMessage) {
		for (id, sender) in self.members.iter() {
			if *id == excluded {
				continue;
			}
			if sender.send(msg.clone()).is_err() {
				log::warn!("Dropping broadcast for {id}: connection channel closed");
			}
		}
	}
}

impl Default for RoomState {
	fn default() -> Self {
		Self::new()
	}
}

struct Inner {
	id: RoomId,
	state: Mutex<RoomState>,
}

/// A handle to one room. Cheap to clone and safe to pass between tasks;
/// every operation takes the room's mutex for the whole read-modify-write
/// so transitions on the same room never interleave.
#[derive(Clone)]
pub struct Room {
	inner: Arc<Inner>,
}

impl Room {
	pub fn new(id: RoomId) -> Self {
		Room {
			inner: Arc::new(Inner {
				id,
				state: Mutex::new(RoomState::new()),
			}),
		}
	}

	pub fn id(&self) -> RoomId {
		self.inner.id.clone()
	}

	pub fn snapshot(&self) -> RoomSnapshot {
		self.inner.state.lock().snapshot()
	}

	/// Join: the joiner alone gets the full snapshot, everyone (joiner
	/// included) gets the refreshed user list.
	pub fn join(&self, id: ConnectionId, nickname: String, sender: OutboundSender) {
		let mut state = self.inner.state.lock();
		state.join(id, nickname, sender);

		state.send_to(id, ServerMessage::InitRoomState(state.snapshot()));
		state.broadcast(ServerMessage::UserListUpdate {
			users: state.users().to_vec(),
		});
	}

	pub fn create_channel(
		&self,
		requester: ConnectionId,
		name: ChannelName,
	) -> Result<(), Rejection> {
		let mut state = self.inner.state.lock();
		state.create_channel(requester, name)?;

		state.broadcast(ServerMessage::InitRoomState(state.snapshot()));
		Ok(())
	}

	/// Channel membership changed for every evicted occupant, so both the
	/// snapshot and the user list go out.
	pub fn delete_channel(
		&self,
		requester: ConnectionId,
		name: &ChannelName,
	) -> Result<(), Rejection> {
		let mut state = self.inner.state.lock();
		state.delete_channel(requester, name)?;

		state.broadcast(ServerMessage::InitRoomState(state.snapshot()));
		state.broadcast(ServerMessage::UserListUpdate {
			users: state.users().to_vec(),
		});
		Ok(())
	}

	pub fn change_channel(
		&self,
		id: ConnectionId,
		channel: Option<ChannelName>,
	) -> Result<(), Rejection> {
		let mut state = self.inner.state.lock();
		state.change_channel(id, channel)?;

		state.broadcast(ServerMessage::UserListUpdate {
			users: state.users().to_vec(),
		});
		Ok(())
	}

	/// The target gets a terminal `kicked` notice on its way out of the
	/// broadcast group; the rest learn through the usual deltas.
	pub fn kick(&self, requester: ConnectionId, target: ConnectionId) -> Result<Departure, Rejection> {
		let mut state = self.inner.state.lock();
		let (departure, kicked_sender) = state.kick(requester, target)?;

		if let Some(sender) = kicked_sender {
			let _ = sender.send(ServerMessage::Kicked);
		}
		self.notify_departure(&state, departure);
		Ok(departure)
	}

	pub fn mute(&self, requester: ConnectionId, target: ConnectionId) -> Result<(), Rejection> {
		let state = self.inner.state.lock();
		let sender = state.mute(requester, target)?;

		let _ = sender.send(ServerMessage::Muted);
		Ok(())
	}

	pub fn leave(&self, id: ConnectionId) -> Result<Departure, Rejection> {
		let mut state = self.inner.state.lock();
		let departure = state.leave(id)?;

		self.notify_departure(&state, departure);
		Ok(departure)
	}

	fn notify_departure(&self, state: &RoomState, departure: Departure) {
		// Ownership moved: clients must relearn the owner, which only the
		// full snapshot carries.
		if departure.owner_changed {
			state.broadcast(ServerMessage::InitRoomState(state.snapshot()));
		}
		state.broadcast(ServerMessage::UserListUpdate {
			users: state.users().to_vec(),
		});
	}

	/// Chat fan-out, sender included. The id is unix milliseconds: roughly
	/// monotonic, not required unique.
	pub fn send_chat(&self, nickname: String, text: String) {
		let id = Local::now().timestamp_millis() as u64;
		let timestamp = Local::now().format("%H:%M").to_string();

		let state = self.inner.state.lock();
		state.broadcast(ServerMessage::NewMessage {
			id,
			nickname,
			text,
			timestamp,
		});
	}

	pub fn voice_state(&self, from: ConnectionId, is_speaking: bool) {
		let state = self.inner.state.lock();
		state.broadcast_except(from, ServerMessage::VoiceStateUpdate { id: from, is_speaking });
	}

	pub fn screen_share_started(&self, from: ConnectionId, channel_name: ChannelName) {
		let state = self.inner.state.lock();
		state.broadcast_except(
			from,
			ServerMessage::UserScreenShareStarted {
				id: from,
				nickname: state.nickname_of(from),
				channel_name,
			},
		);
	}

	pub fn screen_share_stopped(&self, from: ConnectionId) {
		let state = self.inner.state.lock();
		state.broadcast_except(from, ServerMessage::UserScreenShareStopped { id: from });
	}

	pub fn is_empty(&self) -> bool {
		self.inner.state.lock().users().is_empty()
	}
}
