use sesli_server::ids::{ChannelName, ConnectionId, RoomId};
use sesli_server::message::ServerMessage;
use sesli_server::room::{Rejection, Room};
use sesli_server::rooms_registry::RoomsRegistry;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

type Outbox = UnboundedReceiver<ServerMessage>;

fn join(room: &Room, nickname: &str) -> (ConnectionId, Outbox) {
	let id = ConnectionId::new();
	let (tx, rx) = unbounded_channel();
	room.join(id, nickname.to_string(), tx);
	(id, rx)
}

fn drain(rx: &mut Outbox) -> Vec<ServerMessage> {
	let mut out = Vec::new();
	while let Ok(msg) = rx.try_recv() {
		out.push(msg);
	}
	out
}

#[test]
fn joiner_gets_snapshot_then_everyone_gets_user_list() {
	let room = Room::new(RoomId::new("R1"));
	let (alice, mut alice_rx) = join(&room, "Alice");

	let received = drain(&mut alice_rx);
	assert_eq!(received.len(), 2);
	match &received[0] {
		ServerMessage::InitRoomState(snapshot) => {
			assert_eq!(snapshot.owner_id, Some(alice));
			assert_eq!(snapshot.users.len(), 1);
			let channels: Vec<&str> = snapshot.channels.iter().map(|c| c.as_str()).collect();
			assert_eq!(channels, vec!["Genel", "Oyun", "Müzik"]);
		}
		other => panic!("expected the full snapshot first, got {other:?}"),
	}
	assert!(matches!(&received[1], ServerMessage::UserListUpdate { users } if users.len() == 1));
}

#[test]
fn second_joiner_sees_existing_owner() {
	let room = Room::new(RoomId::new("R1"));
	let (alice, mut alice_rx) = join(&room, "Alice");
	drain(&mut alice_rx);

	let (_bob, mut bob_rx) = join(&room, "Bob");

	// Both sides got the membership change.
	let to_alice = drain(&mut alice_rx);
	assert_eq!(to_alice.len(), 1);
	assert!(matches!(&to_alice[0], ServerMessage::UserListUpdate { users } if users.len() == 2));

	let to_bob = drain(&mut bob_rx);
	match &to_bob[0] {
		ServerMessage::InitRoomState(snapshot) => assert_eq!(snapshot.owner_id, Some(alice)),
		other => panic!("expected the full snapshot first, got {other:?}"),
	}
}

#[test]
fn channel_creation_broadcasts_a_snapshot_to_everyone() {
	let room = Room::new(RoomId::new("R1"));
	let (alice, mut alice_rx) = join(&room, "Alice");
	let (_bob, mut bob_rx) = join(&room, "Bob");
	drain(&mut alice_rx);
	drain(&mut bob_rx);

	room.create_channel(alice, ChannelName::new("Sohbet")).unwrap();

	for rx in [&mut alice_rx, &mut bob_rx] {
		let received = drain(rx);
		assert_eq!(received.len(), 1);
		match &received[0] {
			ServerMessage::InitRoomState(snapshot) => assert_eq!(snapshot.channels.len(), 4),
			other => panic!("expected a snapshot, got {other:?}"),
		}
	}
}

#[test]
fn non_owner_channel_ops_change_nothing_and_send_nothing() {
	let room = Room::new(RoomId::new("R1"));
	let (_alice, mut alice_rx) = join(&room, "Alice");
	let (bob, mut bob_rx) = join(&room, "Bob");
	drain(&mut alice_rx);
	drain(&mut bob_rx);

	assert_eq!(
		room.create_channel(bob, ChannelName::new("Sohbet")),
		Err(Rejection::NotOwner)
	);
	assert_eq!(
		room.delete_channel(bob, &ChannelName::new("Genel")),
		Err(Rejection::NotOwner)
	);

	assert!(drain(&mut alice_rx).is_empty());
	assert!(drain(&mut bob_rx).is_empty());
	assert_eq!(room.snapshot().channels.len(), 3);
}

#[test]
fn owner_departure_promotes_earliest_joiner_and_snapshots() {
	let room = Room::new(RoomId::new("R1"));
	let (alice, mut alice_rx) = join(&room, "Alice");
	let (bob, mut bob_rx) = join(&room, "Bob");
	drain(&mut alice_rx);
	drain(&mut bob_rx);

	room.leave(alice).unwrap();

	let received = drain(&mut bob_rx);
	assert!(received
		.iter()
		.any(|msg| matches!(msg, ServerMessage::InitRoomState(s) if s.owner_id == Some(bob))));
	assert!(received
		.iter()
		.any(|msg| matches!(msg, ServerMessage::UserListUpdate { users } if users.len() == 1)));
}

#[test]
fn deleting_an_occupied_channel_evicts_to_lobby_on_the_wire() {
	let room = Room::new(RoomId::new("R1"));
	let (alice, mut alice_rx) = join(&room, "Alice");
	let (carol, mut carol_rx) = join(&room, "Carol");
	room.change_channel(carol, Some(ChannelName::new("Genel"))).unwrap();
	drain(&mut alice_rx);
	drain(&mut carol_rx);

	room.delete_channel(alice, &ChannelName::new("Genel")).unwrap();

	let received = drain(&mut carol_rx);
	// Topology and membership both changed: snapshot plus user list.
	assert_eq!(received.len(), 2);
	match &received[0] {
		ServerMessage::InitRoomState(snapshot) => {
			assert!(!snapshot.channels.contains(&ChannelName::new("Genel")));
		}
		other => panic!("expected a snapshot, got {other:?}"),
	}
	match &received[1] {
		ServerMessage::UserListUpdate { users } => {
			let carol_entry = users.iter().find(|u| u.id == carol).unwrap();
			assert_eq!(carol_entry.channel, None);
		}
		other => panic!("expected a user list, got {other:?}"),
	}
}

#[test]
fn kicked_target_gets_terminal_notice_and_leaves_the_broadcast_group() {
	let room = Room::new(RoomId::new("R1"));
	let (alice, mut alice_rx) = join(&room, "Alice");
	let (bob, mut bob_rx) = join(&room, "Bob");
	drain(&mut alice_rx);
	drain(&mut bob_rx);

	room.kick(alice, bob).unwrap();

	let to_bob = drain(&mut bob_rx);
	assert_eq!(to_bob.len(), 1);
	assert!(matches!(to_bob[0], ServerMessage::Kicked));

	// Remaining members get exactly one user-list update, no snapshot.
	let to_alice = drain(&mut alice_rx);
	assert_eq!(to_alice.len(), 1);
	assert!(matches!(&to_alice[0], ServerMessage::UserListUpdate { users } if users.len() == 1));

	// The kicked connection hears nothing further.
	room.send_chat("Alice".into(), "hello?".into());
	assert!(drain(&mut bob_rx).is_empty());
}

#[test]
fn kicking_the_owner_transfers_ownership_like_a_leave() {
	let room = Room::new(RoomId::new("R1"));
	let (alice, mut alice_rx) = join(&room, "Alice");
	let (bob, mut bob_rx) = join(&room, "Bob");
	drain(&mut alice_rx);
	drain(&mut bob_rx);

	// Owner removing themself is the degenerate case of the unified path.
	let departure = room.kick(alice, alice).unwrap();
	assert!(departure.owner_changed);

	let received = drain(&mut bob_rx);
	assert!(received
		.iter()
		.any(|msg| matches!(msg, ServerMessage::InitRoomState(s) if s.owner_id == Some(bob))));
}

#[test]
fn mute_reaches_only_the_target() {
	let room = Room::new(RoomId::new("R1"));
	let (alice, mut alice_rx) = join(&room, "Alice");
	let (bob, mut bob_rx) = join(&room, "Bob");
	drain(&mut alice_rx);
	drain(&mut bob_rx);

	room.mute(alice, bob).unwrap();

	let to_bob = drain(&mut bob_rx);
	assert_eq!(to_bob.len(), 1);
	assert!(matches!(to_bob[0], ServerMessage::Muted));
	assert!(drain(&mut alice_rx).is_empty());
}

#[test]
fn chat_fan_out_includes_the_sender() {
	let room = Room::new(RoomId::new("R1"));
	let (_alice, mut alice_rx) = join(&room, "Alice");
	let (_bob, mut bob_rx) = join(&room, "Bob");
	drain(&mut alice_rx);
	drain(&mut bob_rx);

	room.send_chat("Alice".into(), "selam".into());

	for rx in [&mut alice_rx, &mut bob_rx] {
		let received = drain(rx);
		assert_eq!(received.len(), 1);
		match &received[0] {
			ServerMessage::NewMessage { nickname, text, timestamp, .. } => {
				assert_eq!(nickname, "Alice");
				assert_eq!(text, "selam");
				assert_eq!(timestamp.len(), 5); // HH:MM
			}
			other => panic!("expected the chat message, got {other:?}"),
		}
	}
}

#[test]
fn voice_state_excludes_the_speaker() {
	let room = Room::new(RoomId::new("R1"));
	let (alice, mut alice_rx) = join(&room, "Alice");
	let (_bob, mut bob_rx) = join(&room, "Bob");
	drain(&mut alice_rx);
	drain(&mut bob_rx);

	room.voice_state(alice, true);

	assert!(drain(&mut alice_rx).is_empty());
	let to_bob = drain(&mut bob_rx);
	assert_eq!(to_bob.len(), 1);
	assert!(matches!(
		&to_bob[0],
		ServerMessage::VoiceStateUpdate { id, is_speaking: true } if *id == alice
	));
}

#[test]
fn screen_share_start_carries_the_server_side_nickname() {
	let room = Room::new(RoomId::new("R1"));
	let (alice, mut alice_rx) = join(&room, "Alice");
	let (_bob, mut bob_rx) = join(&room, "Bob");
	drain(&mut alice_rx);
	drain(&mut bob_rx);

	room.screen_share_started(alice, ChannelName::new("Oyun"));

	let to_bob = drain(&mut bob_rx);
	match &to_bob[0] {
		ServerMessage::UserScreenShareStarted { id, nickname, channel_name } => {
			assert_eq!(*id, alice);
			assert_eq!(nickname.as_deref(), Some("Alice"));
			assert_eq!(channel_name, &ChannelName::new("Oyun"));
		}
		other => panic!("expected a screen share notice, got {other:?}"),
	}
}

#[test]
fn full_room_lifecycle_scenario() {
	// The end-to-end walk: claim, grow, reconfigure, hand over, evict.
	let registry = RoomsRegistry::new();
	let (room, created) = registry.get_or_create(&RoomId::new("R1"));
	assert!(created);

	let (alice, mut alice_rx) = join(&room, "Alice");
	let (bob, mut bob_rx) = join(&room, "Bob");
	let (carol, mut carol_rx) = join(&room, "Carol");
	room.change_channel(carol, Some(ChannelName::new("Genel"))).unwrap();
	drain(&mut alice_rx);
	drain(&mut bob_rx);
	drain(&mut carol_rx);

	room.create_channel(alice, ChannelName::new("Sohbet")).unwrap();
	room.leave(alice).unwrap();

	// Bob inherited the room with four channels.
	let to_bob = drain(&mut bob_rx);
	let last_snapshot = to_bob
		.iter()
		.rev()
		.find_map(|msg| match msg {
			ServerMessage::InitRoomState(s) => Some(s),
			_ => None,
		})
		.expect("ownership change must carry a snapshot");
	assert_eq!(last_snapshot.owner_id, Some(bob));
	assert_eq!(last_snapshot.channels.len(), 4);

	// The new owner may reshape the room the old one seeded.
	room.delete_channel(bob, &ChannelName::new("Genel")).unwrap();
	let to_carol = drain(&mut carol_rx);
	assert!(to_carol.iter().any(|msg| matches!(
		msg,
		ServerMessage::UserListUpdate { users }
			if users.iter().any(|u| u.id == carol && u.channel.is_none())
	)));

	// Same code, same room: the registry kept it.
	let (again, created) = registry.get_or_create(&RoomId::new("R1"));
	assert!(!created);
	assert_eq!(again.id(), room.id());
}
