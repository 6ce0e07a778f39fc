use std::sync::Arc;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{error::SendError, UnboundedReceiver, UnboundedSender};
use warp::filters::ws;
use warp::ws::WebSocket;

use sesli_server::connections::ConnectionRegistry;
use sesli_server::ids::ConnectionId;
use sesli_server::message::{ClientMessage, Internal, Message, ServerMessage};
use sesli_server::monitoring::RelayEvent;
use sesli_server::room::OutboundSender;
use sesli_server::rooms_registry::RoomsRegistry;
use sesli_server::websocket::WsMessageKind;

use crate::monitor_dispatch::MonitorDispatch;

struct Inner {
	id: ConnectionId,
	rooms: RoomsRegistry,
	connections: ConnectionRegistry,
}

/// One live client socket. Owns the connection's server-assigned identity
/// and bridges the websocket to the room machinery; dropping the last clone
/// is the disconnect, which counts as leaving the room.
#[derive(Clone)]
pub struct ClientConnection {
	inner: Arc<Inner>,
}

impl ClientConnection {
	pub fn new(rooms: RoomsRegistry, connections: ConnectionRegistry) -> Self {
		ClientConnection {
			inner: Arc::new(Inner {
				id: ConnectionId::new(),
				rooms,
				connections,
			}),
		}
	}

	pub async fn run(&self, websocket: WebSocket) {
		log::info!("New connection {}", self.inner.id);

		let (ws_tx, ws_rx) = websocket.split();
		let (ch_tx, ch_rx) = mpsc::unbounded_channel::<Message>();

		// Rooms and the connection registry hold this sender; whatever they
		// emit is funneled into the connection's channel.
		let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();
		self.inner.connections.register(self.inner.id, outbound.clone());

		{
			let ch_tx = ch_tx.clone();
			tokio::spawn(async move {
				while let Some(msg) = outbound_rx.recv().await {
					if ch_tx.send(msg.into()).is_err() {
						break;
					}
				}
			});
		}

		// The task that'll handle web socket messages
		{
			let ch_tx = ch_tx.clone();
			let conn = self.clone();
			tokio::spawn(async move {
				if let Err(e) = conn.receive_ws_messages(ws_rx, ch_tx, outbound).await {
					log::error!("Error sending message through the channel: {e}");
				}
			});
		}

		// This is what blocks the "run" function
		// It receives various internal messages and handles them
		self.handle_channel_endpoint(ws_tx, ch_rx).await;
	}

	async fn receive_ws_messages(
		&self,
		mut ws_rx: SplitStream<WebSocket>,
		ch_tx: UnboundedSender<Message>,
		outbound: OutboundSender,
	) -> Result<(), SendError<Message>> {
		// Cut connection when there are too many errors
		let mut ws_error_counter = 0;
		const MAX_ERRORS: u8 = 3;

		while let Some(msg) = ws_rx.next().await {
			let msg = match msg {
				Ok(msg) => WsMessageKind::from(msg),
				Err(e) => {
					ws_error_counter += 1;

					if ws_error_counter <= MAX_ERRORS {
						log::warn!("websocket error: {e}. {ws_error_counter}/{MAX_ERRORS} errors. Keeping connection alive");
						continue;
					} else {
						log::error!("websocket error: {e}. {ws_error_counter}/{MAX_ERRORS} errors. Closing connection");
						ch_tx.send(Internal::Close.into())?;
						break;
					}
				}
			};

			match msg {
				WsMessageKind::Ping(data) => {
					ch_tx.send(WsMessageKind::Pong(data).into())?;
				}
				WsMessageKind::Pong(_) => log::debug!("Received pong from connection {}", self.inner.id),
				WsMessageKind::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
					Ok(client_msg) => self.handle_client_message(client_msg, &outbound),
					Err(e) => {
						log::warn!("Connection {} sent an unreadable message: {e}", self.inner.id);
						ch_tx.send(
							ServerMessage::Warning(
								"Could not interpret the last message as a known event".into(),
							)
							.into(),
						)?;
					}
				},
				WsMessageKind::Binary(_) => {
					// Not a critical error, just warn the client
					log::warn!("Received binary message from {}. The server does not handle binary messages", self.inner.id);
					ch_tx.send(
						ServerMessage::Warning(
							"Binary messages are not handled by the server. Please provide data in an expected JSON format".into(),
						)
						.into(),
					)?;
				}
				WsMessageKind::Close(_) => {
					ch_tx.send(Internal::Close.into())?;
					break;
				}
				WsMessageKind::Unexpected(_) => {
					log::warn!("Received an unexpected websocket frame from {}", self.inner.id);
				}
			}
		}

		Ok(())
	}

	/// Applies one client event. Unauthorized or dangling requests are
	/// deliberately silent on the wire: the room operations report them as
	/// typed rejections and they end here, in a debug line.
	fn handle_client_message(&self, msg: ClientMessage, outbound: &OutboundSender) {
		let id = self.inner.id;

		match msg {
			ClientMessage::JoinRoom { room_id, nickname } => {
				let (room, created) = self.inner.rooms.get_or_create(&room_id);
				if created {
					let _ = MonitorDispatch::send_event(RelayEvent::RoomOpened {
						id: room_id.clone(),
					});
				}

				log::info!("{nickname} ({id}) joined room {room_id}");
				room.join(id, nickname, outbound.clone());
				self.inner.connections.bind_room(id, room_id.clone());

				let _ = MonitorDispatch::send_event(RelayEvent::UserJoined {
					room_id,
					connection_id: id,
				});
			}
			ClientMessage::CreateChannel { room_id, channel_name } => {
				let Some(room) = self.inner.rooms.get(&room_id) else { return };
				if let Err(rejection) = room.create_channel(id, channel_name) {
					log::debug!("create-channel by {id} ignored: {rejection:?}");
				}
			}
			ClientMessage::DeleteChannel { room_id, channel_name } => {
				let Some(room) = self.inner.rooms.get(&room_id) else { return };
				if let Err(rejection) = room.delete_channel(id, &channel_name) {
					log::debug!("delete-channel by {id} ignored: {rejection:?}");
				}
			}
			ClientMessage::JoinChannel { room_id, channel_name } => {
				let Some(room) = self.inner.rooms.get(&room_id) else { return };
				if let Err(rejection) = room.change_channel(id, channel_name) {
					log::debug!("join-channel by {id} ignored: {rejection:?}");
				}
			}
			ClientMessage::KickUser { room_id, target_id } => {
				let Some(room) = self.inner.rooms.get(&room_id) else { return };
				match room.kick(id, target_id) {
					Ok(_) => {
						// The target stays connected but no longer belongs
						// to the room, so its eventual disconnect must not
						// run the leave transition there.
						self.inner.connections.clear_room(target_id);
						let _ = MonitorDispatch::send_event(RelayEvent::UserLeft {
							room_id,
							connection_id: target_id,
						});
					}
					Err(rejection) => log::debug!("kick-user by {id} ignored: {rejection:?}"),
				}
			}
			ClientMessage::MuteUser { room_id, target_id } => {
				let Some(room) = self.inner.rooms.get(&room_id) else { return };
				if let Err(rejection) = room.mute(id, target_id) {
					log::debug!("mute-user by {id} ignored: {rejection:?}");
				}
			}
			ClientMessage::SendMessage { room_id, nickname, message } => {
				let Some(room) = self.inner.rooms.get(&room_id) else { return };
				room.send_chat(nickname, message);
			}
			ClientMessage::Signal { to, from, signal } => {
				// Opaque relay, unscoped by room; an unknown target is not
				// an error the sender learns about.
				if !self.inner.connections.send_to(to, ServerMessage::Signal { from, signal }) {
					log::debug!("signal from {id} to unknown connection {to}");
				}
			}
			ClientMessage::VoiceState { room_id, is_speaking } => {
				let Some(room) = self.inner.rooms.get(&room_id) else { return };
				room.voice_state(id, is_speaking);
			}
			ClientMessage::ScreenShareStarted { room_id, channel_name } => {
				let Some(room) = self.inner.rooms.get(&room_id) else { return };
				room.screen_share_started(id, channel_name);
			}
			ClientMessage::ScreenShareStopped { room_id, .. } => {
				let Some(room) = self.inner.rooms.get(&room_id) else { return };
				room.screen_share_stopped(id);
			}
		}
	}

	async fn handle_channel_endpoint(
		&self,
		mut ws_tx: SplitSink<WebSocket, ws::Message>,
		mut ch_rx: UnboundedReceiver<Message>,
	) {
		let mut send_error_counter = 0;
		const MAX_ERRORS: u8 = 3;

		while let Some(msg) = ch_rx.recv().await {
			let result = match msg {
				Message::WebSocket(ws_msg) => match ws_msg {
					WsMessageKind::Ping(bytes) => ws_tx.send(ws::Message::ping(bytes)).await,
					WsMessageKind::Pong(bytes) => ws_tx.send(ws::Message::pong(bytes)).await,
					_ => unimplemented!("Requested the server to send an unimplemented websocket message kind"),
				},
				Message::Internal(int_msg) => match int_msg {
					Internal::Close => {
						// End connection
						return; /* bye bye */
					}
				},
				Message::Server(srv_msg) => match serde_json::to_string(&srv_msg) {
					Ok(json_msg) => ws_tx.send(ws::Message::text(json_msg)).await,
					Err(e) => {
						log::error!("A server message couldn't be converted to JSON. This should never happen. Error: {e:?}");
						continue;
					}
				},
			};

			if let Err(e) = result {
				send_error_counter += 1;
				if send_error_counter < MAX_ERRORS {
					log::warn!("Error sending message: {e}\n{send_error_counter}/{MAX_ERRORS}; Keeping connection alive");
					continue;
				} else {
					log::error!("Error sending message: {e}\n{send_error_counter}/{MAX_ERRORS}; Closing connection");
					break;
				}
			}
		}
	}
}

impl Drop for Inner {
	fn drop(&mut self) {
		log::info!("Connection {} is leaving", self.id);

		// Connection loss is a leave: settle room state through the same
		// transition an explicit departure takes.
		if let Some(room_id) = self.connections.unregister(self.id) {
			if let Some(room) = self.rooms.get(&room_id) {
				let _ = room.leave(self.id);
			}

			let _ = MonitorDispatch::send_event(RelayEvent::UserLeft {
				room_id,
				connection_id: self.id,
			});
		}
	}
}
