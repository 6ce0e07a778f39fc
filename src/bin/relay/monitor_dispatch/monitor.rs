use std::sync::Arc;

use parking_lot::RwLock;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use sesli_server::ids::MonitorId;
use sesli_server::monitoring::{
	self, MonitorMessage, MonitoringEventCategory, RelayErrorReturn, RelayEvent,
};

struct Inner {
	id: MonitorId,
	evt_tx: UnboundedSender<RelayEvent>,
	listening_category: RwLock<MonitoringEventCategory>,
}

/// One attached monitor process. Events are queued on a channel and a
/// dedicated task pushes them onto the TCP stream, so the dispatch never
/// waits on a slow monitor. A second task reads the monitor's own messages
/// off the other half of the stream.
#[derive(Clone)]
pub struct Monitor {
	inner: Arc<Inner>,
}

impl Monitor {
	pub fn new(stream: TcpStream) -> Self {
		let (evt_tx, evt_rx) = mpsc::unbounded_channel();

		let monitor = Monitor {
			inner: Arc::new(Inner {
				id: MonitorId::new(),
				evt_tx,
				listening_category: RwLock::new(MonitoringEventCategory::Global),
			}),
		};

		let (tcp_read, tcp_write) = stream.into_split();

		tokio::spawn({
			let monitor = monitor.clone();
			async move {
				monitor.wait_for_events(evt_rx, tcp_write).await;
			}
		});

		tokio::spawn({
			let monitor = monitor.clone();
			async move {
				monitor.listen_to_monitor(tcp_read).await;
			}
		});

		monitor
	}

	pub fn id(&self) -> MonitorId {
		self.inner.id
	}

	/// Returns true if that event is of interest for this monitor
	pub fn is_interested(&self, evt: &RelayEvent) -> bool {
		match &*self.inner.listening_category.read() {
			MonitoringEventCategory::Global => true,
			MonitoringEventCategory::Room(listening_room_id) => match evt {
				RelayEvent::UserJoined { room_id, .. } | RelayEvent::UserLeft { room_id, .. } => {
					room_id == listening_room_id
				}
				RelayEvent::RoomOpened { id } => id == listening_room_id,
				_ => false,
			},
		}
	}

	/// Queues an event for this monitor. False means the forwarding task is
	/// gone and the monitor should be discarded.
	pub fn send(&self, evt: RelayEvent) -> bool {
		self.inner.evt_tx.send(evt).is_ok()
	}

	fn handle_monitor_message(&self, msg: MonitorMessage) {
		match msg {
			MonitorMessage::Greeting(name) => {
				log::info!("Monitor {} greeted as {name}", self.id());
			}
			MonitorMessage::SwitchCategory(category) => {
				log::info!("Monitor {} now listening to {category:?}", self.id());
				*self.inner.listening_category.write() = category;
			}
		}
	}

	async fn listen_to_monitor(self, mut tcp_read: OwnedReadHalf) {
		loop {
			let frame = match monitoring::read_frame(&mut tcp_read).await {
				Ok(frame) => frame,
				Err(e) if e.kind() == tokio::io::ErrorKind::UnexpectedEof => {
					log::debug!("Monitor {} closed its connection", self.id());
					break;
				}
				Err(e) => {
					log::warn!("Error reading from monitor {}: {e}", self.id());
					break;
				}
			};

			match bincode::deserialize::<MonitorMessage>(&frame) {
				Ok(msg) => self.handle_monitor_message(msg),
				Err(_) => {
					log::info!("Monitor {} sent an invalid message", self.id());
					self.send(RelayEvent::Error(RelayErrorReturn::UnreadableMessage));
				}
			}
		}
	}

	/// Waits for relay events and forwards them through the TCP connection
	async fn wait_for_events(
		self,
		mut evt_rx: UnboundedReceiver<RelayEvent>,
		mut tcp_write: OwnedWriteHalf,
	) {
		while let Some(evt) = evt_rx.recv().await {
			if let Err(e) = monitoring::write_frame(&mut tcp_write, &evt).await {
				log::warn!("Error sending to monitor {}: {e}. Closing its connection", self.id());
				break;
			}
		}
	}
}
