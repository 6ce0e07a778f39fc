mod error;
mod monitor;

pub use error::Error;

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::Arc;

use lazy_static::lazy_static;
use monitor::Monitor;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use sesli_server::monitoring::{RelayEvent, MONITORING_PORT};

lazy_static! {
	/// Installed by `run`; anything in the server process reports events
	/// through it without threading a sender around.
	static ref EVENT_SENDER: Mutex<Option<UnboundedSender<RelayEvent>>> = Mutex::new(None);
}

#[derive(Default)]
struct Inner {
	monitors: Vec<Monitor>,
}

/// Fans relay events out to every attached monitor process.
#[derive(Clone)]
pub struct MonitorDispatch {
	inner: Arc<Mutex<Inner>>,
}

impl MonitorDispatch {
	pub fn new() -> Self {
		MonitorDispatch {
			inner: Arc::new(Mutex::new(Inner::default())),
		}
	}

	/// Reports an event to whatever monitors are attached. A server running
	/// without monitoring gets `NoDispatchRunning` back and ignores it.
	pub fn send_event(evt: RelayEvent) -> Result<(), Error> {
		match EVENT_SENDER.lock().as_ref() {
			Some(sender) => sender.send(evt).map_err(|_| Error::NoDispatchRunning),
			None => Err(Error::NoDispatchRunning),
		}
	}

	fn add_monitor(&self, monitor: Monitor) {
		self.inner.lock().monitors.push(monitor);
	}

	pub async fn run(self, channel: (UnboundedSender<RelayEvent>, UnboundedReceiver<RelayEvent>)) {
		{
			// Sender is now available
			*EVENT_SENDER.lock() = Some(channel.0);
		}

		tokio::spawn({
			let other_self = self.clone();
			async move {
				other_self.accept_incoming_connections().await;
			}
		});

		log::info!("Monitor dispatch is running");
		self.receive_events(channel.1).await;
	}

	async fn receive_events(self, mut receiver: UnboundedReceiver<RelayEvent>) {
		while let Some(evt) = receiver.recv().await {
			let mut inner = self.inner.lock();

			// A failed send means the monitor's forwarding task is gone;
			// drop it from the list.
			inner.monitors.retain(|monitor| {
				if monitor.is_interested(&evt) && !monitor.send(evt.clone()) {
					log::info!("Monitor {} detached", monitor.id());
					return false;
				}
				true
			});
		}

		log::info!("Monitor dispatch closing");
	}

	async fn accept_incoming_connections(self) {
		let listener = match TcpListener::bind(SocketAddrV4::new(Ipv4Addr::new(0, 0, 0, 0), MONITORING_PORT)).await {
			Ok(listener) => listener,
			Err(e) => {
				log::error!("Failed to bind the monitoring listener: {e}");
				return;
			}
		};

		log::info!("Monitor dispatch now accepting connections on port {MONITORING_PORT}");

		loop {
			match listener.accept().await {
				Ok((stream, _)) => {
					self.add_monitor(Monitor::new(stream));
					let _ = MonitorDispatch::send_event(RelayEvent::MonitorAccepted);
				}
				Err(e) => log::warn!("Failed to accept a monitor connection: {e}"),
			}
		}
	}
}
