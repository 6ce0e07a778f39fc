use std::net::{Ipv4Addr, SocketAddrV4};

use sesli_server::connections::ConnectionRegistry;
use sesli_server::monitoring::RelayEvent;
use sesli_server::rooms_registry::RoomsRegistry;
use warp::filters::ws::{WebSocket, Ws};
use warp::Filter;

use crate::connection::ClientConnection;
use crate::monitor_dispatch::MonitorDispatch;
use crate::security::get_ssl_mode_settings;

pub type Error = Box<dyn std::error::Error + Send + Sync>;

pub struct RelayServerConfig {
	pub port: u16,
}

/// The shared registries every connection works against. Both are internally
/// synchronized handles, so the runtime clones freely into warp's filters.
#[derive(Default, Clone)]
pub struct RelayRuntime {
	pub rooms: RoomsRegistry,
	pub connections: ConnectionRegistry,
}

pub struct RelayServer {
	pub config: RelayServerConfig,
	pub runtime: RelayRuntime,
}

impl Default for RelayServerConfig {
	fn default() -> Self {
		RelayServerConfig { port: 8000 }
	}
}

impl Default for RelayServer {
	fn default() -> Self {
		RelayServer {
			config: RelayServerConfig::default(),
			runtime: RelayRuntime::default(),
		}
	}
}

impl RelayServer {
	pub async fn run(&self) -> Result<(), Error> {
		let with_runtime = warp::any().map({
			let runtime = self.runtime.clone();
			move || runtime.clone()
		});

		let routes = warp::path!("ws")
			.and(warp::ws())
			.and(with_runtime)
			.map(|ws: Ws, runtime: RelayRuntime| {
				ws.on_upgrade(move |websocket| handle_websocket(websocket, runtime))
			});

		let socket_addr = SocketAddrV4::new(Ipv4Addr::new(0, 0, 0, 0), self.config.port);

		let _ = MonitorDispatch::send_event(RelayEvent::ServerStarted);

		let server = warp::serve(routes);
		if let Some(ssl_settings) = get_ssl_mode_settings()? {
			log::info!("Serving on {socket_addr} in secure mode");
			server
				.tls()
				.cert_path(ssl_settings.cert_path)
				.key_path(ssl_settings.key_path)
				.run(socket_addr)
				.await;
		} else {
			log::info!("Serving on {socket_addr} in non-secure mode");
			server.run(socket_addr).await;
		}

		let _ = MonitorDispatch::send_event(RelayEvent::ServerClosed);
		Ok(())
	}
}

async fn handle_websocket(websocket: WebSocket, runtime: RelayRuntime) {
	let conn = ClientConnection::new(runtime.rooms, runtime.connections);
	conn.run(websocket).await;
}
