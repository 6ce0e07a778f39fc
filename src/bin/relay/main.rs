mod connection;
mod monitor_dispatch;
mod relay_server;
mod security;

use clap::Parser;
use monitor_dispatch::MonitorDispatch;
use relay_server::{RelayServer, RelayServerConfig};
use sesli_server::monitoring::RelayEvent;
use tokio::sync::mpsc;

#[derive(Clone, clap::ValueEnum, PartialEq)]
enum MonitoringMode {
	Enabled,
	Disabled,
}

#[derive(clap::Parser)]
struct Args {
	#[arg(short = 'm', long = "monitoring", value_enum)]
	monitoring_mode: MonitoringMode,
	#[arg(short = 'p', long = "port", default_value_t = 8000)]
	port: u16,
}

#[tokio::main]
async fn main() {
	env_logger::init();

	let args = Args::parse();

	let server = RelayServer {
		config: RelayServerConfig { port: args.port },
		..Default::default()
	};

	if args.monitoring_mode == MonitoringMode::Enabled {
		let channel = mpsc::unbounded_channel::<RelayEvent>();

		tokio::spawn(async move {
			MonitorDispatch::new().run(channel).await;
		});
	}

	if let Err(e) = server.run().await {
		log::error!("Server error: {e}");
		std::process::exit(1);
	}
}
