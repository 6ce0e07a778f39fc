use std::net::{Ipv4Addr, SocketAddrV4};

use clap::Parser;
use sesli_server::ids::RoomId;
use sesli_server::monitoring::{
	self, MonitorMessage, MonitoringEventCategory, RelayEvent, MONITORING_PORT,
};
use tokio::net::TcpStream;

/// CLI Args for this brother
#[derive(Parser, Debug)]
struct Args {
	#[arg(short = 'r', long = "remote", value_name = "IPV4 Address")]
	/// The relay server's IPv4 address, port unspecified
	relay_addr: Option<Ipv4Addr>,

	#[arg(long = "room", value_name = "ROOM CODE")]
	/// Only report events concerning this room instead of global ones
	room: Option<String>,
}

#[tokio::main]
async fn main() {
	env_logger::init();

	let args = Args::parse();

	let relay_addr = match args.relay_addr {
		Some(addr) => addr,
		None => {
			println!("No address specified, using localhost");
			Ipv4Addr::LOCALHOST
		}
	};

	let relay_addr = SocketAddrV4::new(relay_addr, MONITORING_PORT);
	let mut relay_stream = match TcpStream::connect(relay_addr).await {
		Ok(stream) => stream,
		Err(e) => {
			eprintln!("Could not reach the relay at {relay_addr}: {e}");
			std::process::exit(1);
		}
	};

	// Greet the server so it knows it's being monitored
	let greeting = MonitorMessage::Greeting("hello".into());
	if let Err(e) = monitoring::write_frame(&mut relay_stream, &greeting).await {
		eprintln!("Error writing to TCP Stream: {e}");
		std::process::exit(1);
	}

	if let Some(room) = args.room {
		let switch = MonitorMessage::SwitchCategory(MonitoringEventCategory::Room(RoomId::new(room)));
		if let Err(e) = monitoring::write_frame(&mut relay_stream, &switch).await {
			eprintln!("Error writing to TCP Stream: {e}");
			std::process::exit(1);
		}
	}

	loop {
		let frame = match monitoring::read_frame(&mut relay_stream).await {
			Ok(frame) => frame,
			Err(e) if e.kind() == tokio::io::ErrorKind::UnexpectedEof => {
				println!("Relay closed the connection");
				break;
			}
			Err(e) => {
				eprintln!("Error reading from TCP Stream: {e}");
				break;
			}
		};

		match bincode::deserialize::<RelayEvent>(&frame) {
			Ok(evt) => println!("{evt:?}"),
			Err(e) => eprintln!("Received an undecodable event: {e}"),
		}
	}
}
