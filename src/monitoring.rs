use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::ids::{ConnectionId, RoomId};

pub const MONITORING_PORT: u16 = 12346;

/// TCP is a byte stream, so every bincode message in either direction is
/// length-prefixed with a big-endian u32. Reading a raw segment instead
/// would merge back-to-back messages and truncate fragmented ones.
pub const MAX_FRAME_LEN: u32 = 16 * 1024;

/// The kind of events a Monitor subscribes to
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum MonitoringEventCategory {
	Global,
	Room(RoomId),
}

/// Message sent by a monitor to the relay server
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum MonitorMessage {
	Greeting(String),
	SwitchCategory(MonitoringEventCategory),
}

/// Error messages sent back to a monitor when its request went wrong
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum RelayErrorReturn {
	/// Sent back when the monitor sends data that could not be interpreted
	/// as a valid MonitorMessage
	UnreadableMessage,
}

/// Events the relay server reports to attached monitor processes
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub enum RelayEvent {
	MonitorAccepted,
	ServerStarted,
	ServerClosed,
	RoomOpened {
		id: RoomId,
	},
	UserJoined {
		room_id: RoomId,
		connection_id: ConnectionId,
	},
	UserLeft {
		room_id: RoomId,
		connection_id: ConnectionId,
	},
	Error(RelayErrorReturn),
}

/// Writes one length-prefixed bincode frame.
pub async fn write_frame<W, T>(stream: &mut W, value: &T) -> tokio::io::Result<()>
where
	W: AsyncWrite + Unpin,
	T: Serialize,
{
	let bytes = bincode::serialize(value)
		.map_err(|e| tokio::io::Error::new(tokio::io::ErrorKind::InvalidData, e))?;

	stream.write_u32(bytes.len() as u32).await?;
	stream.write_all(&bytes).await?;
	stream.flush().await?;
	Ok(())
}

/// Reads one length-prefixed frame and returns its payload bytes. A closed
/// stream surfaces as `UnexpectedEof`; a length beyond `MAX_FRAME_LEN` means
/// the stream lost framing and is unusable, reported as `InvalidData`.
pub async fn read_frame<R>(stream: &mut R) -> tokio::io::Result<Vec<u8>>
where
	R: AsyncRead + Unpin,
{
	let len = stream.read_u32().await?;
	if len > MAX_FRAME_LEN {
		return Err(tokio::io::Error::new(
			tokio::io::ErrorKind::InvalidData,
			format!("frame of {len} bytes exceeds the {MAX_FRAME_LEN} byte limit"),
		));
	}

	let mut payload = vec![0; len as usize];
	stream.read_exact(&mut payload).await?;
	Ok(payload)
}
