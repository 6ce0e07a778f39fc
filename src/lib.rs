pub mod connections;
pub mod ids;
pub mod message;
pub mod monitoring;
pub mod room;
pub mod rooms_registry;
pub mod websocket;

pub use monitoring::MONITORING_PORT;
