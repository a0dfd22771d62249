//! # Socket.IO Client
//!
//! This library provides a Socket.IO protocol v5 client running over Engine.IO v4
//! WebSockets. It's built on top of Tokio and tokio-tungstenite.
//!
//! ## Features
//!
//! - Engine.IO and Socket.IO packet codec
//! - Session handshake and automatic join of the root namespace
//! - Ping/Pong keepalive with optional liveness enforcement
//! - Event delivery acknowledgements
//! - Event and log queues drained from the owner's own loop
//!
//! ## Main Components
//!
//! - `Models`: Engine and socket packet types and their wire rendering.
//! - `Codec`: Parses wire frames into packets.
//! - `Handlers`: The connection state machine reacting to each packet.
//! - `Transport`: Fragment reassembly, the receive and send loops, and the WebSocket binding.
//! - `Client`: The connection handle used by applications.
//! - `Listeners`: Callback registry invoked when events are drained.
//! - `Config`: Handles client configuration.
//!
//! ## Getting Started
//!
//! ```no_run
//! use socketio_client::{Client, ClientConfig, Listeners};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ClientConfig {
//!         auth_token: Some("secret".to_string()),
//!         ..Default::default()
//!     };
//!     let client = Client::new(config);
//!     client.connect("http://127.0.0.1:3000").await.unwrap();
//!
//!     let mut listeners = Listeners::new();
//!     listeners.on("chat", |message| println!("chat: {message}"));
//!
//!     loop {
//!         listeners.tick(&client);
//!         for record in client.drain_log() {
//!             println!("{:?}: {}", record.severity, record.message);
//!         }
//!         client.emit("", "chat", "hello").await.unwrap();
//!         tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//!     }
//! }
//! ```
//!
//! ## Custom Transports
//!
//! Any duplex text transport can be used by implementing `Connector`, `Sender`
//! and `Receiver`, then building the client with `Client::with_connector`.
//!
//! ## Limitations
//!
//! - No reconnection: once `Closed`, create a new `Client`.
//! - Binary and attachment packets are not supported.
//! - Event payloads are split on the first comma, not parsed as JSON.

mod client;
mod codec;
mod config;
mod error;
mod handlers;
mod listeners;
mod models;
mod state;
mod transport;
mod utils;

pub use client::*;
pub use codec::*;
pub use config::*;
pub use error::*;
pub use handlers::*;
pub use listeners::*;
pub use models::*;
pub use state::*;
pub use transport::*;
pub use utils::normalize_address;

#[cfg(test)]
#[path = "tests/test_codec.rs"]
mod test_codec;

#[cfg(test)]
#[path = "tests/test_handlers.rs"]
mod test_handlers;

#[cfg(test)]
#[path = "tests/test_connection.rs"]
mod test_connection;

#[cfg(test)]
#[path = "tests/test_listeners.rs"]
mod test_listeners;

#[cfg(test)]
#[path = "tests/test_transport.rs"]
mod test_transport;
