//! Owner-facing connection handle.
//!
//! A `Client` owns one connection. `connect` dials the transport and spawns
//! the receive and send tasks; everything the protocol produces for the
//! application is then picked up with `drain_events` and `drain_log`.

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::handlers::handle_transport_error;
use crate::models::{EnginePacket, Handshake, SocketPacket};
use crate::state::{DomainEvent, LogRecord, Phase, SharedState};
use crate::transport::{receive_loop, send_loop, Connector, Sender, WebSocketConnector};
use crate::utils::normalize_address;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info};
use uuid::Uuid;

/// Client for one Socket.IO connection.
#[derive(derive_more::Debug)]
pub struct Client<C: Connector = WebSocketConnector> {
    id: Uuid,
    config: ClientConfig,
    #[debug(skip)]
    connector: C,
    state: SharedState,
    started: AtomicBool,
    #[debug(skip)]
    outbound: OnceLock<mpsc::Sender<EnginePacket>>,
    #[debug(skip)]
    shutdown: Arc<Notify>,
}

impl Client<WebSocketConnector> {
    /// Creates a client that connects over WebSockets.
    pub fn new(config: ClientConfig) -> Self {
        Client::with_connector(WebSocketConnector, config)
    }
}

impl<C: Connector> Client<C> {
    /// Creates a client that opens its transport through `connector`.
    ///
    /// # Arguments
    ///
    /// * `connector` - Opens the transport when `connect` is called.
    /// * `config` - The `ClientConfig` for this connection.
    ///
    /// # Type Parameters
    ///
    /// * `C` - The type implementing the `Connector` trait.
    ///
    /// # Returns
    ///
    /// Returns a client in the `Opening` phase. Nothing is dialed until
    /// `connect` is called.
    pub fn with_connector(connector: C, config: ClientConfig) -> Self {
        let id = Uuid::new_v4();
        debug!("Creating client {} with config: {:?}", id, config);
        Client {
            id,
            config,
            connector,
            state: SharedState::new(id),
            started: AtomicBool::new(false),
            outbound: OnceLock::new(),
            shutdown: Arc::new(Notify::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Connects the transport and starts the background tasks.
    ///
    /// A client connects at most once; open a new `Client` to reconnect.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::NotOpening` if `connect` was already called,
    /// and the transport error if the address is invalid or the connection
    /// fails. Failures are also queued as error log records and leave the
    /// connection `Closed`.
    pub async fn connect(&self, address: &str) -> Result<(), TransportError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::NotOpening);
        }

        let address = match normalize_address(address) {
            Ok(address) => address,
            Err(e) => {
                handle_transport_error(&mut self.state.lock(), &e);
                return Err(e);
            }
        };
        info!("[{}] Connecting to {}", self.id, address);

        let connected = tokio::time::timeout(
            self.config.connect_timeout,
            self.connector.connect(&address),
        )
        .await
        .unwrap_or_else(|_| {
            Err(TransportError::Connect(format!(
                "timed out after {:?}",
                self.config.connect_timeout
            )))
        });
        let (mut sender, receiver) = match connected {
            Ok(halves) => halves,
            Err(e) => {
                handle_transport_error(&mut self.state.lock(), &e);
                return Err(e);
            }
        };

        let closed_meanwhile = {
            let mut state = self.state.lock();
            state.set_phase(Phase::Open);
            if state.phase() == Phase::Open {
                state.info(format!("Transport connected to {address}"));
            }
            state.phase() == Phase::Closed
        };
        if closed_meanwhile {
            sender.dispose().await;
            return Err(TransportError::Closed);
        }

        let (tx, rx) = mpsc::channel(self.config.outbound_capacity.max(1));
        // `started` guarantees this is the only `set`
        let _ = self.outbound.set(tx.clone());

        tokio::spawn(send_loop(
            sender,
            rx,
            self.state.clone(),
            self.shutdown.clone(),
        ));
        tokio::spawn(receive_loop(
            receiver,
            self.state.clone(),
            self.config.clone(),
            tx,
            self.shutdown.clone(),
        ));
        Ok(())
    }

    /// Queues an engine packet for sending.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` if the connection is not open.
    pub async fn send(&self, packet: EnginePacket) -> Result<(), TransportError> {
        if self.phase() != Phase::Open {
            return Err(TransportError::Closed);
        }
        let outbound = self.outbound.get().ok_or(TransportError::Closed)?;
        outbound
            .send(packet)
            .await
            .map_err(|_| TransportError::Closed)
    }

    /// Sends `event` with `data` on `namespace`.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` if the connection is not open.
    pub async fn emit(
        &self,
        namespace: &str,
        event: &str,
        data: &str,
    ) -> Result<(), TransportError> {
        self.send(EnginePacket::Message(SocketPacket::event(namespace, event, data)))
            .await
    }

    /// Asks the server for access to `namespace`, sending the configured token.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` if the connection is not open.
    pub async fn join(&self, namespace: &str) -> Result<(), TransportError> {
        self.send(EnginePacket::Message(SocketPacket::connect(
            namespace,
            self.config.auth_token.clone(),
        )))
        .await
    }

    /// Closes the connection. Queued packets are still written before the
    /// transport is disposed; a pending receive is left to finish on its own.
    pub fn close(&self) {
        {
            let mut state = self.state.lock();
            if state.phase() == Phase::Closed {
                return;
            }
            state.info("Closing connection");
            state.set_phase(Phase::Closed);
        }
        self.shutdown.notify_one();
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase()
    }

    /// The handshake received from the server, once the session is open.
    pub fn handshake(&self) -> Option<Handshake> {
        self.state.lock().handshake().cloned()
    }

    /// Removes and returns all domain events received since the last call.
    pub fn drain_events(&self) -> Vec<DomainEvent> {
        self.state.lock().drain_events()
    }

    /// Removes and returns all log records produced since the last call.
    pub fn drain_log(&self) -> Vec<LogRecord> {
        self.state.lock().drain_log()
    }
}

impl<C: Connector> Drop for Client<C> {
    fn drop(&mut self) {
        self.close();
    }
}
