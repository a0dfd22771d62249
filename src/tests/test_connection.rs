#[cfg(test)]
mod tests {
    use crate::{
        Client, ClientConfig, Connector, DomainEvent, EnginePacket, Fragment, FrameKind,
        Listeners, Phase, Receiver as TransportReceiver, Sender as TransportSender, Severity, TransportError,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::sync::mpsc;

    const OPEN: &str =
        "0{\"sid\":\"lv_VI97HAXpY6yYWAAAC\",\"upgrades\":[],\"pingInterval\":25000,\"pingTimeout\":20000}";

    struct MockSender {
        outgoing: mpsc::UnboundedSender<String>,
        pending: Vec<u8>,
        disposed: Arc<AtomicBool>,
    }

    struct MockReceiver {
        incoming: mpsc::UnboundedReceiver<Result<Fragment, TransportError>>,
    }

    #[async_trait]
    impl TransportSender for MockSender {
        async fn send(&mut self, data: Vec<u8>, is_final: bool) -> Result<(), TransportError> {
            self.pending.extend_from_slice(&data);
            if is_final {
                let text = String::from_utf8(std::mem::take(&mut self.pending))
                    .map_err(|e| TransportError::Send(e.to_string()))?;
                self.outgoing
                    .send(text)
                    .map_err(|e| TransportError::Send(e.to_string()))?;
            }
            Ok(())
        }

        async fn dispose(&mut self) {
            self.disposed.store(true, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl TransportReceiver for MockReceiver {
        async fn receive_fragment(&mut self) -> Result<Fragment, TransportError> {
            self.incoming
                .recv()
                .await
                .unwrap_or_else(|| Ok(Fragment::close()))
        }
    }

    struct MockConnector {
        halves: Mutex<Option<(MockSender, MockReceiver)>>,
    }

    #[async_trait]
    impl Connector for MockConnector {
        type Sender = MockSender;
        type Receiver = MockReceiver;

        async fn connect(
            &self,
            address: &str,
        ) -> Result<(MockSender, MockReceiver), TransportError> {
            assert_eq!(
                address,
                "ws://localhost:3000/socket.io/?EIO=4&transport=websocket"
            );
            self.halves
                .lock()
                .unwrap()
                .take()
                .ok_or_else(|| TransportError::Connect("connection refused".into()))
        }
    }

    /// Server side of a mock transport.
    struct TestServer {
        incoming: mpsc::UnboundedSender<Result<Fragment, TransportError>>,
        outgoing: mpsc::UnboundedReceiver<String>,
        disposed: Arc<AtomicBool>,
    }

    impl TestServer {
        fn new() -> (Self, MockConnector) {
            let (incoming_tx, incoming_rx) = mpsc::unbounded_channel();
            let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel();
            let disposed = Arc::new(AtomicBool::new(false));

            let server = TestServer {
                incoming: incoming_tx,
                outgoing: outgoing_rx,
                disposed: disposed.clone(),
            };
            let connector = MockConnector {
                halves: Mutex::new(Some((
                    MockSender {
                        outgoing: outgoing_tx,
                        pending: Vec::new(),
                        disposed,
                    },
                    MockReceiver {
                        incoming: incoming_rx,
                    },
                ))),
            };
            (server, connector)
        }

        fn send(&self, text: &str) {
            self.incoming.send(Ok(Fragment::text(text, true))).unwrap();
        }

        async fn expect(&mut self, expected: &str) {
            match tokio::time::timeout(Duration::from_secs(5), self.outgoing.recv()).await {
                Ok(Some(actual)) => assert_eq!(expected, actual, "unexpected frame from client"),
                Ok(None) => panic!("client transport closed unexpectedly"),
                Err(_) => panic!("timeout waiting for {expected:?}"),
            }
        }

        async fn expect_disposed(&self) {
            tokio::time::timeout(Duration::from_secs(5), async {
                while !self.disposed.load(Ordering::SeqCst) {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
            })
            .await
            .expect("transport was not disposed");
        }
    }

    async fn connected_client(config: ClientConfig) -> (Client<MockConnector>, TestServer) {
        let (server, connector) = TestServer::new();
        let client = Client::with_connector(connector, config);
        client.connect("http://localhost:3000").await.unwrap();
        assert_eq!(client.phase(), Phase::Open);
        (client, server)
    }

    async fn wait_for_phase(client: &Client<MockConnector>, phase: Phase) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while client.phase() != phase {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("phase not reached");
    }

    #[tokio::test]
    async fn test_handshake_joins_root_namespace() {
        let config = ClientConfig {
            auth_token: Some("MaxMaxMaxMax".into()),
            ..Default::default()
        };
        let (client, mut server) = connected_client(config).await;

        server.send(OPEN);
        server.expect("40{\"Token\":\"MaxMaxMaxMax\"}").await;

        assert_eq!(
            client.handshake().map(|h| h.ping_interval_ms),
            Some(25000)
        );
        assert_eq!(
            client.drain_events(),
            vec![DomainEvent::new("", "connect", "")]
        );
        assert!(client.drain_events().is_empty());
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let (_client, mut server) = connected_client(ClientConfig::default()).await;

        server.send(OPEN);
        server.expect("40").await;
        server.send("2probe");
        server.expect("3probe").await;
        server.send("2");
        server.expect("3").await;
    }

    #[tokio::test]
    async fn test_event_with_ack() {
        let (client, mut server) = connected_client(ClientConfig::default()).await;

        server.send(OPEN);
        server.expect("40").await;
        server.send("42/admin,7[\"chat\",\"hi\"]");
        server.expect("43/admin,7").await;

        assert_eq!(
            client.drain_events(),
            vec![
                DomainEvent::new("", "connect", ""),
                DomainEvent::new("/admin", "chat", "hi"),
            ]
        );
    }

    #[tokio::test]
    async fn test_fragmented_frames_are_reassembled() {
        let (_client, mut server) = connected_client(ClientConfig::default()).await;

        let (head, tail) = OPEN.split_at(20);
        server.incoming.send(Ok(Fragment::text(head, false))).unwrap();
        server.incoming.send(Ok(Fragment::text(tail, true))).unwrap();
        server.expect("40").await;

        server.incoming.send(Ok(Fragment::text("2pr", false))).unwrap();
        server.incoming.send(Ok(Fragment::text("o", false))).unwrap();
        server.incoming.send(Ok(Fragment::text("be", true))).unwrap();
        server.expect("3probe").await;
    }

    #[tokio::test]
    async fn test_root_disconnect_closes_connection() {
        let (client, mut server) = connected_client(ClientConfig::default()).await;

        server.send(OPEN);
        server.send("41");
        server.expect("40").await;

        wait_for_phase(&client, Phase::Closed).await;
        server.expect_disposed().await;
        let names: Vec<_> = client.drain_events().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["connect", "disconnect"]);
    }

    #[tokio::test]
    async fn test_invalid_frame_keeps_connection_open() {
        let (client, mut server) = connected_client(ClientConfig::default()).await;

        server.send(OPEN);
        server.expect("40").await;
        server.send("9garbage");
        server.send("2after");
        server.expect("3after").await;

        assert_eq!(client.phase(), Phase::Open);
        assert!(client
            .drain_log()
            .iter()
            .any(|record| record.severity == Severity::Error));
    }

    #[tokio::test]
    async fn test_emit_and_join() {
        let config = ClientConfig {
            auth_token: Some("secret".into()),
            ..Default::default()
        };
        let (client, mut server) = connected_client(config).await;

        client.emit("/chat", "message", "hi").await.unwrap();
        server.expect("42/chat,[\"message\",\"hi\"]").await;
        client.join("/chat").await.unwrap();
        server.expect("40/chat,{\"Token\":\"secret\"}").await;
        client.send(EnginePacket::Close).await.unwrap();
        server.expect("1").await;
    }

    #[tokio::test]
    async fn test_close_disposes_transport() {
        let (client, server) = connected_client(ClientConfig::default()).await;

        client.close();

        assert_eq!(client.phase(), Phase::Closed);
        server.expect_disposed().await;
        assert!(matches!(
            client.emit("", "chat", "late").await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_transport_close_frame() {
        let (client, server) = connected_client(ClientConfig::default()).await;

        server.send(OPEN);
        server.incoming.send(Ok(Fragment::close())).unwrap();

        wait_for_phase(&client, Phase::Closed).await;
        server.expect_disposed().await;
        let names: Vec<_> = client.drain_events().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["connect"]);
    }

    #[tokio::test]
    async fn test_receive_error_closes_connection() {
        let (client, server) = connected_client(ClientConfig::default()).await;

        server
            .incoming
            .send(Err(TransportError::Receive("connection reset".into())))
            .unwrap();

        wait_for_phase(&client, Phase::Closed).await;
        server.expect_disposed().await;
        assert!(client.drain_log().iter().any(|record| {
            record.severity == Severity::Error && record.message.contains("connection reset")
        }));
    }

    #[tokio::test]
    async fn test_heartbeat_timeout() {
        let (client, mut server) = connected_client(ClientConfig::default()).await;

        server.send("0{\"sid\":\"abc\",\"upgrades\":[],\"pingInterval\":50,\"pingTimeout\":50}");
        server.expect("40").await;

        wait_for_phase(&client, Phase::Closed).await;
        let names: Vec<_> = client.drain_events().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["connect", "disconnect"]);
        assert!(client
            .drain_log()
            .iter()
            .any(|record| record.message == "Heartbeat timeout"));
    }

    #[tokio::test]
    async fn test_heartbeat_disabled() {
        let config = ClientConfig {
            heartbeat: false,
            ..Default::default()
        };
        let (client, mut server) = connected_client(config).await;

        server.send("0{\"sid\":\"abc\",\"upgrades\":[],\"pingInterval\":10,\"pingTimeout\":10}");
        server.expect("40").await;
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(client.phase(), Phase::Open);
    }

    #[tokio::test]
    async fn test_connect_failure() {
        let (_server, connector) = TestServer::new();
        connector.halves.lock().unwrap().take();
        let client = Client::with_connector(connector, ClientConfig::default());

        let result = client.connect("ws://localhost:3000").await;

        assert!(matches!(result, Err(TransportError::Connect(_))));
        assert_eq!(client.phase(), Phase::Closed);
        let log = client.drain_log();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_connect_only_once() {
        let (client, _server) = connected_client(ClientConfig::default()).await;

        assert!(matches!(
            client.connect("http://localhost:3000").await,
            Err(TransportError::NotOpening)
        ));
    }

    #[tokio::test]
    async fn test_invalid_address() {
        let (_server, connector) = TestServer::new();
        let client = Client::with_connector(connector, ClientConfig::default());

        assert!(matches!(
            client.connect("not a url").await,
            Err(TransportError::InvalidAddress(_))
        ));
        assert_eq!(client.phase(), Phase::Closed);
    }

    #[tokio::test]
    async fn test_huge_ping_interval_keeps_connection_alive() {
        let (client, mut server) = connected_client(ClientConfig::default()).await;

        server.send(
            "0{\"sid\":\"abc\",\"upgrades\":[],\"pingInterval\":18446744073709551615,\"pingTimeout\":1}",
        );
        server.expect("40").await;
        server.send("2ping");
        server.expect("3ping").await;

        assert_eq!(client.phase(), Phase::Open);
        assert!(!client
            .drain_log()
            .iter()
            .any(|record| record.message == "Heartbeat timeout"));
    }

    #[tokio::test]
    async fn test_binary_frame_is_dropped() {
        let (client, mut server) = connected_client(ClientConfig::default()).await;

        server.send(OPEN);
        server.expect("40").await;
        server
            .incoming
            .send(Ok(Fragment {
                data: vec![0, 1, 2],
                is_final: true,
                kind: FrameKind::Binary,
            }))
            .unwrap();
        server.send("2after");
        server.expect("3after").await;

        assert_eq!(client.phase(), Phase::Open);
        assert!(client.drain_log().iter().any(|record| {
            record.severity == Severity::Warning && record.message.contains("binary frame of 3 bytes")
        }));
    }

    #[tokio::test]
    async fn test_invalid_utf8_frame_is_dropped() {
        let (client, mut server) = connected_client(ClientConfig::default()).await;

        server.send(OPEN);
        server.expect("40").await;
        server
            .incoming
            .send(Ok(Fragment::text(vec![b'4', b'2', 0xff, 0xfe], true)))
            .unwrap();
        server.send("2after");
        server.expect("3after").await;

        assert_eq!(client.phase(), Phase::Open);
        assert_eq!(client.drain_events(), vec![DomainEvent::new("", "connect", "")]);
        assert!(client.drain_log().iter().any(|record| {
            record.severity == Severity::Error && record.message.contains("UTF-8")
        }));
    }

    #[tokio::test]
    async fn test_oversized_message_is_dropped() {
        let config = ClientConfig {
            max_message_size: 8,
            ..Default::default()
        };
        let (client, mut server) = connected_client(config).await;

        server.send("2start");
        server.expect("3start").await;
        server.incoming.send(Ok(Fragment::text("42[\"chat\",", false))).unwrap();
        server.incoming.send(Ok(Fragment::text("\"hi\"]", true))).unwrap();
        server.send("2after");
        server.expect("3after").await;

        assert_eq!(client.phase(), Phase::Open);
        assert!(client.drain_events().is_empty());
        assert!(client.drain_log().iter().any(|record| {
            record.severity == Severity::Error && record.message.contains("limit is 8")
        }));
    }

    #[tokio::test]
    async fn test_listeners_tick_drains_client_once() {
        let (client, mut server) = connected_client(ClientConfig::default()).await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut listeners = Listeners::new();
        let sink = seen.clone();
        listeners.on("connect", |_| {});
        listeners.on_namespace("/admin", "chat", move |arg| {
            sink.lock().unwrap().push(arg.to_string())
        });

        server.send(OPEN);
        server.expect("40").await;
        server.send("42/admin,[\"chat\",\"hi\"]");
        server.send("2sync");
        server.expect("3sync").await;

        assert_eq!(listeners.tick(&client), 2);
        assert_eq!(listeners.tick(&client), 0);
        assert_eq!(*seen.lock().unwrap(), vec!["hi"]);
        assert!(client.drain_events().is_empty());
    }
}
