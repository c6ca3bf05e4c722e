//! # Transport Module
//!
//! A single logical WebSocket connection to the bridge.
//!
//! ## States
//!
//! ```text
//! Disconnected --connect()--> Connecting --open--> Connected
//!      ^                          |                    |
//!      +---------- close ---------+-------- close -----+
//! ```
//!
//! Every `connect()` starts a new socket task tagged with a generation
//! number. The task reports back through [`ConnectionEvent`]s, which the
//! owner feeds into [`ServerConnection::handle_event`] from its event loop,
//! so all state changes and callbacks happen on the caller's task.
//!
//! The close of an old socket and the open of its replacement can arrive in
//! either order. A socket only becomes current on its own open event, and
//! close events from older generations are ignored, so a late close never
//! clobbers a newer connection. Only [`ServerConnection::disconnect`] drops
//! the current socket handle.

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket.
    Disconnected,
    /// Socket opening.
    Connecting,
    /// Socket open.
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        };
        f.write_str(text)
    }
}

/// Report from a socket task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The socket finished its handshake.
    Opened {
        /// Socket generation.
        generation: u64,
    },
    /// The socket closed, failed to connect, or errored.
    Closed {
        /// Socket generation.
        generation: u64,
    },
    /// Text arrived from the server.
    Message {
        /// Socket generation.
        generation: u64,
        /// Message text, verbatim.
        text: String,
    },
}

/// Receiving end for [`ConnectionEvent`]s.
pub type ConnectionEvents = mpsc::UnboundedReceiver<ConnectionEvent>;

/// Callback without arguments.
pub type ConnectionCallback = Box<dyn FnMut() + Send>;

/// Callback receiving inbound message text.
pub type MessageCallback = Box<dyn FnMut(&str) + Send>;

/// Outbound side of one socket task.
#[derive(Debug)]
struct SocketHandle {
    generation: u64,
    outbound: mpsc::UnboundedSender<String>,
}

impl SocketHandle {
    fn is_open(&self) -> bool {
        !self.outbound.is_closed()
    }
}

/// Manages one logical connection to the bridge.
pub struct ServerConnection {
    state: ConnectionState,
    /// Socket that has opened and receives [`send`](Self::send) payloads.
    socket: Option<SocketHandle>,
    /// Socket that is still connecting.
    pending: Option<SocketHandle>,
    generation: u64,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    on_connected: ConnectionCallback,
    on_disconnected: ConnectionCallback,
    on_message: MessageCallback,
}

impl std::fmt::Debug for ServerConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConnection")
            .field("state", &self.state)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl ServerConnection {
    /// Creates a disconnected connection and the receiver for its events.
    ///
    /// # Arguments
    ///
    /// * `on_connected` - called when a socket opens
    /// * `on_disconnected` - called when the current socket closes
    /// * `on_message` - called with each inbound text message
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use robot_arm_controller::transport::ServerConnection;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let (mut connection, mut events) = ServerConnection::new(
    ///     Box::new(|| println!("Connected!")),
    ///     Box::new(|| println!("Disconnected!")),
    ///     Box::new(|text| println!("{}", text)),
    /// );
    /// connection.connect("localhost", 8765);
    /// while let Some(event) = events.recv().await {
    ///     connection.handle_event(event);
    /// }
    /// # }
    /// ```
    pub fn new(
        on_connected: ConnectionCallback,
        on_disconnected: ConnectionCallback,
        on_message: MessageCallback,
    ) -> (Self, ConnectionEvents) {
        let (events, receiver) = mpsc::unbounded_channel();
        let connection = Self {
            state: ConnectionState::Disconnected,
            socket: None,
            pending: None,
            generation: 0,
            events,
            on_connected,
            on_disconnected,
            on_message,
        };
        (connection, receiver)
    }

    /// Creates a connection whose callbacks only log.
    pub fn logging() -> (Self, ConnectionEvents) {
        Self::new(
            Box::new(|| info!(target: "operator", "Connected!")),
            Box::new(|| info!(target: "operator", "Disconnected!")),
            Box::new(|text| info!(target: "operator", "{}", text)),
        )
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True when a socket is open and accepting sends.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
            && self.socket.as_ref().map(SocketHandle::is_open).unwrap_or(false)
    }

    /// Connects to `ws://host:port`, dropping any previous connection first.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect(&mut self, host: &str, port: u16) {
        self.disconnect();

        self.generation += 1;
        let generation = self.generation;
        let url = format!("ws://{}:{}", host, port);
        let (outbound, outbound_rx) = mpsc::unbounded_channel();

        info!("Connecting to {} (connection {})", url, generation);
        self.pending = Some(SocketHandle { generation, outbound });
        self.state = ConnectionState::Connecting;

        tokio::spawn(run_socket(url, generation, outbound_rx, self.events.clone()));
    }

    /// Closes the current connection, if any.
    ///
    /// The close is fire-and-forget; the disconnected callback runs when
    /// the socket task reports the close.
    pub fn disconnect(&mut self) {
        // Dropping the outbound sender makes the socket task close the socket.
        if let Some(socket) = self.socket.take() {
            debug!("Closing connection {}", socket.generation);
        }
        if let Some(pending) = self.pending.take() {
            debug!("Abandoning connection attempt {}", pending.generation);
        }
    }

    /// Serialises `payload` to JSON and sends it if a socket is open.
    ///
    /// Silently drops the payload otherwise.
    pub fn send<T: Serialize>(&self, payload: &T) {
        let Some(socket) = self.socket.as_ref().filter(|s| s.is_open()) else {
            return;
        };
        if self.state != ConnectionState::Connected {
            return;
        }
        match serde_json::to_string(payload) {
            Ok(text) => {
                // A send error means the task just exited; the close event follows.
                let _ = socket.outbound.send(text);
            }
            Err(e) => warn!("Failed to encode outbound message: {}", e),
        }
    }

    /// Applies a socket task report and runs the matching callback.
    pub fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened { generation } => {
                let Some(pending) = self.pending.take_if_generation(generation) else {
                    debug!("Ignoring open of stale connection {}", generation);
                    return;
                };
                self.socket = Some(pending);
                self.state = ConnectionState::Connected;
                (self.on_connected)();
            }
            ConnectionEvent::Closed { generation } => {
                if generation != self.generation {
                    debug!("Ignoring close of stale connection {}", generation);
                    return;
                }
                // A failed attempt never opened; forget it.
                let _ = self.pending.take_if_generation(generation);
                self.state = ConnectionState::Disconnected;
                (self.on_disconnected)();
            }
            ConnectionEvent::Message { generation, text } => {
                if generation != self.generation {
                    debug!("Dropping message from stale connection {}", generation);
                    return;
                }
                (self.on_message)(&text);
            }
        }
    }
}

trait TakeIfGeneration {
    fn take_if_generation(&mut self, generation: u64) -> Option<SocketHandle>;
}

impl TakeIfGeneration for Option<SocketHandle> {
    fn take_if_generation(&mut self, generation: u64) -> Option<SocketHandle> {
        if self.as_ref().map(|s| s.generation) == Some(generation) {
            self.take()
        } else {
            None
        }
    }
}

/// Socket task: connects, pumps outbound text, reports inbound text.
async fn run_socket(
    url: String,
    generation: u64,
    mut outbound: mpsc::UnboundedReceiver<String>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
) {
    let stream = match connect_async(url.as_str()).await {
        Ok((stream, _response)) => stream,
        Err(e) => {
            warn!("Failed to connect to {}: {}", url, e);
            let _ = events.send(ConnectionEvent::Closed { generation });
            return;
        }
    };
    let _ = events.send(ConnectionEvent::Opened { generation });

    let (mut write, mut read) = stream.split();

    loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(text) => {
                    if let Err(e) = write.send(Message::Text(text.into())).await {
                        debug!("Send on connection {} failed: {}", generation, e);
                        break;
                    }
                }
                None => {
                    let _ = write.send(Message::Close(None)).await;
                    break;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(ConnectionEvent::Message {
                        generation,
                        text: text.as_str().to_owned(),
                    });
                }
                Some(Ok(Message::Binary(data))) => {
                    let _ = events.send(ConnectionEvent::Message {
                        generation,
                        text: String::from_utf8_lossy(&data).into_owned(),
                    });
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!("Connection {} errored: {}", generation, e);
                    break;
                }
            },
        }
    }

    // Release the outbound queue before reporting so `is_open` turns false.
    drop(outbound);
    let _ = events.send(ConnectionEvent::Closed { generation });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::protocol::PwmSnapshot;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    #[derive(Clone, Default)]
    struct Counters {
        connected: Arc<AtomicUsize>,
        disconnected: Arc<AtomicUsize>,
        messages: Arc<Mutex<Vec<String>>>,
    }

    fn counted_connection() -> (ServerConnection, ConnectionEvents, Counters) {
        let counters = Counters::default();
        let (c, d, m) = (
            counters.connected.clone(),
            counters.disconnected.clone(),
            counters.messages.clone(),
        );
        let (connection, events) = ServerConnection::new(
            Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(move || {
                d.fetch_add(1, Ordering::SeqCst);
            }),
            Box::new(move |text| m.lock().unwrap().push(text.to_string())),
        );
        (connection, events, counters)
    }

    /// Accepts WebSocket clients; greets each with "hello" and forwards
    /// every text it receives to the returned channel.
    async fn spawn_echo_server() -> (u16, mpsc::UnboundedReceiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let tx = tx.clone();
                tokio::spawn(async move {
                    let Ok(mut ws) = tokio_tungstenite::accept_async(stream).await else {
                        return;
                    };
                    let _ = ws.send(Message::Text("hello".to_string().into())).await;
                    while let Some(Ok(message)) = ws.next().await {
                        if let Message::Text(text) = message {
                            let _ = tx.send(text.as_str().to_owned());
                        }
                    }
                });
            }
        });
        (port, rx)
    }

    async fn next_event(events: &mut ConnectionEvents) -> ConnectionEvent {
        timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for connection event")
            .expect("event channel closed")
    }

    // ==================== State Machine Tests ====================

    #[test]
    fn test_initial_state() {
        let (connection, _events) = ServerConnection::logging();
        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert!(!connection.is_connected());
    }

    #[test]
    fn test_send_while_disconnected_is_dropped() {
        let (connection, mut events, _counters) = counted_connection();
        connection.send(&PwmSnapshot::default());
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_stale_events_are_ignored() {
        let (mut connection, _events, counters) = counted_connection();
        connection.handle_event(ConnectionEvent::Opened { generation: 7 });
        connection.handle_event(ConnectionEvent::Closed { generation: 7 });
        connection.handle_event(ConnectionEvent::Message {
            generation: 7,
            text: "late".to_string(),
        });
        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert_eq!(counters.connected.load(Ordering::SeqCst), 0);
        assert_eq!(counters.disconnected.load(Ordering::SeqCst), 0);
        assert!(counters.messages.lock().unwrap().is_empty());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
    }

    // ==================== Socket Tests ====================

    #[tokio::test]
    async fn test_connect_send_receive_disconnect() {
        let (port, mut received) = spawn_echo_server().await;
        let (mut connection, mut events, counters) = counted_connection();

        connection.connect("127.0.0.1", port);
        assert_eq!(connection.state(), ConnectionState::Connecting);

        let opened = next_event(&mut events).await;
        assert_eq!(opened, ConnectionEvent::Opened { generation: 1 });
        connection.handle_event(opened);
        assert!(connection.is_connected());
        assert_eq!(counters.connected.load(Ordering::SeqCst), 1);

        let greeting = next_event(&mut events).await;
        connection.handle_event(greeting);
        assert_eq!(counters.messages.lock().unwrap().as_slice(), ["hello".to_string()]);

        let mut snapshot = PwmSnapshot::default();
        snapshot.servos.insert(0, 130);
        snapshot.servos.insert(1, 64);
        connection.send(&snapshot);
        let text = timeout(Duration::from_secs(5), received.recv()).await.unwrap().unwrap();
        assert_eq!(text, r#"{"servos":{"0":130,"1":64}}"#);

        connection.disconnect();
        assert!(!connection.is_connected());
        let closed = next_event(&mut events).await;
        assert_eq!(closed, ConnectionEvent::Closed { generation: 1 });
        connection.handle_event(closed);
        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert_eq!(counters.disconnected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_reports_disconnected() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let (mut connection, mut events, counters) = counted_connection();
        connection.connect("127.0.0.1", port);

        let closed = next_event(&mut events).await;
        assert_eq!(closed, ConnectionEvent::Closed { generation: 1 });
        connection.handle_event(closed);
        assert_eq!(connection.state(), ConnectionState::Disconnected);
        assert_eq!(counters.connected.load(Ordering::SeqCst), 0);
        assert_eq!(counters.disconnected.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_reconnect_ignores_old_close() {
        let (port, _received) = spawn_echo_server().await;
        let (mut connection, mut events, counters) = counted_connection();

        connection.connect("127.0.0.1", port);
        connection.connect("127.0.0.1", port);

        let mut saw_new_open = false;
        let mut saw_old_close = false;
        while !(saw_new_open && saw_old_close) {
            let event = next_event(&mut events).await;
            match &event {
                ConnectionEvent::Opened { generation: 2 } => saw_new_open = true,
                ConnectionEvent::Closed { generation: 1 } => saw_old_close = true,
                _ => {}
            }
            connection.handle_event(event);
        }

        assert!(connection.is_connected());
        assert_eq!(counters.connected.load(Ordering::SeqCst), 1);
        assert_eq!(counters.disconnected.load(Ordering::SeqCst), 0);
    }
}
