//! One client's connection to a room.
//!
//! A connection owns a bounded outbound queue filled only by the hub and two
//! pumps: the write pump drains the queue into the transport, the read pump
//! turns inbound frames into persisted messages and hands them to the hub.
//! The transport is abstracted as a `Sink<String>` of outbound JSON frames and
//! a `Stream` of [`ClientFrame`]s so the pumps do not depend on a particular
//! WebSocket library.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::{Sink, SinkExt, Stream, StreamExt};
use rooms_core::{CreateMessage, Message, MessageService};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::hub::HubHandle;
use crate::subscription::Subscription;

/// Process-unique connection identifier.
pub type ConnectionId = u64;

/// Receiving half of a connection's outbound queue, drained by the write pump.
pub type Outbound = mpsc::Receiver<Arc<Message>>;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of a connection. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Registered = 1,
    Closing = 2,
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Connecting,
            1 => Self::Registered,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Registered => "registered",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded inbound transport frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    Text(String),
    Close,
}

#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    user_id: String,
    room_id: String,
    state: AtomicU8,
    // Sending half of the outbound queue until the hub takes it on register.
    outbound: Mutex<Option<mpsc::Sender<Arc<Message>>>>,
}

impl Connection {
    /// Create a connection in the `Connecting` state with a queue holding up
    /// to `capacity` messages.
    pub fn new(
        user_id: impl Into<String>,
        room_id: impl Into<String>,
        capacity: usize,
    ) -> (Arc<Self>, Outbound) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let conn = Arc::new(Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            user_id: user_id.into(),
            room_id: room_id.into(),
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            outbound: Mutex::new(Some(tx)),
        });
        (conn, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Move to `to` if that is further along than the current state.
    /// Returns whether the state changed.
    pub(crate) fn advance(&self, to: ConnectionState) -> bool {
        self.state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (to as u8 > current).then_some(to as u8)
            })
            .is_ok()
    }

    /// Hand the queue's sending half to the hub. `None` once taken or
    /// released, which is what keeps a closed connection from coming back.
    pub(crate) fn take_outbound(&self) -> Option<mpsc::Sender<Arc<Message>>> {
        self.outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Close the queue if the hub never took it.
    pub(crate) fn release(&self) {
        drop(self.take_outbound());
    }
}

/// Drain the outbound queue into the transport, one frame at a time.
///
/// Returns when the hub closes the queue or a write fails; in both cases the
/// transport is closed before returning.
pub async fn write_pump<S>(conn: Arc<Connection>, hub: HubHandle, mut outbound: Outbound, mut sink: S)
where
    S: Sink<String> + Unpin,
    S::Error: fmt::Display,
{
    while let Some(message) = outbound.recv().await {
        let frame = match serde_json::to_string(message.as_ref()) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(connection_id = conn.id(), msg_id = %message.id, error = %e, "Failed to encode message");
                continue;
            }
        };

        let failed = match sink.send(frame).await {
            Ok(()) => false,
            Err(e) => {
                debug!(
                    connection_id = conn.id(),
                    room_id = %conn.room_id(),
                    error = %e,
                    "WebSocket send failed, client disconnected"
                );
                true
            }
        };
        if failed {
            conn.advance(ConnectionState::Closing);
            if hub.unregister(Subscription::new(&conn)).await.is_err() {
                debug!(connection_id = conn.id(), "Hub already stopped");
            }
            break;
        }
    }

    if let Err(e) = sink.close().await {
        debug!(connection_id = conn.id(), error = %e, "Transport close failed");
    }
    debug!(connection_id = conn.id(), "Write pump finished");
}

/// Turn inbound frames into persisted messages and submit them for broadcast.
///
/// Frames the message service rejects are dropped and the connection stays
/// open. An undecodable frame, a transport error, a close frame or the end of
/// the stream unregisters the connection and returns.
pub async fn read_pump<St, E>(
    conn: Arc<Connection>,
    hub: HubHandle,
    service: Arc<dyn MessageService>,
    mut stream: St,
) where
    St: Stream<Item = Result<ClientFrame, E>> + Unpin,
    E: fmt::Display,
{
    loop {
        let text = match stream.next().await {
            Some(Ok(ClientFrame::Text(text))) => text,
            Some(Ok(ClientFrame::Close)) => {
                debug!(connection_id = conn.id(), "WebSocket client sent close frame");
                break;
            }
            Some(Err(e)) => {
                debug!(connection_id = conn.id(), error = %e, "WebSocket receive failed");
                break;
            }
            None => break,
        };

        let request: CreateMessage = match serde_json::from_str(&text) {
            Ok(request) => request,
            Err(e) => {
                warn!(
                    connection_id = conn.id(),
                    user_id = %conn.user_id(),
                    error = %e,
                    "Undecodable client frame, closing connection"
                );
                break;
            }
        };

        match service
            .create(conn.room_id(), conn.user_id(), &request.text)
            .await
        {
            Ok(message) => {
                if hub.broadcast(message).await.is_err() {
                    debug!(connection_id = conn.id(), "Hub already stopped");
                    break;
                }
            }
            Err(e) => {
                warn!(
                    connection_id = conn.id(),
                    room_id = %conn.room_id(),
                    user_id = %conn.user_id(),
                    error = %e,
                    "Message rejected"
                );
            }
        }
    }

    conn.advance(ConnectionState::Closing);
    if hub.unregister(Subscription::new(&conn)).await.is_err() {
        debug!(connection_id = conn.id(), "Hub already stopped");
    }
    debug!(connection_id = conn.id(), "Read pump finished");
}

/// Run a connection from registration to `Closed`.
///
/// Registers with the hub, runs both pumps, and once either finishes makes
/// sure the other stops too: a finished write pump (queue closed or write
/// error) aborts the read pump; a finished read pump has already asked the
/// hub to unregister, which closes the queue and lets the write pump drain
/// and close the transport.
pub async fn serve<S, St, E>(
    conn: Arc<Connection>,
    outbound: Outbound,
    hub: HubHandle,
    service: Arc<dyn MessageService>,
    sink: S,
    stream: St,
) where
    S: Sink<String> + Send + Unpin + 'static,
    S::Error: fmt::Display + Send,
    St: Stream<Item = Result<ClientFrame, E>> + Send + Unpin + 'static,
    E: fmt::Display + Send + 'static,
{
    if hub.register(Subscription::new(&conn)).await.is_err() {
        warn!(connection_id = conn.id(), "Hub is not running, dropping connection");
        conn.release();
        conn.advance(ConnectionState::Closed);
        return;
    }
    info!(
        connection_id = conn.id(),
        room_id = %conn.room_id(),
        user_id = %conn.user_id(),
        "WebSocket client connected"
    );

    let mut write_task = tokio::spawn(write_pump(
        Arc::clone(&conn),
        hub.clone(),
        outbound,
        sink,
    ));
    let mut read_task = tokio::spawn(read_pump(
        Arc::clone(&conn),
        hub.clone(),
        service,
        stream,
    ));

    tokio::select! {
        _ = &mut write_task => {
            read_task.abort();
            let _ = read_task.await;
        }
        _ = &mut read_task => {
            conn.release();
            let _ = write_task.await;
        }
    }

    // Covers a read pump aborted before it could unregister. Acknowledged,
    // so the registry no longer holds this connection once it is `Closed`.
    if hub.unregister(Subscription::new(&conn)).await.is_err() {
        debug!(connection_id = conn.id(), "Hub already stopped");
    }
    conn.release();
    conn.advance(ConnectionState::Closed);

    info!(
        connection_id = conn.id(),
        room_id = %conn.room_id(),
        user_id = %conn.user_id(),
        "WebSocket client disconnected"
    );
}
