//! Channel lifecycle management.
//!
//! A [`ChannelManager`] owns at most one live connection. Each call to
//! [`Channel::open`] spawns a connection task that reports back through a
//! single ordered event stream, read with [`ChannelManager::next_event`].
//! Every event is tagged with the [`ConnectionId`] of the task that produced
//! it; once a connection is closed or replaced its remaining events are
//! discarded, so nothing from a torn-down socket can reach the caller.
//!
//! ```text
//!  open(url) ──→ Connecting ──(handshake ok)──→ Connected
//!                    │                              │
//!                    └──(error / timeout / close)───┴──→ Disconnected
//! ```
//!
//! The manager never retries on its own. Retry policy belongs to whoever
//! drives it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::{Connection, ConnectionId, ConnectionState, Connector};

/// Default time allowed for the connect handshake.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Something that happened on the channel, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The connection moved to a new lifecycle state.
    StateChanged(ConnectionState),
    /// A text payload arrived from the server.
    Message(String),
}

/// The non-blocking control surface of a channel.
///
/// All three operations return immediately; their outcome is observed later
/// as [`ChannelEvent`]s.
pub trait Channel {
    /// Starts connecting to `url`. No-op unless currently `Disconnected`.
    fn open(&mut self, url: &str);

    /// Transmits `payload` if `Connected`, otherwise drops it.
    fn send(&mut self, payload: String);

    /// Tears down the current connection, if any.
    fn close(&mut self);

    /// The current lifecycle state.
    fn state(&self) -> ConnectionState;
}

/// An event stamped with the connection that produced it.
#[derive(Debug)]
struct Tagged {
    id: ConnectionId,
    event: ChannelEvent,
}

/// Handles for the one connection task the manager currently listens to.
struct Active {
    id: ConnectionId,
    outbound: mpsc::UnboundedSender<String>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

/// Owns the lifecycle of a single duplex connection.
///
/// Requires a Tokio runtime: [`Channel::open`] spawns the connection task.
pub struct ChannelManager<C: Connector> {
    connector: Arc<C>,
    connect_timeout: Duration,
    state: ConnectionState,
    next_id: u64,
    active: Option<Active>,
    events_tx: mpsc::UnboundedSender<Tagged>,
    events_rx: mpsc::UnboundedReceiver<Tagged>,
}

impl<C: Connector> ChannelManager<C> {
    /// Creates a manager that dials through `connector`.
    pub fn new(connector: C) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector: Arc::new(connector),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            state: ConnectionState::Disconnected,
            next_id: 1,
            active: None,
            events_tx,
            events_rx,
        }
    }

    /// Sets how long a connect attempt may take before it is abandoned.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The id of the connection currently listened to, if any.
    pub fn active_id(&self) -> Option<ConnectionId> {
        self.active.as_ref().map(|a| a.id)
    }

    /// Waits for the next event from the active connection.
    ///
    /// Events from closed or superseded connections are silently skipped.
    /// Cancel-safe: dropping the future loses no events.
    pub async fn next_event(&mut self) -> Option<ChannelEvent> {
        loop {
            let tagged = self.events_rx.recv().await?;
            if self.active_id() != Some(tagged.id) {
                trace!(conn_id = %tagged.id, "discarding event from detached connection");
                continue;
            }
            if let ChannelEvent::StateChanged(state) = tagged.event {
                self.state = state;
                if state == ConnectionState::Disconnected {
                    // The task has already exited after reporting this.
                    self.active = None;
                }
                debug!(conn_id = %tagged.id, %state, "channel state changed");
            }
            return Some(tagged.event);
        }
    }
}

impl<C: Connector> Channel for ChannelManager<C> {
    fn open(&mut self, url: &str) {
        if self.state != ConnectionState::Disconnected {
            debug!(state = %self.state, "open ignored, connection already in flight");
            return;
        }

        let id = ConnectionId::new(self.next_id);
        self.next_id += 1;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(run_connection(
            Arc::clone(&self.connector),
            url.to_owned(),
            id,
            self.connect_timeout,
            self.events_tx.clone(),
            outbound_rx,
            shutdown_rx,
        ));

        self.active = Some(Active {
            id,
            outbound: outbound_tx,
            shutdown: Some(shutdown_tx),
            task,
        });
        self.state = ConnectionState::Connecting;
        info!(conn_id = %id, url, "opening channel");
    }

    fn send(&mut self, payload: String) {
        if self.state != ConnectionState::Connected {
            debug!(state = %self.state, "send dropped, channel not connected");
            return;
        }
        if let Some(active) = &self.active {
            if active.outbound.send(payload).is_err() {
                debug!(conn_id = %active.id, "send dropped, connection task gone");
            }
        }
    }

    fn close(&mut self) {
        if let Some(mut active) = self.active.take() {
            info!(conn_id = %active.id, "closing channel");
            if let Some(shutdown) = active.shutdown.take() {
                let _ = shutdown.send(());
            }
            // The task closes the socket on its own; its final events are
            // no longer listened to.
        }
        self.state = ConnectionState::Disconnected;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

impl<C: Connector> Drop for ChannelManager<C> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
    }
}

/// Drives one connection from dial to close.
///
/// Always ends by reporting `Disconnected`, unless it was shut down by the
/// manager, in which case nobody is listening anymore.
async fn run_connection<C: Connector>(
    connector: Arc<C>,
    url: String,
    id: ConnectionId,
    connect_timeout: Duration,
    events: mpsc::UnboundedSender<Tagged>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let emit = |event: ChannelEvent| {
        let _ = events.send(Tagged { id, event });
    };

    let conn = tokio::select! {
        _ = &mut shutdown => {
            debug!(conn_id = %id, "connect abandoned by close");
            return;
        }
        result = tokio::time::timeout(connect_timeout, connector.connect(&url)) => {
            match result {
                Ok(Ok(conn)) => conn,
                Ok(Err(e)) => {
                    warn!(conn_id = %id, error = %e, "connect failed");
                    emit(ChannelEvent::StateChanged(ConnectionState::Disconnected));
                    return;
                }
                Err(_) => {
                    warn!(conn_id = %id, timeout = ?connect_timeout, "connect timed out");
                    emit(ChannelEvent::StateChanged(ConnectionState::Disconnected));
                    return;
                }
            }
        }
    };

    info!(conn_id = %id, "channel open");
    emit(ChannelEvent::StateChanged(ConnectionState::Connected));

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                if let Err(e) = conn.close().await {
                    debug!(conn_id = %id, error = %e, "close handshake failed");
                }
                break;
            }
            Some(payload) = outbound.recv() => {
                if let Err(e) = conn.send(&payload).await {
                    warn!(conn_id = %id, error = %e, "send failed");
                    break;
                }
            }
            received = conn.recv() => match received {
                Ok(Some(text)) => emit(ChannelEvent::Message(text)),
                Ok(None) => {
                    info!(conn_id = %id, "channel closed by server");
                    break;
                }
                Err(e) => {
                    warn!(conn_id = %id, error = %e, "receive failed");
                    break;
                }
            },
        }
    }

    emit(ChannelEvent::StateChanged(ConnectionState::Disconnected));
}
