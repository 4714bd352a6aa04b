//! The async driver around a [`Reconciler`].
//!
//! One Tokio task per session owns the reconciler, its channel and the
//! reconnect timer, and runs a single `select!` loop:
//!
//! ```text
//!            ┌────────────── Session task ──────────────┐
//!  dispatch ─┼→ requests ─┐                              │
//!            │            ├→ Reconciler ──→ watch ──────┼─→ SessionView
//!  server  ──┼→ channel ──┤                              │
//!            │  timer ────┘                              │
//!            └───────────────────────────────────────────┘
//! ```
//!
//! Every state change happens on that task, in arrival order. Readers see
//! the latest [`SessionView`]; intermediate views may be skipped, which is
//! safe because every snapshot is a full replacement.

use std::sync::Arc;

use spyglass_protocol::{Codec, ConnectParams, GameSnapshot, JsonCodec, ProtocolError};
use spyglass_timer::ReconnectTimer;
use spyglass_transport::{ChannelManager, Connector, WebSocketConnector};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::markers::MarkerKey;
use crate::{Reconciler, ReconcilerState, SessionConfig};

/// What Presentation gets to see of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub state: ReconcilerState,
    /// Latest snapshot. Still shown, marked stale, while reconnecting.
    pub snapshot: Option<Arc<GameSnapshot>>,
    /// Snapshots applied so far.
    pub revision: u64,
    /// Actions sent but not yet reflected in a snapshot.
    pub pending: Vec<MarkerKey>,
    /// Why the most recent inbound payload was rejected, if it was.
    pub last_error: Option<String>,
}

impl SessionView {
    pub fn is_live(&self) -> bool {
        self.state == ReconcilerState::Synced
    }

    /// Whether a guess on `word` is awaiting confirmation.
    pub fn is_guess_pending(&self, word: &str) -> bool {
        self.pending
            .iter()
            .any(|key| matches!(key, MarkerKey::Guess(w) if w == word))
    }

    fn of<C, K>(reconciler: &Reconciler<C, K>) -> Self
    where
        C: spyglass_transport::Channel,
        K: Codec,
    {
        Self {
            state: reconciler.state(),
            snapshot: reconciler.shared_snapshot(),
            revision: reconciler.revision(),
            pending: reconciler.markers().keys().cloned().collect(),
            last_error: reconciler.last_error().map(str::to_owned),
        }
    }
}

enum Request {
    Dispatch {
        command: String,
        reply: oneshot::Sender<bool>,
    },
}

/// Starts sessions.
pub struct Session;

impl Session {
    /// Connects to the game described by `params` over WebSocket.
    ///
    /// Must be called inside a Tokio runtime.
    ///
    /// # Errors
    /// `ProtocolError::InvalidEndpoint` if `params` do not form a valid URL.
    pub fn start(
        params: &ConnectParams,
        config: SessionConfig,
    ) -> Result<SessionHandle, ProtocolError> {
        let url = params.url()?;
        Ok(Self::start_with(WebSocketConnector, JsonCodec, url.as_str(), config))
    }

    /// Like [`start`](Self::start) with a custom connector and codec.
    pub fn start_with<C, K>(connector: C, codec: K, url: &str, config: SessionConfig) -> SessionHandle
    where
        C: Connector,
        K: Codec,
    {
        let config = config.validated();
        let channel = ChannelManager::new(connector).with_connect_timeout(config.connect_timeout);
        let mut reconciler = Reconciler::with_codec(channel, codec);
        reconciler.start(url);

        let (view_tx, view_rx) = watch::channel(SessionView::of(&reconciler));
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let timer = ReconnectTimer::new(config.timer_config());

        let task = tokio::spawn(run(reconciler, timer, view_tx, requests_rx, shutdown_rx));

        SessionHandle {
            view: view_rx,
            requests: requests_tx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

/// The control surface of a running session.
///
/// Dropping the handle tears the session down.
pub struct SessionHandle {
    view: watch::Receiver<SessionView>,
    requests: mpsc::UnboundedSender<Request>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// The latest published view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// A receiver that is notified on every view change.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Sends a command string, e.g. `"Guess CAT"`.
    ///
    /// Resolves to `false` if nothing was sent: the session is not live,
    /// the command is invalid, the game state rules it out, or the session
    /// has ended.
    pub async fn dispatch(&self, command: impl Into<String>) -> bool {
        let (reply, rx) = oneshot::channel();
        let request = Request::Dispatch {
            command: command.into(),
            reply,
        };
        if self.requests.send(request).is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Tears the session down and waits for its task to finish.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn run<C, K>(
    mut reconciler: Reconciler<ChannelManager<C>, K>,
    mut timer: ReconnectTimer,
    view: watch::Sender<SessionView>,
    mut requests: mpsc::UnboundedReceiver<Request>,
    mut shutdown: oneshot::Receiver<()>,
) where
    C: Connector,
    K: Codec,
{
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                debug!("session shutdown requested");
                break;
            }
            request = requests.recv() => match request {
                Some(Request::Dispatch { command, reply }) => {
                    let _ = reply.send(reconciler.dispatch(&command));
                }
                None => break,
            },
            event = reconciler.channel_mut().next_event() => match event {
                Some(event) => reconciler.handle_event(event),
                None => break,
            },
            tick = timer.wait_for_tick() => {
                if reconciler.on_timer_tick() {
                    debug!(attempt = tick.attempt, "reconnect attempt");
                }
            }
        }

        if reconciler.wants_reconnect() {
            timer.arm();
        } else {
            timer.disarm();
        }
        publish(&view, &reconciler);
    }

    reconciler.teardown();
    timer.disarm();
    publish(&view, &reconciler);
    info!(reconnects = timer.total_ticks(), "session ended");
}

fn publish<C, K>(view: &watch::Sender<SessionView>, reconciler: &Reconciler<C, K>)
where
    C: spyglass_transport::Channel,
    K: Codec,
{
    view.send_if_modified(|current| {
        let next = SessionView::of(reconciler);
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}
