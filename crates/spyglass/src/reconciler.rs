//! The session state machine.
//!
//! A [`Reconciler`] turns channel events into one coherent view of the game:
//! the latest snapshot, whether it is live, and which of our own actions are
//! still in flight. It is synchronous and owns no timers; the
//! [`Session`](crate::Session) driver feeds it events and timer ticks.
//!
//! ```text
//!  Idle ──start──→ Connecting ──Connected──→ Synced ⇄ Stale
//!                      ↑  │                    │
//!                      └──┘ (dropped before    └──teardown──→ Closed
//!                            first snapshot)
//! ```

use std::fmt;
use std::sync::Arc;

use spyglass_protocol::{Codec, Command, GameSnapshot, JsonCodec};
use spyglass_transport::{Channel, ChannelEvent, ConnectionState};
use tracing::{debug, info, trace, warn};

use crate::markers::{Marker, Markers};
use crate::{DispatchError, guard};

/// Where a reconciler is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReconcilerState {
    /// Not started.
    #[default]
    Idle,
    /// Waiting for the channel to open. No snapshot held yet.
    Connecting,
    /// Channel open. Actions may be dispatched.
    Synced,
    /// Channel lost while a snapshot is held. The snapshot is kept and
    /// reconnect attempts are running.
    Stale,
    /// Torn down. Terminal.
    Closed,
}

impl fmt::Display for ReconcilerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Synced => write!(f, "synced"),
            Self::Stale => write!(f, "stale"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Composes a [`Channel`] and a [`Codec`] into the current authoritative
/// game state.
///
/// Never returns errors and never panics on bad input: decode failures,
/// dropped connections and out-of-state dispatches all become observable
/// state or a `false` return.
pub struct Reconciler<C: Channel, K: Codec = JsonCodec> {
    channel: C,
    codec: K,
    url: Option<String>,
    state: ReconcilerState,
    snapshot: Option<Arc<GameSnapshot>>,
    /// Snapshots applied so far.
    revision: u64,
    markers: Markers,
    last_error: Option<String>,
    /// Set between a drop and the next `Connected`.
    reconnecting: bool,
}

impl<C: Channel> Reconciler<C> {
    /// A reconciler speaking the JSON protocol over `channel`.
    pub fn new(channel: C) -> Self {
        Self::with_codec(channel, JsonCodec)
    }
}

impl<C: Channel, K: Codec> Reconciler<C, K> {
    /// A reconciler decoding with `codec` instead of JSON.
    pub fn with_codec(channel: C, codec: K) -> Self {
        Self {
            channel,
            codec,
            url: None,
            state: ReconcilerState::Idle,
            snapshot: None,
            revision: 0,
            markers: Markers::new(),
            last_error: None,
            reconnecting: false,
        }
    }

    /// Opens the channel to `url`. Only valid once, from `Idle`.
    pub fn start(&mut self, url: &str) {
        if self.state != ReconcilerState::Idle {
            warn!(state = %self.state, "start ignored, reconciler already started");
            return;
        }
        info!(url, "session starting");
        self.url = Some(url.to_owned());
        self.state = ReconcilerState::Connecting;
        self.channel.open(url);
    }

    /// Applies one channel event.
    pub fn handle_event(&mut self, event: ChannelEvent) {
        if matches!(self.state, ReconcilerState::Idle | ReconcilerState::Closed) {
            trace!(state = %self.state, ?event, "event ignored");
            return;
        }
        match event {
            ChannelEvent::StateChanged(ConnectionState::Connected) => self.on_connected(),
            ChannelEvent::StateChanged(ConnectionState::Disconnected) => self.on_disconnected(),
            ChannelEvent::StateChanged(ConnectionState::Connecting) => {}
            ChannelEvent::Message(raw) => self.on_message(&raw),
        }
    }

    fn on_connected(&mut self) {
        if self.reconnecting {
            info!("reconnected");
        } else {
            info!("connected");
        }
        self.reconnecting = false;
        self.state = ReconcilerState::Synced;
    }

    fn on_disconnected(&mut self) {
        self.reconnecting = true;
        let next = if self.snapshot.is_some() {
            ReconcilerState::Stale
        } else {
            ReconcilerState::Connecting
        };
        if self.state != next {
            warn!(from = %self.state, to = %next, "channel lost, will reconnect");
        }
        self.state = next;
    }

    fn on_message(&mut self, raw: &str) {
        match self.codec.decode_snapshot(raw) {
            Ok(snapshot) => {
                let cleared = self.markers.settle(&snapshot);
                self.revision += 1;
                debug!(
                    revision = self.revision,
                    status = %snapshot.status(),
                    cleared,
                    "snapshot applied"
                );
                self.snapshot = Some(Arc::new(snapshot));
                self.last_error = None;
            }
            Err(e) => {
                warn!(error = %e, "inbound payload rejected, keeping previous snapshot");
                self.last_error = Some(e.to_string());
            }
        }
    }

    /// Called on every reconnect timer tick.
    ///
    /// Makes exactly one reconnect attempt if the channel is still down.
    /// Returns `true` if it did.
    pub fn on_timer_tick(&mut self) -> bool {
        if !self.wants_reconnect() {
            return false;
        }
        if self.channel.state() != ConnectionState::Disconnected {
            trace!(channel = %self.channel.state(), "reconnect attempt still in flight");
            return false;
        }
        let Some(url) = self.url.as_deref() else {
            return false;
        };
        debug!("reconnecting");
        self.channel.close();
        self.channel.open(url);
        true
    }

    /// Whether the reconnect timer should be running.
    pub fn wants_reconnect(&self) -> bool {
        self.reconnecting && self.state != ReconcilerState::Closed
    }

    /// Sends `command` if the session is live and the command makes sense.
    ///
    /// Returns `false`, sending nothing, when the session is not `Synced`,
    /// the command is not in the action vocabulary, or the current snapshot
    /// rules it out. Nothing is queued.
    pub fn dispatch(&mut self, command: &str) -> bool {
        match self.try_dispatch(command) {
            Ok(()) => true,
            Err(e) => {
                debug!(command, error = %e, "dispatch dropped");
                false
            }
        }
    }

    /// Like [`dispatch`](Self::dispatch), but says why nothing was sent.
    pub fn try_dispatch(&mut self, command: &str) -> Result<(), DispatchError> {
        if self.state != ReconcilerState::Synced {
            return Err(DispatchError::NotLive(self.state));
        }
        let command: Command = command.parse()?;
        if let Some(snapshot) = &self.snapshot {
            guard::check(&command, snapshot)?;
        }
        let payload = self.codec.encode_action(&command)?;

        debug!(%command, "dispatching");
        self.channel.send(payload);
        self.markers
            .insert(Marker::new(command, self.snapshot.as_deref()));
        Ok(())
    }

    /// Stops everything. Terminal; later events and dispatches are ignored.
    pub fn teardown(&mut self) {
        if self.state == ReconcilerState::Closed {
            return;
        }
        info!(from = %self.state, "session torn down");
        self.state = ReconcilerState::Closed;
        self.reconnecting = false;
        self.markers.clear();
        self.channel.close();
    }

    /// Where the lifecycle currently stands.
    pub fn state(&self) -> ReconcilerState {
        self.state
    }

    /// `true` only while `Synced`.
    pub fn is_live(&self) -> bool {
        self.state == ReconcilerState::Synced
    }

    /// The latest snapshot, possibly stale.
    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.snapshot.as_deref()
    }

    pub(crate) fn shared_snapshot(&self) -> Option<Arc<GameSnapshot>> {
        self.snapshot.clone()
    }

    /// How many snapshots have been applied; bumps on every replacement.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Actions sent but not yet reflected in a snapshot.
    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    /// Why the last inbound payload was rejected, until a good one arrives.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The URL given to [`start`](Self::start), reused on every reconnect.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// The underlying channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }

    /// Mutable access, for polling the channel's events.
    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::MarkerKey;
    use spyglass_protocol::{GameStatus, Turn};

    const URL: &str = "ws://localhost:8080/ws?gameID=ABCD&playerID=p1&sessionID=s1";

    /// A channel that records calls and changes state only when told to.
    #[derive(Default)]
    struct SpyChannel {
        state: ConnectionState,
        opens: Vec<String>,
        sends: Vec<String>,
        closes: usize,
    }

    impl Channel for SpyChannel {
        fn open(&mut self, url: &str) {
            if self.state == ConnectionState::Disconnected {
                self.opens.push(url.to_owned());
                self.state = ConnectionState::Connecting;
            }
        }

        fn send(&mut self, payload: String) {
            if self.state == ConnectionState::Connected {
                self.sends.push(payload);
            }
        }

        fn close(&mut self) {
            self.closes += 1;
            self.state = ConnectionState::Disconnected;
        }

        fn state(&self) -> ConnectionState {
            self.state
        }
    }

    /// Moves the spy into `state` and reports it, the way a real channel
    /// would.
    fn report(r: &mut Reconciler<SpyChannel>, state: ConnectionState) {
        r.channel_mut().state = state;
        r.handle_event(ChannelEvent::StateChanged(state));
    }

    fn message(r: &mut Reconciler<SpyChannel>, raw: &str) {
        r.handle_event(ChannelEvent::Message(raw.to_owned()));
    }

    fn synced() -> Reconciler<SpyChannel> {
        let mut r = Reconciler::new(SpyChannel::default());
        r.start(URL);
        report(&mut r, ConnectionState::Connected);
        r
    }

    const PENDING: &str = r#"{"You":"p1","YouOwnGame":true,"GameCanStart":true,
        "BaseGame":{"ID":"ABCD","Status":"pending","Players":["p1"],"TeamRed":["p1"]}}"#;

    const RUNNING: &str = r#"{"You":"p1","YourTurn":true,
        "BaseGame":{"ID":"ABCD","Status":"running","WhoseTurn":"red",
        "Players":["p1","p2"],"TeamRed":["p1"],"TeamBlue":["p2"],
        "Cards":{"CAT":{"BelongsTo":"","Guessed":false,"Index":0},
                 "DOG":{"BelongsTo":"","Guessed":false,"Index":1}}}}"#;

    fn running_with_cat_guessed() -> String {
        RUNNING.replacen(r#""Guessed":false"#, r#""Guessed":true"#, 1)
    }

    // =====================================================================
    // Lifecycle
    // =====================================================================

    #[test]
    fn test_start_opens_channel_and_connects() {
        let mut r = Reconciler::new(SpyChannel::default());
        assert_eq!(r.state(), ReconcilerState::Idle);

        r.start(URL);

        assert_eq!(r.state(), ReconcilerState::Connecting);
        assert_eq!(r.channel().opens, vec![URL.to_owned()]);
        assert!(!r.is_live());
    }

    #[test]
    fn test_start_twice_is_ignored() {
        let mut r = synced();
        r.start("ws://elsewhere/ws");
        assert_eq!(r.channel().opens.len(), 1);
        assert_eq!(r.url(), Some(URL));
    }

    #[test]
    fn test_connected_without_snapshot_is_synced() {
        let r = synced();
        assert_eq!(r.state(), ReconcilerState::Synced);
        assert!(r.is_live());
        assert!(r.snapshot().is_none());
    }

    #[test]
    fn test_events_before_start_are_ignored() {
        let mut r = Reconciler::new(SpyChannel::default());
        r.handle_event(ChannelEvent::StateChanged(ConnectionState::Connected));
        message(&mut r, PENDING);
        assert_eq!(r.state(), ReconcilerState::Idle);
        assert!(r.snapshot().is_none());
    }

    // =====================================================================
    // Snapshots
    // =====================================================================

    #[test]
    fn test_snapshots_last_write_wins() {
        let mut r = synced();
        let frames = [PENDING, RUNNING, PENDING, RUNNING];
        for raw in frames {
            message(&mut r, raw);
        }

        let expected = JsonCodec.decode_snapshot(RUNNING).unwrap();
        assert_eq!(r.snapshot(), Some(&expected));
        assert_eq!(r.revision(), 4);
        assert_eq!(r.state(), ReconcilerState::Synced);
    }

    #[test]
    fn test_snapshot_replaced_not_merged() {
        let mut r = synced();
        message(&mut r, RUNNING);
        message(&mut r, PENDING);

        let snap = r.snapshot().unwrap();
        assert_eq!(snap.status(), GameStatus::Pending);
        assert!(snap.base_game.cards.is_empty());
        assert!(snap.base_game.team_blue.is_empty());
        assert_eq!(snap.base_game.whose_turn, Turn::Nobody);
    }

    #[test]
    fn test_malformed_payload_keeps_snapshot() {
        let mut r = synced();
        message(&mut r, PENDING);
        let before = r.snapshot().cloned();

        message(&mut r, "definitely not json");
        assert_eq!(r.snapshot().cloned(), before);
        assert!(r.last_error().unwrap().contains("malformed"));

        message(&mut r, r#"{"BaseGame":{"Players":["p1"]}}"#);
        assert_eq!(r.snapshot().cloned(), before);
        assert_eq!(r.state(), ReconcilerState::Synced);
        assert_eq!(r.revision(), 1);
    }

    #[test]
    fn test_rejection_frame_recorded_as_error() {
        let mut r = synced();
        message(&mut r, r#"{"error":"could not find game"}"#);

        assert!(r.snapshot().is_none());
        assert!(r.last_error().unwrap().contains("could not find game"));

        message(&mut r, PENDING);
        assert!(r.last_error().is_none());
    }

    // =====================================================================
    // Dispatch
    // =====================================================================

    #[test]
    fn test_dispatch_outside_synced_sends_nothing() {
        let mut r = Reconciler::new(SpyChannel::default());
        assert!(!r.dispatch("StartGame"));

        r.start(URL);
        assert!(!r.dispatch("StartGame"));

        report(&mut r, ConnectionState::Connected);
        message(&mut r, PENDING);
        report(&mut r, ConnectionState::Disconnected);
        assert_eq!(r.state(), ReconcilerState::Stale);
        assert!(!r.dispatch("StartGame"));

        r.teardown();
        assert!(!r.dispatch("StartGame"));

        assert!(r.channel().sends.is_empty());
        assert!(r.markers().is_empty());
    }

    #[test]
    fn test_dispatch_not_live_reports_state() {
        let mut r = Reconciler::new(SpyChannel::default());
        r.start(URL);
        let err = r.try_dispatch("EndTurn").unwrap_err();
        assert!(matches!(
            err,
            DispatchError::NotLive(ReconcilerState::Connecting)
        ));
    }

    #[test]
    fn test_dispatch_start_game_exact_payload() {
        let mut r = synced();
        message(&mut r, PENDING);
        assert_eq!(r.snapshot().unwrap().status(), GameStatus::Pending);

        assert!(r.dispatch("StartGame"));
        assert_eq!(r.channel().sends, vec![r#"{"Action":"StartGame"}"#.to_owned()]);
        assert!(r.markers().contains(&MarkerKey::StartGame));

        message(&mut r, RUNNING);
        let snap = r.snapshot().unwrap();
        assert_eq!(snap.status(), GameStatus::Running);
        assert_eq!(snap.base_game.whose_turn, Turn::Red);
        assert!(!snap.you_own_game);
        assert!(r.markers().is_empty());
    }

    #[test]
    fn test_dispatch_unknown_command_dropped() {
        let mut r = synced();
        assert!(!r.dispatch("FlyToMoon"));
        assert!(!r.dispatch("Guess"));
        assert!(r.channel().sends.is_empty());
    }

    #[test]
    fn test_dispatch_guarded_by_snapshot() {
        let mut r = synced();
        message(&mut r, PENDING);

        assert!(!r.dispatch("EndTurn"));
        assert!(!r.dispatch("Guess CAT"));
        assert!(r.channel().sends.is_empty());
    }

    #[test]
    fn test_dispatch_without_snapshot_skips_guards() {
        let mut r = synced();
        assert!(r.dispatch("EndTurn"));
        assert_eq!(r.channel().sends.len(), 1);
    }

    #[test]
    fn test_guess_marker_cleared_when_card_guessed() {
        let mut r = synced();
        message(&mut r, RUNNING);

        assert!(r.dispatch("Guess CAT"));
        assert!(r.markers().is_guess_pending("CAT"));
        assert_eq!(r.channel().sends, vec![r#"{"Action":"Guess CAT"}"#.to_owned()]);

        // An unrelated snapshot leaves the marker in place.
        message(&mut r, RUNNING);
        assert!(r.markers().is_guess_pending("CAT"));

        message(&mut r, &running_with_cat_guessed());
        assert!(!r.markers().is_guess_pending("CAT"));
    }

    #[test]
    fn test_repeated_dispatch_replaces_marker() {
        let mut r = synced();
        message(&mut r, RUNNING);

        assert!(r.dispatch("Guess DOG"));
        assert!(r.dispatch("Guess DOG"));
        assert_eq!(r.markers().len(), 1);
        assert_eq!(r.channel().sends.len(), 2);
    }

    // =====================================================================
    // Reconnection
    // =====================================================================

    #[test]
    fn test_disconnect_keeps_snapshot_and_goes_stale() {
        let mut r = synced();
        message(&mut r, RUNNING);
        let before = r.snapshot().cloned();

        report(&mut r, ConnectionState::Disconnected);

        assert_eq!(r.state(), ReconcilerState::Stale);
        assert!(!r.is_live());
        assert_eq!(r.snapshot().cloned(), before);
        assert!(r.wants_reconnect());
    }

    #[test]
    fn test_timer_tick_reopens_exactly_once() {
        let mut r = synced();
        message(&mut r, RUNNING);
        report(&mut r, ConnectionState::Disconnected);
        let closes_before = r.channel().closes;

        assert!(r.on_timer_tick());
        assert_eq!(r.channel().closes, closes_before + 1);
        assert_eq!(r.channel().opens, vec![URL.to_owned(), URL.to_owned()]);

        // Still connecting: the next tick must not start a second attempt.
        assert!(!r.on_timer_tick());
        assert_eq!(r.channel().opens.len(), 2);
    }

    #[test]
    fn test_failed_attempt_retried_on_next_tick() {
        let mut r = synced();
        message(&mut r, RUNNING);
        report(&mut r, ConnectionState::Disconnected);

        r.on_timer_tick();
        report(&mut r, ConnectionState::Disconnected);
        r.on_timer_tick();

        assert_eq!(r.channel().opens.len(), 3);
        assert_eq!(r.state(), ReconcilerState::Stale);
    }

    #[test]
    fn test_reconnect_stops_timer() {
        let mut r = synced();
        message(&mut r, RUNNING);
        report(&mut r, ConnectionState::Disconnected);
        r.on_timer_tick();

        report(&mut r, ConnectionState::Connected);

        assert_eq!(r.state(), ReconcilerState::Synced);
        assert!(!r.wants_reconnect());
        assert!(!r.on_timer_tick());
        assert_eq!(r.channel().opens.len(), 2);

        // The server pushes a fresh snapshot which replaces the stale one.
        message(&mut r, PENDING);
        assert_eq!(r.snapshot().unwrap().status(), GameStatus::Pending);
    }

    #[test]
    fn test_drop_before_first_snapshot_returns_to_connecting() {
        let mut r = Reconciler::new(SpyChannel::default());
        r.start(URL);
        report(&mut r, ConnectionState::Disconnected);

        assert_eq!(r.state(), ReconcilerState::Connecting);
        assert!(r.wants_reconnect());
        assert!(r.on_timer_tick());
        assert_eq!(r.channel().opens.len(), 2);
    }

    #[test]
    fn test_ticks_ignored_while_connected() {
        let mut r = synced();
        assert!(!r.wants_reconnect());
        assert!(!r.on_timer_tick());
        assert_eq!(r.channel().opens.len(), 1);
        assert_eq!(r.channel().closes, 0);
    }

    // =====================================================================
    // Teardown
    // =====================================================================

    #[test]
    fn test_teardown_closes_and_ignores_later_events() {
        let mut r = synced();
        message(&mut r, RUNNING);
        assert!(r.dispatch("Guess CAT"));

        r.teardown();

        assert_eq!(r.state(), ReconcilerState::Closed);
        assert_eq!(r.channel().closes, 1);
        assert!(r.markers().is_empty());

        message(&mut r, PENDING);
        report(&mut r, ConnectionState::Disconnected);
        assert_eq!(r.state(), ReconcilerState::Closed);
        assert_eq!(r.snapshot().unwrap().status(), GameStatus::Running);
        assert!(!r.wants_reconnect());
        assert!(!r.on_timer_tick());
    }

    #[test]
    fn test_teardown_while_stale_stops_reconnecting() {
        let mut r = synced();
        message(&mut r, RUNNING);
        report(&mut r, ConnectionState::Disconnected);

        r.teardown();
        r.teardown();

        assert!(!r.wants_reconnect());
        assert_eq!(r.channel().opens.len(), 1);
    }
}
