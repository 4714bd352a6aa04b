//! End-to-end session tests against a scripted local game server.
//!
//! The "server" in each test is a plain `tokio-tungstenite` listener that
//! plays a fixed script: accept, push snapshots, read actions, hang up.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use spyglass::prelude::*;
use spyglass_protocol::Codec;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

const PENDING: &str = r#"{"You":"p1","YouOwnGame":true,"GameCanStart":true,
    "BaseGame":{"ID":"ABCD","Status":"pending","Players":["p1"],"TeamRed":["p1"]}}"#;

const RUNNING: &str = r#"{"You":"p1","YourTurn":true,
    "BaseGame":{"ID":"ABCD","Status":"running","WhoseTurn":"red","Players":["p1","p2"],
    "Cards":{"CAT":{"Guessed":false,"Index":0},"DOG":{"Guessed":false,"Index":1}}}}"#;

// =========================================================================
// Helpers
// =========================================================================

async fn listen() -> (TcpListener, Endpoint) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = listener.local_addr().expect("should have addr");
    (listener, Endpoint::new(addr.to_string(), false))
}

/// Accepts one WebSocket client and returns it with the request URI.
async fn accept(listener: &TcpListener) -> (ServerWs, String) {
    let (stream, _) = listener.accept().await.expect("should accept");
    let mut uri = String::new();
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        uri = req.uri().to_string();
        Ok(resp)
    };
    let ws = tokio_tungstenite::accept_hdr_async(stream, callback)
        .await
        .expect("handshake should succeed");
    (ws, uri)
}

async fn recv_text(ws: &mut ServerWs) -> String {
    loop {
        let msg = ws
            .next()
            .await
            .expect("client should stay connected")
            .expect("frame should be valid");
        if let Message::Text(text) = msg {
            return text.as_str().to_owned();
        }
    }
}

fn player_params(endpoint: Endpoint) -> ConnectParams {
    ConnectParams {
        endpoint,
        game_id: "ABCD".into(),
        participant: Participant::Player {
            player_id: "p1".into(),
        },
        session_id: "s1".into(),
    }
}

fn fast_config() -> SessionConfig {
    SessionConfig::default()
        .with_reconnect_interval(Duration::from_millis(50))
        .with_connect_timeout(Duration::from_secs(2))
}

/// Waits for a view matching `pred`, failing the test instead of hanging.
async fn wait_until(
    views: &mut watch::Receiver<SessionView>,
    pred: impl FnMut(&SessionView) -> bool,
) -> SessionView {
    tokio::time::timeout(Duration::from_secs(5), views.wait_for(pred))
        .await
        .expect("view should arrive in time")
        .expect("session should still be publishing")
        .clone()
}

fn status_is(status: GameStatus) -> impl FnMut(&SessionView) -> bool {
    move |view| view.snapshot.as_ref().is_some_and(|s| s.status() == status)
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_player_session_syncs_and_dispatches() {
    let (listener, endpoint) = listen().await;
    let server = tokio::spawn(async move {
        let (mut ws, uri) = accept(&listener).await;
        ws.send(Message::text(PENDING)).await.unwrap();
        let action = recv_text(&mut ws).await;
        ws.send(Message::text(RUNNING)).await.unwrap();
        // Hold the socket open until the client hangs up.
        while ws.next().await.is_some() {}
        (uri, action)
    });

    let session = Session::start(&player_params(endpoint), fast_config()).unwrap();
    let mut views = session.subscribe();

    let view = wait_until(&mut views, status_is(GameStatus::Pending)).await;
    assert!(view.is_live());
    assert_eq!(view.revision, 1);

    assert!(session.dispatch("StartGame").await);
    let view = wait_until(&mut views, status_is(GameStatus::Running)).await;
    let snapshot = view.snapshot.unwrap();
    assert_eq!(snapshot.base_game.whose_turn, Turn::Red);
    assert!(!snapshot.you_own_game);
    assert!(view.pending.is_empty());

    session.shutdown().await;
    let (uri, action) = server.await.unwrap();
    assert_eq!(uri, "/ws?gameID=ABCD&playerID=p1&sessionID=s1");
    assert_eq!(action, r#"{"Action":"StartGame"}"#);
}

#[tokio::test]
async fn test_spectator_session_uses_spectate_path() {
    let (listener, endpoint) = listen().await;
    let server = tokio::spawn(async move {
        let (mut ws, uri) = accept(&listener).await;
        ws.send(Message::text(r#"{"BaseGame":{"Status":"running"}}"#))
            .await
            .unwrap();
        while ws.next().await.is_some() {}
        uri
    });

    let params = ConnectParams {
        participant: Participant::Spectator,
        ..player_params(endpoint)
    };
    let session = Session::start(&params, fast_config()).unwrap();
    let mut views = session.subscribe();

    wait_until(&mut views, status_is(GameStatus::Running)).await;
    // Spectators never act.
    assert!(!session.dispatch("EndTurn").await);

    session.shutdown().await;
    assert_eq!(server.await.unwrap(), "/ws/spectate?gameID=ABCD&sessionID=s1");
}

#[tokio::test]
async fn test_session_reconnects_with_same_url_and_keeps_snapshot() {
    let (listener, endpoint) = listen().await;
    let server = tokio::spawn(async move {
        let (mut first, first_uri) = accept(&listener).await;
        first.send(Message::text(PENDING)).await.unwrap();
        // Abrupt drop.
        drop(first);

        let (mut second, second_uri) = accept(&listener).await;
        second.send(Message::text(RUNNING)).await.unwrap();
        while second.next().await.is_some() {}
        (first_uri, second_uri)
    });

    // Slow enough that the stale window is observable.
    let config = fast_config().with_reconnect_interval(Duration::from_millis(300));
    let session = Session::start(&player_params(endpoint), config).unwrap();
    let mut views = session.subscribe();

    wait_until(&mut views, status_is(GameStatus::Pending)).await;

    let stale = wait_until(&mut views, |v| v.state == ReconcilerState::Stale).await;
    assert!(!stale.is_live());
    assert_eq!(
        stale.snapshot.as_ref().map(|s| s.status()),
        Some(GameStatus::Pending),
        "stale view should keep the last snapshot"
    );

    let view = wait_until(&mut views, status_is(GameStatus::Running)).await;
    assert!(view.is_live());
    assert_eq!(view.revision, 2);

    session.shutdown().await;
    let (first_uri, second_uri) = server.await.unwrap();
    assert_eq!(first_uri, second_uri);
}

#[tokio::test]
async fn test_dispatch_while_connecting_is_dropped() {
    // Accepts TCP but never completes the WebSocket handshake.
    let (listener, endpoint) = listen().await;
    let _server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        drop(stream);
    });

    let session = Session::start(&player_params(endpoint), fast_config()).unwrap();
    assert_eq!(session.view().state, ReconcilerState::Connecting);
    assert!(!session.dispatch("StartGame").await);

    session.shutdown().await;
}

#[tokio::test]
async fn test_rejection_frame_surfaces_as_last_error() {
    let (listener, endpoint) = listen().await;
    tokio::spawn(async move {
        let (mut ws, _) = accept(&listener).await;
        ws.send(Message::text(r#"{"error":"could not find game"}"#))
            .await
            .unwrap();
        // Keep accepting so reconnects have somewhere to go.
        loop {
            let (mut ws, _) = accept(&listener).await;
            ws.send(Message::text(r#"{"error":"could not find game"}"#))
                .await
                .unwrap();
        }
    });

    let session = Session::start(&player_params(endpoint), fast_config()).unwrap();
    let mut views = session.subscribe();

    let view = wait_until(&mut views, |v| v.last_error.is_some()).await;
    assert!(view.snapshot.is_none());
    assert!(
        view.last_error
            .as_deref()
            .is_some_and(|e| e.contains("could not find game"))
    );

    session.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_publishes_closed() {
    let (listener, endpoint) = listen().await;
    tokio::spawn(async move {
        let (mut ws, _) = accept(&listener).await;
        ws.send(Message::text(PENDING)).await.unwrap();
        while ws.next().await.is_some() {}
    });

    let session = Session::start(&player_params(endpoint), fast_config()).unwrap();
    let mut views = session.subscribe();
    wait_until(&mut views, SessionView::is_live).await;

    session.shutdown().await;

    let view = views.borrow().clone();
    assert_eq!(view.state, ReconcilerState::Closed);
    assert!(!view.is_live());
    // The last snapshot is still readable after teardown.
    assert!(view.snapshot.is_some());
}

#[test]
fn test_fixture_snapshots_decode() {
    let codec = spyglass_protocol::JsonCodec;
    assert_eq!(codec.decode_snapshot(PENDING).unwrap().status(), GameStatus::Pending);
    assert_eq!(codec.decode_snapshot(RUNNING).unwrap().status(), GameStatus::Running);
}
