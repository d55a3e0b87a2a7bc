//! Websocket round-trip: authenticate, create a table, and observe the
//! lobby from a second connection.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures_util::{SinkExt, StreamExt};

use blackjack_server::auth::StaticTokens;
use blackjack_server::config::Config;
use blackjack_server::notify::ChannelNotifier;
use blackjack_server::server::build_router;
use blackjack_server::state::AppState;
use blackjack_server::store::MemoryStore;
use blackjack_shared::ServerMsg;

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

async fn start_server() -> Result<(String, tokio::task::JoinHandle<()>)> {
    let cfg = Config {
        deal_delay_ms: 0,
        dealer_delay_ms: 0,
        ..Config::default()
    };
    let mut tokens = StaticTokens::new();
    tokens.insert("tok-alice", "alice", "Alice");
    tokens.insert("tok-bob", "bob", "Bob");

    let channels = Arc::new(ChannelNotifier::new());
    let store = Arc::new(MemoryStore::new(cfg.starting_credits));
    let state = AppState::new(cfg, channels.clone(), store, Arc::new(tokens));
    let app = build_router(state, channels);

    // Bind to port 0 so the OS chooses an available port.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            eprintln!("server error: {}", e);
        }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok((format!("ws://127.0.0.1:{}/ws", addr.port()), handle))
}

async fn send_text(ws: &mut WsStream, text: String) -> Result<()> {
    ws.send(tokio_tungstenite::tungstenite::Message::Text(text))
        .await?;
    Ok(())
}

/// Read server messages until `pred` matches or the timeout elapses.
async fn wait_for<F>(ws: &mut WsStream, mut pred: F) -> Option<ServerMsg>
where
    F: FnMut(&ServerMsg) -> bool,
{
    let start = tokio::time::Instant::now();
    while start.elapsed() < Duration::from_secs(3) {
        match tokio::time::timeout(Duration::from_millis(300), ws.next()).await {
            Ok(Some(Ok(tokio_tungstenite::tungstenite::Message::Text(txt)))) => {
                if let Ok(msg) = serde_json::from_str::<ServerMsg>(&txt) {
                    if pred(&msg) {
                        return Some(msg);
                    }
                }
            }
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(_))) | Ok(None) => return None,
            Err(_) => continue,
        }
    }
    None
}

#[tokio::test]
async fn ws_clients_authenticate_and_see_the_lobby() -> Result<()> {
    let (url, server) = start_server().await?;

    let (mut ws1, _) = tokio_tungstenite::connect_async(&url).await?;
    let (mut ws2, _) = tokio_tungstenite::connect_async(&url).await?;

    // both connections are greeted before authenticating
    assert!(wait_for(&mut ws1, |m| matches!(m, ServerMsg::Welcome))
        .await
        .is_some());
    assert!(wait_for(&mut ws2, |m| matches!(m, ServerMsg::Welcome))
        .await
        .is_some());

    send_text(
        &mut ws1,
        r#"{"token":"tok-alice","category":"acknowledge","action":"acknowledge"}"#.to_string(),
    )
    .await?;
    let lobby = wait_for(&mut ws1, |m| matches!(m, ServerMsg::Lobby(_))).await;
    assert!(lobby.is_some(), "alice did not receive the lobby listing");

    // a bad token gets a single error notification and no state change
    send_text(
        &mut ws2,
        r#"{"token":"tok-wrong","category":"acknowledge","action":"acknowledge"}"#.to_string(),
    )
    .await?;
    let err = wait_for(&mut ws2, |m| {
        matches!(m, ServerMsg::Notification(n) if n.text == "Invalid or expired token")
    })
    .await;
    assert!(err.is_some(), "bad token was not rejected");

    send_text(
        &mut ws2,
        r#"{"token":"tok-bob","category":"acknowledge","action":"acknowledge"}"#.to_string(),
    )
    .await?;
    assert!(wait_for(&mut ws2, |m| matches!(m, ServerMsg::Lobby(_)))
        .await
        .is_some());

    // alice opens a table; bob, still outside any group, sees it appear
    send_text(
        &mut ws1,
        r#"{"token":"tok-alice","category":"group","action":"create_group"}"#.to_string(),
    )
    .await?;
    let group_view = wait_for(&mut ws1, |m| {
        matches!(m, ServerMsg::Group(g) if g.members.len() == 1)
    })
    .await;
    assert!(group_view.is_some(), "alice did not receive her group view");

    let lobby_update = wait_for(&mut ws2, |m| {
        matches!(m, ServerMsg::Lobby(l) if l.groups.len() == 1 && l.groups[0].players == 1)
    })
    .await;
    assert!(lobby_update.is_some(), "bob did not see the new table");

    server.abort();
    Ok(())
}
