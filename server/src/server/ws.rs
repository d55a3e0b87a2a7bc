// WebSocket handlers: one task per connection, envelope dispatch and
// outbound fan-in.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::StreamExt;
use owo_colors::OwoColorize;
use tokio::sync::mpsc;

use blackjack_shared::ServerMsg;

use crate::dispatch;
use crate::registry::SessionId;
use crate::server::run::TransportState;

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<TransportState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: TransportState) {
    let session = SessionId::new();
    tracing::info!(session = %session.0, "{}", "[CONNECT]".bold().green());

    // All outbound traffic funnels through one queue so the notifier can
    // push to this connection without owning the socket.
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMsg>();
    let _ = tx.send(ServerMsg::Welcome);

    loop {
        tokio::select! {
            biased;

            queued = rx.recv() => {
                match queued {
                    Some(msg) => send_ws(&mut socket, &msg).await,
                    None => break,
                }
            }

            inbound = socket.next() => {
                match inbound {
                    Some(Ok(Message::Text(txt))) => {
                        if let Some(reply) =
                            dispatch::handle_text(&state.app, &state.channels, session, &tx, &txt).await
                        {
                            let _ = tx.send(reply);
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
        }
    }

    if let Some(user) = dispatch::disconnect(&state.app, session).await {
        state.channels.unregister(&user);
        tracing::info!(user = %user, "client disconnected");
    }
}

async fn send_ws(socket: &mut WebSocket, msg: &ServerMsg) {
    match serde_json::to_string(msg) {
        Ok(txt) => {
            let _ = socket.send(Message::Text(txt)).await;
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize ServerMsg for websocket send");
        }
    }
}
