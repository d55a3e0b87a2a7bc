//! Central inbound dispatch: envelope parsing, token resolution, player
//! registration, and routing by category.

use blackjack_shared::{AckCommand, Command, Envelope, ServerMsg, UserId};
use tokio::sync::mpsc;

use crate::auth::Identity;
use crate::chat;
use crate::game;
use crate::groups;
use crate::notify::ChannelNotifier;
use crate::registry::{Player, SessionId};
use crate::state::AppState;

/// Handle one raw text frame from a connection. Protocol errors (bad
/// JSON, unknown tags, bad tokens) produce a direct reply and no state
/// change; everything else answers through the notifier.
pub async fn handle_text(
    state: &AppState,
    channels: &ChannelNotifier,
    session: SessionId,
    tx: &mpsc::UnboundedSender<ServerMsg>,
    raw: &str,
) -> Option<ServerMsg> {
    let envelope: Envelope = match serde_json::from_str(raw) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!(error = %e, "rejecting malformed envelope");
            return Some(ServerMsg::error("Malformed message"));
        }
    };
    let identity = match state.auth.resolve(&envelope.token).await {
        Some(identity) => identity,
        None => return Some(ServerMsg::error("Invalid or expired token")),
    };
    ensure_player(state, &identity).await;
    match envelope.command {
        Command::Acknowledge(AckCommand::Acknowledge) => {
            acknowledge(state, channels, session, &identity, tx).await;
        }
        Command::Chat(cmd) => chat::handle(state, &identity.user_id, cmd).await,
        Command::Group(cmd) => groups::handle(state, &identity.user_id, cmd).await,
        Command::Game(cmd) => game::handle(state, &identity.user_id, cmd).await,
    }
    None
}

/// Create the registry entry for a first-seen player, pulling their
/// balance from the store. The store call runs without the registry
/// lock, so presence is re-checked before inserting.
async fn ensure_player(state: &AppState, identity: &Identity) {
    {
        let reg = state.sessions.read().await;
        if reg.player(&identity.user_id).is_some() {
            return;
        }
    }
    let credits = match state.store.retrieve_credits(&identity.user_id).await {
        Ok(credits) => credits,
        Err(e) => {
            tracing::warn!(
                error = %e,
                user = %identity.user_id,
                "credit lookup failed, falling back to the starting balance"
            );
            state.config.starting_credits
        }
    };
    let mut reg = state.sessions.write().await;
    if reg.player(&identity.user_id).is_none() {
        reg.register_player(Player::new(
            identity.user_id.clone(),
            identity.name.clone(),
            credits,
        ));
        tracing::info!(user = %identity.user_id, credits, "registered player");
    }
}

/// Bind the resolved user to this connection: route future notifier
/// traffic here and greet with the lobby listing.
async fn acknowledge(
    state: &AppState,
    channels: &ChannelNotifier,
    session: SessionId,
    identity: &Identity,
    tx: &mpsc::UnboundedSender<ServerMsg>,
) {
    channels.register(identity.user_id.clone(), tx.clone());
    let lobby = {
        let mut reg = state.sessions.write().await;
        reg.link_session(identity.user_id.clone(), session);
        reg.lobby_model()
    };
    state.notifier.to_player(
        &identity.user_id,
        ServerMsg::success(format!("Welcome, {}", identity.name)),
    );
    state
        .notifier
        .to_player(&identity.user_id, ServerMsg::Lobby(lobby));
    tracing::info!(user = %identity.user_id, session = %session.0, "session acknowledged");
}

/// Transport-level disconnect: unlink the session, leave any group, drop
/// the registry entry. Returns the user that was bound, if any.
pub async fn disconnect(state: &AppState, session: SessionId) -> Option<UserId> {
    let (user, follow) = {
        let mut reg = state.sessions.write().await;
        let user = reg.unlink_session(session)?;
        let follow = groups::detach_from_group(&mut reg, state.notifier.as_ref(), &user);
        reg.remove_player(&user);
        (user, follow)
    };
    groups::run_follow_up(state, follow);
    Some(user)
}
