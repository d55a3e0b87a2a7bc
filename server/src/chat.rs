//! Chat routing: lobby-wide, table, and private messages. Nothing here
//! is persisted; durable chat history belongs to the read-side API.

use blackjack_shared::{ChatCommand, GroupNotification, ServerMsg, UserId};

use crate::state::AppState;

pub async fn handle(state: &AppState, user: &UserId, cmd: ChatCommand) {
    match cmd {
        ChatCommand::Global { text } => global(state, user, text).await,
        ChatCommand::Group { text } => group(state, user, text).await,
        ChatCommand::Private { target, text } => private(state, user, target, text).await,
    }
}

/// Lobby chat, visible to everyone outside a group. Seated players are
/// told to leave their table first.
async fn global(state: &AppState, user: &UserId, text: String) {
    let reg = state.sessions.read().await;
    let Some(sender) = reg.player(user) else {
        return;
    };
    if reg.group_for_player(user).is_some() || reg.group_for_waiting_player(user).is_some() {
        state.notifier.to_player(
            user,
            ServerMsg::warning("Leave your table to use the lobby chat"),
        );
        return;
    }
    let line = format!("{}: {}", sender.name, text);
    let recipients = reg.players_outside_groups();
    state.notifier.to_players(&recipients, ServerMsg::plain(line));
}

async fn group(state: &AppState, user: &UserId, text: String) {
    let reg = state.sessions.read().await;
    let Some(sender) = reg.player(user) else {
        return;
    };
    let name = sender.name.clone();
    let Some(group) = reg.group_for_player(user) else {
        state
            .notifier
            .to_player(user, ServerMsg::warning("You are not in a group"));
        return;
    };
    let mut recipients = group.members.clone();
    recipients.extend(group.waiting_room.iter().cloned());
    state.notifier.to_players(
        &recipients,
        ServerMsg::GroupNotification(GroupNotification {
            group_id: group.group_id.clone(),
            text: format!("{}: {}", name, text),
        }),
    );
}

/// One-to-one whisper. Messages to yourself are dropped without a reply.
async fn private(state: &AppState, user: &UserId, target: UserId, text: String) {
    if &target == user {
        return;
    }
    let reg = state.sessions.read().await;
    let Some(sender) = reg.player(user) else {
        return;
    };
    if reg.player(&target).is_none() {
        state
            .notifier
            .to_player(user, ServerMsg::error("No such player"));
        return;
    }
    let line = format!("{} (whisper): {}", sender.name, text);
    state.notifier.to_player(&target, ServerMsg::plain(line));
}
