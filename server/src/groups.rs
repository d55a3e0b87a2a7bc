//! Group lifecycle: create, join, leave, readiness voting, and lobby
//! views.

use blackjack_shared::{GroupCommand, GroupNotification, ServerMsg, UserId};
use rand::Rng;

use crate::game::round;
use crate::notify::Notifier;
use crate::registry::{Group, GroupStatus, SessionStore, MAX_MEMBERS};
use crate::state::AppState;

pub async fn handle(state: &AppState, user: &UserId, cmd: GroupCommand) {
    match cmd {
        GroupCommand::CreateGroup => create_group(state, user).await,
        GroupCommand::JoinGroup { group_id } => join_group(state, user, &group_id).await,
        GroupCommand::LeaveGroup => leave_group(state, user).await,
        GroupCommand::Ready => set_ready(state, user, true).await,
        GroupCommand::Unready => set_ready(state, user, false).await,
        GroupCommand::CheckGroup => check_group(state, user).await,
        GroupCommand::ShowLobby => show_lobby(state, user).await,
    }
}

/// Work left over from a leave that must run after the registry lock is
/// released: a departure can complete a betting gate or finish a round.
pub(crate) enum LeaveFollowUp {
    None,
    Deal(String),
    Finish(String),
}

pub(crate) fn run_follow_up(state: &AppState, follow: LeaveFollowUp) {
    match follow {
        LeaveFollowUp::None => {}
        LeaveFollowUp::Deal(code) => {
            let state = state.clone();
            tokio::spawn(async move {
                round::start_round(&state, &code).await;
            });
        }
        LeaveFollowUp::Finish(code) => {
            let state = state.clone();
            tokio::spawn(async move {
                round::finish_round(&state, &code).await;
            });
        }
    }
}

fn random_group_code(rng: &mut impl Rng) -> String {
    (0..6)
        .map(|_| {
            let offset: u8 = rng.random_range(0..26);
            (b'A' + offset) as char
        })
        .collect()
}

async fn create_group(state: &AppState, user: &UserId) {
    let follow;
    {
        let mut reg = state.sessions.write().await;
        follow = detach_from_group(&mut reg, state.notifier.as_ref(), user);
        let code = {
            let mut rng = rand::rng();
            loop {
                let candidate = random_group_code(&mut rng);
                if !reg.has_group(&candidate) {
                    break candidate;
                }
            }
        };
        let mut group = Group::new(code.clone());
        group.members.push(user.clone());
        reg.insert_group(group);
        tracing::info!(group = %code, user = %user, "created group");
        state
            .notifier
            .to_player(user, ServerMsg::success(format!("Created group {}", code)));
        push_group_view(&reg, state.notifier.as_ref(), &code);
        push_lobby_to_outsiders(&reg, state.notifier.as_ref());
    }
    run_follow_up(state, follow);
}

async fn join_group(state: &AppState, user: &UserId, code: &str) {
    let follow;
    {
        let mut reg = state.sessions.write().await;
        let Some(group) = reg.group(code) else {
            state
                .notifier
                .to_player(user, ServerMsg::warning(format!("No group named {}", code)));
            return;
        };
        if group.is_member(user) || group.in_waiting_room(user) {
            state
                .notifier
                .to_player(user, ServerMsg::info("You are already in this group"));
            return;
        }
        let full = if group.round_in_progress() {
            group.occupancy() >= MAX_MEMBERS
        } else {
            group.members.len() >= MAX_MEMBERS
        };
        if full {
            state
                .notifier
                .to_player(user, ServerMsg::warning(format!("Group {} is full", code)));
            return;
        }

        follow = detach_from_group(&mut reg, state.notifier.as_ref(), user);
        let Some(group) = reg.group_mut(code) else {
            return;
        };
        if group.round_in_progress() {
            group.waiting_room.push(user.clone());
            state.notifier.to_player(
                user,
                ServerMsg::info("Round in progress, you will join at the next betting phase"),
            );
        } else {
            group.members.push(user.clone());
            state
                .notifier
                .to_player(user, ServerMsg::success(format!("Joined group {}", code)));
        }
        tracing::info!(group = %code, user = %user, "joined group");
        push_group_view(&reg, state.notifier.as_ref(), code);
        push_lobby_to_outsiders(&reg, state.notifier.as_ref());
    }
    run_follow_up(state, follow);
}

async fn leave_group(state: &AppState, user: &UserId) {
    let follow;
    {
        let mut reg = state.sessions.write().await;
        if reg.group_code_for_player(user).is_none()
            && reg.group_code_for_waiting_player(user).is_none()
        {
            state
                .notifier
                .to_player(user, ServerMsg::warning("You are not in a group"));
            return;
        }
        follow = detach_from_group(&mut reg, state.notifier.as_ref(), user);
        state
            .notifier
            .to_player(user, ServerMsg::info("You left the group"));
    }
    run_follow_up(state, follow);
}

/// Remove the player from whichever group currently holds them, clearing
/// their round state. The returned follow-up must be run by the caller
/// once the registry lock is released.
pub(crate) fn detach_from_group(
    reg: &mut SessionStore,
    notifier: &dyn Notifier,
    user: &UserId,
) -> LeaveFollowUp {
    // waiting-room exits carry no hand state
    if let Some(code) = reg.group_code_for_waiting_player(user) {
        if let Some(group) = reg.group_mut(&code) {
            group.waiting_room.retain(|u| u != user);
        }
        push_group_view(reg, notifier, &code);
        push_lobby_to_outsiders(reg, notifier);
        return LeaveFollowUp::None;
    }

    let Some(code) = reg.group_code_for_player(user) else {
        return LeaveFollowUp::None;
    };
    let leaver_name = reg
        .player(user)
        .map(|p| p.name.clone())
        .unwrap_or_else(|| user.to_string());
    if let Some(p) = reg.player_mut(user) {
        p.reset_for_round();
        p.is_ready = false;
    }

    let mut stranded: Vec<UserId> = Vec::new();
    let mut deleted = false;
    if let Some(group) = reg.group_mut(&code) {
        group.members.retain(|u| u != user);
        group.bets.remove(user);
        if group.members.is_empty() {
            stranded = group.waiting_room.drain(..).collect();
            deleted = true;
        }
    }

    let mut follow = LeaveFollowUp::None;
    if deleted {
        reg.remove_group(&code);
        for u in &stranded {
            notifier.to_player(u, ServerMsg::info("The group you were waiting for was closed"));
        }
        tracing::info!(group = %code, "deleted empty group");
    } else if let Some(group) = reg.group(&code) {
        notifier.to_players(
            &group.members,
            ServerMsg::GroupNotification(GroupNotification {
                group_id: code.clone(),
                text: format!("{} left the table", leaver_name),
            }),
        );
        match group.status {
            GroupStatus::Betting if group.bets.len() == group.members.len() => {
                follow = LeaveFollowUp::Deal(code.clone());
            }
            GroupStatus::Playing => {
                let all_done = group
                    .members
                    .iter()
                    .all(|u| reg.players.get(u).map_or(true, |p| p.has_finished));
                if all_done {
                    follow = LeaveFollowUp::Finish(code.clone());
                }
            }
            _ => {}
        }
        push_group_view(reg, notifier, &code);
    }
    push_lobby_to_outsiders(reg, notifier);
    follow
}

async fn set_ready(state: &AppState, user: &UserId, ready: bool) {
    let mut start = None;
    {
        let mut reg = state.sessions.write().await;
        let Some(code) = reg.group_code_for_player(user) else {
            state
                .notifier
                .to_player(user, ServerMsg::warning("You are not in a group"));
            return;
        };
        if reg.group(&code).is_some_and(|g| g.round_in_progress()) {
            state.notifier.to_player(
                user,
                ServerMsg::warning("The round is in progress, readiness is locked"),
            );
            return;
        }
        if let Some(p) = reg.player_mut(user) {
            p.is_ready = ready;
        }
        let Some(group) = reg.group(&code) else {
            return;
        };
        let total = group.members.len();
        let ready_count = group
            .members
            .iter()
            .filter(|u| reg.players.get(u).is_some_and(|p| p.is_ready))
            .count();
        state.notifier.to_players(
            &group.members,
            ServerMsg::GroupNotification(GroupNotification {
                group_id: code.clone(),
                text: format!("{}/{} players are ready", ready_count, total),
            }),
        );
        if group.status == GroupStatus::Waiting && 2 * ready_count > total {
            start = Some(code.clone());
        }
        push_group_view(&reg, state.notifier.as_ref(), &code);
        push_lobby_to_outsiders(&reg, state.notifier.as_ref());
    }
    if let Some(code) = start {
        round::begin_betting(state, &code).await;
    }
}

async fn check_group(state: &AppState, user: &UserId) {
    let reg = state.sessions.read().await;
    let code = reg
        .group_code_for_player(user)
        .or_else(|| reg.group_code_for_waiting_player(user));
    match code.and_then(|c| reg.group_model(&c)) {
        Some(model) => state.notifier.to_player(user, ServerMsg::Group(model)),
        None => state
            .notifier
            .to_player(user, ServerMsg::info("You are not in a group")),
    }
}

async fn show_lobby(state: &AppState, user: &UserId) {
    let reg = state.sessions.read().await;
    state
        .notifier
        .to_player(user, ServerMsg::Lobby(reg.lobby_model()));
}

/// Push the membership view to everyone seated at or waiting on a group.
pub(crate) fn push_group_view(reg: &SessionStore, notifier: &dyn Notifier, code: &str) {
    let Some(model) = reg.group_model(code) else {
        return;
    };
    let Some(group) = reg.group(code) else {
        return;
    };
    let mut recipients: Vec<UserId> = group.members.clone();
    recipients.extend(group.waiting_room.iter().cloned());
    notifier.to_players(&recipients, ServerMsg::Group(model));
}

/// Push the lobby listing to every player currently outside any group.
pub(crate) fn push_lobby_to_outsiders(reg: &SessionStore, notifier: &dyn Notifier) {
    let recipients = reg.players_outside_groups();
    if recipients.is_empty() {
        return;
    }
    notifier.to_players(&recipients, ServerMsg::Lobby(reg.lobby_model()));
}
