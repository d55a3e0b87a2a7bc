//! Round controller: owns the transitions between the betting and
//! playing phases. Both the readiness path and the betting path call in
//! here, so the group lifecycle and the rules engine never call each
//! other directly.

use std::time::Duration;

use blackjack_shared::{GameEventKind, GameModel, GroupNotification, Hand, ServerMsg, UserId};

use crate::groups;
use crate::registry::{fresh_shoe, GroupStatus};
use crate::state::AppState;
use crate::store::{record_event, EventRecord};

use super::dealer;

/// Card name broadcast in place of the dealer's hole card.
pub const HOLE_CARD_NAME: &str = "back";

/// User id recorded on dealer-driven event records.
pub(crate) const DEALER_ID: &str = "dealer";

/// Open a betting phase: promote the waiting room, clear per-round state
/// and prompt members for their stakes.
pub async fn begin_betting(state: &AppState, code: &str) {
    let mut reg = state.sessions.write().await;
    let Some(group) = reg.group_mut(code) else {
        return;
    };
    let promoted: Vec<UserId> = group.waiting_room.drain(..).collect();
    group.members.extend(promoted.iter().cloned());
    group.status = GroupStatus::Betting;
    group.settling = false;
    group.bets.clear();
    group.dealer_hand = Hand::default();
    group.hole_card = None;
    let members = group.members.clone();
    for user in &members {
        if let Some(p) = reg.players.get_mut(user) {
            p.reset_for_round();
        }
    }
    for user in &promoted {
        state
            .notifier
            .to_player(user, ServerMsg::success("A seat opened up, you joined the table"));
    }
    state.notifier.to_players(
        &members,
        ServerMsg::GroupNotification(GroupNotification {
            group_id: code.to_string(),
            text: "Place your bets".to_string(),
        }),
    );
    groups::push_group_view(&reg, state.notifier.as_ref(), code);
    groups::push_lobby_to_outsiders(&reg, state.notifier.as_ref());
}

/// Deal a fresh round. Called once every member's bet is in.
///
/// The pacing sleeps release the registry lock, so every step re-checks
/// that the group still exists and that the receiving seat is still
/// occupied before touching it.
pub async fn start_round(state: &AppState, code: &str) {
    let delay = Duration::from_millis(state.config.deal_delay_ms);
    let record;
    let members = {
        let mut reg = state.sessions.write().await;
        let Some(group) = reg.group_mut(code) else {
            return;
        };
        if group.status != GroupStatus::Betting {
            return;
        }
        group.status = GroupStatus::Playing;
        group.round += 1;
        if group.needs_fresh_shoe() {
            group.deck = fresh_shoe();
            tracing::info!(group = %code, "built a fresh two-deck shoe");
        }
        group.dealer_hand = Hand::default();
        group.hole_card = None;
        let members = group.members.clone();
        let deck_count = group.deck.len();
        let round = group.round;
        let gid = group.unique_id.to_string();
        for user in &members {
            if let Some(p) = reg.players.get_mut(user) {
                p.hands = vec![Hand::default()];
                p.has_finished = false;
                p.has_insurance = false;
            }
        }
        let mut model = GameModel::new(GameEventKind::GameStarted);
        model.deck_count = Some(deck_count);
        state.notifier.to_players(&members, ServerMsg::Game(model));
        tracing::info!(group = %code, round, players = members.len(), "round started");
        record = EventRecord::new(
            UserId::from(DEALER_ID),
            gid,
            GameEventKind::GameStarted.as_str(),
            String::new(),
            String::new(),
            round,
        );
        members
    };
    record_event(state.store.as_ref(), record).await;

    // first card to every seat, dealer up card, second card, hole card
    for user in &members {
        tokio::time::sleep(delay).await;
        if !deal_member_card(state, code, user).await {
            return;
        }
    }
    tokio::time::sleep(delay).await;
    if !deal_dealer_card(state, code, false).await {
        return;
    }
    for user in &members {
        tokio::time::sleep(delay).await;
        if !deal_member_card(state, code, user).await {
            return;
        }
    }
    tokio::time::sleep(delay).await;
    if !deal_dealer_card(state, code, true).await {
        return;
    }

    resolve_naturals(state, code).await;
}

/// Complete the round: the dealer plays out, every hand settles, then
/// the next betting phase opens.
pub async fn finish_round(state: &AppState, code: &str) {
    if !dealer::play_dealer(state, code).await {
        return;
    }
    if !dealer::settle(state, code).await {
        return;
    }
    begin_betting(state, code).await;
}

/// Deal one card into a member's first hand. Returns false when the
/// group itself disappeared and the deal must stop; a departed member is
/// skipped.
async fn deal_member_card(state: &AppState, code: &str, user: &UserId) -> bool {
    let record;
    {
        let mut reg = state.sessions.write().await;
        let Some(group) = reg.group_mut(code) else {
            return false;
        };
        if !group.is_member(user) {
            tracing::debug!(group = %code, user = %user, "skipping deal, member departed");
            return true;
        }
        let card = group.draw();
        let deck_count = group.deck.len();
        let round = group.round;
        let gid = group.unique_id.to_string();
        let members = group.members.clone();
        let Some(player) = reg.players.get_mut(user) else {
            return true;
        };
        let Some(hand) = player.hands.first_mut() else {
            return true;
        };
        hand.cards.push(card);
        let total = hand.value_string();
        let mut model = GameModel::new(GameEventKind::CardDrawn);
        model.user_id = Some(user.clone());
        model.card = Some(card.name());
        model.hand_index = Some(0);
        model.total_value = Some(total.clone());
        model.deck_count = Some(deck_count);
        state.notifier.to_players(&members, ServerMsg::Game(model));
        record = EventRecord::new(
            user.clone(),
            gid,
            GameEventKind::CardDrawn.as_str(),
            total,
            card.name(),
            round,
        );
    }
    record_event(state.store.as_ref(), record).await;
    true
}

/// Deal one dealer card. The hole card is broadcast under
/// [`HOLE_CARD_NAME`] with only the visible total; the event record keeps
/// the real card for replay.
async fn deal_dealer_card(state: &AppState, code: &str, hole: bool) -> bool {
    let record;
    {
        let mut reg = state.sessions.write().await;
        let Some(group) = reg.group_mut(code) else {
            return false;
        };
        let card = group.draw();
        group.dealer_hand.cards.push(card);
        if hole {
            group.hole_card = Some(card);
        }
        let shown = if hole {
            HOLE_CARD_NAME.to_string()
        } else {
            card.name()
        };
        let total = group.dealer_visible_value();
        let deck_count = group.deck.len();
        let round = group.round;
        let gid = group.unique_id.to_string();
        let members = group.members.clone();
        let mut model = GameModel::new(GameEventKind::CardDrawn);
        model.card = Some(shown);
        model.total_value = Some(total.clone());
        model.deck_count = Some(deck_count);
        state.notifier.to_players(&members, ServerMsg::Game(model));
        record = EventRecord::new(
            UserId::from(DEALER_ID),
            gid,
            GameEventKind::CardDrawn.as_str(),
            total,
            card.name(),
            round,
        );
    }
    record_event(state.store.as_ref(), record).await;
    true
}

/// Auto-finish naturals dealt on the opening two cards and establish the
/// first turn.
async fn resolve_naturals(state: &AppState, code: &str) {
    let mut all_finished = false;
    {
        let mut reg = state.sessions.write().await;
        let Some(group) = reg.group(code) else {
            return;
        };
        let members = group.members.clone();
        for user in &members {
            let Some(player) = reg.players.get_mut(user) else {
                continue;
            };
            if let Some(hand) = player.hands.first_mut() {
                if hand.is_natural() {
                    hand.is_finished = true;
                }
            }
            if !player.hands.is_empty() && player.all_hands_finished() && !player.has_finished {
                player.has_finished = true;
                let mut model = GameModel::new(GameEventKind::PlayerFinished);
                model.user_id = Some(user.clone());
                state.notifier.to_players(&members, ServerMsg::Game(model));
            }
        }
        match members
            .iter()
            .find(|u| reg.players.get(u).is_some_and(|p| !p.has_finished))
        {
            Some(next) => {
                let idx = reg
                    .players
                    .get(next)
                    .and_then(|p| p.active_hand())
                    .unwrap_or(0);
                let mut model = GameModel::new(GameEventKind::Turn);
                model.user_id = Some((*next).clone());
                model.hand_index = Some(idx);
                state.notifier.to_players(&members, ServerMsg::Game(model));
            }
            None => all_finished = true,
        }
    }
    if all_finished {
        finish_round(state, code).await;
    }
}
