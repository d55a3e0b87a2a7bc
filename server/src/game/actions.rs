//! In-round player actions: turn gating, hit, stand, double, split,
//! insurance and surrender.

use blackjack_shared::{GameEventKind, GameModel, Hand, ServerMsg, UserId};

use crate::notify::Notifier;
use crate::registry::{GroupStatus, SessionStore, MAX_HANDS};
use crate::state::AppState;
use crate::store::{record_event, EventRecord};

use super::round;

/// The round-robin turn gate. An action is allowed only while the group
/// is playing, the opening deal is complete, the actor is unfinished and
/// every earlier seat has finished. Returns the group code on success.
fn check_turn(reg: &SessionStore, user: &UserId) -> Result<String, String> {
    let Some(group) = reg.group_for_player(user) else {
        return Err("You are not in a group".to_string());
    };
    if group.status != GroupStatus::Playing {
        return Err("The round has not started".to_string());
    }
    if group.dealer_hand.cards.len() < 2 {
        return Err("The deal is still running".to_string());
    }
    let Some(me) = reg.player(user) else {
        return Err("You are not seated at this table".to_string());
    };
    if me.has_finished {
        return Err("You have already finished this round".to_string());
    }
    for other in &group.members {
        if other == user {
            break;
        }
        if reg.player(other).is_some_and(|p| !p.has_finished) {
            return Err("Not your turn".to_string());
        }
    }
    Ok(group.group_id.clone())
}

/// A state invariant was violated. Log it and tell the table.
fn report_anomaly(reg: &SessionStore, notifier: &dyn Notifier, code: &str, what: &str) {
    tracing::error!(group = %code, what, "game state anomaly");
    if let Some(group) = reg.group(code) {
        notifier.to_players(
            &group.members,
            ServerMsg::error("Something went wrong at the table, try again later"),
        );
    }
}

/// Cascade player-finished state after a hand closes and work out who
/// acts next. Returns true when every member is done and the dealer
/// should play.
fn advance_turn(
    reg: &mut SessionStore,
    notifier: &dyn Notifier,
    code: &str,
    actor: &UserId,
) -> bool {
    let Some(group) = reg.groups.get(code) else {
        return false;
    };
    let members = group.members.clone();
    let mut actor_done = false;
    if let Some(p) = reg.players.get_mut(actor) {
        if !p.hands.is_empty() && p.all_hands_finished() && !p.has_finished {
            p.has_finished = true;
            actor_done = true;
        }
    }
    if actor_done {
        let mut model = GameModel::new(GameEventKind::PlayerFinished);
        model.user_id = Some(actor.clone());
        notifier.to_players(&members, ServerMsg::Game(model));
    } else if let Some(p) = reg.players.get(actor) {
        // the actor continues on their next split hand
        if let Some(idx) = p.active_hand() {
            let mut model = GameModel::new(GameEventKind::Turn);
            model.user_id = Some(actor.clone());
            model.hand_index = Some(idx);
            notifier.to_players(&members, ServerMsg::Game(model));
            return false;
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
            notifier.to_players(&members, ServerMsg::Game(model));
            false
        }
        None => true,
    }
}

pub async fn hit(state: &AppState, user: &UserId) {
    let mut finish = None;
    let record;
    {
        let mut reg = state.sessions.write().await;
        let code = match check_turn(&reg, user) {
            Ok(code) => code,
            Err(msg) => {
                state.notifier.to_player(user, ServerMsg::warning(msg));
                return;
            }
        };
        let Some(group) = reg.groups.get_mut(&code) else {
            return;
        };
        let card = group.draw();
        let deck_count = group.deck.len();
        let round = group.round;
        let gid = group.unique_id.to_string();
        let members = group.members.clone();
        let Some(player) = reg.players.get_mut(user) else {
            return;
        };
        let Some(idx) = player.active_hand() else {
            report_anomaly(&reg, state.notifier.as_ref(), &code, "active hand missing on hit");
            return;
        };
        let hand = &mut player.hands[idx];
        hand.cards.push(card);
        let total = hand.value_string();
        let hand_done = hand.best_value() >= 21;
        if hand_done {
            hand.is_finished = true;
        }
        let mut model = GameModel::new(GameEventKind::Hit);
        model.user_id = Some(user.clone());
        model.card = Some(card.name());
        model.hand_index = Some(idx);
        model.total_value = Some(total.clone());
        model.deck_count = Some(deck_count);
        state.notifier.to_players(&members, ServerMsg::Game(model));
        record = EventRecord::new(
            user.clone(),
            gid,
            GameEventKind::Hit.as_str(),
            total,
            card.name(),
            round,
        );
        if hand_done && advance_turn(&mut reg, state.notifier.as_ref(), &code, user) {
            finish = Some(code);
        }
    }
    record_event(state.store.as_ref(), record).await;
    if let Some(code) = finish {
        round::finish_round(state, &code).await;
    }
}

pub async fn stand(state: &AppState, user: &UserId) {
    let mut finish = None;
    let record;
    {
        let mut reg = state.sessions.write().await;
        let code = match check_turn(&reg, user) {
            Ok(code) => code,
            Err(msg) => {
                state.notifier.to_player(user, ServerMsg::warning(msg));
                return;
            }
        };
        let Some(player) = reg.players.get_mut(user) else {
            return;
        };
        let Some(idx) = player.active_hand() else {
            report_anomaly(&reg, state.notifier.as_ref(), &code, "active hand missing on stand");
            return;
        };
        player.hands[idx].is_finished = true;
        let total = player.hands[idx].value_string();
        let Some(group) = reg.groups.get(&code) else {
            return;
        };
        let members = group.members.clone();
        let gid = group.unique_id.to_string();
        let round = group.round;
        let mut model = GameModel::new(GameEventKind::Stand);
        model.user_id = Some(user.clone());
        model.hand_index = Some(idx);
        model.total_value = Some(total.clone());
        state.notifier.to_players(&members, ServerMsg::Game(model));
        record = EventRecord::new(
            user.clone(),
            gid,
            GameEventKind::Stand.as_str(),
            total,
            String::new(),
            round,
        );
        if advance_turn(&mut reg, state.notifier.as_ref(), &code, user) {
            finish = Some(code);
        }
    }
    record_event(state.store.as_ref(), record).await;
    if let Some(code) = finish {
        round::finish_round(state, &code).await;
    }
}

pub async fn double(state: &AppState, user: &UserId) {
    let mut finish = None;
    let record;
    {
        let mut reg = state.sessions.write().await;
        let code = match check_turn(&reg, user) {
            Ok(code) => code,
            Err(msg) => {
                state.notifier.to_player(user, ServerMsg::warning(msg));
                return;
            }
        };
        let Some(group) = reg.groups.get(&code) else {
            return;
        };
        let bet = group.bets.get(user).copied().unwrap_or(0);
        if bet == 0 {
            state
                .notifier
                .to_player(user, ServerMsg::warning("You have no stake in this round"));
            return;
        }
        {
            let Some(player) = reg.players.get(user) else {
                return;
            };
            let Some(idx) = player.active_hand() else {
                report_anomaly(&reg, state.notifier.as_ref(), &code, "active hand missing on double");
                return;
            };
            if player.hands[idx].cards.len() != 2 {
                state.notifier.to_player(
                    user,
                    ServerMsg::warning("Double is only available on a two-card hand"),
                );
                return;
            }
            if player.credits < bet {
                state
                    .notifier
                    .to_player(user, ServerMsg::warning("Not enough credits to double"));
                return;
            }
        }
        let Some(group) = reg.groups.get_mut(&code) else {
            return;
        };
        let card = group.draw();
        let deck_count = group.deck.len();
        let round = group.round;
        let gid = group.unique_id.to_string();
        let members = group.members.clone();
        let Some(player) = reg.players.get_mut(user) else {
            return;
        };
        player.credits -= bet;
        let credits = player.credits;
        let Some(idx) = player.active_hand() else {
            return;
        };
        let hand = &mut player.hands[idx];
        hand.is_doubled = true;
        hand.cards.push(card);
        hand.is_finished = true;
        let total = hand.value_string();
        let mut model = GameModel::new(GameEventKind::Double);
        model.user_id = Some(user.clone());
        model.card = Some(card.name());
        model.hand_index = Some(idx);
        model.total_value = Some(total.clone());
        model.bet = Some(bet * 2);
        model.credits = Some(credits);
        model.deck_count = Some(deck_count);
        state.notifier.to_players(&members, ServerMsg::Game(model));
        record = EventRecord::new(
            user.clone(),
            gid,
            GameEventKind::Double.as_str(),
            total,
            card.name(),
            round,
        );
        if advance_turn(&mut reg, state.notifier.as_ref(), &code, user) {
            finish = Some(code);
        }
    }
    record_event(state.store.as_ref(), record).await;
    if let Some(code) = finish {
        round::finish_round(state, &code).await;
    }
}

pub async fn split(state: &AppState, user: &UserId) {
    let record;
    {
        let mut reg = state.sessions.write().await;
        let code = match check_turn(&reg, user) {
            Ok(code) => code,
            Err(msg) => {
                state.notifier.to_player(user, ServerMsg::warning(msg));
                return;
            }
        };
        let Some(group) = reg.groups.get(&code) else {
            return;
        };
        let bet = group.bets.get(user).copied().unwrap_or(0);
        let gid = group.unique_id.to_string();
        let round = group.round;
        let members = group.members.clone();
        if bet == 0 {
            state
                .notifier
                .to_player(user, ServerMsg::warning("You have no stake in this round"));
            return;
        }
        let Some(player) = reg.players.get_mut(user) else {
            return;
        };
        let Some(idx) = player.active_hand() else {
            report_anomaly(&reg, state.notifier.as_ref(), &code, "active hand missing on split");
            return;
        };
        let pair = player.hands[idx].cards.len() == 2
            && player.hands[idx].cards[0].rank() == player.hands[idx].cards[1].rank();
        if !pair {
            state
                .notifier
                .to_player(user, ServerMsg::warning("You can only split a matching pair"));
            return;
        }
        if player.hands.len() >= MAX_HANDS {
            state
                .notifier
                .to_player(user, ServerMsg::warning("You cannot split into more hands"));
            return;
        }
        if player.credits < bet {
            state
                .notifier
                .to_player(user, ServerMsg::warning("Not enough credits to split"));
            return;
        }
        player.credits -= bet;
        let credits = player.credits;
        let first = player.hands[idx].cards[0];
        let second = player.hands[idx].cards[1];
        player.hands[idx] = Hand::with_cards(vec![first]);
        player.hands.insert(idx + 1, Hand::with_cards(vec![second]));
        let mut model = GameModel::new(GameEventKind::Split);
        model.user_id = Some(user.clone());
        model.hand_index = Some(idx);
        model.bet = Some(bet);
        model.credits = Some(credits);
        state.notifier.to_players(&members, ServerMsg::Game(model));
        record = EventRecord::new(
            user.clone(),
            gid,
            GameEventKind::Split.as_str(),
            String::new(),
            first.name(),
            round,
        );
    }
    record_event(state.store.as_ref(), record).await;
}

pub async fn insure(state: &AppState, user: &UserId) {
    let record;
    {
        let mut reg = state.sessions.write().await;
        let code = match check_turn(&reg, user) {
            Ok(code) => code,
            Err(msg) => {
                state.notifier.to_player(user, ServerMsg::warning(msg));
                return;
            }
        };
        let Some(group) = reg.groups.get(&code) else {
            return;
        };
        let bet = group.bets.get(user).copied().unwrap_or(0);
        let ace_up = group
            .dealer_upcard()
            .is_some_and(|c| c.blackjack_value() == 11);
        let gid = group.unique_id.to_string();
        let round = group.round;
        let members = group.members.clone();
        if !ace_up {
            state.notifier.to_player(
                user,
                ServerMsg::warning("Insurance is only offered against a dealer ace"),
            );
            return;
        }
        if bet == 0 {
            state
                .notifier
                .to_player(user, ServerMsg::warning("You have no stake in this round"));
            return;
        }
        let cost = bet / 2;
        let Some(player) = reg.players.get_mut(user) else {
            return;
        };
        if player.has_insurance {
            state
                .notifier
                .to_player(user, ServerMsg::warning("You already have insurance"));
            return;
        }
        if player.hands.len() != 1 || player.hands[0].cards.len() != 2 {
            state.notifier.to_player(
                user,
                ServerMsg::warning("Insurance is only available on your opening hand"),
            );
            return;
        }
        if player.credits < cost {
            state
                .notifier
                .to_player(user, ServerMsg::warning("Not enough credits for insurance"));
            return;
        }
        player.credits -= cost;
        player.has_insurance = true;
        let credits = player.credits;
        let mut model = GameModel::new(GameEventKind::Insure);
        model.user_id = Some(user.clone());
        model.bet = Some(cost);
        model.credits = Some(credits);
        state.notifier.to_players(&members, ServerMsg::Game(model));
        record = EventRecord::new(
            user.clone(),
            gid,
            GameEventKind::Insure.as_str(),
            cost.to_string(),
            String::new(),
            round,
        );
    }
    record_event(state.store.as_ref(), record).await;
}

pub async fn surrender(state: &AppState, user: &UserId) {
    let mut finish = None;
    let record;
    {
        let mut reg = state.sessions.write().await;
        let code = match check_turn(&reg, user) {
            Ok(code) => code,
            Err(msg) => {
                state.notifier.to_player(user, ServerMsg::warning(msg));
                return;
            }
        };
        let Some(group) = reg.groups.get(&code) else {
            return;
        };
        let bet = group.bets.get(user).copied().unwrap_or(0);
        let gid = group.unique_id.to_string();
        let round = group.round;
        let members = group.members.clone();
        if bet == 0 {
            state
                .notifier
                .to_player(user, ServerMsg::warning("You have no stake in this round"));
            return;
        }
        let Some(player) = reg.players.get_mut(user) else {
            return;
        };
        if player.hands.len() != 1 || player.hands[0].cards.len() != 2 {
            state.notifier.to_player(
                user,
                ServerMsg::warning("Surrender is only available on your opening hand"),
            );
            return;
        }
        player.credits += bet / 2;
        let credits = player.credits;
        player.hands[0].cards.clear();
        player.hands[0].is_finished = true;
        let mut model = GameModel::new(GameEventKind::Surrender);
        model.user_id = Some(user.clone());
        model.credits = Some(credits);
        state.notifier.to_players(&members, ServerMsg::Game(model));
        record = EventRecord::new(
            user.clone(),
            gid,
            GameEventKind::Surrender.as_str(),
            (bet / 2).to_string(),
            String::new(),
            round,
        );
        if advance_turn(&mut reg, state.notifier.as_ref(), &code, user) {
            finish = Some(code);
        }
    }
    record_event(state.store.as_ref(), record).await;
    if let Some(code) = finish {
        round::finish_round(state, &code).await;
    }
}
