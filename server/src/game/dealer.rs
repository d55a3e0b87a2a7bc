//! Dealer auto-play and round settlement.

use std::time::Duration;

use blackjack_shared::{GameEventKind, GameModel, Hand, ServerMsg, UserId};

use crate::state::AppState;
use crate::store::{record_event, EventRecord};

use super::round::DEALER_ID;

/// Dealer draws while their best value is at or below this, standing on
/// all 17s.
const DEALER_STAND: u8 = 17;

/// Credits floor below which the house steps in after settlement.
const BANKRUPT_FLOOR: u32 = 10;
const STIPEND: u32 = 100;

const FLAVOR: [&str; 5] = [
    "The house takes pity on you. Here are 100 credits, try not to lose these too.",
    "A mysterious benefactor slides 100 credits across the table.",
    "The pit boss sighs and tops you up with 100 credits.",
    "Lady Luck owes you one. 100 credits, on the house.",
    "Your tab is getting long. 100 credits to keep you in the game.",
];

/// Reveal the hole card and draw out the dealer's hand with pacing.
/// Returns false when the group vanished or another completion pass
/// already owns the round.
pub(crate) async fn play_dealer(state: &AppState, code: &str) -> bool {
    let delay = Duration::from_millis(state.config.dealer_delay_ms);
    let reveal;
    {
        let mut reg = state.sessions.write().await;
        let Some(group) = reg.group_mut(code) else {
            return false;
        };
        if group.settling {
            return false;
        }
        group.settling = true;
        let Some(card) = group.hole_card.take() else {
            return true;
        };
        let total = group.dealer_hand.value_string();
        let deck_count = group.deck.len();
        let members = group.members.clone();
        let gid = group.unique_id.to_string();
        let round = group.round;
        let mut model = GameModel::new(GameEventKind::CardDrawn);
        model.card = Some(card.name());
        model.total_value = Some(total.clone());
        model.deck_count = Some(deck_count);
        state.notifier.to_players(&members, ServerMsg::Game(model));
        reveal = EventRecord::new(
            UserId::from(DEALER_ID),
            gid,
            GameEventKind::CardDrawn.as_str(),
            total,
            card.name(),
            round,
        );
    }
    record_event(state.store.as_ref(), reveal).await;

    loop {
        tokio::time::sleep(delay).await;
        let record;
        {
            let mut reg = state.sessions.write().await;
            let Some(group) = reg.group_mut(code) else {
                return false;
            };
            if group.dealer_hand.best_value() >= DEALER_STAND {
                break;
            }
            let card = group.draw();
            group.dealer_hand.cards.push(card);
            let total = group.dealer_hand.value_string();
            let deck_count = group.deck.len();
            let members = group.members.clone();
            let gid = group.unique_id.to_string();
            let round = group.round;
            let mut model = GameModel::new(GameEventKind::CardDrawn);
            model.card = Some(card.name());
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
    }
    true
}

/// What one hand pays out. `credited` is added back to the player's
/// balance; `earnings` and `losses` feed the statistics counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct HandOutcome {
    pub credited: u32,
    pub earnings: u32,
    pub losses: u32,
    pub stake: u32,
    pub result: &'static str,
}

/// Resolve one hand against the dealer, in priority order: surrender,
/// bust, push, natural, dealer higher, player wins. Insurance is handled
/// separately by the settlement pass. Doubled hands stake twice the bet.
pub(crate) fn resolve_hand(hand: &Hand, bet: u32, dealer_best: u8) -> HandOutcome {
    if hand.cards.is_empty() {
        return HandOutcome {
            credited: 0,
            earnings: 0,
            losses: bet / 2,
            stake: bet,
            result: "Surrender",
        };
    }
    let stake = if hand.is_doubled { bet * 2 } else { bet };
    let best = hand.best_value();
    if best > 21 {
        return HandOutcome {
            credited: 0,
            earnings: 0,
            losses: stake,
            stake,
            result: "Bust",
        };
    }
    if best == dealer_best {
        return HandOutcome {
            credited: stake,
            earnings: 0,
            losses: 0,
            stake,
            result: "Push",
        };
    }
    if hand.is_natural() {
        let bonus = bet * 3 / 2;
        return HandOutcome {
            credited: bet + bonus,
            earnings: bonus,
            losses: 0,
            stake,
            result: "Blackjack",
        };
    }
    if dealer_best > best && dealer_best <= 21 {
        return HandOutcome {
            credited: 0,
            earnings: 0,
            losses: stake,
            stake,
            result: "Lose",
        };
    }
    HandOutcome {
        credited: stake * 2,
        earnings: stake,
        losses: 0,
        stake,
        result: "Win",
    }
}

struct MemberSettlement {
    user: UserId,
    credits: u32,
    earnings: u32,
    losses: u32,
}

/// Settle every member's hands against the dealer, apply the bankruptcy
/// stipend, then persist credits and statistics. Returns false when the
/// group vanished before settlement could run.
pub(crate) async fn settle(state: &AppState, code: &str) -> bool {
    let mut persists: Vec<MemberSettlement> = Vec::new();
    let mut records: Vec<EventRecord> = Vec::new();
    {
        let mut reg = state.sessions.write().await;
        let Some(group) = reg.group(code) else {
            return false;
        };
        let dealer_best = group.dealer_hand.best_value();
        let dealer_natural = group.dealer_natural();
        let members = group.members.clone();
        let bets = group.bets.clone();
        let gid = group.unique_id.to_string();
        let round = group.round;
        for user in &members {
            let bet = bets.get(user).copied().unwrap_or(0);
            let Some(player) = reg.players.get_mut(user) else {
                tracing::error!(group = %code, user = %user, "member missing at settlement");
                continue;
            };
            let mut credited = 0u32;
            let mut earnings = 0u32;
            let mut losses = 0u32;
            if player.has_insurance {
                if dealer_natural {
                    credited += bet;
                    earnings += bet / 2;
                } else {
                    losses += bet / 2;
                }
            }
            let outcomes: Vec<(usize, HandOutcome, String)> = player
                .hands
                .iter()
                .enumerate()
                .map(|(i, h)| (i, resolve_hand(h, bet, dealer_best), h.value_string()))
                .collect();
            for (_, outcome, _) in &outcomes {
                credited += outcome.credited;
                earnings += outcome.earnings;
                losses += outcome.losses;
            }
            player.credits += credited;
            let mut stipend = false;
            if player.credits < BANKRUPT_FLOOR {
                player.credits += STIPEND;
                stipend = true;
            }
            let credits = player.credits;
            for (idx, outcome, total) in &outcomes {
                let mut model = GameModel::new(GameEventKind::GameFinished);
                model.user_id = Some(user.clone());
                model.hand_index = Some(*idx);
                model.result = Some(outcome.result.to_string());
                model.total_value = Some(total.clone());
                model.bet = Some(outcome.stake);
                model.credits = Some(credits);
                state.notifier.to_players(&members, ServerMsg::Game(model));
                records.push(EventRecord::new(
                    user.clone(),
                    gid.clone(),
                    GameEventKind::GameFinished.as_str(),
                    outcome.result.to_string(),
                    total.clone(),
                    round,
                ));
            }
            if stipend {
                let line = FLAVOR[rand::random_range(0..FLAVOR.len())];
                state.notifier.to_player(user, ServerMsg::plain(line));
                tracing::info!(group = %code, user = %user, "bankruptcy stipend granted");
            }
            persists.push(MemberSettlement {
                user: user.clone(),
                credits,
                earnings,
                losses,
            });
        }
        tracing::info!(group = %code, round, dealer = dealer_best, "round settled");
    }
    for s in persists {
        if let Err(e) = state.store.update_credits(&s.user, s.credits).await {
            tracing::warn!(error = %e, user = %s.user, "failed to persist credits");
        }
        if let Err(e) = state
            .store
            .update_statistics(&s.user, s.earnings, s.losses)
            .await
        {
            tracing::warn!(error = %e, user = %s.user, "failed to persist statistics");
        }
        let mut model = GameModel::new(GameEventKind::CreditsUpdate);
        model.user_id = Some(s.user.clone());
        model.credits = Some(s.credits);
        state.notifier.to_player(&s.user, ServerMsg::Game(model));
    }
    for record in records {
        record_event(state.store.as_ref(), record).await;
    }
    true
}
