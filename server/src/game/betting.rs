//! Stake placement and the all-bets-in gate.

use blackjack_shared::{GameEventKind, GameModel, ServerMsg, UserId};

use crate::registry::GroupStatus;
use crate::state::AppState;
use crate::store::{record_event, EventRecord};

use super::round;

/// Place a stake. Bets are a positive multiple of 10, at most the
/// player's balance, one per round. The last bet in flips the group to
/// playing and starts the deal.
pub async fn bet(state: &AppState, user: &UserId, amount: u32) {
    let record;
    let code;
    let deal;
    {
        let mut reg = state.sessions.write().await;
        let Some(found) = reg.group_code_for_player(user) else {
            state
                .notifier
                .to_player(user, ServerMsg::warning("You are not in a group"));
            return;
        };
        code = found;
        {
            let Some(group) = reg.group(&code) else {
                return;
            };
            if group.status != GroupStatus::Betting {
                state
                    .notifier
                    .to_player(user, ServerMsg::warning("Betting is closed"));
                return;
            }
            if group.bets.contains_key(user) {
                state
                    .notifier
                    .to_player(user, ServerMsg::warning("You already placed a bet"));
                return;
            }
        }
        if amount == 0 || amount % 10 != 0 {
            state.notifier.to_player(
                user,
                ServerMsg::warning("Bets must be a positive multiple of 10"),
            );
            return;
        }
        let credits = {
            let Some(player) = reg.player_mut(user) else {
                return;
            };
            if amount > player.credits {
                state
                    .notifier
                    .to_player(user, ServerMsg::warning("Not enough credits"));
                return;
            }
            player.credits -= amount;
            player.credits
        };
        let Some(group) = reg.group_mut(&code) else {
            return;
        };
        group.bets.insert(user.clone(), amount);
        deal = group.bets.len() == group.members.len();
        let members = group.members.clone();
        let round = group.round;
        let gid = group.unique_id.to_string();
        let mut model = GameModel::new(GameEventKind::BetPlaced);
        model.user_id = Some(user.clone());
        model.bet = Some(amount);
        model.credits = Some(credits);
        state.notifier.to_players(&members, ServerMsg::Game(model));
        record = EventRecord::new(
            user.clone(),
            gid,
            GameEventKind::BetPlaced.as_str(),
            amount.to_string(),
            String::new(),
            round,
        );
        tracing::info!(group = %code, user = %user, amount, "bet placed");
    }
    record_event(state.store.as_ref(), record).await;
    if deal {
        round::start_round(state, &code).await;
    }
}
