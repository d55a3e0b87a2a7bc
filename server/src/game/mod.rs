//! Blackjack rules engine and round state machine.

pub mod actions;
pub mod betting;
pub mod dealer;
pub mod round;

use blackjack_shared::{GameCommand, UserId};

use crate::state::AppState;

pub async fn handle(state: &AppState, user: &UserId, cmd: GameCommand) {
    match cmd {
        GameCommand::Bet { amount } => betting::bet(state, user, amount).await,
        GameCommand::Hit => actions::hit(state, user).await,
        GameCommand::Stand => actions::stand(state, user).await,
        GameCommand::Double => actions::double(state, user).await,
        GameCommand::Split => actions::split(state, user).await,
        GameCommand::Insure => actions::insure(state, user).await,
        GameCommand::Surrender => actions::surrender(state, user).await,
    }
}
