//! Shared protocol and card-model types for the blackjack server.

pub mod cards;
pub mod hand;
pub mod messages;
pub mod player;

pub use cards::{standard_deck, Card, CardRank, CardSuit};
pub use hand::{Hand, HandValue};
pub use messages::{
    AckCommand, ChatCommand, Command, Envelope, GameCommand, GameEventKind, GameModel,
    GroupCommand, GroupModel, GroupNotification, LobbyEntry, LobbyModel, Notification, ServerMsg,
    ToastKind,
};
pub use player::{GroupMember, UserId};
