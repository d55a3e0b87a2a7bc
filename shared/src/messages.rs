//! Client-server messaging protocol for the blackjack server.

use serde::{Deserialize, Serialize};

use crate::player::{GroupMember, UserId};

/// Inbound message envelope. Every frame carries a bearer token; the
/// remaining fields are keyed by `category` and `action`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Envelope {
    pub token: String,
    #[serde(flatten)]
    pub command: Command,
}

/// Inbound commands, tagged by category. Unknown categories or actions
/// fail deserialization and are rejected centrally.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum Command {
    Chat(ChatCommand),
    Group(GroupCommand),
    Game(GameCommand),
    Acknowledge(AckCommand),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ChatCommand {
    Global { text: String },
    Group { text: String },
    Private { target: UserId, text: String },
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GroupCommand {
    CreateGroup,
    JoinGroup { group_id: String },
    LeaveGroup,
    Ready,
    Unready,
    CheckGroup,
    ShowLobby,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum GameCommand {
    Bet { amount: u32 },
    Hit,
    Stand,
    Double,
    Split,
    Insure,
    Surrender,
}

/// Binds the resolved user identity to the current connection.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AckCommand {
    Acknowledge,
}

/// Messages that the server can send to clients
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMsg {
    Welcome,
    Notification(Notification),
    GroupNotification(GroupNotification),
    Game(GameModel),
    Group(GroupModel),
    Lobby(LobbyModel),
}

impl ServerMsg {
    pub fn info(text: impl Into<String>) -> Self {
        ServerMsg::Notification(Notification::new(ToastKind::Info, text))
    }

    pub fn success(text: impl Into<String>) -> Self {
        ServerMsg::Notification(Notification::new(ToastKind::Success, text))
    }

    pub fn warning(text: impl Into<String>) -> Self {
        ServerMsg::Notification(Notification::new(ToastKind::Warning, text))
    }

    pub fn error(text: impl Into<String>) -> Self {
        ServerMsg::Notification(Notification::new(ToastKind::Error, text))
    }

    pub fn plain(text: impl Into<String>) -> Self {
        ServerMsg::Notification(Notification::new(ToastKind::Default, text))
    }
}

/// Toast severity shown by clients.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Info,
    Success,
    Warning,
    Error,
    Default,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Notification {
    pub kind: ToastKind,
    pub text: String,
}

impl Notification {
    pub fn new(kind: ToastKind, text: impl Into<String>) -> Self {
        Notification {
            kind,
            text: text.into(),
        }
    }
}

/// Group-scoped banner message.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupNotification {
    pub group_id: String,
    pub text: String,
}

/// Game event kinds carried by [`GameModel`].
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEventKind {
    Turn,
    CreditsUpdate,
    CardDrawn,
    BetPlaced,
    GameFinished,
    GameStarted,
    PlayerFinished,
    Hit,
    Stand,
    Split,
    Insure,
    Double,
    Surrender,
}

impl GameEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            GameEventKind::Turn => "TURN",
            GameEventKind::CreditsUpdate => "CREDITS_UPDATE",
            GameEventKind::CardDrawn => "CARD_DRAWN",
            GameEventKind::BetPlaced => "BET_PLACED",
            GameEventKind::GameFinished => "GAME_FINISHED",
            GameEventKind::GameStarted => "GAME_STARTED",
            GameEventKind::PlayerFinished => "PLAYER_FINISHED",
            GameEventKind::Hit => "HIT",
            GameEventKind::Stand => "STAND",
            GameEventKind::Split => "SPLIT",
            GameEventKind::Insure => "INSURE",
            GameEventKind::Double => "DOUBLE",
            GameEventKind::Surrender => "SURRENDER",
        }
    }
}

/// One typed game event. Only the fields relevant for the event kind are
/// populated.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GameModel {
    pub action: GameEventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hand_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bet: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub credits: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

impl GameModel {
    pub fn new(action: GameEventKind) -> Self {
        GameModel {
            action,
            user_id: None,
            card: None,
            hand_index: None,
            total_value: None,
            bet: None,
            credits: None,
            deck_count: None,
            result: None,
        }
    }
}

/// Membership view of one group.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GroupModel {
    pub group_id: String,
    pub members: Vec<GroupMember>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LobbyEntry {
    pub group_id: String,
    pub players: usize,
}

/// Listing of every open table, pushed to players outside any group.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LobbyModel {
    pub groups: Vec<LobbyEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_group_join() {
        let raw = r#"{"token":"t-1","category":"group","action":"join_group","group_id":"ABCDEF"}"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.token, "t-1");
        match env.command {
            Command::Group(GroupCommand::JoinGroup { group_id }) => {
                assert_eq!(group_id, "ABCDEF");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn envelope_parses_bet() {
        let raw = r#"{"token":"t-1","category":"game","action":"bet","amount":50}"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            env.command,
            Command::Game(GameCommand::Bet { amount: 50 })
        ));
    }

    #[test]
    fn envelope_parses_acknowledge() {
        let raw = r#"{"token":"t-1","category":"acknowledge","action":"acknowledge"}"#;
        let env: Envelope = serde_json::from_str(raw).unwrap();
        assert!(matches!(
            env.command,
            Command::Acknowledge(AckCommand::Acknowledge)
        ));
    }

    #[test]
    fn unknown_action_is_rejected() {
        let raw = r#"{"token":"t-1","category":"game","action":"steal_chips"}"#;
        assert!(serde_json::from_str::<Envelope>(raw).is_err());
    }

    #[test]
    fn unknown_category_is_rejected() {
        let raw = r#"{"token":"t-1","category":"admin","action":"shutdown"}"#;
        assert!(serde_json::from_str::<Envelope>(raw).is_err());
    }

    #[test]
    fn server_msg_wire_shape() {
        let msg = ServerMsg::warning("not your turn");
        let v: serde_json::Value = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["type"], "Notification");
        assert_eq!(v["data"]["kind"], "warning");
        assert_eq!(v["data"]["text"], "not your turn");
    }

    #[test]
    fn game_model_skips_empty_fields() {
        let mut model = GameModel::new(GameEventKind::CardDrawn);
        model.card = Some("A♠".to_string());
        let v: serde_json::Value = serde_json::to_value(ServerMsg::Game(model)).unwrap();
        assert_eq!(v["data"]["action"], "CARD_DRAWN");
        assert_eq!(v["data"]["card"], "A♠");
        assert!(v["data"].get("bet").is_none());
    }
}
