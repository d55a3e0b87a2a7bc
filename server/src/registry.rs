//! Players, groups, and the in-memory session registry.

use std::collections::{HashMap, VecDeque};

use blackjack_shared::{standard_deck, Card, GroupMember, GroupModel, Hand, LobbyEntry, LobbyModel, UserId};
use rand::seq::SliceRandom;
use uuid::Uuid;

/// Seats per table.
pub const MAX_MEMBERS: usize = 4;
/// Hands per player (the original hand plus up to three splits).
pub const MAX_HANDS: usize = 4;
/// A fresh shoe is built at deal time when at most this many cards remain.
pub const SHOE_LOW_WATER: usize = 52;

/// Connection identifier assigned by the transport layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        SessionId(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-connection player state. Credits are mutated only by the game
/// engine and synced to the store at settlement.
#[derive(Clone, Debug)]
pub struct Player {
    pub user_id: UserId,
    pub name: String,
    pub credits: u32,
    pub hands: Vec<Hand>,
    pub has_finished: bool,
    pub has_insurance: bool,
    pub is_ready: bool,
}

impl Player {
    pub fn new(user_id: UserId, name: String, credits: u32) -> Self {
        Player {
            user_id,
            name,
            credits,
            hands: Vec::new(),
            has_finished: false,
            has_insurance: false,
            is_ready: false,
        }
    }

    /// First unfinished hand, the only one eligible for an action.
    pub fn active_hand(&self) -> Option<usize> {
        self.hands.iter().position(|h| !h.is_finished)
    }

    pub fn all_hands_finished(&self) -> bool {
        self.hands.iter().all(|h| h.is_finished)
    }

    pub fn reset_for_round(&mut self) {
        self.hands.clear();
        self.has_finished = false;
        self.has_insurance = false;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupStatus {
    Waiting,
    Betting,
    Playing,
}

/// A 1-4 player table with a shared shoe and a dealer hand.
#[derive(Clone, Debug)]
pub struct Group {
    /// Short public code players type to join.
    pub group_id: String,
    /// Internal id used for durable correlation in event records.
    pub unique_id: Uuid,
    pub status: GroupStatus,
    /// Seat order is turn order.
    pub members: Vec<UserId>,
    /// Players who joined while a round was running; promoted at the next
    /// betting phase.
    pub waiting_room: Vec<UserId>,
    pub deck: VecDeque<Card>,
    pub dealer_hand: Hand,
    /// The dealer's second card. Its value is already counted in
    /// `dealer_hand`; only the identity is withheld until reveal.
    pub hole_card: Option<Card>,
    pub bets: HashMap<UserId, u32>,
    pub round: u32,
    /// Set while the dealer plays out and settlement runs. Prevents a
    /// second completion pass from racing the first.
    pub settling: bool,
}

impl Group {
    pub fn new(group_id: String) -> Self {
        Group {
            group_id,
            unique_id: Uuid::new_v4(),
            status: GroupStatus::Waiting,
            members: Vec::new(),
            waiting_room: Vec::new(),
            deck: VecDeque::new(),
            dealer_hand: Hand::default(),
            hole_card: None,
            bets: HashMap::new(),
            round: 0,
            settling: false,
        }
    }

    pub fn is_member(&self, user: &UserId) -> bool {
        self.members.contains(user)
    }

    pub fn in_waiting_room(&self, user: &UserId) -> bool {
        self.waiting_room.contains(user)
    }

    /// Seats taken counting both members and the waiting room.
    pub fn occupancy(&self) -> usize {
        self.members.len() + self.waiting_room.len()
    }

    /// A non-empty deck means cards are (or have been) in play this shoe.
    pub fn round_in_progress(&self) -> bool {
        !self.deck.is_empty()
    }

    pub fn needs_fresh_shoe(&self) -> bool {
        self.deck.len() <= SHOE_LOW_WATER
    }

    /// Draw one card, rebuilding the shoe if it ran dry mid-round.
    pub fn draw(&mut self) -> Card {
        if let Some(card) = self.deck.pop_front() {
            return card;
        }
        tracing::warn!(group = %self.group_id, "shoe ran dry mid-round, rebuilding");
        self.deck = fresh_shoe();
        // a freshly built shoe is never empty
        self.deck.pop_front().unwrap()
    }

    pub fn dealer_upcard(&self) -> Option<Card> {
        self.dealer_hand.cards.first().copied()
    }

    /// Dealer total with the hole card still hidden.
    pub fn dealer_visible_value(&self) -> String {
        let shown: Vec<Card> = match self.hole_card {
            Some(_) => self.dealer_hand.cards.first().copied().into_iter().collect(),
            None => self.dealer_hand.cards.clone(),
        };
        Hand::with_cards(shown).value_string()
    }

    pub fn dealer_natural(&self) -> bool {
        self.dealer_hand.is_natural()
    }
}

/// Two shuffled 52-card decks.
pub fn fresh_shoe() -> VecDeque<Card> {
    let mut cards: Vec<Card> = Vec::with_capacity(104);
    cards.extend(standard_deck());
    cards.extend(standard_deck());
    cards.shuffle(&mut rand::rng());
    VecDeque::from(cards)
}

/// Process-wide registry of connected players, live groups, and the
/// user-to-connection routing table. Lives behind the single registry
/// lock in [`crate::state::AppState`].
#[derive(Default)]
pub struct SessionStore {
    pub(crate) groups: HashMap<String, Group>,
    pub(crate) players: HashMap<UserId, Player>,
    pub(crate) routes: HashMap<UserId, SessionId>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player(&self, user: &UserId) -> Option<&Player> {
        self.players.get(user)
    }

    pub fn player_mut(&mut self, user: &UserId) -> Option<&mut Player> {
        self.players.get_mut(user)
    }

    pub fn register_player(&mut self, player: Player) {
        self.players.insert(player.user_id.clone(), player);
    }

    pub fn remove_player(&mut self, user: &UserId) -> Option<Player> {
        self.players.remove(user)
    }

    pub fn group(&self, code: &str) -> Option<&Group> {
        self.groups.get(code)
    }

    pub fn group_mut(&mut self, code: &str) -> Option<&mut Group> {
        self.groups.get_mut(code)
    }

    pub fn insert_group(&mut self, group: Group) {
        self.groups.insert(group.group_id.clone(), group);
    }

    pub fn remove_group(&mut self, code: &str) -> Option<Group> {
        self.groups.remove(code)
    }

    pub fn has_group(&self, code: &str) -> bool {
        self.groups.contains_key(code)
    }

    /// The group the player is seated at, found by scanning all groups.
    /// A player belongs to at most one.
    pub fn group_for_player(&self, user: &UserId) -> Option<&Group> {
        self.groups.values().find(|g| g.is_member(user))
    }

    pub fn group_code_for_player(&self, user: &UserId) -> Option<String> {
        self.group_for_player(user).map(|g| g.group_id.clone())
    }

    pub fn group_for_waiting_player(&self, user: &UserId) -> Option<&Group> {
        self.groups.values().find(|g| g.in_waiting_room(user))
    }

    pub fn group_code_for_waiting_player(&self, user: &UserId) -> Option<String> {
        self.group_for_waiting_player(user).map(|g| g.group_id.clone())
    }

    pub fn link_session(&mut self, user: UserId, session: SessionId) {
        self.routes.insert(user, session);
    }

    /// Drop the routing entry for a closing connection. Returns the user
    /// that was bound to it, if any.
    pub fn unlink_session(&mut self, session: SessionId) -> Option<UserId> {
        let user = self
            .routes
            .iter()
            .find(|(_, s)| **s == session)
            .map(|(u, _)| u.clone())?;
        self.routes.remove(&user);
        Some(user)
    }

    pub fn session_for(&self, user: &UserId) -> Option<SessionId> {
        self.routes.get(user).copied()
    }

    /// Players not seated at any table and not in any waiting room, the
    /// audience for lobby broadcasts and lobby chat.
    pub fn players_outside_groups(&self) -> Vec<UserId> {
        self.players
            .keys()
            .filter(|u| self.group_for_player(u).is_none() && self.group_for_waiting_player(u).is_none())
            .cloned()
            .collect()
    }

    pub fn lobby_model(&self) -> LobbyModel {
        let mut groups: Vec<LobbyEntry> = self
            .groups
            .values()
            .map(|g| LobbyEntry {
                group_id: g.group_id.clone(),
                players: g.occupancy(),
            })
            .collect();
        groups.sort_by(|a, b| a.group_id.cmp(&b.group_id));
        LobbyModel { groups }
    }

    pub fn group_model(&self, code: &str) -> Option<GroupModel> {
        let group = self.groups.get(code)?;
        let mut members = Vec::new();
        for user in &group.members {
            if let Some(p) = self.players.get(user) {
                members.push(GroupMember {
                    user_id: user.clone(),
                    name: p.name.clone(),
                    is_ready: p.is_ready,
                    in_waiting_room: false,
                });
            }
        }
        for user in &group.waiting_room {
            if let Some(p) = self.players.get(user) {
                members.push(GroupMember {
                    user_id: user.clone(),
                    name: p.name.clone(),
                    is_ready: p.is_ready,
                    in_waiting_room: true,
                });
            }
        }
        Some(GroupModel {
            group_id: group.group_id.clone(),
            members,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(id: &str) -> Player {
        Player::new(UserId::from(id), id.to_string(), 1000)
    }

    #[test]
    fn group_lookup_by_member_and_waiting_room() {
        let mut reg = SessionStore::new();
        reg.register_player(player("alice"));
        reg.register_player(player("bob"));
        let mut group = Group::new("ABCDEF".to_string());
        group.members.push(UserId::from("alice"));
        group.waiting_room.push(UserId::from("bob"));
        reg.insert_group(group);

        assert_eq!(
            reg.group_code_for_player(&UserId::from("alice")).as_deref(),
            Some("ABCDEF")
        );
        assert!(reg.group_for_player(&UserId::from("bob")).is_none());
        assert_eq!(
            reg.group_code_for_waiting_player(&UserId::from("bob")).as_deref(),
            Some("ABCDEF")
        );
    }

    #[test]
    fn session_routing_round_trip() {
        let mut reg = SessionStore::new();
        let session = SessionId::new();
        reg.link_session(UserId::from("alice"), session);
        assert_eq!(reg.session_for(&UserId::from("alice")), Some(session));
        assert_eq!(reg.unlink_session(session), Some(UserId::from("alice")));
        assert_eq!(reg.unlink_session(session), None);
    }

    #[test]
    fn outsiders_excludes_seated_and_waiting_players() {
        let mut reg = SessionStore::new();
        reg.register_player(player("alice"));
        reg.register_player(player("bob"));
        reg.register_player(player("carol"));
        let mut group = Group::new("QWERTY".to_string());
        group.members.push(UserId::from("alice"));
        group.waiting_room.push(UserId::from("bob"));
        reg.insert_group(group);

        let outside = reg.players_outside_groups();
        assert_eq!(outside, vec![UserId::from("carol")]);
    }

    #[test]
    fn active_hand_is_first_unfinished() {
        let mut p = player("alice");
        p.hands = vec![Hand::default(), Hand::default()];
        p.hands[0].is_finished = true;
        assert_eq!(p.active_hand(), Some(1));
        p.hands[1].is_finished = true;
        assert_eq!(p.active_hand(), None);
        assert!(p.all_hands_finished());
    }

    #[test]
    fn fresh_shoe_is_two_decks() {
        let shoe = fresh_shoe();
        assert_eq!(shoe.len(), 104);
    }

    #[test]
    fn draw_rebuilds_an_empty_shoe() {
        let mut group = Group::new("ABCDEF".to_string());
        let _ = group.draw();
        assert_eq!(group.deck.len(), 103);
    }

    #[test]
    fn dealer_visible_value_hides_hole_card() {
        let mut group = Group::new("ABCDEF".to_string());
        let up = Card::new(blackjack_shared::CardRank::Nine, blackjack_shared::CardSuit::Clubs);
        let hole = Card::new(blackjack_shared::CardRank::King, blackjack_shared::CardSuit::Clubs);
        group.dealer_hand.cards.push(up);
        group.dealer_hand.cards.push(hole);
        group.hole_card = Some(hole);
        assert_eq!(group.dealer_visible_value(), "9");
        group.hole_card = None;
        assert_eq!(group.dealer_visible_value(), "19");
    }
}
