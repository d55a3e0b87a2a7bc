//! Card types and deck construction for blackjack.

use serde::{Deserialize, Serialize};

/// Card rank values (0=Ace, 1=2, ..., 12=King)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardRank {
    Ace = 0,
    Two = 1,
    Three = 2,
    Four = 3,
    Five = 4,
    Six = 5,
    Seven = 6,
    Eight = 7,
    Nine = 8,
    Ten = 9,
    Jack = 10,
    Queen = 11,
    King = 12,
}

impl CardRank {
    /// Convert from u8 to CardRank. Panics if value > 12.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => CardRank::Ace,
            1 => CardRank::Two,
            2 => CardRank::Three,
            3 => CardRank::Four,
            4 => CardRank::Five,
            5 => CardRank::Six,
            6 => CardRank::Seven,
            7 => CardRank::Eight,
            8 => CardRank::Nine,
            9 => CardRank::Ten,
            10 => CardRank::Jack,
            11 => CardRank::Queen,
            12 => CardRank::King,
            _ => panic!("Invalid card rank: {}", value),
        }
    }

    /// Blackjack value of this rank. Aces count 11 nominally; the soft
    /// reading is resolved at hand-value time.
    pub fn blackjack_value(self) -> u8 {
        match self {
            CardRank::Ace => 11,
            CardRank::Jack | CardRank::Queen | CardRank::King => 10,
            rank => rank as u8 + 1,
        }
    }
}

/// Card suit values (0=Clubs, 1=Diamonds, 2=Hearts, 3=Spades)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CardSuit {
    Clubs = 0,
    Diamonds = 1,
    Hearts = 2,
    Spades = 3,
}

impl CardSuit {
    /// Convert from u8 to CardSuit. Panics if value > 3.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => CardSuit::Clubs,
            1 => CardSuit::Diamonds,
            2 => CardSuit::Hearts,
            3 => CardSuit::Spades,
            _ => panic!("Invalid card suit: {}", value),
        }
    }
}

/// A playing card represented as a compact u8 value
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Card(pub u8);

impl Card {
    /// Create a new card from rank and suit
    pub fn new(rank: CardRank, suit: CardSuit) -> Self {
        Card((suit as u8) * 13 + (rank as u8))
    }

    /// Get the rank of this card
    pub fn rank(self) -> CardRank {
        CardRank::from_u8(self.0 % 13)
    }

    /// Get the suit of this card
    pub fn suit(self) -> CardSuit {
        CardSuit::from_u8(self.0 / 13)
    }

    /// Blackjack value of this card (2-10 face value, J/Q/K = 10, A = 11).
    pub fn blackjack_value(self) -> u8 {
        self.rank().blackjack_value()
    }

    /// Get the rank as a string (A, 2, 3, ..., K)
    pub fn rank_str(self) -> &'static str {
        match self.rank() {
            CardRank::Ace => "A",
            CardRank::Two => "2",
            CardRank::Three => "3",
            CardRank::Four => "4",
            CardRank::Five => "5",
            CardRank::Six => "6",
            CardRank::Seven => "7",
            CardRank::Eight => "8",
            CardRank::Nine => "9",
            CardRank::Ten => "T",
            CardRank::Jack => "J",
            CardRank::Queen => "Q",
            CardRank::King => "K",
        }
    }

    /// Get the suit as a character (♣, ♦, ♥, ♠)
    pub fn suit_char(self) -> char {
        match self.suit() {
            CardSuit::Clubs => '♣',
            CardSuit::Diamonds => '♦',
            CardSuit::Hearts => '♥',
            CardSuit::Spades => '♠',
        }
    }

    /// Display name like "A♣" or "T♦". Clients map these straight to
    /// card image file names.
    pub fn name(self) -> String {
        format!("{}{}", self.rank_str(), self.suit_char())
    }
}

/// One ordered 52-card deck.
pub fn standard_deck() -> Vec<Card> {
    (0..52).map(Card).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn blackjack_values() {
        assert_eq!(Card::new(CardRank::Ace, CardSuit::Spades).blackjack_value(), 11);
        assert_eq!(Card::new(CardRank::Two, CardSuit::Clubs).blackjack_value(), 2);
        assert_eq!(Card::new(CardRank::Ten, CardSuit::Hearts).blackjack_value(), 10);
        assert_eq!(Card::new(CardRank::Jack, CardSuit::Clubs).blackjack_value(), 10);
        assert_eq!(Card::new(CardRank::Queen, CardSuit::Diamonds).blackjack_value(), 10);
        assert_eq!(Card::new(CardRank::King, CardSuit::Spades).blackjack_value(), 10);
    }

    #[test]
    fn deck_has_52_distinct_cards() {
        let deck = standard_deck();
        assert_eq!(deck.len(), 52);
        let distinct: HashSet<Card> = deck.into_iter().collect();
        assert_eq!(distinct.len(), 52);
    }

    #[test]
    fn rank_and_suit_round_trip() {
        let card = Card::new(CardRank::Nine, CardSuit::Diamonds);
        assert_eq!(card.rank(), CardRank::Nine);
        assert_eq!(card.suit(), CardSuit::Diamonds);
        assert_eq!(card.name(), "9♦");
    }
}
