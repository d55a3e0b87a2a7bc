//! Hand state and blackjack value arithmetic.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cards::Card;

/// One concurrently playable set of cards. A player holds more than one
/// hand only after a split.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Hand {
    pub cards: Vec<Card>,
    pub is_finished: bool,
    pub is_doubled: bool,
}

/// A blackjack hand value. Hands containing an ace carry two valid
/// readings while the high reading stays at 21 or below.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandValue {
    pub low: u8,
    pub high: Option<u8>,
}

impl HandValue {
    /// The reading used for all comparisons: high when it does not bust,
    /// low otherwise.
    pub fn best(self) -> u8 {
        self.high.unwrap_or(self.low)
    }
}

impl fmt::Display for HandValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.high {
            Some(high) => write!(f, "{}/{}", self.low, high),
            None => write!(f, "{}", self.low),
        }
    }
}

impl Hand {
    pub fn with_cards(cards: Vec<Card>) -> Self {
        Hand {
            cards,
            is_finished: false,
            is_doubled: false,
        }
    }

    /// Sum non-ace cards at face value; with n aces the high reading adds
    /// 10 on top of counting every ace as 1, and is kept only while it
    /// stays at 21 or below.
    pub fn value(&self) -> HandValue {
        let aces = self
            .cards
            .iter()
            .filter(|c| c.blackjack_value() == 11)
            .count() as u8;
        let sum: u8 = self
            .cards
            .iter()
            .map(|c| c.blackjack_value())
            .filter(|v| *v != 11)
            .sum();
        if aces == 0 {
            return HandValue { low: sum, high: None };
        }
        let low = sum + aces;
        let high = low + 10;
        if high <= 21 {
            HandValue { low, high: Some(high) }
        } else {
            HandValue { low, high: None }
        }
    }

    pub fn best_value(&self) -> u8 {
        self.value().best()
    }

    pub fn value_string(&self) -> String {
        self.value().to_string()
    }

    /// A natural: 21 from the first two cards.
    pub fn is_natural(&self) -> bool {
        self.cards.len() == 2 && self.best_value() == 21
    }

    pub fn is_busted(&self) -> bool {
        self.best_value() > 21
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::{CardRank, CardSuit};

    fn hand(ranks: &[CardRank]) -> Hand {
        Hand::with_cards(
            ranks
                .iter()
                .map(|r| Card::new(*r, CardSuit::Clubs))
                .collect(),
        )
    }

    #[test]
    fn dual_reading_with_one_ace() {
        let h = hand(&[CardRank::Five, CardRank::Five, CardRank::Ace]);
        assert_eq!(h.value_string(), "11/21");
        assert_eq!(h.best_value(), 21);
        assert!(!h.is_natural());
    }

    #[test]
    fn natural_is_exactly_two_cards() {
        let h = hand(&[CardRank::Ten, CardRank::Ace]);
        assert_eq!(h.value_string(), "11/21");
        assert!(h.is_natural());
        let three = hand(&[CardRank::Seven, CardRank::Seven, CardRank::Seven]);
        assert_eq!(three.best_value(), 21);
        assert!(!three.is_natural());
    }

    #[test]
    fn high_reading_dropped_past_21() {
        let h = hand(&[CardRank::Ace, CardRank::Nine, CardRank::Five]);
        assert_eq!(h.value_string(), "15");
        assert_eq!(h.best_value(), 15);
    }

    #[test]
    fn two_aces_stay_soft() {
        let h = hand(&[CardRank::Ace, CardRank::Ace]);
        assert_eq!(h.value_string(), "2/12");
        assert_eq!(h.best_value(), 12);
    }

    #[test]
    fn bust_detection() {
        let h = hand(&[CardRank::King, CardRank::Queen, CardRank::Five]);
        assert_eq!(h.best_value(), 25);
        assert!(h.is_busted());
    }

    #[test]
    fn cleared_hand_reports_zero() {
        let mut h = hand(&[CardRank::Ten, CardRank::Six]);
        h.cards.clear();
        assert_eq!(h.best_value(), 0);
        assert_eq!(h.value_string(), "0");
    }
}
