use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A playing card in a standard 52-card game.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

/// The suit of a [card](Card).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Suit {
    #[serde(rename = "♦")]
    Diamond,
    #[serde(rename = "♥")]
    Heart,
    #[serde(rename = "♠")]
    Spade,
    #[serde(rename = "♣")]
    Club,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Diamond, Suit::Heart, Suit::Spade, Suit::Club];
}

/// The rank of a [card](Card).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum Rank {
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
    #[serde(rename = "A")]
    Ace,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
        Rank::Ace,
    ];
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.unicode_char())
    }
}

impl Card {
    /// The scoring contribution of this card, distinct from its display
    /// identity. Pip cards count face value, court cards count 10, the
    /// ace counts 11.
    pub fn real_value(&self) -> u8 {
        match self.rank {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
            Rank::Ace => 11,
        }
    }

    /// Render this card as a Unicode playing cards character
    pub fn unicode_char(&self) -> char {
        // https://en.wikipedia.org/wiki/Playing_Cards_(Unicode_block)
        let row = match self.suit {
            Suit::Spade => 0,
            Suit::Heart => 1,
            Suit::Diamond => 2,
            Suit::Club => 3,
        };
        let col = match self.rank {
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten => 10,
            Rank::Jack => 11,
            Rank::Queen => 13,
            Rank::King => 14,
            Rank::Ace => 1,
        };
        let codepoint = 0x1F0A0 + 16 * row + col;
        char::from_u32(codepoint).unwrap()
    }
}

/// The error type for the [`FromStr`] instance of [`Card`].
#[derive(Clone, Copy, Debug)]
pub enum CardFromStrErr {
    LessThanTwoChars,
    MoreThanTwoChars,
    InvalidRank,
    InvalidSuit,
}

impl FromStr for Card {
    type Err = CardFromStrErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let rank_char = chars.next().ok_or(CardFromStrErr::LessThanTwoChars)?;
        let suit_char = chars.next().ok_or(CardFromStrErr::LessThanTwoChars)?;
        if chars.next().is_some() {
            return Err(CardFromStrErr::MoreThanTwoChars);
        }
        let rank = match rank_char {
            '2' => Rank::Two,
            '3' => Rank::Three,
            '4' => Rank::Four,
            '5' => Rank::Five,
            '6' => Rank::Six,
            '7' => Rank::Seven,
            '8' => Rank::Eight,
            '9' => Rank::Nine,
            'T' => Rank::Ten,
            'J' => Rank::Jack,
            'Q' => Rank::Queen,
            'K' => Rank::King,
            'A' => Rank::Ace,
            _ => return Err(CardFromStrErr::InvalidRank),
        };
        let suit = match suit_char {
            '♦' => Suit::Diamond,
            '♥' => Suit::Heart,
            '♠' => Suit::Spade,
            '♣' => Suit::Club,
            _ => return Err(CardFromStrErr::InvalidSuit),
        };
        Ok(Card { rank, suit })
    }
}

/// Shorthand for creating cards from a two-character string.
///
/// The first character is the [rank](Rank) (note: 10 is `T`), the second is
/// the [suit](Suit) as a unicode character (♦, ♥, ♠, or ♣).
///
/// This macro is just calling the [`FromStr`] instance of [`Card`].
/// ```
/// # use blackjack::{card, Card, Rank, Suit};
/// assert_eq!(
///     card!("T♥"),
///     Card { rank: Rank::Ten, suit: Suit::Heart }
/// );
/// ```
#[macro_export]
macro_rules! card {
    ($rs:literal) => {
        <$crate::Card as std::str::FromStr>::from_str($rs)
            .expect("Invalid card code given to card! macro")
    };
}
// The import is for using the macro in other modules, see https://stackoverflow.com/a/31749071/1726797
#[allow(unused_imports)]
pub(crate) use card;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_values() {
        assert_eq!(card!("2♦").real_value(), 2);
        assert_eq!(card!("9♣").real_value(), 9);
        assert_eq!(card!("T♥").real_value(), 10);
        assert_eq!(card!("J♥").real_value(), 10);
        assert_eq!(card!("Q♠").real_value(), 10);
        assert_eq!(card!("K♦").real_value(), 10);
        assert_eq!(card!("A♠").real_value(), 11);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Card::from_str("7").is_err());
        assert!(Card::from_str("7♥x").is_err());
        assert!(Card::from_str("X♥").is_err());
        assert!(Card::from_str("7h").is_err());
    }

    #[test]
    fn display_is_single_glyph() {
        let rendered = card!("A♠").to_string();
        assert_eq!(rendered.chars().count(), 1);
        assert_eq!(rendered, "🂡");
    }
}
