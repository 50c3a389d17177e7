use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::{Card, Rank, Suit};

/// The error returned by [`Deck::draw_top`] when no cards remain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EmptyDeck;

impl std::fmt::Display for EmptyDeck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tried to draw from a deck with no cards remaining")
    }
}

impl std::error::Error for EmptyDeck {}

/// A finite ordered sequence of undrawn cards.
///
/// Drawing removes exactly one card from the front; a drawn card never
/// reappears until the deck is rebuilt.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: VecDeque<Card>,
}

impl Deck {
    /// A full 52-card deck in shuffled order.
    pub fn shuffled(rng: &mut StdRng) -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card { suit, rank });
            }
        }
        cards.shuffle(rng);
        Self {
            cards: VecDeque::from(cards),
        }
    }

    /// A deck with a fixed draw order, first element drawn first.
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self {
            cards: VecDeque::from(cards),
        }
    }

    pub fn draw_top(&mut self) -> Result<Card, EmptyDeck> {
        self.cards.pop_front().ok_or(EmptyDeck)
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// A cloneable handle to the one deck shared by every participant.
///
/// Draws are serialized through the inner lock, so a card is delivered to
/// exactly one draw even when participants run on different threads. Each
/// agent receives this handle at construction; there is no ambient global
/// deck.
#[derive(Clone, Debug)]
pub struct SharedDeck {
    inner: Arc<Mutex<Deck>>,
}

impl SharedDeck {
    pub fn new(deck: Deck) -> Self {
        Self {
            inner: Arc::new(Mutex::new(deck)),
        }
    }

    pub fn draw_top(&self) -> Result<Card, EmptyDeck> {
        self.lock().draw_top()
    }

    pub fn remaining(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Deck> {
        self.inner.lock().expect("deck lock poisoned")
    }
}
