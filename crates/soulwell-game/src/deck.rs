//! The shared draw pile.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::card::Card;
use crate::catalog::{DeckType, catalog};

/// An ordered stack of cards. The top of the deck is the end of the vec.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Builds an unshuffled copy of the catalog for `deck_type`.
    pub fn build(deck_type: DeckType) -> Self {
        Self { cards: catalog(deck_type) }
    }

    /// Fisher-Yates shuffle.
    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    /// Draws the top card, or `None` when the deck is exhausted.
    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Draws up to `n` cards; fewer if the deck runs out.
    pub fn draw_many(&mut self, n: usize) -> Vec<Card> {
        let take = n.min(self.cards.len());
        let at = self.cards.len() - take;
        let mut drawn = self.cards.split_off(at);
        // keep draw order: top card first
        drawn.reverse();
        drawn
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}
