//! Card definitions.
//!
//! A [`Card`] is immutable once built. Decks, hands, and the Tower of Sins
//! hold clones; nothing ever edits a card in place.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lowest printed value.
pub const MIN_VALUE: u8 = 1;
/// Highest printed value.
pub const MAX_VALUE: u8 = 13;
/// Value that lets the next player play anything.
pub const UNIVERSAL_VALUE: u8 = 2;
/// Value that skips the next player.
pub const SKIP_VALUE: u8 = 8;
/// Value that purifies the Tower of Sins.
pub const PURIFY_VALUE: u8 = 10;

/// Identifies one physical card within a built deck.
///
/// Two copies of the same creature have different ids, so a client can pin
/// a `playCard` intent to the exact card it saw.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CardId(pub u32);

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// Printed card type. Only creatures are exercised by the rule engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CardKind {
    #[default]
    Creature,
    Spell,
    Trap,
}

/// The special effect a card carries.
///
/// The catalog only ever produces the first four. `Custom` is the
/// extensibility slot for one-off fixtures: the engine treats it like
/// `None` for pile mechanics and reports the tag in the play outcome.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tag", rename_all = "camelCase")]
pub enum Effect {
    #[default]
    None,
    /// Next player may play any card.
    Universal,
    /// Next player in turn order loses their turn.
    Skip,
    /// Clears the Tower of Sins.
    Purify,
    Custom(String),
}

impl Effect {
    /// The effect the catalog prints on a card of `value`.
    pub fn for_value(value: u8) -> Self {
        match value {
            UNIVERSAL_VALUE => Self::Universal,
            SKIP_VALUE => Self::Skip,
            PURIFY_VALUE => Self::Purify,
            _ => Self::None,
        }
    }
}

/// A playable card.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: CardKind,
    pub value: u8,
    pub effect: Effect,
}

impl Card {
    /// Builds a creature with the effect the catalog assigns to `value`.
    pub fn creature(id: CardId, name: impl Into<String>, value: u8) -> Self {
        Self {
            id,
            name: name.into(),
            kind: CardKind::Creature,
            value,
            effect: Effect::for_value(value),
        }
    }

    /// Replaces the effect tag (builder style).
    #[must_use]
    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }

    /// Special cards (2, 8, 10) are always legal to play.
    pub fn is_special(&self) -> bool {
        matches!(self.value, UNIVERSAL_VALUE | SKIP_VALUE | PURIFY_VALUE)
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_special_only_for_two_eight_ten() {
        let special: Vec<u8> = (MIN_VALUE..=MAX_VALUE)
            .filter(|v| Card::creature(CardId(0), "x", *v).is_special())
            .collect();
        assert_eq!(special, vec![2, 8, 10]);
    }

    #[test]
    fn test_effect_for_value() {
        assert_eq!(Effect::for_value(2), Effect::Universal);
        assert_eq!(Effect::for_value(8), Effect::Skip);
        assert_eq!(Effect::for_value(10), Effect::Purify);
        assert_eq!(Effect::for_value(7), Effect::None);
    }

    #[test]
    fn test_card_json_shape() {
        let card = Card::creature(CardId(5), "Wrath Imp", 8);
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["id"], 5);
        assert_eq!(json["type"], "creature");
        assert_eq!(json["value"], 8);
        assert_eq!(json["effect"]["kind"], "skip");
    }

    #[test]
    fn test_custom_effect_carries_tag() {
        let card = Card::creature(CardId(1), "Mirror", 6)
            .with_effect(Effect::Custom("mirror".into()));
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["effect"]["kind"], "custom");
        assert_eq!(json["effect"]["tag"], "mirror");
    }
}
