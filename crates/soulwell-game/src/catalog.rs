//! Thematic deck catalogs.
//!
//! Every deck has the same shape: values 1 to 13, four copies each, all
//! creatures. Only the names differ.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::card::{Card, CardId, MAX_VALUE, MIN_VALUE};

/// Copies of each value in a deck.
pub const COPIES_PER_VALUE: u32 = 4;

/// Cards in a full deck.
pub const DECK_SIZE: usize = (MAX_VALUE - MIN_VALUE + 1) as usize * COPIES_PER_VALUE as usize;

/// Which thematic deck a room plays with.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeckType {
    #[default]
    Inferno,
    Abyss,
    Celestial,
}

impl DeckType {
    /// All deck types, in catalog order.
    pub const ALL: [DeckType; 3] = [Self::Inferno, Self::Abyss, Self::Celestial];

    /// Creature names indexed by `value - 1`.
    fn creature_names(self) -> [&'static str; 13] {
        match self {
            Self::Inferno => [
                "Ember Wisp",
                "Chaos Imp",
                "Cinder Hound",
                "Ash Ghoul",
                "Brimstone Shade",
                "Pyre Warden",
                "Lava Serpent",
                "Wrath Drake",
                "Hellforge Golem",
                "Purging Flame",
                "Infernal Knight",
                "Demon Regent",
                "Lord of Cinders",
            ],
            Self::Abyss => [
                "Drowned Soul",
                "Tide Phantom",
                "Brine Crawler",
                "Ink Wraith",
                "Reef Lurker",
                "Siren Husk",
                "Kelp Strangler",
                "Riptide Eel",
                "Hollow Leviathan",
                "Abyssal Deluge",
                "Trench Warden",
                "Deep Matriarch",
                "Maw of the Abyss",
            ],
            Self::Celestial => [
                "Star Mote",
                "Halo Sprite",
                "Dawn Sentinel",
                "Lumen Hare",
                "Choir Acolyte",
                "Aurora Stag",
                "Zenith Falcon",
                "Comet Herald",
                "Radiant Colossus",
                "Cleansing Light",
                "Seraph Captain",
                "Throne Keeper",
                "Archon of Dawn",
            ],
        }
    }
}

impl fmt::Display for DeckType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inferno => "inferno",
            Self::Abyss => "abyss",
            Self::Celestial => "celestial",
        };
        f.write_str(name)
    }
}

/// Returns the full, unshuffled card list for a deck type.
///
/// Ids are stable: the copies of value `v` get ids
/// `(v - 1) * COPIES_PER_VALUE + 1 ..= v * COPIES_PER_VALUE`.
pub fn catalog(deck_type: DeckType) -> Vec<Card> {
    let names = deck_type.creature_names();
    let mut cards = Vec::with_capacity(DECK_SIZE);
    for value in MIN_VALUE..=MAX_VALUE {
        let name = names[usize::from(value - MIN_VALUE)];
        for copy in 0..COPIES_PER_VALUE {
            let id = CardId(u32::from(value - MIN_VALUE) * COPIES_PER_VALUE + copy + 1);
            cards.push(Card::creature(id, name, value));
        }
    }
    cards
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::card::Effect;

    #[test]
    fn test_catalog_has_four_of_each_value() {
        for deck in DeckType::ALL {
            let cards = catalog(deck);
            assert_eq!(cards.len(), DECK_SIZE);
            for value in MIN_VALUE..=MAX_VALUE {
                let n = cards.iter().filter(|c| c.value == value).count();
                assert_eq!(n, 4, "{deck} value {value}");
            }
        }
    }

    #[test]
    fn test_catalog_ids_unique() {
        let ids: HashSet<_> = catalog(DeckType::Abyss).iter().map(|c| c.id).collect();
        assert_eq!(ids.len(), DECK_SIZE);
    }

    #[test]
    fn test_catalog_effects_follow_values() {
        for card in catalog(DeckType::Celestial) {
            assert_eq!(card.effect, Effect::for_value(card.value));
        }
    }

    #[test]
    fn test_deck_type_serializes_camel_case() {
        let json = serde_json::to_string(&DeckType::Celestial).unwrap();
        assert_eq!(json, "\"celestial\"");
    }
}
