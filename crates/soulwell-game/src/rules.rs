//! The rule engine.
//!
//! Pure functions over a snapshot: nothing here mutates the session.
//! [`is_legal`] and [`will_purify`] read only the [`Pile`];
//! [`apply_effect`] also needs turn order to resolve a skip, so it takes
//! the whole [`GameSession`]. The orchestrator applies the returned
//! [`EffectDelta`].
//!
//! Ownership and phase checks are not made here; they belong to the
//! orchestrator.

use serde::{Deserialize, Serialize};
use soulwell_protocol::PlayerId;

use crate::card::{Card, Effect, PURIFY_VALUE};
use crate::game::GameSession;

/// Copies of one value that purify the tower when stacked.
pub const PURIFY_STACK: usize = 4;

/// The Tower of Sins and the state that rides on top of it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pile {
    /// Append-only until purified or taken.
    pub discard: Vec<Card>,
    pub last_played: Option<Card>,
    pub may_play_anything: bool,
}

impl Pile {
    /// Clears the tower and everything riding on it.
    pub fn purify(&mut self) {
        self.discard.clear();
        self.last_played = None;
        self.may_play_anything = false;
    }

    /// Empties the tower into the caller's hands.
    pub fn take_all(&mut self) -> Vec<Card> {
        let cards = std::mem::take(&mut self.discard);
        self.purify();
        cards
    }

    /// How many cards of `value` are in the tower.
    pub fn count_value(&self, value: u8) -> usize {
        self.discard.iter().filter(|c| c.value == value).count()
    }

    pub fn len(&self) -> usize {
        self.discard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.discard.is_empty()
    }
}

/// What a single play does to the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectDelta {
    pub card: Card,
    /// The tower is cleared instead of appended to.
    pub purified: bool,
    /// Value of `may_play_anything` after the play.
    pub next_player_may_play_anything: bool,
    /// The player whose turn is skipped.
    pub skipped: Option<PlayerId>,
    pub target: Option<PlayerId>,
    /// Tag of a `Custom` effect, passed through untouched.
    pub custom: Option<String>,
}

impl EffectDelta {
    /// Applies the pile part of the delta. Turn movement is the
    /// orchestrator's job.
    pub fn apply_to(&self, pile: &mut Pile) {
        if self.purified {
            pile.purify();
        } else {
            pile.discard.push(self.card.clone());
            pile.last_played = Some(self.card.clone());
        }
        pile.may_play_anything = self.next_player_may_play_anything;
    }
}

/// A card is legal if it is special, opens a fresh sequence, follows a
/// universal play, or matches or beats the top card.
pub fn is_legal(card: &Card, pile: &Pile) -> bool {
    if card.is_special() || pile.may_play_anything {
        return true;
    }
    match &pile.last_played {
        None => true,
        Some(top) => card.value >= top.value,
    }
}

/// A play purifies when it is a 10, matches the top card, or completes
/// four of a kind in the tower.
pub fn will_purify(card: &Card, pile: &Pile) -> bool {
    card.value == PURIFY_VALUE
        || pile
            .last_played
            .as_ref()
            .is_some_and(|top| top.value == card.value)
        || pile.count_value(card.value) + 1 >= PURIFY_STACK
}

/// Indices of the legal cards in `cards`.
pub fn legal_moves(cards: &[Card], pile: &Pile) -> Vec<usize> {
    cards
        .iter()
        .enumerate()
        .filter(|(_, c)| is_legal(c, pile))
        .map(|(i, _)| i)
        .collect()
}

/// Computes the outcome of `actor` playing `card`.
///
/// Purification overrides appending. Skip and universal-play are
/// orthogonal to it: an 8 that matches the top card both purifies and
/// skips.
pub fn apply_effect(
    card: &Card,
    snapshot: &GameSession,
    actor: PlayerId,
    target: Option<PlayerId>,
) -> EffectDelta {
    let purified = will_purify(card, snapshot.pile());
    let mut delta = EffectDelta {
        card: card.clone(),
        purified,
        next_player_may_play_anything: false,
        skipped: None,
        target,
        custom: None,
    };

    match &card.effect {
        Effect::Universal => delta.next_player_may_play_anything = true,
        Effect::Skip => {
            delta.skipped = snapshot
                .next_in_rotation_after(actor)
                .filter(|next| *next != actor);
        }
        Effect::Custom(tag) => delta.custom = Some(tag.clone()),
        Effect::Purify | Effect::None => {}
    }

    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{CardId, MAX_VALUE, MIN_VALUE};
    use crate::game::tests::playing_table;

    fn card(value: u8) -> Card {
        Card::creature(CardId(u32::from(value)), format!("v{value}"), value)
    }

    fn pile_with(top: Option<u8>, may_play_anything: bool) -> Pile {
        Pile {
            discard: top.map(|v| vec![card(v)]).unwrap_or_default(),
            last_played: top.map(card),
            may_play_anything,
        }
    }

    // =====================================================================
    // is_legal
    // =====================================================================

    #[test]
    fn test_is_legal_plain_cards_follow_top_value() {
        for top in [None, Some(1), Some(7), Some(13)] {
            for anything in [false, true] {
                let pile = pile_with(top, anything);
                for v in (MIN_VALUE..=MAX_VALUE).filter(|v| ![2, 8, 10].contains(v)) {
                    let expected = top.is_none() || anything || v >= top.unwrap_or(0);
                    assert_eq!(
                        is_legal(&card(v), &pile),
                        expected,
                        "value {v} on {top:?} (anything={anything})"
                    );
                }
            }
        }
    }

    #[test]
    fn test_is_legal_specials_always() {
        for top in MIN_VALUE..=MAX_VALUE {
            let pile = pile_with(Some(top), false);
            for v in [2, 8, 10] {
                assert!(is_legal(&card(v), &pile), "{v} on {top}");
            }
        }
    }

    #[test]
    fn test_hand_two_five_nine_on_nine() {
        let pile = pile_with(Some(9), false);
        let hand = vec![card(2), card(5), card(9)];
        assert!(!is_legal(&hand[1], &pile));
        assert!(is_legal(&hand[0], &pile));
        assert_eq!(legal_moves(&hand, &pile), vec![0, 2]);
    }

    // =====================================================================
    // will_purify
    // =====================================================================

    #[test]
    fn test_will_purify_ten_always() {
        assert!(will_purify(&card(10), &Pile::default()));
        assert!(will_purify(&card(10), &pile_with(Some(13), false)));
    }

    #[test]
    fn test_will_purify_on_matching_top() {
        assert!(will_purify(&card(7), &pile_with(Some(7), false)));
        assert!(!will_purify(&card(8), &pile_with(Some(7), false)));
    }

    #[test]
    fn test_will_purify_on_fourth_of_a_kind_not_third() {
        let mut pile = Pile::default();
        pile.discard = vec![card(5), card(6), card(5)];
        pile.last_played = Some(card(6));
        // third 5 in the tower: no purification yet
        assert!(!will_purify(&card(5), &pile));

        pile.discard.push(card(5));
        pile.discard.push(card(9));
        pile.last_played = Some(card(9));
        assert!(will_purify(&card(5), &pile), "fourth 5 purifies");
    }

    // =====================================================================
    // apply_effect
    // =====================================================================

    #[test]
    fn test_apply_effect_two_sets_universal() {
        let mut table = playing_table(2);
        table.pile_mut().last_played = Some(card(9));
        table.pile_mut().discard = vec![card(9)];
        let actor = table.players()[0].id;

        let delta = apply_effect(&card(2), &table, actor, None);
        assert!(!delta.purified);
        assert!(delta.next_player_may_play_anything);

        let mut pile = table.pile().clone();
        delta.apply_to(&mut pile);
        assert_eq!(pile.last_played.as_ref().map(|c| c.value), Some(2));
        assert!(pile.may_play_anything);
        assert_eq!(pile.len(), 2);
    }

    #[test]
    fn test_apply_effect_ten_purifies_and_resets() {
        let mut table = playing_table(3);
        table.pile_mut().discard = vec![card(3), card(2)];
        table.pile_mut().last_played = Some(card(2));
        table.pile_mut().may_play_anything = true;
        let actor = table.players()[0].id;

        let delta = apply_effect(&card(10), &table, actor, None);
        let mut pile = table.pile().clone();
        delta.apply_to(&mut pile);
        assert!(pile.is_empty());
        assert_eq!(pile.last_played, None);
        assert!(!pile.may_play_anything);
    }

    #[test]
    fn test_apply_effect_plain_card_appends_and_clears_universal() {
        let mut table = playing_table(2);
        table.pile_mut().discard = vec![card(2)];
        table.pile_mut().last_played = Some(card(2));
        table.pile_mut().may_play_anything = true;
        let actor = table.players()[0].id;

        let delta = apply_effect(&card(4), &table, actor, None);
        let mut pile = table.pile().clone();
        delta.apply_to(&mut pile);
        assert_eq!(pile.len(), 2);
        assert!(!pile.may_play_anything);
        assert_eq!(pile.last_played.map(|c| c.value), Some(4));
    }

    #[test]
    fn test_apply_effect_eight_skips_next_in_order() {
        let table = playing_table(4);
        let ids: Vec<_> = table.players().iter().map(|p| p.id).collect();

        let delta = apply_effect(&card(8), &table, ids[1], None);
        assert_eq!(delta.skipped, Some(ids[2]));

        let delta = apply_effect(&card(8), &table, ids[3], None);
        assert_eq!(delta.skipped, Some(ids[0]), "skip wraps around");
    }

    #[test]
    fn test_apply_effect_matching_eight_purifies_and_skips() {
        let mut table = playing_table(3);
        table.pile_mut().discard = vec![card(8)];
        table.pile_mut().last_played = Some(card(8));
        let ids: Vec<_> = table.players().iter().map(|p| p.id).collect();

        let delta = apply_effect(&card(8), &table, ids[0], None);
        assert!(delta.purified);
        assert_eq!(delta.skipped, Some(ids[1]));
    }

    #[test]
    fn test_apply_effect_custom_tag_passes_through() {
        let table = playing_table(2);
        let actor = table.players()[0].id;
        let odd = card(6).with_effect(Effect::Custom("echo".into()));

        let delta = apply_effect(&odd, &table, actor, Some(table.players()[1].id));
        assert_eq!(delta.custom.as_deref(), Some("echo"));
        assert_eq!(delta.target, Some(table.players()[1].id));
        assert!(!delta.purified);
    }
}
