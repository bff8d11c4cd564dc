//! Per-seat player record.

use serde::{Deserialize, Serialize};
use soulwell_protocol::{ConnectionStatus, PlayerId};
use std::fmt;

use crate::card::Card;

/// Which container a player is currently playing from.
///
/// Derived from the containers, never set directly:
/// `Hand` while the hand has cards, then `FaceUp` while face-up creatures
/// remain, then `FaceDown`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Hand,
    FaceUp,
    FaceDown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Hand => "hand",
            Self::FaceUp => "face-up creatures",
            Self::FaceDown => "face-down creatures",
        };
        f.write_str(name)
    }
}

/// Bot strength, handed to the mover with every move request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

/// One seat at the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Player {
    /// Stable across reconnects.
    pub id: PlayerId,
    pub display_name: String,
    pub hand: Vec<Card>,
    pub face_up: Vec<Card>,
    /// Known to the server, opaque to every client including the owner.
    pub face_down: Vec<Card>,
    /// Private last-resort reserve, drained into the hand once the draw
    /// pile is gone.
    pub soul_well: Vec<Card>,
    pub phase: Phase,
    pub is_ready: bool,
    /// Cleared once the player has emptied every container.
    pub is_alive: bool,
    pub is_bot: bool,
    pub difficulty: Option<Difficulty>,
    pub connection_status: ConnectionStatus,
}

impl Player {
    /// A human seat, not yet ready.
    pub fn human(id: PlayerId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            hand: Vec::new(),
            face_up: Vec::new(),
            face_down: Vec::new(),
            soul_well: Vec::new(),
            phase: Phase::Hand,
            is_ready: false,
            is_alive: true,
            is_bot: false,
            difficulty: None,
            connection_status: ConnectionStatus::Connected,
        }
    }

    /// A bot seat. Bots are always ready.
    pub fn bot(id: PlayerId, display_name: impl Into<String>, difficulty: Difficulty) -> Self {
        Self {
            is_ready: true,
            is_bot: true,
            difficulty: Some(difficulty),
            ..Self::human(id, display_name)
        }
    }

    pub fn container(&self, phase: Phase) -> &[Card] {
        match phase {
            Phase::Hand => &self.hand,
            Phase::FaceUp => &self.face_up,
            Phase::FaceDown => &self.face_down,
        }
    }

    fn container_mut(&mut self, phase: Phase) -> &mut Vec<Card> {
        match phase {
            Phase::Hand => &mut self.hand,
            Phase::FaceUp => &mut self.face_up,
            Phase::FaceDown => &mut self.face_down,
        }
    }

    /// The cards the player may currently play from.
    pub fn active_cards(&self) -> &[Card] {
        self.container(self.phase)
    }

    /// Phase implied by the containers right now.
    pub fn derive_phase(&self) -> Phase {
        if !self.hand.is_empty() {
            Phase::Hand
        } else if !self.face_up.is_empty() {
            Phase::FaceUp
        } else {
            Phase::FaceDown
        }
    }

    /// Recomputes `phase`; returns `true` if it changed.
    pub fn refresh_phase(&mut self) -> bool {
        let next = self.derive_phase();
        let changed = next != self.phase;
        self.phase = next;
        changed
    }

    /// Removes the card at `index` from the current-phase container.
    pub fn take_card(&mut self, index: usize) -> Option<Card> {
        let container = self.container_mut(self.phase);
        (index < container.len()).then(|| container.remove(index))
    }

    /// Moves the soul well into the hand; returns how many cards moved.
    pub fn drain_soul_well(&mut self) -> usize {
        let n = self.soul_well.len();
        self.hand.append(&mut self.soul_well);
        n
    }

    /// Hand, face-up and face-down are all empty.
    pub fn has_cleared_all(&self) -> bool {
        self.hand.is_empty() && self.face_up.is_empty() && self.face_down.is_empty()
    }

    /// Still alive and not evicted: eligible to hold the turn.
    pub fn in_rotation(&self) -> bool {
        self.is_alive && self.connection_status.in_rotation()
    }

    /// Removes every card the player holds, e.g. before a fresh deal.
    pub(crate) fn clear_cards(&mut self) {
        self.hand.clear();
        self.face_up.clear();
        self.face_down.clear();
        self.soul_well.clear();
        self.phase = Phase::Hand;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardId;

    fn card(value: u8) -> Card {
        Card::creature(CardId(u32::from(value)), "c", value)
    }

    #[test]
    fn test_phase_follows_containers() {
        let mut p = Player::human(PlayerId(1), "Ada");
        p.hand = vec![card(3)];
        p.face_up = vec![card(4)];
        p.face_down = vec![card(5)];
        assert_eq!(p.derive_phase(), Phase::Hand);

        p.hand.clear();
        assert!(p.refresh_phase());
        assert_eq!(p.phase, Phase::FaceUp);

        p.face_up.clear();
        p.refresh_phase();
        assert_eq!(p.phase, Phase::FaceDown);

        // taking the pile puts the player back in their hand
        p.hand.push(card(9));
        p.refresh_phase();
        assert_eq!(p.phase, Phase::Hand);
    }

    #[test]
    fn test_take_card_only_from_current_phase() {
        let mut p = Player::human(PlayerId(1), "Ada");
        p.hand = vec![card(3)];
        p.face_up = vec![card(4), card(6)];
        p.refresh_phase();

        assert_eq!(p.take_card(1), None, "index 1 is out of the hand");
        assert_eq!(p.take_card(0).map(|c| c.value), Some(3));
        assert_eq!(p.face_up.len(), 2);
    }

    #[test]
    fn test_bot_is_ready() {
        let b = Player::bot(PlayerId(9), "Grim", Difficulty::Hard);
        assert!(b.is_ready);
        assert!(b.is_bot);
        assert_eq!(b.difficulty, Some(Difficulty::Hard));
    }

    #[test]
    fn test_in_rotation_excludes_evicted_and_escaped() {
        let mut p = Player::human(PlayerId(1), "Ada");
        assert!(p.in_rotation());
        p.connection_status = ConnectionStatus::Disconnected;
        assert!(p.in_rotation());
        p.connection_status = ConnectionStatus::Evicted;
        assert!(!p.in_rotation());
        p.connection_status = ConnectionStatus::Connected;
        p.is_alive = false;
        assert!(!p.in_rotation());
    }
}
