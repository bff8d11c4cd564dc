//! The turn state machine: one [`GameSession`] per room.
//!
//! ```text
//! Waiting ──(start)──→ Playing ──(≤ 1 player left in rotation)──→ Finished
//! ```
//!
//! Every mutating method validates first and returns the
//! [`GameEvent`]s it produced. A rejected call leaves the session
//! untouched. The session is not thread-safe and does not need to be: the
//! room actor owns it and feeds it one intent at a time.

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use soulwell_protocol::{ConnectionStatus, PlayerId, RoomId};

use crate::card::{Card, CardId};
use crate::catalog::{DECK_SIZE, DeckType};
use crate::deck::Deck;
use crate::error::GameError;
use crate::player::{Phase, Player};
use crate::rules::{Pile, apply_effect, is_legal, legal_moves};

/// Fewest seats a game can start with.
pub const MIN_PLAYERS: usize = 2;

/// Lifecycle of a session. `Finished` is terminal.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    #[default]
    Waiting,
    Playing,
    Finished,
}

/// Table rules fixed at room creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GameConfig {
    pub deck_type: DeckType,
    pub max_players: usize,
    /// Cards dealt to the hand.
    pub hand_size: usize,
    pub face_up_size: usize,
    pub face_down_size: usize,
    pub soul_well_size: usize,
    /// Fixes the shuffle. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            deck_type: DeckType::default(),
            max_players: 4,
            hand_size: 3,
            face_up_size: 3,
            face_down_size: 3,
            soul_well_size: 0,
            seed: None,
        }
    }
}

impl GameConfig {
    /// Cards dealt to each seat at the start.
    pub fn cards_per_player(&self) -> usize {
        self.hand_size + self.face_up_size + self.face_down_size + self.soul_well_size
    }

    /// Checks that a full table can be dealt from one deck.
    pub fn validate(&self) -> Result<(), GameError> {
        if self.max_players < MIN_PLAYERS {
            return Err(GameError::InvalidConfig(format!(
                "max_players must be at least {MIN_PLAYERS}"
            )));
        }
        if self.hand_size == 0 {
            return Err(GameError::InvalidConfig("hand_size must be at least 1".into()));
        }
        let needed = self.cards_per_player() * self.max_players;
        if needed > DECK_SIZE {
            return Err(GameError::InvalidConfig(format!(
                "{} players need {needed} cards, the deck has {DECK_SIZE}",
                self.max_players
            )));
        }
        Ok(())
    }
}

/// Something that happened at the table.
///
/// The room actor turns these into wire events; the game crate never
/// decides who gets to see what.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    PlayerJoined {
        player_id: PlayerId,
        display_name: String,
        is_bot: bool,
    },
    /// Left (or was evicted from) a table that had not started yet.
    PlayerRemoved {
        player_id: PlayerId,
        new_host: Option<PlayerId>,
    },
    ReadyChanged {
        player_id: PlayerId,
        ready: bool,
    },
    GameStarted {
        first_player: PlayerId,
    },
    CardPlayed {
        player_id: PlayerId,
        card: Card,
        from: Phase,
        was_purified: bool,
        skipped: Option<PlayerId>,
        target: Option<PlayerId>,
        custom_effect: Option<String>,
    },
    DiscardPileTaken {
        player_id: PlayerId,
        count: usize,
        /// Taken on the player's behalf (bot fallback).
        forced: bool,
    },
    SoulWellDrained {
        player_id: PlayerId,
        count: usize,
    },
    PhaseChanged {
        player_id: PlayerId,
        phase: Phase,
    },
    PlayerEscaped {
        player_id: PlayerId,
        /// 1 for the first player out.
        place: usize,
    },
    /// The player's turn ran out without a move.
    TurnPassed {
        player_id: PlayerId,
    },
    TurnChanged {
        player_id: PlayerId,
        turn: u64,
    },
    ConnectionChanged {
        player_id: PlayerId,
        status: ConnectionStatus,
    },
    GameFinished {
        winner: Option<PlayerId>,
        sinner: Option<PlayerId>,
    },
}

/// One game, from the first join to the final result.
#[derive(Clone, Debug)]
pub struct GameSession {
    room_id: RoomId,
    status: GameStatus,
    config: GameConfig,
    /// Seat order. Fixed once the game starts.
    players: Vec<Player>,
    host: Option<PlayerId>,
    current_player_index: usize,
    draw_pile: Deck,
    pile: Pile,
    winner_id: Option<PlayerId>,
    sinner_id: Option<PlayerId>,
    /// Players who emptied every container, in order.
    escaped: Vec<PlayerId>,
    /// Increments on every turn change; 0 before the game starts.
    turn: u64,
}

impl GameSession {
    pub fn new(room_id: RoomId, config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self {
            room_id,
            status: GameStatus::Waiting,
            config,
            players: Vec::new(),
            host: None,
            current_player_index: 0,
            draw_pile: Deck::default(),
            pile: Pile::default(),
            winner_id: None,
            sinner_id: None,
            escaped: Vec::new(),
            turn: 0,
        })
    }

    // -- Accessors --------------------------------------------------------

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn host(&self) -> Option<PlayerId> {
        self.host
    }

    pub fn current_player_index(&self) -> usize {
        self.current_player_index
    }

    /// The player holding the turn, while the game is in progress.
    pub fn current_player(&self) -> Option<&Player> {
        match self.status {
            GameStatus::Playing => self.players.get(self.current_player_index),
            _ => None,
        }
    }

    pub fn draw_pile_len(&self) -> usize {
        self.draw_pile.len()
    }

    pub fn pile(&self) -> &Pile {
        &self.pile
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner_id
    }

    pub fn sinner(&self) -> Option<PlayerId> {
        self.sinner_id
    }

    pub fn escaped(&self) -> &[PlayerId] {
        &self.escaped
    }

    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.config.max_players
    }

    fn index_of(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    fn remaining_in_rotation(&self) -> usize {
        self.players.iter().filter(|p| p.in_rotation()).count()
    }

    /// Index of the next seat after `from` that may hold the turn,
    /// wrapping. May return `from` itself if it is the only one left.
    fn next_in_rotation_index_after(&self, from: usize) -> Option<usize> {
        let n = self.players.len();
        (1..=n)
            .map(|step| (from + step) % n)
            .find(|&i| self.players[i].in_rotation())
    }

    /// The next player in turn order after `id`.
    pub fn next_in_rotation_after(&self, id: PlayerId) -> Option<PlayerId> {
        let from = self.index_of(id)?;
        self.next_in_rotation_index_after(from)
            .map(|i| self.players[i].id)
    }

    // -- Lobby ------------------------------------------------------------

    /// Seats a player. The first human to sit down becomes host.
    pub fn add_player(&mut self, player: Player) -> Result<Vec<GameEvent>, GameError> {
        if self.status != GameStatus::Waiting {
            return Err(GameError::AlreadyStarted);
        }
        if self.index_of(player.id).is_some() {
            return Err(GameError::AlreadySeated(player.id));
        }
        if self.is_full() {
            return Err(GameError::RoomFull(self.config.max_players));
        }

        if self.host.is_none() && !player.is_bot {
            self.host = Some(player.id);
        }
        let event = GameEvent::PlayerJoined {
            player_id: player.id,
            display_name: player.display_name.clone(),
            is_bot: player.is_bot,
        };
        self.players.push(player);
        Ok(vec![event])
    }

    /// Unseats a player before the game starts. Host passes to the next
    /// human in seat order.
    pub fn remove_player(&mut self, id: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        if self.status != GameStatus::Waiting {
            return Err(GameError::AlreadyStarted);
        }
        let idx = self.index_of(id).ok_or(GameError::PlayerNotFound(id))?;
        self.players.remove(idx);

        let mut new_host = None;
        if self.host == Some(id) {
            self.host = self.players.iter().find(|p| !p.is_bot).map(|p| p.id);
            new_host = self.host;
        }
        Ok(vec![GameEvent::PlayerRemoved {
            player_id: id,
            new_host,
        }])
    }

    pub fn set_ready(&mut self, id: PlayerId, ready: bool) -> Result<Vec<GameEvent>, GameError> {
        if self.status != GameStatus::Waiting {
            return Err(GameError::AlreadyStarted);
        }
        let idx = self.index_of(id).ok_or(GameError::PlayerNotFound(id))?;
        if self.players[idx].is_ready == ready {
            return Ok(Vec::new());
        }
        self.players[idx].is_ready = ready;
        Ok(vec![GameEvent::ReadyChanged {
            player_id: id,
            ready,
        }])
    }

    /// Enough players are seated and every connected one is ready. A
    /// dropped player does not hold up the table.
    pub fn can_start(&self) -> bool {
        self.status == GameStatus::Waiting
            && self.players.len() >= MIN_PLAYERS
            && self
                .players
                .iter()
                .filter(|p| p.connection_status == ConnectionStatus::Connected)
                .all(|p| p.is_ready)
    }

    /// Deals and starts the game.
    ///
    /// `requested_by` is the player who asked; only the host may start a
    /// game by intent. `None` is the auto-start path.
    pub fn start(&mut self, requested_by: Option<PlayerId>) -> Result<Vec<GameEvent>, GameError> {
        if self.status != GameStatus::Waiting {
            return Err(GameError::AlreadyStarted);
        }
        if let Some(id) = requested_by {
            if self.host != Some(id) {
                return Err(GameError::NotHost);
            }
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers(MIN_PLAYERS));
        }
        if !self.can_start() {
            return Err(GameError::NotAllReady);
        }

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let mut deck = Deck::build(self.config.deck_type);
        deck.shuffle(&mut rng);

        for player in &mut self.players {
            player.clear_cards();
            player.face_down = deck.draw_many(self.config.face_down_size);
            player.face_up = deck.draw_many(self.config.face_up_size);
            player.hand = deck.draw_many(self.config.hand_size);
            player.soul_well = deck.draw_many(self.config.soul_well_size);
            player.refresh_phase();
        }
        self.draw_pile = deck;
        self.pile = Pile::default();
        self.status = GameStatus::Playing;
        self.current_player_index = 0;
        self.turn = 1;

        let first = self.players[0].id;
        tracing::info!(
            room_id = %self.room_id,
            players = self.players.len(),
            deck = %self.config.deck_type,
            "game started"
        );
        Ok(vec![
            GameEvent::GameStarted {
                first_player: first,
            },
            GameEvent::TurnChanged {
                player_id: first,
                turn: self.turn,
            },
        ])
    }

    // -- Turn actions -----------------------------------------------------

    /// Checks that `actor` may act right now; returns their seat index.
    fn ensure_turn(&self, actor: PlayerId) -> Result<usize, GameError> {
        if self.status != GameStatus::Playing {
            return Err(GameError::NotPlaying(self.status));
        }
        let idx = self.index_of(actor).ok_or(GameError::PlayerNotFound(actor))?;
        let player = &self.players[idx];
        if player.connection_status == ConnectionStatus::Evicted {
            return Err(GameError::PlayerEvicted(actor));
        }
        if !player.is_alive {
            return Err(GameError::PlayerNotAlive(actor));
        }
        if idx != self.current_player_index {
            return Err(GameError::NotYourTurn(actor));
        }
        Ok(idx)
    }

    /// Plays the card at `card_index` of the actor's current-phase
    /// container.
    ///
    /// If `card_id` is given it must name that same card, so a retried
    /// intent cannot land on whatever slid into the slot.
    pub fn submit_move(
        &mut self,
        actor: PlayerId,
        card_index: usize,
        card_id: Option<CardId>,
        target: Option<PlayerId>,
    ) -> Result<Vec<GameEvent>, GameError> {
        let idx = self.ensure_turn(actor)?;
        if let Some(t) = target {
            if self.index_of(t).is_none() {
                return Err(GameError::PlayerNotFound(t));
            }
        }

        let phase = self.players[idx].phase;
        let card = self.players[idx]
            .active_cards()
            .get(card_index)
            .filter(|c| card_id.is_none_or(|id| c.id == id))
            .ok_or(GameError::CardNotFound {
                index: card_index,
                phase,
            })?;
        if !is_legal(card, &self.pile) {
            return Err(GameError::IllegalCard {
                played: card.value,
                top: self.pile.last_played.as_ref().map_or(0, |c| c.value),
            });
        }
        let delta = apply_effect(card, self, actor, target);

        self.players[idx]
            .take_card(card_index)
            .ok_or_else(|| GameError::InvariantViolation("validated card vanished".into()))?;
        delta.apply_to(&mut self.pile);
        tracing::debug!(
            room_id = %self.room_id,
            player_id = %actor,
            card = %delta.card,
            purified = delta.purified,
            "card played"
        );

        let mut events = vec![GameEvent::CardPlayed {
            player_id: actor,
            card: delta.card.clone(),
            from: phase,
            was_purified: delta.purified,
            skipped: delta.skipped,
            target: delta.target,
            custom_effect: delta.custom.clone(),
        }];

        // one draw per hand play, whatever the hand size
        if phase == Phase::Hand {
            if let Some(drawn) = self.draw_pile.draw() {
                self.players[idx].hand.push(drawn);
            }
        }
        self.settle(idx, &mut events);
        self.end_turn(idx, delta.skipped, &mut events)?;
        Ok(events)
    }

    /// Picks up the whole tower. Only allowed when nothing in the actor's
    /// current-phase container is playable.
    pub fn submit_take_discard_pile(&mut self, actor: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let idx = self.ensure_turn(actor)?;
        if !legal_moves(self.players[idx].active_cards(), &self.pile).is_empty() {
            return Err(GameError::MustPlayLegalCard);
        }
        self.take_pile(idx, false)
    }

    /// Picks up the tower on the actor's behalf, legal card or not. The
    /// liveness fallback for a bot that did not answer in time.
    pub fn force_take_discard_pile(&mut self, actor: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let idx = self.ensure_turn(actor)?;
        self.take_pile(idx, true)
    }

    fn take_pile(&mut self, idx: usize, forced: bool) -> Result<Vec<GameEvent>, GameError> {
        let cards = self.pile.take_all();
        let player_id = self.players[idx].id;
        let count = cards.len();
        self.players[idx].hand.extend(cards);

        let mut events = vec![GameEvent::DiscardPileTaken {
            player_id,
            count,
            forced,
        }];
        self.settle(idx, &mut events);
        self.end_turn(idx, None, &mut events)?;
        Ok(events)
    }

    /// Gives up the actor's turn without a move (inactivity timeout).
    pub fn pass_turn(&mut self, actor: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        let idx = self.ensure_turn(actor)?;
        let mut events = vec![GameEvent::TurnPassed { player_id: actor }];
        self.end_turn(idx, None, &mut events)?;
        Ok(events)
    }

    /// Brings a player's phase and liveness in line with their containers.
    fn settle(&mut self, idx: usize, events: &mut Vec<GameEvent>) {
        let player = &mut self.players[idx];
        if player.hand.is_empty() && self.draw_pile.is_empty() && !player.soul_well.is_empty() {
            let count = player.drain_soul_well();
            events.push(GameEvent::SoulWellDrained {
                player_id: player.id,
                count,
            });
        }
        if player.refresh_phase() {
            events.push(GameEvent::PhaseChanged {
                player_id: player.id,
                phase: player.phase,
            });
        }
        if player.is_alive && player.has_cleared_all() && player.soul_well.is_empty() {
            player.is_alive = false;
            let id = player.id;
            self.escaped.push(id);
            tracing::info!(room_id = %self.room_id, player_id = %id, place = self.escaped.len(), "player escaped");
            events.push(GameEvent::PlayerEscaped {
                player_id: id,
                place: self.escaped.len(),
            });
        }
    }

    /// Finishes the game or hands the turn on, then re-checks the
    /// session's invariants.
    fn end_turn(
        &mut self,
        from: usize,
        skipped: Option<PlayerId>,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        if self.remaining_in_rotation() <= 1 {
            self.finish(events);
        } else {
            self.advance_turn(from, skipped, events)?;
        }
        self.check_invariants()
    }

    fn advance_turn(
        &mut self,
        from: usize,
        skipped: Option<PlayerId>,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), GameError> {
        let no_one = || GameError::InvariantViolation("no player left to take the turn".into());
        let mut next = self.next_in_rotation_index_after(from).ok_or_else(no_one)?;
        if skipped.is_some_and(|s| self.players[next].id == s) {
            next = self.next_in_rotation_index_after(next).ok_or_else(no_one)?;
        }
        self.current_player_index = next;
        self.turn += 1;
        events.push(GameEvent::TurnChanged {
            player_id: self.players[next].id,
            turn: self.turn,
        });
        Ok(())
    }

    /// Ends the game. The first player out wins; whoever is still holding
    /// cards is the sinner. If nobody escaped, the last one standing wins
    /// by default.
    fn finish(&mut self, events: &mut Vec<GameEvent>) {
        let survivor = self.players.iter().find(|p| p.in_rotation()).map(|p| p.id);
        match self.escaped.first() {
            Some(&first) => {
                self.winner_id = Some(first);
                self.sinner_id = survivor;
            }
            None => self.winner_id = survivor,
        }
        self.status = GameStatus::Finished;
        tracing::info!(
            room_id = %self.room_id,
            winner = ?self.winner_id,
            sinner = ?self.sinner_id,
            "game finished"
        );
        events.push(GameEvent::GameFinished {
            winner: self.winner_id,
            sinner: self.sinner_id,
        });
    }

    // -- Connection -------------------------------------------------------

    /// Records a transport drop or a reconnect. Use [`evict`](Self::evict)
    /// to fold a player.
    pub fn set_connection(
        &mut self,
        id: PlayerId,
        status: ConnectionStatus,
    ) -> Result<Vec<GameEvent>, GameError> {
        if status == ConnectionStatus::Evicted {
            return self.evict(id);
        }
        let idx = self.index_of(id).ok_or(GameError::PlayerNotFound(id))?;
        let player = &mut self.players[idx];
        if player.connection_status == ConnectionStatus::Evicted {
            return Err(GameError::PlayerEvicted(id));
        }
        if player.connection_status == status {
            return Ok(Vec::new());
        }
        player.connection_status = status;
        Ok(vec![GameEvent::ConnectionChanged {
            player_id: id,
            status,
        }])
    }

    /// Removes a player for good.
    ///
    /// Before the game starts the seat is freed. During play the player
    /// folds: their cards stay where they are but they never act again,
    /// and the turn moves on if it was theirs.
    pub fn evict(&mut self, id: PlayerId) -> Result<Vec<GameEvent>, GameError> {
        if self.status == GameStatus::Waiting {
            return self.remove_player(id);
        }
        let idx = self.index_of(id).ok_or(GameError::PlayerNotFound(id))?;
        if self.players[idx].connection_status == ConnectionStatus::Evicted {
            return Ok(Vec::new());
        }
        self.players[idx].connection_status = ConnectionStatus::Evicted;
        let mut events = vec![GameEvent::ConnectionChanged {
            player_id: id,
            status: ConnectionStatus::Evicted,
        }];
        tracing::info!(room_id = %self.room_id, player_id = %id, "player evicted");

        if self.status == GameStatus::Playing {
            if self.remaining_in_rotation() <= 1 {
                self.finish(&mut events);
            } else if idx == self.current_player_index {
                self.advance_turn(idx, None, &mut events)?;
            }
            self.check_invariants()?;
        }
        Ok(events)
    }

    // -- Invariants -------------------------------------------------------

    /// Verifies the structural invariants of a running game.
    pub fn check_invariants(&self) -> Result<(), GameError> {
        let violation = |msg: String| Err(GameError::InvariantViolation(msg));

        if self.pile.is_empty() != self.pile.last_played.is_none() {
            return violation("tower and top card disagree".into());
        }
        for p in &self.players {
            if p.is_alive && p.phase != p.derive_phase() {
                return violation(format!("{} is in {} with cards elsewhere", p.id, p.phase));
            }
            if !p.is_alive && !self.escaped.contains(&p.id) {
                return violation(format!("{} is out without escaping", p.id));
            }
        }
        if self.status == GameStatus::Playing {
            match self.players.get(self.current_player_index) {
                None => {
                    return violation(format!(
                        "turn pointer {} past {} seats",
                        self.current_player_index,
                        self.players.len()
                    ));
                }
                Some(p) if !p.in_rotation() => {
                    return violation(format!("turn held by {} who cannot act", p.id));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
