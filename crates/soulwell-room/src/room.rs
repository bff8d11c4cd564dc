//! Room actor: one Tokio task per table, the only writer of its game.
//!
//! Player intents, reconnects, timer firings and bot answers all arrive
//! as [`RoomCommand`]s on one bounded channel and are applied one at a
//! time. Nothing outside the task ever touches the [`GameSession`].

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use soulwell_game::{
    BotDecision, BotMover, Difficulty, GameError, GameEvent, GameSession, GameStatus, GameView,
    MoveRequest, Player,
};
use soulwell_protocol::{ConnectionStatus, PlayerId, RoomId};
use soulwell_session::SessionManager;
use soulwell_timer::{Timers, jittered};
use tokio::sync::{mpsc, oneshot};

use crate::{GameMode, PlayerAction, RoomConfig, RoomError, RoomInfo, RoomSettings, ServerEvent};

/// Server-wide player ids. Bots draw from the same counter.
static NEXT_PLAYER_ID: AtomicU64 = AtomicU64::new(1);

fn next_player_id() -> PlayerId {
    PlayerId(NEXT_PLAYER_ID.fetch_add(1, Ordering::Relaxed))
}

/// Where the room pushes events for one connected player.
pub type PlayerSender = mpsc::UnboundedSender<ServerEvent>;

/// What a successful join or reconnect hands back to the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Seat {
    pub room_id: RoomId,
    pub player_id: PlayerId,
    pub token: String,
}

/// Timers a room can have running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TimerKey {
    /// A dropped player's reconnect window.
    Grace(PlayerId),
    /// A disconnected player holding the turn.
    Inactivity,
    /// The current bot thinking.
    Bot,
}

pub(crate) enum RoomCommand {
    Join {
        player_name: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<Seat, RoomError>>,
    },
    Act {
        player_id: PlayerId,
        action: PlayerAction,
    },
    Disconnect {
        player_id: PlayerId,
    },
    Reconnect {
        player_id: PlayerId,
        token: String,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<Seat, RoomError>>,
    },
    Leave {
        player_id: PlayerId,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    TimerFired {
        key: TimerKey,
        generation: u64,
    },
    /// `decision` is `None` when the mover timed out or panicked.
    BotAnswered {
        generation: u64,
        player_id: PlayerId,
        turn: u64,
        decision: Option<BotDecision>,
    },
    GetInfo {
        reply: oneshot::Sender<RoomInfo>,
    },
    Snapshot {
        viewer: Option<PlayerId>,
        reply: oneshot::Sender<GameView>,
    },
    Shutdown,
}

// ---------------------------------------------------------------------------
// RoomHandle
// ---------------------------------------------------------------------------

/// Cheap, cloneable handle to a running room.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(make(reply_tx)).await?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id))
    }

    /// Seats a new human. The room answers on `sender` with `roomCreated`
    /// for the first human and `roomJoined` for everyone after.
    pub async fn join(
        &self,
        player_name: impl Into<String>,
        sender: PlayerSender,
    ) -> Result<Seat, RoomError> {
        let player_name = player_name.into();
        self.request(|reply| RoomCommand::Join {
            player_name,
            sender,
            reply,
        })
        .await?
    }

    /// Forwards a seated player's intent. Rejections come back on the
    /// player's own sender as an `error` event.
    pub async fn act(&self, player_id: PlayerId, action: PlayerAction) -> Result<(), RoomError> {
        self.send(RoomCommand::Act { player_id, action }).await
    }

    /// Reports that the player's transport dropped.
    pub async fn disconnect(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.send(RoomCommand::Disconnect { player_id }).await
    }

    pub async fn reconnect(
        &self,
        player_id: PlayerId,
        token: impl Into<String>,
        sender: PlayerSender,
    ) -> Result<Seat, RoomError> {
        let token = token.into();
        self.request(|reply| RoomCommand::Reconnect {
            player_id,
            token,
            sender,
            reply,
        })
        .await?
    }

    pub async fn leave(&self, player_id: PlayerId) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::Leave { player_id, reply })
            .await?
    }

    pub async fn info(&self) -> Result<RoomInfo, RoomError> {
        self.request(|reply| RoomCommand::GetInfo { reply }).await
    }

    /// The table as `viewer` would see it.
    pub async fn snapshot(&self, viewer: Option<PlayerId>) -> Result<GameView, RoomError> {
        self.request(|reply| RoomCommand::Snapshot { viewer, reply })
            .await
    }

    /// Closes the room, telling every connected member.
    pub async fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown).await
    }
}

// ---------------------------------------------------------------------------
// RoomActor
// ---------------------------------------------------------------------------

struct RoomActor {
    room_id: RoomId,
    config: RoomConfig,
    /// Vs-bots tables start as soon as their creator sits down.
    solo: bool,
    game: GameSession,
    sessions: SessionManager,
    /// Connected humans only.
    senders: HashMap<PlayerId, PlayerSender>,
    timers: Timers<TimerKey>,
    mover: Arc<dyn BotMover>,
    /// Lets timers post back without keeping the room alive.
    self_tx: mpsc::WeakSender<RoomCommand>,
    has_creator: bool,
    /// Turn the running bot or inactivity timer was started for.
    timed_turn: Option<u64>,
    closed: bool,
}

impl RoomActor {
    async fn run(mut self, mut receiver: mpsc::Receiver<RoomCommand>) {
        tracing::info!(room_id = %self.room_id, "room actor started");

        while let Some(cmd) = receiver.recv().await {
            self.handle(cmd);
            if self.closed {
                break;
            }
        }

        self.timers.cancel_all();
        tracing::info!(room_id = %self.room_id, "room actor stopped");
    }

    fn handle(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join {
                player_name,
                sender,
                reply,
            } => {
                let result = self.handle_join(player_name, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Act { player_id, action } => self.handle_action(player_id, action),
            RoomCommand::Disconnect { player_id } => self.handle_disconnect(player_id),
            RoomCommand::Reconnect {
                player_id,
                token,
                sender,
                reply,
            } => {
                let result = self.handle_reconnect(player_id, &token, sender);
                let _ = reply.send(result);
            }
            RoomCommand::Leave { player_id, reply } => {
                let result = self.handle_leave(player_id);
                let _ = reply.send(result);
            }
            RoomCommand::TimerFired { key, generation } => {
                if self.timers.claim(&key, generation) {
                    self.handle_timer(key);
                }
            }
            RoomCommand::BotAnswered {
                generation,
                player_id,
                turn,
                decision,
            } => {
                if self.timers.claim(&TimerKey::Bot, generation) {
                    self.timed_turn = None;
                    self.handle_bot_answer(player_id, turn, decision);
                }
            }
            RoomCommand::GetInfo { reply } => {
                let _ = reply.send(self.info());
            }
            RoomCommand::Snapshot { viewer, reply } => {
                let _ = reply.send(self.game.view_for(viewer));
            }
            RoomCommand::Shutdown => self.close("room shut down"),
        }
    }

    // -- Membership -------------------------------------------------------

    fn handle_join(&mut self, player_name: String, sender: PlayerSender) -> Result<Seat, RoomError> {
        let player_id = next_player_id();
        let mut events = self.game.add_player(Player::human(player_id, player_name))?;
        let token = self.sessions.issue(player_id)?.reconnect_token.clone();
        if self.solo {
            events.extend(self.game.set_ready(player_id, true)?);
        }

        let state = self.game.view_for(Some(player_id));
        let welcome = if self.has_creator {
            ServerEvent::RoomJoined {
                room_id: self.room_id,
                player_id,
                token: token.clone(),
                state,
            }
        } else {
            self.has_creator = true;
            ServerEvent::RoomCreated {
                room_id: self.room_id,
                player_id,
                token: token.clone(),
                state,
            }
        };
        let _ = sender.send(welcome);
        self.senders.insert(player_id, sender);
        tracing::info!(
            room_id = %self.room_id,
            %player_id,
            players = self.game.players().len(),
            "player joined"
        );

        self.after_change(events);
        Ok(Seat {
            room_id: self.room_id,
            player_id,
            token,
        })
    }

    fn handle_leave(&mut self, player_id: PlayerId) -> Result<(), RoomError> {
        if self.game.player(player_id).is_none() || self.sessions.get(player_id).is_none() {
            return Err(RoomError::NotInRoom(player_id, self.room_id));
        }
        self.senders.remove(&player_id);
        self.timers.cancel(&TimerKey::Grace(player_id));

        let result = if self.game.status() == GameStatus::Waiting {
            self.sessions.remove(player_id);
            self.game.remove_player(player_id)
        } else {
            self.sessions.evict(player_id)?;
            self.game.evict(player_id)
        };
        tracing::info!(room_id = %self.room_id, %player_id, "player left");
        self.apply(result)?;
        self.close_if_abandoned();
        Ok(())
    }

    fn handle_disconnect(&mut self, player_id: PlayerId) {
        self.senders.remove(&player_id);
        match self.sessions.disconnect(player_id) {
            Ok(true) => {}
            Ok(false) => return,
            Err(e) => {
                tracing::debug!(room_id = %self.room_id, %player_id, error = %e, "disconnect ignored");
                return;
            }
        }
        self.schedule_grace(player_id);
        let result = self
            .game
            .set_connection(player_id, ConnectionStatus::Disconnected);
        let _ = self.apply(result);
    }

    fn handle_reconnect(
        &mut self,
        player_id: PlayerId,
        token: &str,
        sender: PlayerSender,
    ) -> Result<Seat, RoomError> {
        if let Err(e) = self.sessions.reconnect(player_id, token) {
            tracing::debug!(room_id = %self.room_id, %player_id, error = %e, "reconnect rejected");
            return Err(e.into());
        }
        self.timers.cancel(&TimerKey::Grace(player_id));

        let _ = sender.send(ServerEvent::ReconnectionSuccess {
            room_id: self.room_id,
            player_id,
            state: self.game.view_for(Some(player_id)),
        });
        self.senders.insert(player_id, sender);

        let result = self
            .game
            .set_connection(player_id, ConnectionStatus::Connected);
        self.apply(result)?;
        let token = self
            .sessions
            .token(player_id)
            .map(str::to_owned)
            .unwrap_or_default();
        Ok(Seat {
            room_id: self.room_id,
            player_id,
            token,
        })
    }

    /// Folds a player whose reconnect window ran out.
    fn evict(&mut self, player_id: PlayerId) {
        self.senders.remove(&player_id);
        self.timers.cancel(&TimerKey::Grace(player_id));
        let _ = self.sessions.evict(player_id);

        let result = self.game.evict(player_id);
        if self.apply(result).is_ok() {
            self.close_if_abandoned();
        }
    }

    fn close_if_abandoned(&mut self) {
        if !self.closed && self.sessions.all_gone() {
            self.close("every player has left");
        }
    }

    // -- Intents ----------------------------------------------------------

    fn handle_action(&mut self, player_id: PlayerId, action: PlayerAction) {
        if !self.senders.contains_key(&player_id) {
            tracing::warn!(room_id = %self.room_id, %player_id, "intent from a player not connected here, ignoring");
            return;
        }

        let result = match action {
            PlayerAction::SetReady { ready } => self.game.set_ready(player_id, ready),
            PlayerAction::StartGame => self.game.start(Some(player_id)),
            PlayerAction::AddBot { difficulty } => {
                if self.game.host() == Some(player_id) {
                    self.seat_bot(difficulty)
                } else {
                    Err(GameError::NotHost)
                }
            }
            PlayerAction::PlayCard {
                card_index,
                card_id,
                target,
            } => self.game.submit_move(player_id, card_index, card_id, target),
            PlayerAction::TakeDiscardPile => self.game.submit_take_discard_pile(player_id),
        };

        if let Err(e) = self.apply(result) {
            if !self.closed {
                tracing::debug!(room_id = %self.room_id, %player_id, error = %e, "intent rejected");
                self.send_to(player_id, ServerEvent::from(&RoomError::from(e)));
            }
        }
    }

    fn seat_bot(&mut self, difficulty: Difficulty) -> Result<Vec<GameEvent>, GameError> {
        let bots = self.game.players().iter().filter(|p| p.is_bot).count();
        let name = format!("Bot {}", bots + 1);
        self.game
            .add_player(Player::bot(next_player_id(), name, difficulty))
    }

    // -- Timers -----------------------------------------------------------

    fn schedule_grace(&mut self, player_id: PlayerId) {
        let Some(tx) = self.self_tx.upgrade() else {
            return;
        };
        let key = TimerKey::Grace(player_id);
        let grace = self.sessions.config().grace_period();
        self.timers.schedule(key, grace, tx, move |generation| {
            RoomCommand::TimerFired { key, generation }
        });
    }

    fn handle_timer(&mut self, key: TimerKey) {
        match key {
            TimerKey::Grace(_) => {
                for player_id in self.sessions.expire_stale() {
                    tracing::info!(room_id = %self.room_id, %player_id, "grace period over, evicting");
                    self.evict(player_id);
                    if self.closed {
                        return;
                    }
                }
            }
            TimerKey::Inactivity => {
                self.timed_turn = None;
                let Some(current) = self.game.current_player() else {
                    return;
                };
                if current.connection_status != ConnectionStatus::Disconnected {
                    return;
                }
                let player_id = current.id;
                tracing::info!(room_id = %self.room_id, %player_id, "turn passed for inactivity");
                let result = self.game.pass_turn(player_id);
                let _ = self.apply(result);
            }
            // bot answers arrive as BotAnswered
            TimerKey::Bot => {}
        }
    }

    /// Starts, keeps or stops the bot and inactivity timers so that they
    /// always belong to the current turn.
    fn sync_turn_timers(&mut self) {
        let turn = self.game.turn();
        let current = self
            .game
            .current_player()
            .map(|p| (p.id, p.is_bot, p.connection_status));

        match current {
            Some((player_id, true, _)) => {
                self.timers.cancel(&TimerKey::Inactivity);
                if self.timed_turn != Some(turn) || !self.timers.is_pending(&TimerKey::Bot) {
                    self.schedule_bot(player_id, turn);
                }
            }
            Some((_, false, ConnectionStatus::Disconnected)) => {
                self.timers.cancel(&TimerKey::Bot);
                if self.timed_turn != Some(turn) || !self.timers.is_pending(&TimerKey::Inactivity)
                {
                    self.schedule_inactivity(turn);
                }
            }
            _ => {
                self.timers
                    .cancel_where(|k| matches!(k, TimerKey::Bot | TimerKey::Inactivity));
                self.timed_turn = None;
            }
        }
    }

    fn schedule_inactivity(&mut self, turn: u64) {
        let Some(tx) = self.self_tx.upgrade() else {
            return;
        };
        let after = self.sessions.config().inactivity_timeout();
        self.timers
            .schedule(TimerKey::Inactivity, after, tx, |generation| {
                RoomCommand::TimerFired {
                    key: TimerKey::Inactivity,
                    generation,
                }
            });
        self.timed_turn = Some(turn);
    }

    /// Asks the mover for a decision off the room's task. The answer comes
    /// back as [`RoomCommand::BotAnswered`].
    fn schedule_bot(&mut self, player_id: PlayerId, turn: u64) {
        let Some(tx) = self.self_tx.upgrade() else {
            return;
        };
        let request = match MoveRequest::for_player(&self.game, player_id) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(room_id = %self.room_id, %player_id, error = %e, "no move request for bot");
                return;
            }
        };
        let mover = Arc::clone(&self.mover);
        let think = jittered(self.config.bot_think(), self.config.bot_jitter());
        let budget = self.config.bot_budget();
        let room_id = self.room_id;

        self.timers.spawn(TimerKey::Bot, tx, move |generation| async move {
            tokio::time::sleep(think).await;
            let decide = tokio::task::spawn_blocking(move || mover.decide(&request));
            let decision = match tokio::time::timeout(budget, decide).await {
                Ok(Ok(decision)) => Some(decision),
                Ok(Err(e)) => {
                    tracing::warn!(%room_id, %player_id, error = %e, "bot mover failed");
                    None
                }
                Err(_) => {
                    tracing::warn!(%room_id, %player_id, budget_ms = budget.as_millis() as u64, "bot mover timed out");
                    None
                }
            };
            RoomCommand::BotAnswered {
                generation,
                player_id,
                turn,
                decision,
            }
        });
        self.timed_turn = Some(turn);
    }

    fn handle_bot_answer(&mut self, player_id: PlayerId, turn: u64, decision: Option<BotDecision>) {
        let still_theirs = self.game.turn() == turn
            && self.game.current_player().is_some_and(|p| p.id == player_id);
        if !still_theirs {
            tracing::debug!(room_id = %self.room_id, %player_id, turn, "late bot answer dropped");
            self.sync_turn_timers();
            return;
        }

        let attempt = decision.map(|d| match d {
            BotDecision::Play {
                card_index,
                card_id,
            } => self.game.submit_move(player_id, card_index, card_id, None),
            BotDecision::TakePile => self.game.submit_take_discard_pile(player_id),
        });
        let result = match attempt {
            Some(Ok(events)) => Ok(events),
            Some(Err(e)) if e.is_fatal() => Err(e),
            Some(Err(e)) => {
                tracing::warn!(room_id = %self.room_id, %player_id, error = %e, "bot answer rejected, taking the pile");
                self.game.force_take_discard_pile(player_id)
            }
            None => self.game.force_take_discard_pile(player_id),
        };
        if let Err(e) = self.apply(result) {
            tracing::warn!(room_id = %self.room_id, %player_id, error = %e, "bot fallback failed");
        }
    }

    // -- Outcomes ---------------------------------------------------------

    /// Publishes a successful mutation, or tears the room down if the
    /// game reported a broken invariant.
    fn apply(&mut self, result: Result<Vec<GameEvent>, GameError>) -> Result<(), GameError> {
        match result {
            Ok(events) => {
                self.after_change(events);
                Ok(())
            }
            Err(e) => {
                if e.is_fatal() {
                    tracing::error!(room_id = %self.room_id, error = %e, "room state corrupted");
                    self.close(&e.to_string());
                }
                Err(e)
            }
        }
    }

    fn after_change(&mut self, events: Vec<GameEvent>) {
        if events.is_empty() {
            return;
        }
        let mut started = false;
        let mut game_over = None;

        for event in events {
            let wire = match event {
                GameEvent::GameStarted { .. } => {
                    started = true;
                    None
                }
                GameEvent::CardPlayed {
                    player_id,
                    card,
                    was_purified,
                    skipped,
                    target,
                    custom_effect,
                    ..
                } => Some(ServerEvent::CardPlayed {
                    player_id,
                    card,
                    was_purified,
                    skipped_player_id: skipped,
                    target_player_id: target,
                    custom_effect,
                }),
                GameEvent::DiscardPileTaken {
                    player_id,
                    count,
                    forced,
                } => Some(ServerEvent::DiscardPileTaken {
                    player_id,
                    count,
                    forced,
                }),
                GameEvent::TurnPassed { player_id } => Some(ServerEvent::TurnPassed { player_id }),
                GameEvent::PlayerEscaped { player_id, place } => {
                    Some(ServerEvent::PlayerEscaped { player_id, place })
                }
                GameEvent::PlayerRemoved { player_id, .. } => {
                    Some(ServerEvent::PlayerRemoved { player_id })
                }
                GameEvent::ConnectionChanged { player_id, status } => Some(match status {
                    ConnectionStatus::Connected => ServerEvent::PlayerReconnected { player_id },
                    ConnectionStatus::Disconnected => ServerEvent::PlayerDisconnected { player_id },
                    ConnectionStatus::Evicted => ServerEvent::PlayerRemoved { player_id },
                }),
                GameEvent::GameFinished { winner, sinner } => {
                    game_over = Some(ServerEvent::GameOver {
                        winner_id: winner,
                        sinner_id: sinner,
                    });
                    None
                }
                GameEvent::PlayerJoined { .. }
                | GameEvent::ReadyChanged { .. }
                | GameEvent::SoulWellDrained { .. }
                | GameEvent::PhaseChanged { .. }
                | GameEvent::TurnChanged { .. } => None,
            };
            if let Some(wire) = wire {
                self.broadcast(&wire);
            }
        }

        for (&player_id, sender) in &self.senders {
            let state = self.game.view_for(Some(player_id));
            let event = if started {
                ServerEvent::GameStarted { state }
            } else {
                ServerEvent::GameStateUpdate { state }
            };
            let _ = sender.send(event);
        }
        if let Some(over) = game_over {
            self.broadcast(&over);
        }

        self.sync_turn_timers();
        self.maybe_auto_start();
    }

    fn maybe_auto_start(&mut self) {
        if !(self.config.auto_start || self.solo) || !self.game.can_start() {
            return;
        }
        tracing::info!(room_id = %self.room_id, "every seat ready, starting");
        let result = self.game.start(None);
        if let Err(e) = self.apply(result) {
            tracing::warn!(room_id = %self.room_id, error = %e, "auto-start failed");
        }
    }

    fn close(&mut self, reason: &str) {
        if self.closed {
            return;
        }
        self.broadcast(&ServerEvent::RoomClosed {
            room_id: self.room_id,
            reason: reason.to_owned(),
        });
        self.timers.cancel_all();
        self.senders.clear();
        self.closed = true;
        tracing::info!(room_id = %self.room_id, reason, "room closed");
    }

    fn broadcast(&self, event: &ServerEvent) {
        for sender in self.senders.values() {
            let _ = sender.send(event.clone());
        }
    }

    fn send_to(&self, player_id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&player_id) {
            let _ = sender.send(event);
        }
    }

    fn info(&self) -> RoomInfo {
        let host_name = self
            .game
            .host()
            .and_then(|id| self.game.player(id))
            .map(|p| p.display_name.clone());
        RoomInfo {
            room_id: self.room_id,
            status: self.game.status(),
            player_count: self.game.players().len(),
            max_players: self.game.config().max_players,
            deck_type: self.game.config().deck_type,
            host_name,
        }
    }
}

/// Spawns a room actor. Vs-bots tables are seated with their bots before
/// the handle is returned.
pub(crate) fn spawn_room(
    room_id: RoomId,
    settings: &RoomSettings,
    config: RoomConfig,
    mover: Arc<dyn BotMover>,
) -> Result<RoomHandle, RoomError> {
    let game = GameSession::new(room_id, settings.game_config(config.seed))?;
    let (tx, rx) = mpsc::channel(config.channel_size.max(1));

    let mut actor = RoomActor {
        room_id,
        solo: matches!(settings.mode, GameMode::VsBots { .. }),
        game,
        sessions: SessionManager::new(config.resilience.clone()),
        config,
        senders: HashMap::new(),
        timers: Timers::new(),
        mover,
        self_tx: tx.downgrade(),
        has_creator: false,
        timed_turn: None,
        closed: false,
    };
    if let GameMode::VsBots { bots, difficulty } = settings.mode {
        for _ in 0..bots {
            actor.seat_bot(difficulty)?;
        }
    }

    tokio::spawn(actor.run(rx));
    Ok(RoomHandle {
        room_id,
        sender: tx,
    })
}
