//! The per-room session manager.
//!
//! One `SessionManager` lives inside each room actor and tracks only the
//! human seats of that room. It is a plain `HashMap` with no locking: the
//! actor is its only user.

use std::collections::HashMap;

use rand::Rng;
use soulwell_protocol::{ConnectionStatus, PlayerId};
use tokio::time::Instant;

use crate::{ResilienceConfig, Session, SessionError, SessionState};

/// Connection bookkeeping for one room.
///
/// ```text
/// issue() ──→ [Connected] ──disconnect()──→ [Disconnected] ──reconnect()──→ [Connected]
///                                                 │
///                                   expire_stale() / evict()
///                                                 ▼
///                                            [Evicted]
/// ```
#[derive(Debug)]
pub struct SessionManager {
    sessions: HashMap<PlayerId, Session>,
    config: ResilienceConfig,
}

impl SessionManager {
    pub fn new(config: ResilienceConfig) -> Self {
        Self {
            sessions: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    /// Issues the seat's reconnect token. Once per membership.
    ///
    /// # Errors
    /// [`SessionError::AlreadyIssued`] if the player already has one.
    pub fn issue(&mut self, player_id: PlayerId) -> Result<&Session, SessionError> {
        if self.sessions.contains_key(&player_id) {
            return Err(SessionError::AlreadyIssued(player_id));
        }
        let session = Session {
            player_id,
            state: SessionState::Connected,
            reconnect_token: generate_token(),
        };
        tracing::debug!(%player_id, "reconnect token issued");
        Ok(self.sessions.entry(player_id).or_insert(session))
    }

    /// Marks the seat disconnected and starts its grace period.
    ///
    /// Returns `false` if it was already disconnected.
    pub fn disconnect(&mut self, player_id: PlayerId) -> Result<bool, SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        match session.state {
            SessionState::Evicted => Err(SessionError::Evicted(player_id)),
            SessionState::Disconnected { .. } => Ok(false),
            SessionState::Connected => {
                session.state = SessionState::Disconnected {
                    since: Instant::now(),
                };
                tracing::info!(%player_id, grace_secs = self.config.grace_period_secs, "player disconnected");
                Ok(true)
            }
        }
    }

    /// Restores a disconnected seat.
    ///
    /// Fails without touching anything unless the token matches and the
    /// seat is inside its grace period.
    pub fn reconnect(&mut self, player_id: PlayerId, token: &str) -> Result<&Session, SessionError> {
        let grace = self.config.grace_period();
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;

        match session.state {
            SessionState::Evicted => return Err(SessionError::Evicted(player_id)),
            _ if session.reconnect_token != token => return Err(SessionError::InvalidToken),
            SessionState::Connected => return Err(SessionError::AlreadyConnected(player_id)),
            SessionState::Disconnected { since } if since.elapsed() > grace => {
                // grace timer has not fired yet, but the window is closed
                return Err(SessionError::Evicted(player_id));
            }
            SessionState::Disconnected { .. } => {}
        }

        session.state = SessionState::Connected;
        tracing::info!(%player_id, "player reconnected");
        Ok(session)
    }

    /// Folds the seat for good. Returns `false` if it already was.
    pub fn evict(&mut self, player_id: PlayerId) -> Result<bool, SessionError> {
        let session = self
            .sessions
            .get_mut(&player_id)
            .ok_or(SessionError::NotFound(player_id))?;
        if session.state == SessionState::Evicted {
            return Ok(false);
        }
        session.state = SessionState::Evicted;
        tracing::info!(%player_id, "player evicted");
        Ok(true)
    }

    /// Evicts every seat whose grace period has run out and returns them.
    pub fn expire_stale(&mut self) -> Vec<PlayerId> {
        let grace = self.config.grace_period();
        let mut expired = Vec::new();

        for session in self.sessions.values_mut() {
            if let SessionState::Disconnected { since } = session.state {
                if since.elapsed() >= grace {
                    session.state = SessionState::Evicted;
                    expired.push(session.player_id);
                    tracing::info!(player_id = %session.player_id, "grace period elapsed");
                }
            }
        }
        expired.sort();
        expired
    }

    /// Forgets a seat entirely (left before the game started).
    pub fn remove(&mut self, player_id: PlayerId) -> Option<Session> {
        self.sessions.remove(&player_id)
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&Session> {
        self.sessions.get(&player_id)
    }

    pub fn status(&self, player_id: PlayerId) -> Option<ConnectionStatus> {
        self.get(player_id).map(Session::status)
    }

    pub fn token(&self, player_id: PlayerId) -> Option<&str> {
        self.get(player_id).map(|s| s.reconnect_token.as_str())
    }

    /// `true` once no human seat can ever act again.
    pub fn all_gone(&self) -> bool {
        self.sessions
            .values()
            .all(|s| s.state == SessionState::Evicted)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// 16 random bytes as 32 lowercase hex characters.
fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn pid(id: u64) -> PlayerId {
        PlayerId(id)
    }

    fn manager() -> SessionManager {
        SessionManager::new(ResilienceConfig::default())
    }

    fn token_of(mgr: &SessionManager, id: u64) -> String {
        mgr.token(pid(id)).unwrap().to_owned()
    }

    // =====================================================================
    // issue()
    // =====================================================================

    #[test]
    fn test_issue_new_player_returns_connected_with_hex_token() {
        let mut mgr = manager();
        let session = mgr.issue(pid(1)).unwrap();
        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert_eq!(session.reconnect_token.len(), 32);
        assert!(session.reconnect_token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_issue_twice_returns_error() {
        let mut mgr = manager();
        mgr.issue(pid(1)).unwrap();
        assert_eq!(
            mgr.issue(pid(1)).unwrap_err(),
            SessionError::AlreadyIssued(pid(1))
        );
    }

    #[test]
    fn test_issue_tokens_are_unique() {
        let mut mgr = manager();
        mgr.issue(pid(1)).unwrap();
        mgr.issue(pid(2)).unwrap();
        assert_ne!(token_of(&mgr, 1), token_of(&mgr, 2));
    }

    // =====================================================================
    // reconnect()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_within_grace_restores_connected() {
        let mut mgr = manager();
        mgr.issue(pid(1)).unwrap();
        let token = token_of(&mgr, 1);
        assert!(mgr.disconnect(pid(1)).unwrap());

        tokio::time::advance(Duration::from_secs(60)).await;
        let session = mgr.reconnect(pid(1), &token).unwrap();
        assert_eq!(session.status(), ConnectionStatus::Connected);
        assert_eq!(session.reconnect_token, token, "token is not rotated");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_wrong_token_leaves_disconnected() {
        let mut mgr = manager();
        mgr.issue(pid(1)).unwrap();
        mgr.disconnect(pid(1)).unwrap();

        let err = mgr.reconnect(pid(1), "not-the-token").unwrap_err();
        assert_eq!(err, SessionError::InvalidToken);
        assert_eq!(mgr.status(pid(1)), Some(ConnectionStatus::Disconnected));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_while_connected_rejected() {
        let mut mgr = manager();
        mgr.issue(pid(1)).unwrap();
        let token = token_of(&mgr, 1);
        assert_eq!(
            mgr.reconnect(pid(1), &token).unwrap_err(),
            SessionError::AlreadyConnected(pid(1))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_unknown_player_not_found() {
        let mut mgr = manager();
        assert_eq!(
            mgr.reconnect(pid(7), "x").unwrap_err(),
            SessionError::NotFound(pid(7))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_after_eviction_fails_with_right_token() {
        let mut mgr = manager();
        mgr.issue(pid(1)).unwrap();
        let token = token_of(&mgr, 1);
        mgr.disconnect(pid(1)).unwrap();

        tokio::time::advance(Duration::from_secs(121)).await;
        assert_eq!(mgr.expire_stale(), vec![pid(1)]);
        assert_eq!(
            mgr.reconnect(pid(1), &token).unwrap_err(),
            SessionError::Evicted(pid(1))
        );
        assert_eq!(mgr.status(pid(1)), Some(ConnectionStatus::Evicted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_past_window_before_sweep_fails() {
        let mut mgr = manager();
        mgr.issue(pid(1)).unwrap();
        let token = token_of(&mgr, 1);
        mgr.disconnect(pid(1)).unwrap();

        tokio::time::advance(Duration::from_secs(200)).await;
        assert_eq!(
            mgr.reconnect(pid(1), &token).unwrap_err(),
            SessionError::Evicted(pid(1))
        );
    }

    // =====================================================================
    // expire_stale() / evict()
    // =====================================================================

    #[tokio::test(start_paused = true)]
    async fn test_expire_stale_only_takes_elapsed_seats() {
        let mut mgr = manager();
        for id in 1..=3 {
            mgr.issue(pid(id)).unwrap();
        }
        mgr.disconnect(pid(1)).unwrap();
        tokio::time::advance(Duration::from_secs(100)).await;
        mgr.disconnect(pid(2)).unwrap();
        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(mgr.expire_stale(), vec![pid(1)]);
        assert_eq!(mgr.status(pid(2)), Some(ConnectionStatus::Disconnected));
        assert_eq!(mgr.status(pid(3)), Some(ConnectionStatus::Connected));
    }

    #[test]
    fn test_evict_is_idempotent_and_blocks_disconnect() {
        let mut mgr = manager();
        mgr.issue(pid(1)).unwrap();
        assert!(mgr.evict(pid(1)).unwrap());
        assert!(!mgr.evict(pid(1)).unwrap());
        assert_eq!(
            mgr.disconnect(pid(1)).unwrap_err(),
            SessionError::Evicted(pid(1))
        );
    }

    #[test]
    fn test_all_gone_once_every_seat_evicted() {
        let mut mgr = manager();
        mgr.issue(pid(1)).unwrap();
        mgr.issue(pid(2)).unwrap();
        mgr.evict(pid(1)).unwrap();
        assert!(!mgr.all_gone());
        mgr.remove(pid(2));
        assert!(mgr.all_gone());
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ResilienceConfig =
            serde_json::from_str(r#"{"gracePeriodSecs": 5}"#).unwrap();
        assert_eq!(config.grace_period(), Duration::from_secs(5));
        assert_eq!(config.inactivity_timeout_secs, 30);
    }
}
