//! In-memory session store for opaque bearer tokens.
//!
//! Sessions live only in process memory; a restart signs everyone out. Tokens
//! are 48 alphanumeric characters (~285 bits), so they are not guessable and
//! never need to be persisted or logged.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

const TOKEN_LENGTH: usize = 48;

/// What the server remembers about one logged-in client.
#[derive(Clone, Debug)]
pub struct Session {
    pub user_id: Uuid,
    pub login_name: String,
    pub display_name: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Concurrent token -> session map with lazy expiry.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Creates a session and returns the freshly minted token.
    pub fn create(&self, user_id: Uuid, login_name: &str, display_name: &str) -> String {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(TOKEN_LENGTH)
            .map(char::from)
            .collect();

        self.sessions.insert(
            token.clone(),
            Session {
                user_id,
                login_name: login_name.to_string(),
                display_name: display_name.to_string(),
                expires_at: Utc::now() + self.ttl,
            },
        );

        token
    }

    /// Looks up a token, dropping it if it has expired.
    pub fn get(&self, token: &str) -> Option<Session> {
        // Clone out before removing so the shard guard is released first.
        let session = self.sessions.get(token).map(|entry| entry.clone())?;
        if session.is_expired(Utc::now()) {
            self.sessions.remove(token);
            return None;
        }
        Some(session)
    }

    /// Removes a session; returns whether the token was live.
    pub fn remove(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drops every session belonging to a user, e.g. after a password reset
    /// or account deletion.
    pub fn remove_for_user(&self, user_id: Uuid) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| session.user_id != user_id);
        before - self.sessions.len()
    }

    /// Sweeps out expired entries. Called opportunistically; correctness does
    /// not depend on it because `get` checks expiry itself.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired(now));
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
