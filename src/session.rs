//! Doctor login sessions.
//!
//! Key properties:
//! - Tokens are opaque, 32 random bytes, URL-safe base64
//! - Only the SHA-256 of a token is kept; raw tokens are never stored
//! - Sessions expire after the idle timeout; each validation refreshes them
//! - Sessions live in memory only, so a restart logs everyone out

use std::collections::HashMap;
use std::time::{Duration, Instant};

struct SessionEntry {
    username: String,
    last_seen: Instant,
}

/// In-memory session table keyed by token hash.
pub struct SessionStore {
    sessions: HashMap<[u8; 32], SessionEntry>,
    idle_timeout: Duration,
}

impl SessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            idle_timeout,
        }
    }

    /// Open a session for `username`. Returns the raw token to hand to the client.
    pub fn create(&mut self, username: &str) -> String {
        if self.sessions.len() > 1000 {
            self.cleanup();
        }
        let token = generate_token();
        self.sessions.insert(
            hash_token(&token),
            SessionEntry {
                username: username.to_string(),
                last_seen: Instant::now(),
            },
        );
        tracing::debug!(username, "Session opened");
        token
    }

    /// Resolve a token to its username, refreshing the idle clock.
    /// Expired sessions are removed and yield `None`.
    pub fn validate(&mut self, token: &str) -> Option<String> {
        let key = hash_token(token);
        let now = Instant::now();
        let entry = self.sessions.get_mut(&key)?;
        if now.duration_since(entry.last_seen) >= self.idle_timeout {
            tracing::debug!(username = %entry.username, "Session expired");
            self.sessions.remove(&key);
            return None;
        }
        entry.last_seen = now;
        Some(entry.username.clone())
    }

    /// Whether `token` names a live session. Does not refresh it.
    pub fn is_active(&self, token: &str) -> bool {
        self.sessions
            .get(&hash_token(token))
            .is_some_and(|entry| entry.last_seen.elapsed() < self.idle_timeout)
    }

    /// Revoke a token. Returns `true` if a session was removed.
    pub fn revoke(&mut self, token: &str) -> bool {
        self.sessions.remove(&hash_token(token)).is_some()
    }

    /// Drop all expired sessions.
    pub fn cleanup(&mut self) {
        let now = Instant::now();
        let timeout = self.idle_timeout;
        self.sessions
            .retain(|_, entry| now.duration_since(entry.last_seen) < timeout);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Hash a session token using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random session token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}
