//! Shared-secret gate for the internal browse mode.
//!
//! A [`SessionGuard`] is the state of one browsing context: authenticated or
//! not, and when. It is valid for a fixed window after a successful
//! authentication and is never silently renewed. [`SessionStore`] keeps one
//! guard per session cookie.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use voxlink_common::SessionId;

use crate::config::{AuthConfig, MAX_SESSION_TIMEOUT_MINS};

/// The configured shared secret.
#[derive(Debug, Clone)]
pub enum SharedSecret {
    Plain(String),
    /// Bcrypt hash of the secret.
    Hashed(String),
}

impl SharedSecret {
    /// Secret from config; the hash wins when both are set.
    pub fn from_config(config: &AuthConfig) -> Option<Self> {
        let non_empty = |s: &Option<String>| s.clone().filter(|s| !s.is_empty());
        non_empty(&config.secret_hash)
            .map(Self::Hashed)
            .or_else(|| non_empty(&config.secret).map(Self::Plain))
    }

    pub fn verify(&self, candidate: &str) -> bool {
        match self {
            Self::Plain(secret) => secret == candidate,
            Self::Hashed(hash) => bcrypt::verify(candidate, hash).unwrap_or_else(|e| {
                tracing::warn!("Configured secret_hash is not a valid bcrypt hash: {}", e);
                false
            }),
        }
    }
}

/// Authentication state of one browsing context.
#[derive(Debug, Clone)]
pub struct SessionGuard {
    authenticated_at: Option<DateTime<Utc>>,
    timeout: Duration,
}

impl SessionGuard {
    pub fn new(timeout: Duration) -> Self {
        Self {
            authenticated_at: None,
            timeout,
        }
    }

    /// Check `candidate` against `secret`; on success (re)start the timer.
    ///
    /// A failed attempt leaves the current state untouched.
    pub fn authenticate(&mut self, secret: &SharedSecret, candidate: &str) -> bool {
        self.authenticate_at(secret, candidate, Utc::now())
    }

    pub fn authenticate_at(
        &mut self,
        secret: &SharedSecret,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> bool {
        if !secret.verify(candidate) {
            return false;
        }
        self.authenticated_at = Some(now);
        true
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    /// Authenticated and still inside the timeout window.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.authenticated_at
            .is_some_and(|started| now - started < self.timeout)
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.authenticated_at.map(|started| started + self.timeout)
    }
}

/// Thread-safe map of session cookies to guards.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<DashMap<SessionId, SessionGuard>>,
    secret: Option<SharedSecret>,
    timeout: Duration,
}

impl SessionStore {
    /// `timeout_mins` is capped at [`MAX_SESSION_TIMEOUT_MINS`].
    pub fn new(secret: Option<SharedSecret>, timeout_mins: u64) -> Self {
        let capped = timeout_mins.min(MAX_SESSION_TIMEOUT_MINS);
        if capped < timeout_mins {
            tracing::warn!(
                requested = timeout_mins,
                capped,
                "Session timeout capped"
            );
        }
        Self {
            sessions: Arc::new(DashMap::new()),
            secret,
            timeout: Duration::minutes(capped as i64),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(SharedSecret::from_config(config), config.session_timeout_mins)
    }

    pub fn is_configured(&self) -> bool {
        self.secret.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Authenticate a new browsing context.
    ///
    /// Returns the new session id and its expiry, or `None` when the secret
    /// does not match (or none is configured).
    pub fn login(&self, candidate: &str) -> Option<(SessionId, DateTime<Utc>)> {
        let secret = self.secret.as_ref()?;
        let mut guard = SessionGuard::new(self.timeout);
        if !guard.authenticate(secret, candidate) {
            tracing::info!("Rejected login with wrong secret");
            return None;
        }

        let id = SessionId::new();
        let expires_at = guard.expires_at()?;
        self.sessions.insert(id, guard);
        tracing::info!(session_id = %id, expires_at = %expires_at, "Session started");
        Some((id, expires_at))
    }

    pub fn is_valid(&self, id: &SessionId) -> bool {
        self.sessions
            .get(id)
            .is_some_and(|guard| guard.is_valid())
    }

    pub fn expires_at(&self, id: &SessionId) -> Option<DateTime<Utc>> {
        self.sessions
            .get(id)
            .filter(|guard| guard.is_valid())
            .and_then(|guard| guard.expires_at())
    }

    pub fn logout(&self, id: &SessionId) {
        if self.sessions.remove(id).is_some() {
            tracing::info!(session_id = %id, "Session ended");
        }
    }

    /// Remove sessions whose window has passed. Returns the number removed.
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions.retain(|_, guard| guard.is_valid_at(now));
        let removed = before.saturating_sub(self.sessions.len());

        if removed > 0 {
            tracing::debug!(removed, "Cleaned up expired sessions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Start a background task that periodically drops expired sessions.
pub fn start_cleanup_task(store: SessionStore, interval_secs: u64) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            store.cleanup_expired();
        }
    })
}
