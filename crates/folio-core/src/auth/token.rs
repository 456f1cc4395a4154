use std::sync::{Arc, RwLock};

use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::TokenStore;
use crate::clock::{Clock, SystemClock};

const TOKEN_KEY: &str = "adminToken";
const TOKEN_TYPE_KEY: &str = "tokenType";
const TOKEN_EXPIRY_KEY: &str = "tokenExpiry";
const REMEMBER_ME_KEY: &str = "rememberMe";
const LAST_LOGIN_KEY: &str = "lastLoginTime";

const ALL_KEYS: [&str; 5] = [
    TOKEN_KEY,
    TOKEN_TYPE_KEY,
    TOKEN_EXPIRY_KEY,
    REMEMBER_ME_KEY,
    LAST_LOGIN_KEY,
];

pub const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Token lifetime when no explicit expiry is given.
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Token lifetime with "remember me" set.
const REMEMBER_ME_TTL_DAYS: i64 = 30;

/// Upper bound on a server-supplied lifetime (10 years).
const MAX_EXPIRES_IN_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// A login counts as recent for this long, regardless of token expiry.
const RECENT_LOGIN_HOURS: i64 = 24;

/// Snapshot of everything the manager persists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub token: String,
    pub token_type: String,
    pub expiry: DateTime<Utc>,
    pub remember_me: bool,
    pub last_login_time: Option<DateTime<Utc>>,
}

/// Owns the auth token lifecycle on top of a `TokenStore`.
///
/// Multi-key writes and clears run under one write lock, so a reader never
/// sees a half-written or half-cleared session. A write that fails part way
/// puts the previous session back.
pub struct TokenManager {
    store: Box<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    lock: RwLock<()>,
}

impl TokenManager {
    pub fn new(store: impl TokenStore + 'static) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: impl TokenStore + 'static, clock: Arc<dyn Clock>) -> Self {
        Self {
            store: Box::new(store),
            clock,
            lock: RwLock::new(()),
        }
    }

    /// Store a freshly issued token.
    ///
    /// Expiry precedence: `remember_me` (30 days), then `expires_in_secs`,
    /// then the 24 hour default. Always computed as `now + ttl`.
    pub fn set_token(
        &self,
        token: &str,
        token_type: Option<&str>,
        expires_in_secs: Option<u64>,
        remember_me: bool,
    ) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());

        let now = self.clock.now();
        let ttl = if remember_me {
            Duration::days(REMEMBER_ME_TTL_DAYS)
        } else if let Some(secs) = expires_in_secs {
            Duration::seconds(secs.min(MAX_EXPIRES_IN_SECS) as i64)
        } else {
            Duration::hours(DEFAULT_TOKEN_TTL_HOURS)
        };
        let expiry = now + ttl;

        let expiry_millis = expiry.timestamp_millis().to_string();
        let login_millis = now.timestamp_millis().to_string();
        let values = [
            (TOKEN_KEY, token),
            (TOKEN_TYPE_KEY, token_type.unwrap_or(DEFAULT_TOKEN_TYPE)),
            (TOKEN_EXPIRY_KEY, expiry_millis.as_str()),
            (REMEMBER_ME_KEY, if remember_me { "true" } else { "false" }),
            (LAST_LOGIN_KEY, login_millis.as_str()),
        ];

        let previous: Vec<(&str, Option<String>)> =
            ALL_KEYS.iter().map(|key| (*key, self.store.get(key))).collect();

        for (key, value) in values {
            if let Err(e) = self.store.set(key, value) {
                self.restore(&previous);
                return Err(e.context("Failed to store token"));
            }
        }

        debug!(remember_me, expiry = %expiry, "Token stored");
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        self.store.get(TOKEN_KEY)
    }

    pub fn token_type(&self) -> String {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        self.store
            .get(TOKEN_TYPE_KEY)
            .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string())
    }

    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        self.read_millis(TOKEN_EXPIRY_KEY)
    }

    /// True when no expiry is stored or it has passed.
    pub fn is_token_expired(&self) -> bool {
        match self.expiry() {
            Some(expiry) => self.clock.now() > expiry,
            None => true,
        }
    }

    pub fn has_valid_token(&self) -> bool {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        let Some(_) = self.store.get(TOKEN_KEY) else {
            return false;
        };
        match self.read_millis(TOKEN_EXPIRY_KEY) {
            Some(expiry) => self.clock.now() <= expiry,
            None => false,
        }
    }

    /// Whether the last login happened within 24 hours.
    /// Independent of the token's own expiry; for UX decisions only.
    pub fn is_recent_login(&self) -> bool {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        match self.read_millis(LAST_LOGIN_KEY) {
            Some(last) => self.clock.now() - last < Duration::hours(RECENT_LOGIN_HOURS),
            None => false,
        }
    }

    /// Whole minutes until expiry, never negative.
    pub fn remaining_minutes(&self) -> i64 {
        match self.expiry() {
            Some(expiry) => (expiry - self.clock.now()).num_minutes().max(0),
            None => 0,
        }
    }

    pub fn is_remembered(&self) -> bool {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        self.store.get(REMEMBER_ME_KEY).as_deref() == Some("true")
    }

    /// `"<type> <token>"` while the token is valid.
    pub fn authorization_header(&self) -> Option<String> {
        let record = self.record()?;
        if self.clock.now() > record.expiry {
            return None;
        }
        Some(format!("{} {}", record.token_type, record.token))
    }

    /// Consistent snapshot of the stored session
    pub fn record(&self) -> Option<TokenRecord> {
        let _guard = self.lock.read().unwrap_or_else(|e| e.into_inner());
        let token = self.store.get(TOKEN_KEY)?;
        let expiry = self.read_millis(TOKEN_EXPIRY_KEY)?;
        Some(TokenRecord {
            token,
            token_type: self
                .store
                .get(TOKEN_TYPE_KEY)
                .unwrap_or_else(|| DEFAULT_TOKEN_TYPE.to_string()),
            expiry,
            remember_me: self.store.get(REMEMBER_ME_KEY).as_deref() == Some("true"),
            last_login_time: self.read_millis(LAST_LOGIN_KEY),
        })
    }

    /// Remove every session key.
    pub fn clear_token(&self) -> Result<()> {
        let _guard = self.lock.write().unwrap_or_else(|e| e.into_inner());
        let mut first_err = None;
        for key in ALL_KEYS {
            if let Err(e) = self.store.remove(key) {
                first_err.get_or_insert(e);
            }
        }
        debug!("Token cleared");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Put back the keys as they were before a failed write. If that fails
    /// too, drop the session entirely rather than leave a mix of both.
    fn restore(&self, previous: &[(&str, Option<String>)]) {
        let restored = previous.iter().try_for_each(|(key, value)| match value {
            Some(value) => self.store.set(key, value),
            None => self.store.remove(key),
        });
        if let Err(e) = restored {
            warn!(error = %e, "Failed to restore previous session, clearing it");
            for key in ALL_KEYS {
                let _ = self.store.remove(key);
            }
        }
    }

    fn read_millis(&self, key: &str) -> Option<DateTime<Utc>> {
        let raw = self.store.get(key)?;
        let millis: i64 = raw.trim().parse().ok()?;
        Utc.timestamp_millis_opt(millis).single()
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("has_valid_token", &self.has_valid_token())
            .finish_non_exhaustive()
    }
}
