//! Bearer-token cache with single-flight refresh.
//!
//! State machine: `Absent` and `Expired` both require a login, `Valid` allows
//! reuse. Refresh is serialised behind an async mutex with a second state check
//! once the lock is held, so concurrent callers that all saw a stale token share
//! one login instead of racing.

use crate::{Error, Result};
use std::future::Future;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Absent,
    Valid,
    Expired,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

#[derive(Debug)]
pub struct TokenCache {
    slot: RwLock<Option<CachedToken>>,
    refresh: tokio::sync::Mutex<()>,
    lifetime: Duration,
}

impl TokenCache {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            slot: RwLock::new(None),
            refresh: tokio::sync::Mutex::new(()),
            lifetime,
        }
    }

    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    pub fn state(&self) -> TokenState {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        match slot.as_ref() {
            None => TokenState::Absent,
            Some(cached) if Instant::now() < cached.expires_at => TokenState::Valid,
            Some(_) => TokenState::Expired,
        }
    }

    /// The cached token, if still valid.
    pub fn current(&self) -> Option<String> {
        let slot = self.slot.read().unwrap_or_else(|e| e.into_inner());
        slot.as_ref()
            .filter(|cached| Instant::now() < cached.expires_at)
            .map(|cached| cached.token.clone())
    }

    /// Cache `token` with expiry `now + lifetime`.
    pub fn store(&self, token: impl Into<String>) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(CachedToken {
            token: token.into(),
            expires_at: Instant::now() + self.lifetime,
        });
    }

    pub fn invalidate(&self) {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        *slot = None;
    }

    /// Clear the cache only if it still holds `token`.
    ///
    /// A token refreshed by a concurrent caller survives a late rejection of
    /// the previous one. Returns whether anything was cleared.
    pub fn invalidate_token(&self, token: &str) -> bool {
        let mut slot = self.slot.write().unwrap_or_else(|e| e.into_inner());
        if slot.as_ref().map_or(false, |cached| cached.token == token) {
            *slot = None;
            true
        } else {
            false
        }
    }

    /// Return the cached token or run `login` to obtain and cache a new one.
    ///
    /// At most one login runs at a time per cache. The login future runs on its
    /// own task and stores its token even if this caller stops waiting; a panic
    /// inside it surfaces as [`Error::Opaque`].
    pub async fn get_or_refresh<F, Fut>(self: &Arc<Self>, login: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        if let Some(token) = self.current() {
            return Ok(token);
        }

        let _guard = self.refresh.lock().await;
        if let Some(token) = self.current() {
            return Ok(token);
        }

        let cache = Arc::clone(self);
        let pending = login();
        let handle = tokio::spawn(async move {
            let token = pending.await?;
            cache.store(token.clone());
            Ok::<_, Error>(token)
        });

        match handle.await {
            Ok(result) => result,
            Err(join) if join.is_panic() => Err(Error::from_panic(join.into_panic())),
            Err(_) => Err(Error::Cancelled),
        }
    }
}
