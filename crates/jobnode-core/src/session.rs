//! Node session lifecycle: single-active-node enforcement and abort scoping.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info};

use crate::{CoreError, NodeAddress};

/// Tracks which node addresses have an active session in this process.
///
/// This is an in-memory, single-process guarantee only.
#[derive(Debug, Default)]
pub struct SessionGuard {
    active: Mutex<HashSet<NodeAddress>>,
}

impl SessionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `address` active, failing if it already is.
    pub fn mark_active(&self, address: &NodeAddress) -> Result<(), CoreError> {
        if !self.active.lock().insert(address.clone()) {
            return Err(CoreError::NodeAlreadyActive(address.clone()));
        }
        info!(address = %address, "node session active");
        Ok(())
    }

    /// Clear the active flag. Idempotent.
    pub fn mark_inactive(&self, address: &NodeAddress) {
        if self.active.lock().remove(address) {
            info!(address = %address, "node session inactive");
        }
    }

    pub fn is_active(&self, address: &NodeAddress) -> bool {
        self.active.lock().contains(address)
    }

    /// Start a session for `address`. The session ends when the returned
    /// handle is ended or dropped.
    pub fn begin(self: &Arc<Self>, address: NodeAddress) -> Result<ActiveSession, CoreError> {
        self.mark_active(&address)?;
        Ok(ActiveSession {
            guard: self.clone(),
            address,
            ended: AtomicBool::new(false),
        })
    }
}

/// Handle for a running session. Ending it frees the address.
#[derive(Debug)]
pub struct ActiveSession {
    guard: Arc<SessionGuard>,
    address: NodeAddress,
    ended: AtomicBool,
}

impl ActiveSession {
    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    /// Mark the address inactive. Calling this more than once is a no-op.
    pub fn end(&self) {
        if !self.ended.swap(true, Ordering::SeqCst) {
            self.guard.mark_inactive(&self.address);
        }
    }
}

impl Drop for ActiveSession {
    fn drop(&mut self) {
        self.end();
    }
}

/// Cooperative cancellation handle held by cancellable operations.
///
/// Clones share the same underlying token. Two tokens compare equal only if
/// they are the same generation of the same scope.
#[derive(Debug, Clone)]
pub struct AbortToken {
    generation: u64,
    scope: u64,
    token: CancellationToken,
}

impl AbortToken {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Signal every holder of this token to wind down.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once this token is cancelled.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

impl PartialEq for AbortToken {
    fn eq(&self, other: &Self) -> bool {
        self.scope == other.scope && self.generation == other.generation
    }
}

impl Eq for AbortToken {}

static NEXT_SCOPE: AtomicU64 = AtomicU64::new(0);

/// Owns the rotating "current" abort token of a node.
///
/// [`rotate`](Self::rotate) forgets the current token without cancelling it.
/// Operations that captured it keep running against it; only the next
/// [`current`](Self::current) call sees a fresh token. Callers that need a
/// stable token must capture it once and hold on to it.
#[derive(Debug)]
pub struct AbortScope {
    id: u64,
    current: Mutex<Option<AbortToken>>,
    generations: AtomicU64,
}

impl AbortScope {
    pub fn new() -> Self {
        Self {
            id: NEXT_SCOPE.fetch_add(1, Ordering::Relaxed),
            current: Mutex::new(None),
            generations: AtomicU64::new(0),
        }
    }

    /// The current token, created on first access after construction or rotation.
    pub fn current(&self) -> AbortToken {
        let mut current = self.current.lock();
        current
            .get_or_insert_with(|| {
                let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                debug!(generation, "abort token created");
                AbortToken {
                    generation,
                    scope: self.id,
                    token: CancellationToken::new(),
                }
            })
            .clone()
    }

    /// Forget the current token without cancelling it.
    pub fn rotate(&self) {
        if let Some(previous) = self.current.lock().take() {
            debug!(generation = previous.generation, "abort token rotated");
        }
    }

    /// Cancel the current token if one exists. Returns whether a token was cancelled.
    ///
    /// Tokens already rotated away are not affected.
    pub fn cancel_current(&self) -> bool {
        match self.current.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

impl Default for AbortScope {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn addr(a: &str) -> NodeAddress {
        NodeAddress::new(a)
    }

    #[test]
    fn test_mark_active_twice_fails() {
        let guard = SessionGuard::new();
        guard.mark_active(&addr("A")).unwrap();
        let err = guard.mark_active(&addr("A")).unwrap_err();
        assert!(matches!(err, CoreError::NodeAlreadyActive(ref a) if a.as_str() == "A"));
    }

    #[test]
    fn test_mark_inactive_allows_restart() {
        let guard = SessionGuard::new();
        guard.mark_active(&addr("A")).unwrap();
        guard.mark_inactive(&addr("A"));
        guard.mark_active(&addr("A")).unwrap();
        assert!(guard.is_active(&addr("A")));
    }

    #[test]
    fn test_mark_inactive_is_idempotent() {
        let guard = SessionGuard::new();
        guard.mark_inactive(&addr("A"));
        guard.mark_active(&addr("A")).unwrap();
        guard.mark_inactive(&addr("A"));
        guard.mark_inactive(&addr("A"));
        assert!(!guard.is_active(&addr("A")));
    }

    #[test]
    fn test_addresses_are_independent() {
        let guard = SessionGuard::new();
        guard.mark_active(&addr("A")).unwrap();
        guard.mark_active(&addr("B")).unwrap();
        assert!(guard.mark_active(&addr("B")).is_err());
    }

    #[test]
    fn test_begin_and_drop_session() {
        let guard = Arc::new(SessionGuard::new());
        {
            let session = guard.begin(addr("A")).unwrap();
            assert_eq!(session.address().as_str(), "A");
            assert!(guard.begin(addr("A")).is_err());
        }
        assert!(!guard.is_active(&addr("A")));

        let session = guard.begin(addr("A")).unwrap();
        session.end();
        session.end();
        assert!(!guard.is_active(&addr("A")));
        let _again = guard.begin(addr("A")).unwrap();
        drop(session);
        assert!(guard.is_active(&addr("A")));
    }

    #[test]
    fn test_current_is_stable_until_rotate() {
        let scope = AbortScope::new();
        let first = scope.current();
        assert_eq!(first, scope.current());

        scope.rotate();
        let second = scope.current();
        assert_ne!(first, second);
        assert_eq!(second, scope.current());
    }

    #[test]
    fn test_rotate_does_not_cancel() {
        let scope = AbortScope::new();
        let captured = scope.current();
        scope.rotate();
        assert!(!captured.is_cancelled());

        let fresh = scope.current();
        fresh.cancel();
        assert!(fresh.is_cancelled());
        assert!(!captured.is_cancelled());
    }

    #[test]
    fn test_cancel_current_skips_rotated_tokens() {
        let scope = AbortScope::new();
        assert!(!scope.cancel_current());

        let old = scope.current();
        scope.rotate();
        let new = scope.current();
        assert!(scope.cancel_current());
        assert!(new.is_cancelled());
        assert!(!old.is_cancelled());
    }

    #[test]
    fn test_tokens_from_different_scopes_differ() {
        let a = AbortScope::new();
        let b = AbortScope::new();
        assert_ne!(a.current(), b.current());
    }

    #[tokio::test]
    async fn test_cancelled_wakes_holder() {
        let scope = AbortScope::new();
        let token = scope.current();
        let waiter = token.clone();
        let handle = tokio::spawn(async move {
            waiter.cancelled().await;
            true
        });

        scope.cancel_current();
        let woke = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("holder woke")
            .unwrap();
        assert!(woke);
    }
}
