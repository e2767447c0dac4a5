//! Observable finite-state register.
//!
//! A register holds exactly one current [`PhaseRecord`] and a persistent
//! "shared data" projection of selected payload fields. The projection is
//! restricted to an allow-list fixed at construction, so a reader can ask
//! for e.g. the running job without knowing which phase last supplied it.
//!
//! Subscribers are invoked synchronously inside [`StateRegister::transition`],
//! in registration order. Transitions are serialized, so every subscriber
//! observes the same global phase order with nothing dropped or coalesced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::phase::Phase;

/// Free-form payload attached to a phase.
pub type Payload = serde_json::Map<String, Value>;

/// Turn a JSON value into a payload. Non-object values yield an empty payload.
pub fn payload(value: Value) -> Payload {
    match value {
        Value::Object(map) => map,
        _ => Payload::new(),
    }
}

/// The current phase of a register together with its payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseRecord<P> {
    pub phase: P,
    pub payload: Payload,
    pub timestamp: DateTime<Utc>,
}

/// Allow-list of payload keys promoted into shared data.
#[derive(Debug, Clone, Copy)]
pub struct SharedKeys(&'static [&'static str]);

impl SharedKeys {
    pub const fn new(keys: &'static [&'static str]) -> Self {
        Self(keys)
    }

    /// An empty allow-list; shared data stays empty forever.
    pub const fn none() -> Self {
        Self(&[])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|k| *k == key)
    }

    pub fn keys(&self) -> &'static [&'static str] {
        self.0
    }
}

/// Handle returned by [`StateRegister::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber<P> = Arc<dyn Fn(&PhaseRecord<P>) + Send + Sync>;

/// Generic observable store of "current phase + payload".
///
/// Callbacks may read the register and may subscribe or unsubscribe, but
/// must not call [`transition`](Self::transition) on the same register.
pub struct StateRegister<P: Phase> {
    shared_keys: SharedKeys,
    current: RwLock<PhaseRecord<P>>,
    shared: RwLock<Payload>,
    subscribers: RwLock<Vec<(SubscriptionId, Subscriber<P>)>>,
    next_subscription: AtomicU64,
    transition_lock: Mutex<()>,
}

impl<P: Phase> StateRegister<P> {
    /// Create a register in `initial` with an empty payload.
    pub fn new(initial: P, shared_keys: SharedKeys) -> Self {
        Self {
            shared_keys,
            current: RwLock::new(PhaseRecord {
                phase: initial,
                payload: Payload::new(),
                timestamp: Utc::now(),
            }),
            shared: RwLock::new(Payload::new()),
            subscribers: RwLock::new(Vec::new()),
            next_subscription: AtomicU64::new(0),
            transition_lock: Mutex::new(()),
        }
    }

    /// Move to `phase`, promote allow-listed payload keys and notify subscribers.
    pub fn transition(&self, phase: P, payload: Payload) {
        let _ordered = self.transition_lock.lock();

        let record = PhaseRecord {
            phase,
            payload,
            timestamp: Utc::now(),
        };
        *self.current.write() = record.clone();

        {
            let mut shared = self.shared.write();
            for (key, value) in &record.payload {
                if self.shared_keys.contains(key) {
                    shared.insert(key.clone(), value.clone());
                }
            }
        }

        debug!(phase = phase.as_str(), "state transition");

        // Snapshot so callbacks can (un)subscribe without deadlocking.
        let subscribers: Vec<Subscriber<P>> = self
            .subscribers
            .read()
            .iter()
            .map(|(_, subscriber)| subscriber.clone())
            .collect();
        for subscriber in subscribers {
            subscriber(&record);
        }
    }

    /// Copy of the current phase record.
    pub fn current(&self) -> PhaseRecord<P> {
        self.current.read().clone()
    }

    pub fn phase(&self) -> P {
        self.current.read().phase
    }

    /// Last value promoted for `key`, if `key` is allow-listed and was ever set.
    pub fn shared(&self, key: &str) -> Option<Value> {
        if !self.shared_keys.contains(key) {
            return None;
        }
        self.shared.read().get(key).cloned()
    }

    /// Shared values for several keys; unknown or unset keys are left out.
    pub fn shared_many(&self, keys: &[&str]) -> Payload {
        keys.iter()
            .filter_map(|key| self.shared(key).map(|value| ((*key).to_string(), value)))
            .collect()
    }

    /// Every shared value set so far.
    pub fn shared_snapshot(&self) -> Payload {
        self.shared.read().clone()
    }

    pub fn shared_keys(&self) -> SharedKeys {
        self.shared_keys
    }

    /// Register a callback invoked on every subsequent transition.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&PhaseRecord<P>) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_subscription.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(callback)));
        id
    }

    /// Remove a callback. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
