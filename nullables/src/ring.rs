//! Nullable ring — scripted replica sets instead of a real overlay.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use ringchain_network::{NetworkError, Ring, Vnode};

#[derive(Default)]
struct State {
    default_replicas: Vec<Vnode>,
    scripted: HashMap<Vec<u8>, Vec<Vnode>>,
    lookups: Vec<(usize, Vec<u8>)>,
    failing: bool,
}

/// A ring whose lookups return whatever the test configured.
///
/// `lookup(n, key)` answers the replicas scripted for `key`, else the
/// default replicas, truncated to `n`. Every call is recorded.
pub struct NullRing {
    hostname: String,
    state: Mutex<State>,
}

impl NullRing {
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            state: Mutex::new(State::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Answer every unscripted key with `replicas`.
    pub fn with_replicas(self, replicas: Vec<Vnode>) -> Self {
        self.state().default_replicas = replicas;
        self
    }

    /// Answer lookups of exactly `key` with `replicas`.
    pub fn script(&self, key: &[u8], replicas: Vec<Vnode>) {
        self.state().scripted.insert(key.to_vec(), replicas);
    }

    /// Make every following lookup fail.
    pub fn fail_lookups(&self) {
        self.state().failing = true;
    }

    /// All `(n, key)` lookups made so far.
    pub fn lookups(&self) -> Vec<(usize, Vec<u8>)> {
        self.state().lookups.clone()
    }
}

impl Ring for NullRing {
    fn lookup(&self, n: usize, key: &[u8]) -> Result<Vec<Vnode>, NetworkError> {
        let mut state = self.state();
        state.lookups.push((n, key.to_vec()));
        if state.failing {
            return Err(NetworkError::Ring("null ring set to fail".into()));
        }
        let replicas = state
            .scripted
            .get(key)
            .unwrap_or(&state.default_replicas);
        Ok(replicas.iter().take(n).cloned().collect())
    }

    fn hostname(&self) -> &str {
        &self.hostname
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_keys_override_the_default() {
        let ring = NullRing::new("me:1").with_replicas(vec![Vnode::new("a:1", [1; 32])]);
        ring.script(b"k", vec![Vnode::new("b:1", [2; 32]), Vnode::new("c:1", [3; 32])]);

        assert_eq!(ring.lookup(3, b"other").unwrap()[0].host, "a:1");
        let found = ring.lookup(1, b"k").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].host, "b:1");
        assert_eq!(ring.lookups(), vec![(3, b"other".to_vec()), (1, b"k".to_vec())]);
    }

    #[test]
    fn failing_ring_errors() {
        let ring = NullRing::new("me:1");
        ring.fail_lookups();
        assert!(ring.lookup(1, b"k").is_err());
        assert_eq!(ring.hostname(), "me:1");
    }
}
