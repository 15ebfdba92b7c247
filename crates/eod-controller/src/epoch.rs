//! Staleness tokens for in-flight fetches.
//!
//! Each scope has a counter. Advancing a scope advances it and every scope
//! below it, so a fetch only has to compare the counter of its own scope:
//! any upstream change has bumped it too.

/// Invalidation scope, ordered from the top of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Scope {
    /// Engine list (initialize / refresh).
    Root = 0,
    /// Market list of the selected engine.
    Engine = 1,
    /// Security list of the selected market.
    Market = 2,
    /// Description and boards of the selected security.
    Security = 3,
    /// History of the current selection chain.
    History = 4,
}

const SCOPES: usize = 5;

/// Captured epoch of a scope at dispatch time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchToken {
    scope: Scope,
    epoch: u64,
}

impl FetchToken {
    pub fn scope(&self) -> Scope {
        self.scope
    }
}

#[derive(Debug, Default)]
pub struct Epochs {
    counters: [u64; SCOPES],
}

impl Epochs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Invalidate `scope` and everything below it, returning a fresh token.
    pub fn advance(&mut self, scope: Scope) -> FetchToken {
        for counter in &mut self.counters[scope as usize..] {
            *counter = counter.wrapping_add(1);
        }
        self.token(scope)
    }

    pub fn token(&self, scope: Scope) -> FetchToken {
        FetchToken {
            scope,
            epoch: self.counters[scope as usize],
        }
    }

    #[inline]
    pub fn is_current(&self, token: FetchToken) -> bool {
        self.counters[token.scope as usize] == token.epoch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_invalidates_own_scope() {
        let mut epochs = Epochs::new();
        let first = epochs.advance(Scope::Engine);
        assert!(epochs.is_current(first));

        let second = epochs.advance(Scope::Engine);
        assert!(!epochs.is_current(first));
        assert!(epochs.is_current(second));
    }

    #[test]
    fn test_advance_cascades_downwards_only() {
        let mut epochs = Epochs::new();
        let engines = epochs.advance(Scope::Root);
        let securities = epochs.advance(Scope::Market);
        let history = epochs.advance(Scope::History);

        epochs.advance(Scope::Engine);

        assert!(epochs.is_current(engines));
        assert!(!epochs.is_current(securities));
        assert!(!epochs.is_current(history));
    }

    #[test]
    fn test_history_scope_leaves_upper_scopes() {
        let mut epochs = Epochs::new();
        let definition = epochs.advance(Scope::Security);
        epochs.advance(Scope::History);
        assert!(epochs.is_current(definition));
        assert_eq!(definition.scope(), Scope::Security);
    }
}
