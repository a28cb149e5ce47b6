//! Options for a compaction run.

use crate::{PackError, Result};
use std::time::Duration;

/// Upper bound for any lock wait.
pub const MAX_LOCK_TIMEOUT: Duration = Duration::from_secs(60);

/// What a compaction run packs and whether it prunes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackOptions {
    /// Pack every ref, not only tags and already-packed refs.
    pub all: bool,
    /// Remove loose refs once they are captured in the snapshot.
    pub prune: bool,
    /// How long to wait for the `packed-refs.lock` file.
    pub commit_lock_timeout: Duration,
    /// How long to wait for each loose ref's lock while pruning.
    pub ref_lock_timeout: Duration,
}

impl Default for PackOptions {
    fn default() -> Self {
        Self {
            all: false,
            prune: true,
            commit_lock_timeout: Duration::ZERO,
            ref_lock_timeout: Duration::ZERO,
        }
    }
}

impl PackOptions {
    /// Creates the default options: tags only, with pruning.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether every ref is packed.
    pub fn with_all(mut self, all: bool) -> Self {
        self.all = all;
        self
    }

    /// Sets whether loose refs are pruned.
    pub fn with_prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Sets the wait for the snapshot lock.
    pub fn with_commit_lock_timeout(mut self, timeout: Duration) -> Self {
        self.commit_lock_timeout = timeout;
        self
    }

    /// Sets the wait for each loose ref lock.
    pub fn with_ref_lock_timeout(mut self, timeout: Duration) -> Self {
        self.ref_lock_timeout = timeout;
        self
    }

    /// Rejects option values that would make the run wait unboundedly.
    pub fn validate(&self) -> Result<()> {
        for (what, timeout) in [
            ("commit lock timeout", self.commit_lock_timeout),
            ("ref lock timeout", self.ref_lock_timeout),
        ] {
            if timeout > MAX_LOCK_TIMEOUT {
                return Err(PackError::InvalidOptions(format!(
                    "{what} of {}ms exceeds the maximum of {}ms",
                    timeout.as_millis(),
                    MAX_LOCK_TIMEOUT.as_millis()
                )));
            }
        }
        Ok(())
    }
}
