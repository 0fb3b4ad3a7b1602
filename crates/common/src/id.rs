//! ID generation utilities.

use std::sync::{Arc, Mutex, PoisonError};

use ulid::{Generator, Ulid};

/// ID generator for entities.
///
/// Clones share one monotonic generator, so ids from the same generator sort
/// in the order they were generated, even within a single millisecond.
#[derive(Clone, Default)]
pub struct IdGenerator {
    inner: Arc<Mutex<Generator>>,
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}

impl IdGenerator {
    /// Create a new ID generator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a new ULID-based ID.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut generator = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        // Overflow of the random part within one millisecond; start a fresh id.
        let ulid = generator.generate().unwrap_or_else(|_| Ulid::new());
        ulid.to_string().to_lowercase()
    }
}
