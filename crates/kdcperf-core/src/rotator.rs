//! Round-robin credential rotation

use crate::credential::CredentialSource;
use crate::error::{BenchError, Result};

/// Wrap-around cursor over a fixed, non-empty set of credential sources
///
/// Only the dispatch loop reads the rotator, so advancing takes `&mut self`
/// and needs no synchronization.
#[derive(Debug, Clone)]
pub struct CredentialRotator {
    sources: Vec<CredentialSource>,
    cursor: usize,
}

impl CredentialRotator {
    /// Build a rotator; fails if `sources` is empty
    pub fn new(sources: Vec<CredentialSource>) -> Result<Self> {
        if sources.is_empty() {
            return Err(BenchError::EmptyCredentialList);
        }
        Ok(Self { sources, cursor: 0 })
    }

    /// Rotator over exactly one source
    pub fn single(source: CredentialSource) -> Self {
        Self {
            sources: vec![source],
            cursor: 0,
        }
    }

    /// Return the next source and advance the cursor
    pub fn next_source(&mut self) -> &CredentialSource {
        let source = &self.sources[self.cursor];
        self.cursor = (self.cursor + 1) % self.sources.len();
        source
    }

    /// Number of distinct sources in rotation
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        false
    }
}
