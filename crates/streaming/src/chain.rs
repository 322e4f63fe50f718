use crate::candidate::{Candidate, CandidateList};
use crate::error::FetchError;

/// One candidate that did not produce an asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Miss {
    pub location: String,
    pub error: FetchError,
}

/// Cursor over a [`CandidateList`] that remembers every miss.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    candidates: CandidateList,
    cursor: usize,
    misses: Vec<Miss>,
}

impl FallbackChain {
    pub fn new(candidates: CandidateList) -> Self {
        Self {
            candidates,
            cursor: 0,
            misses: Vec::new(),
        }
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    pub fn current(&self) -> &Candidate {
        self.candidates
            .get(self.cursor)
            .unwrap_or_else(|| self.candidates.placeholder())
    }

    /// 1-based attempt number of the current candidate.
    pub fn attempt(&self) -> usize {
        self.cursor + 1
    }

    /// Records a miss for the current candidate and moves to the next one.
    ///
    /// Returns `None` when the current candidate was already the last.
    pub fn advance(&mut self, error: FetchError) -> Option<&Candidate> {
        self.misses.push(Miss {
            location: self.current().location(),
            error,
        });
        if self.cursor + 1 >= self.candidates.len() {
            return None;
        }
        self.cursor += 1;
        Some(self.current())
    }

    pub fn misses(&self) -> &[Miss] {
        &self.misses
    }

    pub fn attempted(&self) -> Vec<String> {
        self.misses.iter().map(|m| m.location.clone()).collect()
    }

    /// True once every remote candidate has missed.
    pub fn remotes_exhausted(&self) -> bool {
        self.current().is_bundled() && self.misses.len() >= self.candidates.remote_count()
    }

    /// The error to report once the chain has fallen through to its placeholder.
    pub fn exhausted_error(&self) -> FetchError {
        FetchError::Exhausted {
            attempted: self.attempted(),
        }
    }
}
