//! Per-document statistics for a single term.

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// Occurrence statistics of one term in one document.
///
/// Identity is the `(term, document)` pair; the counts are ignored by
/// equality and hashing.
#[derive(Debug, Clone)]
pub struct DocTerm {
    term: String,
    document: PathBuf,
    occurrences: u64,
    word_count: u64,
}

impl DocTerm {
    /// Create a statistic for `term` in `document`.
    pub fn new(
        term: impl Into<String>,
        document: impl AsRef<Path>,
        occurrences: u64,
        word_count: u64,
    ) -> Self {
        Self {
            term: term.into(),
            document: document.as_ref().to_path_buf(),
            occurrences,
            word_count,
        }
    }

    #[must_use]
    pub fn term(&self) -> &str {
        &self.term
    }

    #[must_use]
    pub fn document(&self) -> &Path {
        &self.document
    }

    #[must_use]
    pub const fn occurrences(&self) -> u64 {
        self.occurrences
    }

    #[must_use]
    pub const fn word_count(&self) -> u64 {
        self.word_count
    }

    /// Term frequency: occurrences over the document's word count.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn tf(&self) -> f64 {
        if self.word_count == 0 {
            return 0.0;
        }
        self.occurrences as f64 / self.word_count as f64
    }
}

impl PartialEq for DocTerm {
    fn eq(&self, other: &Self) -> bool {
        self.term == other.term && self.document == other.document
    }
}

impl Eq for DocTerm {}

impl Hash for DocTerm {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.term.hash(state);
        self.document.hash(state);
    }
}
