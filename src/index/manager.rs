//! Document set and term index with TF-IDF scoring.
//!
//! The index keeps two concurrent maps:
//! - documents: path -> indexing status (plus discovery order)
//! - terms: term -> (path -> `DocTerm`), holding only documents in which
//!   the term occurs at least once
//!
//! Both are sharded `DashMap`s, so writers from indexing tasks, the watcher
//! listener and report readers only contend on the shard they touch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use walkdir::WalkDir;

use super::doc_term::DocTerm;
use crate::config::DEFAULT_SEPARATOR;
use crate::reader::TokenizingReader;
use crate::{Error, Result};

/// Indexing status of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocStatus {
    /// Discovered, statistics not computed yet.
    Pending,
    /// An indexing task owns the document.
    Indexing,
    /// Statistics computed and stored.
    Indexed,
    /// The document could not be read.
    Failed,
}

/// Index manager configuration.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Token separator handed to the reader.
    pub separator: String,
    /// Re-attempt failed documents on later refreshes.
    pub retry_failed: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            retry_failed: false,
        }
    }
}

/// Result of one refresh batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    /// Documents whose statistics were stored.
    pub indexed: usize,
    /// Documents that could not be read.
    pub failed: usize,
}

impl RefreshSummary {
    /// Total documents processed by the batch.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.indexed + self.failed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexOutcome {
    Indexed,
    Failed,
}

/// Tasks started by a single `refresh()` call.
///
/// Dropping the handle detaches the tasks; they still run to completion.
#[derive(Debug)]
pub struct RefreshHandle {
    handles: Vec<JoinHandle<IndexOutcome>>,
}

impl RefreshHandle {
    /// Number of documents the refresh started indexing.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Whether the refresh found nothing to index.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Wait for every task of this batch to finish.
    pub async fn wait(self) -> RefreshSummary {
        let mut summary = RefreshSummary::default();

        for result in futures::future::join_all(self.handles).await {
            match result {
                Ok(IndexOutcome::Indexed) => summary.indexed += 1,
                Ok(IndexOutcome::Failed) => summary.failed += 1,
                Err(e) => {
                    tracing::error!(error = %e, "Indexing task did not complete");
                    summary.failed += 1;
                }
            }
        }

        summary
    }
}

#[derive(Debug, Clone, Copy)]
struct DocEntry {
    seq: u64,
    status: DocStatus,
}

struct Inner {
    documents: DashMap<PathBuf, DocEntry>,
    terms: DashMap<String, HashMap<PathBuf, DocTerm>>,
    vocabulary: RwLock<Arc<Vec<String>>>,
    next_seq: AtomicU64,
    reader: TokenizingReader,
    retry_failed: bool,
}

impl Inner {
    fn index_document(&self, path: &Path, vocabulary: &[String]) -> IndexOutcome {
        tracing::debug!(path = %path.display(), "Building term index for document");

        match self.reader.read_terms(path, vocabulary) {
            Ok(stats) => {
                if !self.documents.contains_key(path) {
                    tracing::debug!(path = %path.display(), "Document removed while indexing");
                    return IndexOutcome::Indexed;
                }

                for stat in stats.into_iter().filter(|s| s.occurrences() > 0) {
                    self.terms
                        .entry(stat.term().to_string())
                        .or_default()
                        .insert(path.to_path_buf(), stat);
                }
                self.set_status(path, DocStatus::Indexed);
                IndexOutcome::Indexed
            }
            Err(e) => {
                tracing::error!(path = %e.path().display(), error = %e, "Failed to index document");
                self.set_status(path, DocStatus::Failed);
                IndexOutcome::Failed
            }
        }
    }

    fn set_status(&self, path: &Path, status: DocStatus) {
        if let Some(mut entry) = self.documents.get_mut(path) {
            entry.status = status;
        }
    }

    /// Move every eligible document to `Indexing` and return their paths.
    fn claim_pending(&self) -> Vec<PathBuf> {
        let mut claimed = Vec::new();
        for mut entry in self.documents.iter_mut() {
            let eligible = match entry.status {
                DocStatus::Pending => true,
                DocStatus::Failed => self.retry_failed,
                DocStatus::Indexing | DocStatus::Indexed => false,
            };
            if eligible {
                entry.status = DocStatus::Indexing;
                claimed.push(entry.key().clone());
            }
        }
        claimed
    }
}

/// Shared handle to the document set and term index.
#[derive(Clone)]
pub struct IndexManager {
    inner: Arc<Inner>,
}

impl Default for IndexManager {
    fn default() -> Self {
        Self::new(IndexConfig::default())
    }
}

impl std::fmt::Debug for IndexManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IndexManager")
            .field("documents", &self.inner.documents.len())
            .field("terms", &self.inner.terms.len())
            .field("separator", &self.inner.reader.separator())
            .finish_non_exhaustive()
    }
}

impl IndexManager {
    /// Create an empty index.
    #[must_use]
    pub fn new(config: IndexConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                documents: DashMap::new(),
                terms: DashMap::new(),
                vocabulary: RwLock::new(Arc::new(Vec::new())),
                next_seq: AtomicU64::new(0),
                reader: TokenizingReader::new(config.separator),
                retry_failed: config.retry_failed,
            }),
        }
    }

    /// Set the terms documents are scored against.
    ///
    /// Repeated terms are kept once, in first-seen order.
    pub fn set_vocabulary<I, S>(&self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut vocabulary: Vec<String> = Vec::new();
        for term in terms {
            let term = term.into();
            if !vocabulary.contains(&term) {
                vocabulary.push(term);
            }
        }
        tracing::debug!(terms = ?vocabulary, "Vocabulary set");
        *self.inner.vocabulary.write() = Arc::new(vocabulary);
    }

    /// Current vocabulary.
    #[must_use]
    pub fn vocabulary(&self) -> Vec<String> {
        self.inner.vocabulary.read().as_ref().clone()
    }

    /// Add a document as not yet indexed.
    ///
    /// Returns `false` if the document was already known.
    pub fn add_document(&self, path: impl Into<PathBuf>) -> bool {
        match self.inner.documents.entry(path.into()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                tracing::debug!(path = %vacant.key().display(), "Adding document");
                let seq = self.inner.next_seq.fetch_add(1, Ordering::Relaxed);
                vacant.insert(DocEntry {
                    seq,
                    status: DocStatus::Pending,
                });
                true
            }
        }
    }

    /// Add every regular file currently in `directory`.
    ///
    /// Not recursive. Returns the number of documents added.
    pub fn load_from(&self, directory: &Path) -> usize {
        if !directory.is_dir() {
            tracing::warn!(path = %directory.display(), "Not a directory, nothing loaded");
            return 0;
        }

        let mut added = 0;
        let walker = WalkDir::new(directory)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name();

        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.path().is_file() && self.add_document(entry.into_path()) {
                        added += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!(path = %directory.display(), error = %e, "Error listing directory");
                }
            }
        }

        tracing::info!(path = %directory.display(), documents = added, "Loaded documents");
        added
    }

    /// Start indexing every pending document.
    ///
    /// Each document is read on its own blocking task. Documents already
    /// indexed or in flight are skipped; failed ones only when retries are
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns an error if called outside a Tokio runtime.
    pub fn refresh(&self) -> Result<RefreshHandle> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::internal(format!("refresh requires a Tokio runtime: {e}")))?;

        let claimed = self.inner.claim_pending();
        tracing::debug!(documents = claimed.len(), "Refreshing index");

        let vocabulary = Arc::clone(&self.inner.vocabulary.read());
        let handles = claimed
            .into_iter()
            .map(|path| {
                let inner = Arc::clone(&self.inner);
                let vocabulary = Arc::clone(&vocabulary);
                runtime.spawn_blocking(move || inner.index_document(&path, &vocabulary))
            })
            .collect();

        Ok(RefreshHandle { handles })
    }

    /// TF-IDF of `term` in `doc`.
    ///
    /// Zero when the term is in no document, the document set is empty, or
    /// the term occurs in every document.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn term_tf_idf(&self, term: &str, doc: &Path) -> f64 {
        let total = self.inner.documents.len();
        if total == 0 {
            return 0.0;
        }

        let Some(postings) = self.inner.terms.get(term) else {
            return 0.0;
        };

        let doc_freq = postings.len();
        if doc_freq == 0 || doc_freq >= total {
            return 0.0;
        }

        let idf = (total as f64 / doc_freq as f64).log10();
        postings.get(doc).map_or(0.0, |stat| stat.tf() * idf)
    }

    /// Mean TF-IDF of `doc` over the whole vocabulary.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_tf_idf(&self, doc: &Path) -> f64 {
        let vocabulary = Arc::clone(&self.inner.vocabulary.read());
        if vocabulary.is_empty() {
            return 0.0;
        }

        let sum: f64 = vocabulary
            .iter()
            .map(|term| self.term_tf_idf(term, doc))
            .sum();
        sum / vocabulary.len() as f64
    }

    /// Number of known documents, indexed or not.
    #[must_use]
    pub fn size(&self) -> usize {
        self.inner.documents.len()
    }

    /// Status of a document, if known.
    #[must_use]
    pub fn status(&self, doc: &Path) -> Option<DocStatus> {
        self.inner.documents.get(doc).map(|entry| entry.status)
    }

    /// Whether the document's statistics are complete.
    #[must_use]
    pub fn is_indexed(&self, doc: &Path) -> bool {
        self.status(doc) == Some(DocStatus::Indexed)
    }

    /// All known documents in discovery order.
    #[must_use]
    pub fn documents(&self) -> Vec<PathBuf> {
        let mut docs: Vec<(u64, PathBuf)> = self
            .inner
            .documents
            .iter()
            .map(|entry| (entry.seq, entry.key().clone()))
            .collect();
        docs.sort_unstable_by_key(|(seq, _)| *seq);
        docs.into_iter().map(|(_, path)| path).collect()
    }

    /// Statistics stored for `term`, sorted by document path.
    #[must_use]
    pub fn document_stats(&self, term: &str) -> Vec<DocTerm> {
        let mut stats: Vec<DocTerm> = self
            .inner
            .terms
            .get(term)
            .map(|postings| postings.values().cloned().collect())
            .unwrap_or_default();
        stats.sort_by(|a, b| a.document().cmp(b.document()));
        stats
    }

    /// Number of terms with at least one stored statistic.
    #[must_use]
    pub fn term_count(&self) -> usize {
        self.inner.terms.len()
    }

    /// Drop every document and statistic.
    pub fn clear(&self) {
        self.inner.documents.clear();
        self.inner.terms.clear();
        tracing::debug!("Index cleared");
    }

    /// Store statistics for an already known document without reading it.
    ///
    /// Used by benchmarks and tests to build an index in memory.
    #[doc(hidden)]
    pub fn insert_stats(&self, doc: &Path, stats: impl IntoIterator<Item = DocTerm>) {
        self.add_document(doc);
        for stat in stats.into_iter().filter(|s| s.occurrences() > 0) {
            self.inner
                .terms
                .entry(stat.term().to_string())
                .or_default()
                .insert(doc.to_path_buf(), stat);
        }
        self.inner.set_status(doc, DocStatus::Indexed);
    }
}
