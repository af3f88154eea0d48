//! In-memory term index.
//!
//! This module provides:
//! - The document set with per-document indexing status
//! - Per-term, per-document occurrence statistics
//! - TF-IDF scoring over a fixed vocabulary

mod doc_term;
mod manager;

pub use doc_term::DocTerm;
pub use manager::{DocStatus, IndexConfig, IndexManager, RefreshHandle, RefreshSummary};
