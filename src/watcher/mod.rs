//! File system watching.
//!
//! This module provides:
//! - Directory watching using notify-rs
//! - Batching of creation notifications into discovery events

mod directory;

pub use directory::{DirectoryWatcher, WatcherConfig};
