//! termrank
//!
//! Watches directories of text documents and periodically reports the
//! documents that rank highest by average TF-IDF over a fixed set of terms.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod events;
pub mod index;
pub mod ranking;
pub mod reader;
pub mod server;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
