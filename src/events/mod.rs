//! In-process event channel.
//!
//! Producers publish tagged [`Event`]s; subscribers registered for the
//! event's [`EventKind`] are called on the publishing thread.

mod channel;
mod event;

pub use channel::{EventChannel, Subscriber};
pub use event::{Event, EventKind};
