//! The record log, in-memory cache, and event emitter (C1, C9).

pub mod events;
pub mod log;

pub use events::{Channel, EventEmitter, GraphEvent, Listener, Subscription};
pub use log::{GraphStore, MutationContext};
