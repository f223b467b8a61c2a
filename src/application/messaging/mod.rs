//! Event handling - Ordered delivery of host events to plugins

pub mod dispatcher;

pub use dispatcher::{event_channel, EventDispatcher, EventSender};
