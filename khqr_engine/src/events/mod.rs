//! Fire-and-forget notifications.
//!
//! The payment engine announces interesting state changes (an order was paid, stale requests were purged) to any
//! hooks that the application registered at start-up. Publishing never fails from the engine's point of view: if a
//! handler panics or its channel is closed, the problem is logged and the engine carries on.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
