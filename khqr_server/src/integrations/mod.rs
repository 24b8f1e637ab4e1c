//! Adapters between the payment engine's seams and the outside world.
pub mod notifications;
pub mod provider;
pub mod renderer;
