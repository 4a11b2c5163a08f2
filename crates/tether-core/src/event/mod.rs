//! Session event bus.
//!
//! Provides an `EventBus` that distributes `SessionEvent` messages (login,
//! renewal, expiry warnings, logout, finished turns) to every subscriber via
//! a `tokio::sync::broadcast` channel.

pub mod bus;

pub use bus::EventBus;
