//! Streamed chat turns.
//!
//! - `Turn`: the per-turn state machine and its pending conversation slot
//! - `ChatController`: runs turns against the agent backend and reconciles

pub mod controller;
pub mod turn;

pub use controller::{ChatController, NoopObserver, TurnObserver, TurnReport};
pub use turn::{Absorbed, Transcript, Turn};
