//! Session, renewal, resilient-call and chat-turn coordination for Tether.
//!
//! This crate defines the "ports" (backend and storage traits) that the
//! infrastructure layer implements, plus the components built on them. It
//! depends only on `tether-types` -- never on `tether-infra` or any HTTP or
//! filesystem crate.

pub mod backend;
pub mod chat;
pub mod event;
pub mod invoker;
pub mod repository;
pub mod session;
pub mod view;

#[cfg(test)]
pub(crate) mod test_support;

pub use invoker::ResilientInvoker;
