//! Shared domain types for Tether.
//!
//! This crate contains the types used across the session layer: credentials,
//! sessions, user profiles, chat turns, agent stream events, configuration
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod agent;
pub mod chat;
pub mod config;
pub mod credential;
pub mod error;
pub mod event;
pub mod identity;
pub mod session;
pub mod view;
