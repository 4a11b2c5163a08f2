//! Identity backend adapters.

pub mod http;

pub use http::HttpIdentityBackend;
