//! Agent backend adapters.

pub mod http;
pub mod sse;

pub use http::HttpAgentBackend;
