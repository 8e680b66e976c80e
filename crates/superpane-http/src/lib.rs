//! [`DocumentStore`](superpane_api::DocumentStore) over a GROQ query API.
//!
//! Queries go to `{root}/data/query/{dataset}` with bound parameters passed
//! as JSON-encoded `$name` query arguments. Live updates come from
//! `{root}/data/listen/{dataset}` as server-sent events.

pub mod client;
pub mod config;
pub mod decode;
pub mod sse;

pub use client::HttpStore;
pub use config::HttpStoreConfig;
