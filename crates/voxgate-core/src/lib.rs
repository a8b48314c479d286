//! Shared types for the voxgate audio-ingest gateway: configuration,
//! request context, error taxonomy, and the pure per-request
//! classification logic (format sniffing, header validation).

pub mod config;
pub mod context;
pub mod errors;
pub mod headers;
pub mod ids;
pub mod lang;
pub mod sniff;
pub mod transcript;
