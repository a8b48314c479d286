//! Best-effort artifact persistence. Up to three independent blobs
//! per request (original audio, request metadata, transcript)
//! under one shared key prefix. Uploads never block the pipeline and
//! their failures never reach the client.

mod archiver;
mod key;
mod store;

pub use archiver::Archiver;
pub use key::ArchiveKey;
pub use store::{ArchiveError, HttpObjectStore, MemoryStore, ObjectStore};
