//! Sandboxed decoder subprocess management. One request owns one
//! decode job: the request body is fed to the decoder's stdin, raw
//! PCM streams out of stdout as it is produced, and stderr is always
//! drained and captured for diagnostics.

mod command;
mod error;
mod job;

pub use command::DecodeConfig;
pub use error::DecodeError;
pub use job::{DecodeHandle, DecodeJob, PcmStream, RunningDecode};
