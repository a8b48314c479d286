use std::pin::Pin;
use std::process::{ExitStatus, Stdio};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdout, Command};
use tokio::task::JoinHandle;
use tokio_util::io::ReaderStream;

use voxgate_core::sniff::AudioFormat;

use crate::command::DecodeConfig;
use crate::error::DecodeError;

const READ_CHUNK: usize = 8192;

/// Streamed decoder stdout: the PCM bytes as the subprocess produces
/// them. Slow consumption throttles the decoder through the pipe.
pub type PcmStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// One decoder subprocess invocation. Owns the child exclusively for
/// the duration of one request.
pub struct DecodeJob;

impl DecodeJob {
    /// Spawn the decoder for `format`, feeding `body` to its stdin
    /// from a background task. stderr draining starts immediately so
    /// a chatty decoder can never block on a full pipe.
    pub fn spawn(
        config: &DecodeConfig,
        format: AudioFormat,
        body: Bytes,
    ) -> Result<RunningDecode, DecodeError> {
        let argv = config
            .argv(format)
            .ok_or_else(|| DecodeError::Spawn("no decoder for unrecognized format".into()))?;
        tracing::debug!(command = %argv.join(" "), body_len = body.len(), "spawning decoder");

        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DecodeError::Spawn(format!("{}: {e}", argv[0])))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| DecodeError::Spawn("decoder stdin not captured".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DecodeError::Spawn("decoder stdout not captured".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| DecodeError::Spawn("decoder stderr not captured".into()))?;

        // A decoder that rejects its input may exit before reading
        // everything we write; the broken pipe is expected then and
        // the exit status carries the real failure.
        drop(tokio::spawn(async move {
            let _ = stdin.write_all(&body).await;
            let _ = stdin.shutdown().await;
        }));

        let stderr_task = tokio::spawn(async move {
            let mut buf = Vec::new();
            let _ = stderr.read_to_end(&mut buf).await;
            String::from_utf8_lossy(&buf).into_owned()
        });

        Ok(RunningDecode {
            child,
            stdout,
            first_chunk: Bytes::new(),
            stderr_task: Some(stderr_task),
            exit: None,
            stderr: None,
        })
    }
}

/// A spawned decode whose streams are live.
#[derive(Debug)]
pub struct RunningDecode {
    child: Child,
    stdout: ChildStdout,
    first_chunk: Bytes,
    stderr_task: Option<JoinHandle<String>>,
    exit: Option<ExitStatus>,
    stderr: Option<String>,
}

impl RunningDecode {
    /// Await the first stdout chunk or process exit, whichever comes
    /// first. A non-zero exit before any output surfaces here, with
    /// captured stderr, so nothing downstream ever runs for a decode
    /// that failed at the gate. EOF with a clean exit is fine, the
    /// PCM stream is simply empty.
    pub async fn first_output(&mut self) -> Result<(), DecodeError> {
        let mut buf = vec![0u8; READ_CHUNK];
        let n = self
            .stdout
            .read(&mut buf)
            .await
            .map_err(|e| DecodeError::Io(e.to_string()))?;

        if n > 0 {
            buf.truncate(n);
            self.first_chunk = buf.into();
            return Ok(());
        }

        // EOF before any output: the child has exited or closed
        // stdout. Settle its status now.
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| DecodeError::Io(e.to_string()))?;
        let stderr = match self.stderr_task.take() {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        self.exit = Some(status);
        self.stderr = Some(stderr.clone());

        if status.success() {
            Ok(())
        } else {
            Err(DecodeError::Exit {
                code: status.code(),
                stderr,
            })
        }
    }

    /// Split into the PCM stream (first chunk replayed, then stdout
    /// as produced) and the handle that settles the exit status.
    pub fn into_stream(self) -> (PcmStream, DecodeHandle) {
        let head = if self.first_chunk.is_empty() {
            None
        } else {
            Some(Ok(self.first_chunk))
        };
        let stream = futures::stream::iter(head)
            .chain(ReaderStream::with_capacity(self.stdout, READ_CHUNK));

        let handle = DecodeHandle {
            child: self.child,
            stderr_task: self.stderr_task,
            exit: self.exit,
            stderr: self.stderr,
        };
        (Box::pin(stream), handle)
    }
}

/// Settles the subprocess after its output has been consumed.
/// Dropping it kills the child, so an abandoned request cannot leak
/// a decoder process.
pub struct DecodeHandle {
    child: Child,
    stderr_task: Option<JoinHandle<String>>,
    exit: Option<ExitStatus>,
    stderr: Option<String>,
}

impl DecodeHandle {
    /// Wait for exit and drained stderr. Non-zero exit is fatal even
    /// when it surfaces only after the output was fully streamed;
    /// the caller must not build a response from a failed decode.
    /// On success the captured stderr is returned for logging.
    pub async fn finish(mut self) -> Result<String, DecodeError> {
        let status = match self.exit {
            Some(status) => status,
            None => self
                .child
                .wait()
                .await
                .map_err(|e| DecodeError::Io(e.to_string()))?,
        };
        let stderr = match self.stderr.take() {
            Some(s) => s,
            None => match self.stderr_task.take() {
                Some(task) => task.await.unwrap_or_default(),
                None => String::new(),
            },
        };

        if status.success() {
            Ok(stderr)
        } else {
            Err(DecodeError::Exit {
                code: status.code(),
                stderr,
            })
        }
    }
}
