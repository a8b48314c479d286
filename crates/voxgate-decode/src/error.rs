use voxgate_core::errors::PipelineError;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("failed to spawn decoder: {0}")]
    Spawn(String),

    #[error("decoder exited with code {code:?}")]
    Exit { code: Option<i32>, stderr: String },

    #[error("decoder I/O error: {0}")]
    Io(String),
}

impl From<DecodeError> for PipelineError {
    fn from(e: DecodeError) -> Self {
        match e {
            DecodeError::Spawn(msg) => PipelineError::DecodeSpawn(msg),
            DecodeError::Exit { code, stderr } => PipelineError::DecodeExit { code, stderr },
            // A broken pipe means the child died out from under us;
            // there is no exit code to report.
            DecodeError::Io(msg) => PipelineError::DecodeExit { code: None, stderr: msg },
        }
    }
}
