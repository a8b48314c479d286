use std::time::Duration;

/// Typed error hierarchy for the request pipeline. Classifies every
/// terminal failure by the stage it belongs to and by what the
/// client is allowed to see: validation failures are the caller's
/// fault (400), everything past validation is internal (500) and
/// maps to a generic message so backend detail never leaks.
///
/// Archive failures are deliberately absent: they are never
/// terminal for a request and never reach this type.
#[derive(Clone, Debug, thiserror::Error)]
pub enum PipelineError {
    // Caller's fault; subprocess and upstream are never touched
    #[error("invalid header: {field}")]
    Validation { field: &'static str },
    #[error("unrecognized audio container")]
    UnrecognizedFormat,

    // Decode stage
    #[error("decoder failed to start: {0}")]
    DecodeSpawn(String),
    #[error("decoder exited with code {code:?}")]
    DecodeExit { code: Option<i32>, stderr: String },
    #[error("decode timed out after {0:?}")]
    DecodeTimeout(Duration),

    // Upstream stage
    #[error("upstream transport failure: {0}")]
    UpstreamTransport(String),
    #[error("upstream timed out after {0:?}")]
    UpstreamTimeout(Duration),
    #[error("upstream reply was not valid JSON")]
    UpstreamParse,
}

impl PipelineError {
    /// HTTP status the client receives for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } | Self::UnrecognizedFormat => 400,
            _ => 500,
        }
    }

    /// Short classification string for logging and tests.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::UnrecognizedFormat => "unrecognized_format",
            Self::DecodeSpawn(_) => "decode_spawn",
            Self::DecodeExit { .. } => "decode_exit",
            Self::DecodeTimeout(_) => "decode_timeout",
            Self::UpstreamTransport(_) => "upstream_transport",
            Self::UpstreamTimeout(_) => "upstream_timeout",
            Self::UpstreamParse => "upstream_parse",
        }
    }

    /// Message safe to echo to the client. Internal failures all
    /// collapse to the same generic text.
    pub fn client_message(&self) -> String {
        match self {
            Self::Validation { field } => format!("Invalid header: {field}"),
            Self::UnrecognizedFormat => "Body should be Opus or WebM/3GP audio".into(),
            _ => "Internal STT Server Error".into(),
        }
    }
}
