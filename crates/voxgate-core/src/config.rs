use std::time::Duration;

/// Immutable gateway configuration. Built once at startup (normally
/// from the environment) and passed into each component. Pipeline
/// logic never reads the environment itself.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// Port the HTTP server binds to.
    pub port: u16,
    /// Endpoint of the speech-recognition backend.
    pub asr_url: String,
    /// Run the decoder without the sandbox wrapper.
    pub disable_jail: bool,
    /// Base URL of the object store. `None` disables archiving.
    pub store_url: Option<String>,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
    /// Upper bound on one decoder subprocess run.
    pub decode_timeout: Duration,
    /// Upper bound on one upstream ASR call.
    pub upstream_timeout: Duration,
    /// Canned audio sample replayed by the deep-health check.
    pub heartbeat_file: String,
    /// Version descriptor served at `/__version__`.
    pub version_file: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: 9001,
            asr_url: String::new(),
            disable_jail: false,
            store_url: None,
            max_body_bytes: 1_024_000,
            decode_timeout: Duration::from_secs(30),
            upstream_timeout: Duration::from_secs(60),
            heartbeat_file: "hb.raw".into(),
            version_file: "version.json".into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

impl GatewayConfig {
    /// Load configuration from the environment. Fails fast on a
    /// missing `ASR_URL` or an unparseable numeric value so the
    /// process never starts listening half-configured.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let asr_url = std::env::var("ASR_URL")
            .ok()
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("ASR_URL"))?;

        Ok(Self {
            port: parse_var("PORT", defaults.port)?,
            asr_url,
            disable_jail: std::env::var("DISABLE_DECODE_JAIL").as_deref() == Ok("1"),
            store_url: std::env::var("STORE_URL").ok().filter(|v| !v.is_empty()),
            max_body_bytes: parse_var("MAX_BODY_BYTES", defaults.max_body_bytes)?,
            decode_timeout: Duration::from_secs(parse_var("DECODE_TIMEOUT_SECS", 30)?),
            upstream_timeout: Duration::from_secs(parse_var("UPSTREAM_TIMEOUT_SECS", 60)?),
            heartbeat_file: std::env::var("HEARTBEAT_FILE")
                .unwrap_or(defaults.heartbeat_file),
            version_file: std::env::var("VERSION_FILE").unwrap_or(defaults.version_file),
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw.clone(),
        }),
        Err(_) => Ok(default),
    }
}
