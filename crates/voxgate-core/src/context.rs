use serde::Serialize;

/// Parsed request metadata headers. All fields are optional on the
/// wire; validation decides whether present values are acceptable.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RequestMeta {
    pub language: Option<String>,
    pub store_sample: Option<String>,
    pub store_transcription: Option<String>,
    pub user_agent: Option<String>,
    pub product_tag: Option<String>,
}

impl RequestMeta {
    /// Store-by-default policy: archiving is on unless the caller
    /// explicitly sent `0`. Only called on validated metadata, where
    /// the flag is known to be `0`, `1`, or absent.
    pub fn store_sample_enabled(&self) -> bool {
        self.store_sample.as_deref() != Some("0")
    }

    pub fn store_transcription_enabled(&self) -> bool {
        self.store_transcription.as_deref() != Some("0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_flags_default_to_enabled() {
        let meta = RequestMeta::default();
        assert!(meta.store_sample_enabled());
        assert!(meta.store_transcription_enabled());
    }

    #[test]
    fn explicit_zero_disables_storage() {
        let meta = RequestMeta {
            store_sample: Some("0".into()),
            store_transcription: Some("0".into()),
            ..Default::default()
        };
        assert!(!meta.store_sample_enabled());
        assert!(!meta.store_transcription_enabled());
    }

    #[test]
    fn explicit_one_keeps_storage_enabled() {
        let meta = RequestMeta {
            store_sample: Some("1".into()),
            ..Default::default()
        };
        assert!(meta.store_sample_enabled());
    }
}
