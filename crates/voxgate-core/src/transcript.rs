use serde_json::Value;

/// Parsed reply from the ASR backend. The raw JSON value is kept so
/// the client receives the backend's exact document; typed access to
/// the hypothesis texts exists for the health prober.
#[derive(Clone, Debug)]
pub struct Transcript {
    raw: Value,
}

impl Transcript {
    pub fn from_value(raw: Value) -> Self {
        Self { raw }
    }

    /// The backend's JSON document, unmodified.
    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    pub fn into_value(self) -> Value {
        self.raw
    }

    /// Serialized form for archiving.
    pub fn to_json_bytes(&self) -> Vec<u8> {
        self.raw.to_string().into_bytes()
    }

    /// Texts of all recognition hypotheses in `data[].text`.
    pub fn hypothesis_texts(&self) -> Vec<&str> {
        self.raw
            .get("data")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.get("text").and_then(Value::as_str))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether any hypothesis text equals `expected` exactly.
    pub fn contains_text(&self, expected: &str) -> bool {
        self.hypothesis_texts().iter().any(|t| *t == expected)
    }
}
