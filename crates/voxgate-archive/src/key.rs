use uuid::Uuid;

/// Shared storage prefix for one request's artifacts, derived once
/// from a random 128-bit identifier: `{first-two-chars}/{uuid}`. The
/// leading pair fans keys out across storage partitions; the full
/// identifier makes collisions negligible.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArchiveKey(String);

impl ArchiveKey {
    pub fn generate() -> Self {
        let id = Uuid::new_v4().to_string();
        Self(format!("{}/{id}", &id[..2]))
    }

    pub fn prefix(&self) -> &str {
        &self.0
    }

    /// Full key for one artifact under this prefix.
    pub fn artifact(&self, name: &str) -> String {
        format!("{}/{name}", self.0)
    }
}

impl std::fmt::Display for ArchiveKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
