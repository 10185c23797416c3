use serde::{Deserialize, Serialize};

/// Severity levels for audit records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Permission changes: kept forever
    Critical,
    #[default]
    Important,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
        }
    }
}

/// Records that can be published on the audit bus.
pub trait Loggable: Serialize + Send + Sync {
    /// Prefix of the event name, e.g. "grant" in "grant.upserted"
    fn entity_type() -> &'static str;

    fn subject_id(&self) -> i64;

    fn severity(&self) -> Severity {
        Severity::Important
    }

    /// Removals are always critical.
    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "revoked" | "deleted" => Severity::Critical,
            _ => self.severity(),
        }
    }
}
