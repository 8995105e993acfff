use {
    super::id::SubjectId,
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// For INSERT; `id` is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuditEntry {
    pub subject_id: SubjectId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl NewAuditEntry {
    pub fn now(subject_id: SubjectId, message: impl Into<String>) -> Self {
        Self {
            subject_id,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn into_entry(self, id: i64) -> AuditEntry {
        AuditEntry {
            id,
            subject_id: self.subject_id,
            message: self.message,
            created_at: self.created_at,
        }
    }
}

/// A persisted audit record. Never updated or deleted once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: i64,
    pub subject_id: SubjectId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
