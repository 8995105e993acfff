use crate::domain::id::SubjectId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("validation: {0}")]
    Validation(String),

    #[error("configuration: {0}")]
    Config(String),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store: {0}")]
    Store(String),

    #[error("audit entry for subject {subject_id} was not persisted: {source}")]
    NotPersisted {
        subject_id: SubjectId,
        #[source]
        source: Box<AuditError>,
    },

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("transport: {0}")]
    Transport(String),

    #[error("http: {0}")]
    Http(#[from] reqwest::Error),
}

impl AuditError {
    /// True for failures raised while writing to the log store.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::Store(_) | Self::NotPersisted { .. }
        )
    }

    pub(crate) fn not_persisted(subject_id: SubjectId, source: AuditError) -> Self {
        Self::NotPersisted {
            subject_id,
            source: Box::new(source),
        }
    }
}
