use {
    super::audit::{AuditEntry, NewAuditEntry},
    super::error::AuditError,
    super::id::SubjectId,
    super::page::{PageRequest, PagedResult},
    std::{future::Future, pin::Pin},
};

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AuditError>> + Send + 'a>>;

/// Durable, append-only audit trail keyed by subject.
///
/// No update or delete exists; entries outlive their subject.
pub trait AuditStore: Send + Sync {
    /// Persist one entry and return it with its assigned id.
    fn append<'a>(&'a self, entry: &'a NewAuditEntry) -> StoreFuture<'a, AuditEntry>;

    /// One page of a subject's entries, newest first.
    fn get_by_subject(
        &self,
        subject_id: SubjectId,
        page: PageRequest,
    ) -> StoreFuture<'_, PagedResult<AuditEntry>>;

    /// One page across every subject, newest first.
    fn get_all(&self, page: PageRequest) -> StoreFuture<'_, PagedResult<AuditEntry>>;
}
