use {
    crate::domain::{
        audit::{AuditEntry, NewAuditEntry},
        id::SubjectId,
        page::{PageRequest, PagedResult},
        store::{AuditStore, StoreFuture},
    },
    parking_lot::RwLock,
};

/// Process-local audit store. History is lost on restart.
#[derive(Default)]
pub struct MemoryAuditStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    entries: Vec<AuditEntry>,
    last_id: i64,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().entries.is_empty()
    }

    /// Every stored entry in insertion order.
    pub fn snapshot(&self) -> Vec<AuditEntry> {
        self.inner.read().entries.clone()
    }

    fn insert(&self, entry: &NewAuditEntry) -> AuditEntry {
        let mut inner = self.inner.write();
        inner.last_id += 1;
        let stored = entry.clone().into_entry(inner.last_id);
        inner.entries.push(stored.clone());
        stored
    }

    fn page(&self, subject_id: Option<SubjectId>, page: PageRequest) -> PagedResult<AuditEntry> {
        let inner = self.inner.read();
        let mut matching: Vec<&AuditEntry> = inner
            .entries
            .iter()
            .filter(|e| subject_id.is_none_or(|s| e.subject_id == s))
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total_count = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size() as usize)
            .cloned()
            .collect();

        PagedResult::new(items, page, total_count)
    }
}

impl AuditStore for MemoryAuditStore {
    fn append<'a>(&'a self, entry: &'a NewAuditEntry) -> StoreFuture<'a, AuditEntry> {
        let stored = self.insert(entry);
        Box::pin(async move { Ok(stored) })
    }

    fn get_by_subject(
        &self,
        subject_id: SubjectId,
        page: PageRequest,
    ) -> StoreFuture<'_, PagedResult<AuditEntry>> {
        let result = self.page(Some(subject_id), page);
        Box::pin(async move { Ok(result) })
    }

    fn get_all(&self, page: PageRequest) -> StoreFuture<'_, PagedResult<AuditEntry>> {
        let result = self.page(None, page);
        Box::pin(async move { Ok(result) })
    }
}
