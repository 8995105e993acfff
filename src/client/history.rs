use {
    crate::{
        config::ClientConfig,
        domain::{
            audit::AuditEntry,
            error::AuditError,
            id::SubjectId,
            page::{PageRequest, PagedResult},
            store::{AuditStore, StoreFuture},
        },
    },
    std::sync::Arc,
};

/// Read side of the log store as seen by a live feed.
pub trait EntryHistory: Send + Sync {
    fn fetch_page(
        &self,
        subject_id: SubjectId,
        page: PageRequest,
    ) -> StoreFuture<'_, PagedResult<AuditEntry>>;
}

/// Fetches pages from `GET /api/subjects/{id}/entries`.
#[derive(Clone)]
pub struct HttpEntryHistory {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpEntryHistory {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    async fn fetch(
        &self,
        subject_id: SubjectId,
        page: PageRequest,
    ) -> Result<PagedResult<AuditEntry>, AuditError> {
        let url = self.config.entries_url(subject_id)?;
        let result = self
            .http
            .get(url)
            .query(&[("page", page.page()), ("pageSize", page.page_size())])
            .send()
            .await?
            .error_for_status()?
            .json::<PagedResult<AuditEntry>>()
            .await?;
        Ok(result)
    }
}

impl EntryHistory for HttpEntryHistory {
    fn fetch_page(
        &self,
        subject_id: SubjectId,
        page: PageRequest,
    ) -> StoreFuture<'_, PagedResult<AuditEntry>> {
        Box::pin(self.fetch(subject_id, page))
    }
}

/// Reads straight from an in-process store.
#[derive(Clone)]
pub struct StoreHistory(pub Arc<dyn AuditStore>);

impl EntryHistory for StoreHistory {
    fn fetch_page(
        &self,
        subject_id: SubjectId,
        page: PageRequest,
    ) -> StoreFuture<'_, PagedResult<AuditEntry>> {
        self.0.get_by_subject(subject_id, page)
    }
}
