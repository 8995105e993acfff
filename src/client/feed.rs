use {
    super::{
        connection::HubConnection,
        history::EntryHistory,
        subscription::{ListenerHandle, SubjectSubscription},
    },
    crate::domain::{
        audit::AuditEntry,
        error::AuditError,
        id::SubjectId,
        page::{PageRequest, PagedResult},
    },
    parking_lot::Mutex,
    std::sync::Arc,
    tracing::{debug, warn},
};

/// What a feed currently shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSnapshot {
    pub items: Vec<AuditEntry>,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
}

impl FeedSnapshot {
    pub fn has_more(&self) -> bool {
        self.page.saturating_mul(self.page_size) < self.total_count
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    fn accept_live(&mut self, entry: AuditEntry) -> bool {
        if self.items.iter().any(|e| e.id == entry.id) {
            return false;
        }
        self.total_count += 1;
        if self.page == 1 {
            self.items.insert(0, entry);
        }
        true
    }

    /// Replace the visible page, keeping live entries on page 1 that the
    /// fetched page does not contain yet.
    fn load(&mut self, fetched: PagedResult<AuditEntry>) {
        let newest = fetched.items.iter().map(|e| e.id).max().unwrap_or(0);
        let pending: Vec<AuditEntry> = if fetched.page == 1 {
            self.items
                .drain(..)
                .filter(|e| e.id > newest && !fetched.items.iter().any(|f| f.id == e.id))
                .collect()
        } else {
            Vec::new()
        };

        self.total_count = fetched.total_count + pending.len() as i64;
        self.page = fetched.page;
        self.page_size = fetched.page_size;
        self.items = pending;
        self.items.extend(fetched.items);
    }
}

/// Newest-first view of one subject's audit trail that stays current while
/// mounted.
pub struct LiveFeed<C: HubConnection + 'static> {
    subject_id: SubjectId,
    subscription: Arc<SubjectSubscription<C>>,
    history: Arc<dyn EntryHistory>,
    state: Arc<Mutex<FeedSnapshot>>,
    listener: Option<ListenerHandle>,
    joined: bool,
}

impl<C: HubConnection + 'static> LiveFeed<C> {
    /// Listen, connect and join the subject's group, then load the newest page.
    /// Joining before the fetch means no entry falls between history and live.
    pub async fn mount(
        subscription: Arc<SubjectSubscription<C>>,
        history: Arc<dyn EntryHistory>,
        subject_id: SubjectId,
        page_size: i64,
    ) -> Result<Self, AuditError> {
        let request = PageRequest::new(Some(1), Some(page_size));
        let state = Arc::new(Mutex::new(FeedSnapshot {
            items: Vec::new(),
            page: 1,
            page_size: request.page_size(),
            total_count: 0,
        }));

        subscription.acquire_view();
        let listener = {
            let state = state.clone();
            subscription.subscribe(move |entry| {
                // Delivery is already scoped by group; this guards against
                // listeners shared with other subjects.
                if entry.subject_id != subject_id {
                    return;
                }
                if state.lock().accept_live(entry.clone()) {
                    debug!(%subject_id, entry_id = entry.id, "live audit entry added to feed");
                }
            })
        };

        let mut feed = Self {
            subject_id,
            subscription,
            history,
            state,
            listener: Some(listener),
            joined: false,
        };

        if let Err(e) = feed.connect_and_load(request).await {
            if let Err(cleanup) = feed.teardown().await {
                debug!(error = %cleanup, "feed cleanup after failed mount");
            }
            return Err(e);
        }
        Ok(feed)
    }

    async fn connect_and_load(&mut self, request: PageRequest) -> Result<(), AuditError> {
        self.subscription.start().await?;
        self.subscription.join_subject(self.subject_id).await?;
        self.joined = true;
        self.fetch(request).await
    }

    async fn fetch(&self, request: PageRequest) -> Result<(), AuditError> {
        let fetched = self.history.fetch_page(self.subject_id, request).await?;
        self.state.lock().load(fetched);
        Ok(())
    }

    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.state.lock().clone()
    }

    pub fn items(&self) -> Vec<AuditEntry> {
        self.state.lock().items.clone()
    }

    pub fn page(&self) -> i64 {
        self.state.lock().page
    }

    pub fn total_count(&self) -> i64 {
        self.state.lock().total_count
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    pub fn has_more(&self) -> bool {
        self.state.lock().has_more()
    }

    pub async fn go_to(&self, page: i64) -> Result<(), AuditError> {
        let page_size = self.state.lock().page_size;
        self.fetch(PageRequest::new(Some(page), Some(page_size))).await
    }

    /// Returns `false` when already on the last page.
    pub async fn next_page(&self) -> Result<bool, AuditError> {
        let (page, more) = {
            let state = self.state.lock();
            (state.page, state.has_more())
        };
        if !more {
            return Ok(false);
        }
        self.go_to(page + 1).await?;
        Ok(true)
    }

    /// Returns `false` when already on the first page.
    pub async fn previous_page(&self) -> Result<bool, AuditError> {
        let page = self.state.lock().page;
        if page <= 1 {
            return Ok(false);
        }
        self.go_to(page - 1).await?;
        Ok(true)
    }

    /// Stop listening and leave the subject's group; stops the subscription
    /// when no other feed is using it.
    pub async fn unmount(mut self) -> Result<(), AuditError> {
        self.teardown().await
    }

    async fn teardown(&mut self) -> Result<(), AuditError> {
        let Some(listener) = self.listener.take() else {
            return Ok(());
        };
        drop(listener);

        // Only release a join this feed made; other views may share the subject.
        if std::mem::take(&mut self.joined) {
            if let Err(e) = self.subscription.leave_subject(self.subject_id).await {
                warn!(subject_id = %self.subject_id, error = %e, "failed to leave subject group");
            }
        }

        if self.subscription.release_view() == 0 {
            self.subscription.stop().await?;
        }
        Ok(())
    }
}
