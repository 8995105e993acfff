use {
    crate::domain::{
        audit::NewAuditEntry,
        error::AuditError,
        event::{LogEvent, SinkOutcome},
        fields::Fields,
        id::SubjectId,
        level::LogLevel,
        store::AuditStore,
    },
    crate::scope,
    crate::services::{
        forward::{ForwardSink, TracingForward},
        group_channel::EntryPublisher,
    },
    parking_lot::Mutex,
    std::{collections::HashMap, sync::Arc},
    tokio::sync::OwnedMutexGuard,
};

/// Logging decorator that turns subject-attributed events into durable,
/// live-published audit entries.
///
/// Every event with a non-blank message is forwarded. Events at a persisted
/// level whose subject resolves (ambient scope first, then the `subjectId` /
/// `UserId` field) are also appended to the store and, once stored, published
/// to the subject's group.
pub struct AuditSink {
    store: Arc<dyn AuditStore>,
    publisher: Arc<dyn EntryPublisher>,
    forward: Arc<dyn ForwardSink>,
    locks: SubjectLocks,
}

impl AuditSink {
    pub fn new(store: Arc<dyn AuditStore>, publisher: Arc<dyn EntryPublisher>) -> Self {
        Self {
            store,
            publisher,
            forward: Arc::new(TracingForward),
            locks: SubjectLocks::default(),
        }
    }

    pub fn with_forward(mut self, forward: Arc<dyn ForwardSink>) -> Self {
        self.forward = forward;
        self
    }

    pub async fn log(&self, event: LogEvent) -> Result<SinkOutcome, AuditError> {
        let message = event.render();
        if message.trim().is_empty() {
            return Ok(SinkOutcome::Dropped);
        }

        self.forward.forward(&event, &message);

        if !event.level.is_persisted() {
            return Ok(SinkOutcome::Forwarded);
        }

        let Some(subject_id) = scope::current().or_else(|| event.fields.subject_id()) else {
            return Ok(SinkOutcome::Forwarded);
        };

        // Held across append and publish: pushes for one subject go out in
        // the order their entries were stored.
        let _ordered = self.locks.lock(subject_id).await;

        let new_entry = NewAuditEntry::now(subject_id, message);
        let entry = match self.store.append(&new_entry).await {
            Ok(entry) => entry,
            Err(err) => {
                self.report_unpersisted(&new_entry, &err);
                return Err(AuditError::not_persisted(subject_id, err));
            }
        };

        self.publisher.publish(subject_id, &entry);
        Ok(SinkOutcome::Persisted(entry))
    }

    pub async fn information(
        &self,
        template: &str,
        fields: Fields,
    ) -> Result<SinkOutcome, AuditError> {
        self.log(LogEvent::new(LogLevel::Information, template).with_fields(fields))
            .await
    }

    pub async fn warning(&self, template: &str, fields: Fields) -> Result<SinkOutcome, AuditError> {
        self.log(LogEvent::new(LogLevel::Warning, template).with_fields(fields))
            .await
    }

    /// Subjects with a log call currently in flight.
    pub fn active_subject_locks(&self) -> usize {
        self.locks.len()
    }

    fn report_unpersisted(&self, entry: &NewAuditEntry, err: &AuditError) {
        let failure = LogEvent::new(
            LogLevel::Error,
            "audit entry for subject {subjectId} was not persisted: {auditMessage}",
        )
        .field("subjectId", entry.subject_id)
        .field("auditMessage", entry.message.as_str())
        .with_error(err);
        let message = failure.render();
        self.forward.forward(&failure, &message);
    }
}

/// One async mutex per subject, created on demand and dropped once no task
/// holds or waits on it.
#[derive(Default)]
struct SubjectLocks {
    locks: Mutex<HashMap<SubjectId, SubjectLock>>,
}

struct SubjectLock {
    mutex: Arc<tokio::sync::Mutex<()>>,
    // Holders plus waiters; the entry goes when this reaches zero.
    users: usize,
}

impl SubjectLocks {
    async fn lock(&self, subject_id: SubjectId) -> SubjectLockGuard<'_> {
        let mutex = {
            let mut locks = self.locks.lock();
            let lock = locks.entry(subject_id).or_insert_with(|| SubjectLock {
                mutex: Arc::default(),
                users: 0,
            });
            lock.users += 1;
            lock.mutex.clone()
        };
        // Registered before awaiting so a waiter cancelled here still
        // releases its slot on drop.
        let mut guard = SubjectLockGuard {
            locks: self,
            subject_id,
            held: None,
        };
        guard.held = Some(mutex.lock_owned().await);
        guard
    }

    fn len(&self) -> usize {
        self.locks.lock().len()
    }
}

struct SubjectLockGuard<'a> {
    locks: &'a SubjectLocks,
    subject_id: SubjectId,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for SubjectLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.held.take());
        let mut locks = self.locks.locks.lock();
        if let Some(lock) = locks.get_mut(&self.subject_id) {
            lock.users -= 1;
            if lock.users == 0 {
                locks.remove(&self.subject_id);
            }
        }
    }
}
