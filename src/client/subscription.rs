use {
    super::connection::{ConnectionHandlers, ConnectionState, HubConnection},
    crate::domain::{audit::AuditEntry, error::AuditError, id::SubjectId, wire::HubMethod},
    parking_lot::{Mutex, RwLock},
    std::{
        collections::{BTreeMap, btree_map::Entry},
        panic::{AssertUnwindSafe, catch_unwind},
        sync::{
            Arc, Weak,
            atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        },
    },
    tracing::{debug, error, warn},
};

pub type Listener = Arc<dyn Fn(&AuditEntry) + Send + Sync>;

/// Whether joined subjects are joined again after the transport reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RejoinPolicy {
    #[default]
    Rejoin,
    Never,
}

/// Client side of the group channel: idempotent start/stop, subject group
/// membership and fan-out of pushed entries to local listeners.
pub struct SubjectSubscription<C: HubConnection + 'static> {
    connection: Arc<C>,
    shared: Arc<Shared>,
    views: AtomicUsize,
}

#[derive(Default)]
struct Shared {
    listeners: RwLock<Vec<(u64, Listener)>>,
    next_listener: AtomicU64,
    // Subject -> number of outstanding joins through this subscription.
    joined: Mutex<BTreeMap<SubjectId, usize>>,
    closed: AtomicBool,
}

impl<C: HubConnection + 'static> SubjectSubscription<C> {
    pub fn new(connection: C) -> Self {
        Self::with_policy(connection, RejoinPolicy::default())
    }

    pub fn with_policy(connection: C, policy: RejoinPolicy) -> Self {
        let connection = Arc::new(connection);
        let shared = Arc::new(Shared::default());

        let on_entry = {
            let shared = Arc::downgrade(&shared);
            Arc::new(move |entry: AuditEntry| {
                if let Some(shared) = shared.upgrade() {
                    shared.dispatch(&entry);
                }
            })
        };

        let on_reconnected = {
            let shared = Arc::downgrade(&shared);
            let connection = Arc::downgrade(&connection);
            Arc::new(move || {
                if policy == RejoinPolicy::Rejoin {
                    rejoin(&shared, &connection);
                }
            })
        };

        connection.set_handlers(ConnectionHandlers {
            on_entry,
            on_reconnected,
        });

        Self {
            connection,
            shared,
            views: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Connect unless already connected.
    pub async fn start(&self) -> Result<(), AuditError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(AuditError::Transport("subscription is closed".into()));
        }
        if self.connection.state() == ConnectionState::Connected {
            return Ok(());
        }
        self.connection.start().await
    }

    /// Disconnect unless already disconnected.
    pub async fn stop(&self) -> Result<(), AuditError> {
        if self.connection.state() == ConnectionState::Disconnected {
            return Ok(());
        }
        self.connection.stop().await
    }

    /// Join the subject's group. Joins are counted: the group is only left
    /// once every successful join has been matched by a leave.
    pub async fn join_subject(&self, subject_id: SubjectId) -> Result<(), AuditError> {
        self.connection
            .invoke(HubMethod::JoinSubjectGroup, subject_id)
            .await?;
        *self.shared.joined.lock().entry(subject_id).or_default() += 1;
        Ok(())
    }

    /// Release one join. The hub is only asked to leave when no join for the
    /// subject remains, or when the subject was never joined here.
    pub async fn leave_subject(&self, subject_id: SubjectId) -> Result<(), AuditError> {
        {
            let mut joined = self.shared.joined.lock();
            if let Entry::Occupied(mut count) = joined.entry(subject_id) {
                *count.get_mut() -= 1;
                if *count.get() > 0 {
                    debug!(%subject_id, remaining = *count.get(), "subject still joined by another view");
                    return Ok(());
                }
                count.remove();
            }
        }
        self.connection
            .invoke(HubMethod::LeaveSubjectGroup, subject_id)
            .await
    }

    /// Subjects that will be re-joined after a reconnect.
    pub fn joined_subjects(&self) -> Vec<SubjectId> {
        self.shared.joined.lock().keys().copied().collect()
    }

    /// Register a listener for every pushed entry until the handle is dropped.
    pub fn subscribe(&self, listener: impl Fn(&AuditEntry) + Send + Sync + 'static) -> ListenerHandle {
        let id = self.shared.next_listener.fetch_add(1, Ordering::Relaxed);
        self.shared.listeners.write().push((id, Arc::new(listener)));
        ListenerHandle {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.shared.listeners.read().len()
    }

    pub fn acquire_view(&self) -> usize {
        self.views.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Returns the number of views still using this subscription.
    pub fn release_view(&self) -> usize {
        let previous = self
            .views
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| Some(v.saturating_sub(1)))
            .unwrap_or(0);
        previous.saturating_sub(1)
    }

    /// Stop delivering entries and disconnect. Safe without a prior `start`.
    pub async fn close(&self) -> Result<(), AuditError> {
        self.shared.close();
        self.stop().await
    }
}

impl<C: HubConnection + 'static> Drop for SubjectSubscription<C> {
    fn drop(&mut self) {
        self.shared.close();
        if self.connection.state() == ConnectionState::Disconnected {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let connection = self.connection.clone();
            handle.spawn(async move {
                if let Err(e) = connection.stop().await {
                    debug!(error = %e, "hub stop on drop failed");
                }
            });
        }
    }
}

impl Shared {
    fn dispatch(&self, entry: &AuditEntry) {
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        let listeners: Vec<(u64, Listener)> = self.listeners.read().clone();
        for (id, listener) in listeners {
            if catch_unwind(AssertUnwindSafe(|| listener(entry))).is_err() {
                error!(listener_id = id, entry_id = entry.id, "audit entry listener panicked");
            }
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.listeners.write().clear();
    }
}

fn rejoin<C: HubConnection + 'static>(shared: &Weak<Shared>, connection: &Weak<C>) {
    let (Some(shared), Some(connection)) = (shared.upgrade(), connection.upgrade()) else {
        return;
    };
    let subjects: Vec<SubjectId> = shared.joined.lock().keys().copied().collect();
    if subjects.is_empty() {
        return;
    }

    tokio::spawn(async move {
        for subject_id in subjects {
            match connection
                .invoke(HubMethod::JoinSubjectGroup, subject_id)
                .await
            {
                Ok(()) => debug!(%subject_id, "re-joined subject group after reconnect"),
                Err(e) => warn!(%subject_id, error = %e, "failed to re-join subject group"),
            }
        }
    });
}

/// Revocable listener registration.
pub struct ListenerHandle {
    id: u64,
    shared: Weak<Shared>,
}

impl ListenerHandle {
    pub fn unsubscribe(self) {}
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.listeners.write().retain(|(id, _)| *id != self.id);
        }
    }
}
