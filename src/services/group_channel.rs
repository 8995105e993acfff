use {
    crate::domain::{
        audit::AuditEntry,
        id::{ConnectionId, SubjectId},
    },
    parking_lot::RwLock,
    std::{
        collections::{HashMap, HashSet},
        sync::Arc,
    },
    tokio::sync::mpsc,
};

/// Receives every entry published to a group the connection has joined.
pub type Outbox = mpsc::UnboundedReceiver<AuditEntry>;

/// Where the audit sink hands entries once they are persisted.
pub trait EntryPublisher: Send + Sync {
    /// Deliver `entry` to the subject's live subscribers; returns how many received it.
    fn publish(&self, subject_id: SubjectId, entry: &AuditEntry) -> usize;
}

/// Subject-keyed publish/subscribe over live connections.
///
/// Membership and outboxes share one lock, so a publish always fans out to a
/// complete membership snapshot and never to a disconnected connection.
#[derive(Clone, Default)]
pub struct GroupChannel {
    inner: Arc<RwLock<Membership>>,
}

#[derive(Default)]
struct Membership {
    connections: HashMap<ConnectionId, Member>,
    groups: HashMap<String, HashSet<ConnectionId>>,
}

struct Member {
    outbox: mpsc::UnboundedSender<AuditEntry>,
    groups: HashSet<String>,
}

impl GroupChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection with no group memberships.
    pub fn connect(&self) -> (ConnectionId, Outbox) {
        let id = ConnectionId::generate();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.write().connections.insert(
            id,
            Member {
                outbox: tx,
                groups: HashSet::new(),
            },
        );
        tracing::debug!(connection_id = %id, "hub connection registered");
        (id, rx)
    }

    /// Drop the connection and all of its memberships.
    pub fn disconnect(&self, id: ConnectionId) {
        let mut inner = self.inner.write();
        let Some(member) = inner.connections.remove(&id) else {
            return;
        };
        for key in &member.groups {
            inner.remove_from_group(key, id);
        }
        tracing::debug!(connection_id = %id, groups = member.groups.len(), "hub connection removed");
    }

    /// Add the connection to the subject's group. Returns `false` when it was
    /// already a member or is not connected.
    pub fn join(&self, id: ConnectionId, subject_id: SubjectId) -> bool {
        let key = subject_id.group_key();
        let mut inner = self.inner.write();
        let Some(member) = inner.connections.get_mut(&id) else {
            tracing::debug!(connection_id = %id, %subject_id, "join from unknown connection ignored");
            return false;
        };
        if !member.groups.insert(key.clone()) {
            return false;
        }
        inner.groups.entry(key).or_default().insert(id);
        true
    }

    /// Remove the connection from the subject's group. Returns `false` when it
    /// was not a member.
    pub fn leave(&self, id: ConnectionId, subject_id: SubjectId) -> bool {
        let key = subject_id.group_key();
        let mut inner = self.inner.write();
        let removed = inner
            .connections
            .get_mut(&id)
            .is_some_and(|member| member.groups.remove(&key));
        if removed {
            inner.remove_from_group(&key, id);
        }
        removed
    }

    /// Number of connections currently in the subject's group.
    pub fn member_count(&self, subject_id: SubjectId) -> usize {
        self.inner
            .read()
            .groups
            .get(&subject_id.group_key())
            .map_or(0, HashSet::len)
    }

    pub fn connection_count(&self) -> usize {
        self.inner.read().connections.len()
    }
}

impl Membership {
    fn remove_from_group(&mut self, key: &str, id: ConnectionId) {
        if let Some(members) = self.groups.get_mut(key) {
            members.remove(&id);
            if members.is_empty() {
                self.groups.remove(key);
            }
        }
    }
}

impl EntryPublisher for GroupChannel {
    fn publish(&self, subject_id: SubjectId, entry: &AuditEntry) -> usize {
        let inner = self.inner.read();
        let Some(members) = inner.groups.get(&subject_id.group_key()) else {
            return 0;
        };

        let mut delivered = 0;
        for id in members {
            let Some(member) = inner.connections.get(id) else {
                continue;
            };
            // A closed outbox means the socket task already exited; disconnect
            // will clean the membership up.
            if member.outbox.send(entry.clone()).is_ok() {
                delivered += 1;
            }
        }

        tracing::debug!(%subject_id, entry_id = entry.id, delivered, "audit entry published");
        delivered
    }
}
