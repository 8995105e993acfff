use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the entity (a user) an audit entry or live subscription concerns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SubjectId(i64);

impl SubjectId {
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }

    /// Name of the fan-out group that live subscribers of this subject join.
    pub fn group_key(&self) -> String {
        format!("subject-{}", self.0)
    }
}

/// Server-side identity of one live hub connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}
