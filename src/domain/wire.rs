//! Frames exchanged over the `/hubs/audit` WebSocket.

use {
    super::audit::AuditEntry,
    super::id::SubjectId,
    serde::{Deserialize, Serialize},
};

/// Remote methods a client may invoke on the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HubMethod {
    JoinSubjectGroup,
    LeaveSubjectGroup,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    #[serde(rename_all = "camelCase")]
    Invoke {
        invocation_id: u64,
        target: HubMethod,
        subject_id: SubjectId,
    },
    Pong,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    #[serde(rename_all = "camelCase")]
    Completion {
        invocation_id: u64,
        error: Option<String>,
    },
    EntryAdded {
        entry: AuditEntry,
    },
    Ping,
}
