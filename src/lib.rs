pub mod adapters;
pub mod client;
pub mod config;
pub mod domain;
pub mod infra;
pub mod scope;
pub mod services;

use {
    domain::store::AuditStore,
    services::{audit_sink::AuditSink, group_channel::GroupChannel},
    std::sync::Arc,
};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn AuditStore>,
    pub channel: GroupChannel,
    pub sink: Arc<AuditSink>,
}

impl AppState {
    /// Wire a sink that persists into `store` and publishes on a fresh channel.
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        let channel = GroupChannel::new();
        let sink = AuditSink::new(store.clone(), Arc::new(channel.clone()));
        Self {
            store,
            channel,
            sink: Arc::new(sink),
        }
    }
}
