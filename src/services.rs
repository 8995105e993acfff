pub mod audit_sink;
pub mod forward;
pub mod group_channel;
