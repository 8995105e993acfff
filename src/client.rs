pub mod connection;
pub mod feed;
pub mod history;
pub mod subscription;
pub mod ws;
