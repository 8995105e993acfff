pub mod audit;
pub mod error;
pub mod event;
pub mod fields;
pub mod id;
pub mod level;
pub mod page;
pub mod store;
pub mod wire;
