pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod progress;
pub mod reminder;
pub mod storage;
pub mod store;
pub mod sync;
pub mod views;
