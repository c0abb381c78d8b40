pub mod bridge;
pub mod config;
pub mod error;
pub mod host;
pub mod inference;
pub mod manifest;
pub mod reader;
pub mod registry;
pub mod resolve;
pub mod types;
pub mod watcher;
