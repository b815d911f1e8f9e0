pub mod api;
pub mod auth;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod node;

pub use config::NodeConfig;
pub use node::{AuraNode, NodeStats};
