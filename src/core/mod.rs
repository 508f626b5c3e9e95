pub mod agent;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod keyring;
pub mod message;
pub mod reasoning;
pub mod store;
pub mod transport;
