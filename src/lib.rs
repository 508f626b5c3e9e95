//! Cortex client core: credential lifecycle and message dispatch for the
//! Cortex multi-agent chat backend.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`auth`] turns a user-supplied master key into a short-lived API key
//!   and tracks the authentication state machine.
//! - [`core`] owns the conversation: the dispatch pipeline, agent
//!   classification, reasoning extraction, the backend transport, secret
//!   storage and configuration.
//! - [`api`] defines the wire payloads exchanged with the backend.
//! - [`utils`] holds URL, header and tracing helpers.
//!
//! A host application builds a [`core::transport::HttpTransport`] and a
//! [`core::keyring::KeyringCredentialStore`] from [`core::config::Config`],
//! hands both to an [`auth::CredentialManager`], calls
//! [`auth::CredentialManager::restore`] at start-up, and drives one
//! [`core::dispatch::DispatchPipeline`] per conversation.

pub mod api;
pub mod auth;
pub mod core;
pub mod utils;
