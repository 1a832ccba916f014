//! # Concord
//!
//! HTTP surface, configuration and storage plumbing around `concord-core`.
//! The binary in `main.rs` adds the CLI on top of these modules.

pub mod api;
pub mod config;
pub mod store;
