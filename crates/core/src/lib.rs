//! Shop Insights Core - Shared types library.
//!
//! This crate provides common types used across all Shop Insights components:
//! - `ingest` - Full sync and webhook ingestion service
//! - `cli` - Command-line tools for migrations, tenants and manual syncs
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, external IDs, shop domains,
//!   order statuses and resource types

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
