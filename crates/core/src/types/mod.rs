//! Core types for Shop Insights.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod domain;
pub mod external_id;
pub mod id;
pub mod resource;
pub mod status;

pub use domain::{ShopDomain, ShopDomainError};
pub use external_id::ExternalId;
pub use id::*;
pub use resource::{ResourceType, ResourceTypeError};
pub use status::*;
