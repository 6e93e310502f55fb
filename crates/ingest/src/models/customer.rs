//! Customer model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use shop_insights_core::{CustomerId, ExternalId, TenantId};

/// A stored customer, unique per `(tenant_id, external_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub id: CustomerId,
    pub tenant_id: TenantId,
    pub external_id: ExternalId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub tags: Option<String>,
    /// Cumulative spend (platform snapshot, plus local paid-order credits).
    pub total_spent: Decimal,
    /// Order count (platform snapshot, plus local paid-order credits).
    pub orders_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Full customer snapshot, as written by customer reconciliation.
///
/// Overwrites every mutable field including the spend / order-count
/// snapshot, so writing the same record twice is a no-op.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerRecord {
    pub external_id: ExternalId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub tags: Option<String>,
    pub total_spent: Decimal,
    pub orders_count: i32,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Contact fields of a customer embedded in another entity (an order).
///
/// Never carries aggregates: writing a contact leaves spend and order count
/// untouched on existing rows and zeroed on new ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomerContact {
    pub external_id: ExternalId,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}
