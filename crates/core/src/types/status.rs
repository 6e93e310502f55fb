//! Order status enums.
//!
//! Both enums are opaque to this system: the platform defines them and may add
//! values at any time. A value not listed here is carried verbatim in `Other`
//! so the platform's own spelling survives into the store. The snake_case wire
//! form is also the form persisted in the store.

use serde::{Deserialize, Serialize};

/// Order financial status.
///
/// Maps to the platform's `financial_status` values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum FinancialStatus {
    #[default]
    Pending,
    Authorized,
    PartiallyPaid,
    Paid,
    PartiallyRefunded,
    Refunded,
    Voided,
    Expired,
    /// A value this system does not model, kept as sent.
    Other(String),
}

impl FinancialStatus {
    /// The persisted / wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Authorized => "authorized",
            Self::PartiallyPaid => "partially_paid",
            Self::Paid => "paid",
            Self::PartiallyRefunded => "partially_refunded",
            Self::Refunded => "refunded",
            Self::Voided => "voided",
            Self::Expired => "expired",
            Self::Other(raw) => raw,
        }
    }

    /// Whether the order counts as paid for customer aggregates.
    #[must_use]
    pub const fn is_paid(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl From<String> for FinancialStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => Self::Pending,
            "authorized" => Self::Authorized,
            "partially_paid" => Self::PartiallyPaid,
            "paid" => Self::Paid,
            "partially_refunded" => Self::PartiallyRefunded,
            "refunded" => Self::Refunded,
            "voided" => Self::Voided,
            "expired" => Self::Expired,
            _ => Self::Other(s),
        }
    }
}

impl From<FinancialStatus> for String {
    fn from(status: FinancialStatus) -> Self {
        match status {
            FinancialStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for FinancialStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FinancialStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}

/// Order fulfillment status.
///
/// The platform reports `null` for unfulfilled orders, so this is always
/// carried as `Option<FulfillmentStatus>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FulfillmentStatus {
    Fulfilled,
    Partial,
    Restocked,
    /// A value this system does not model, kept as sent.
    Other(String),
}

impl FulfillmentStatus {
    /// The persisted / wire representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Fulfilled => "fulfilled",
            Self::Partial => "partial",
            Self::Restocked => "restocked",
            Self::Other(raw) => raw,
        }
    }
}

impl From<String> for FulfillmentStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "fulfilled" => Self::Fulfilled,
            "partial" => Self::Partial,
            "restocked" => Self::Restocked,
            _ => Self::Other(s),
        }
    }
}

impl From<FulfillmentStatus> for String {
    fn from(status: FulfillmentStatus) -> Self {
        match status {
            FulfillmentStatus::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for FulfillmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FulfillmentStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s.to_string()))
    }
}
