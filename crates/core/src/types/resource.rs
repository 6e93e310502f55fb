//! Syncable resource types.

use serde::{Deserialize, Serialize};

/// Error returned when a resource name is not recognized.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown resource type: {0} (expected customers, products or orders)")]
pub struct ResourceTypeError(pub String);

/// A resource collection that can be fully synced or pushed via webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Customers,
    Products,
    Orders,
}

impl ResourceType {
    /// All resource types, in dependency order.
    ///
    /// Orders reference customers and products, so syncing in this order
    /// lets full-sync lookups find their references.
    pub const ALL: [Self; 3] = [Self::Customers, Self::Products, Self::Orders];

    /// Plural name as used in REST paths and webhook topics.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Products => "products",
            Self::Orders => "orders",
        }
    }

    /// JSON key under which a page response lists its items.
    #[must_use]
    pub const fn collection_key(&self) -> &'static str {
        self.as_str()
    }

    /// Extra query parameters the collection endpoint needs.
    ///
    /// The orders endpoint only returns open orders unless asked otherwise.
    #[must_use]
    pub const fn default_query(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Orders => &[("status", "any")],
            Self::Customers | Self::Products => &[],
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = ResourceTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "customers" | "customer" => Ok(Self::Customers),
            "products" | "product" => Ok(Self::Products),
            "orders" | "order" => Ok(Self::Orders),
            other => Err(ResourceTypeError(other.to_owned())),
        }
    }
}
