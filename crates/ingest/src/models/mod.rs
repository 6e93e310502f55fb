//! Domain models for ingested data.
//!
//! Each synced entity has two shapes:
//! - the stored row (`Customer`, `Product`, `Order`, `OrderItem`), carrying
//!   its internal id, and
//! - the write record (`CustomerRecord`, `ProductRecord`, ...) produced by the
//!   reconciliation engine and handed to the [`Store`](crate::db::Store).
//!
//! Internal ids never leave this system; the natural key of every synced
//! entity is `(tenant_id, external_id)`.

pub mod customer;
pub mod order;
pub mod product;
pub mod tenant;

pub use customer::{Customer, CustomerContact, CustomerRecord};
pub use order::{CustomerCredit, Order, OrderItem, OrderItemRecord, OrderRecord, OrderWrite, ReplacedOrder};
pub use product::{Product, ProductRecord, ProductStub};
pub use tenant::{NewTenant, StoreCredential, Tenant, TenantCredentials, WebhookVerification};
