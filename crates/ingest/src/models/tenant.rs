//! Tenant model.

use chrono::{DateTime, Utc};
use secrecy::SecretString;

use shop_insights_core::{ShopDomain, TenantId};

/// An isolation unit: one organization with its own platform shop.
///
/// Implements `Debug` manually to redact the access token and webhook secret.
#[derive(Clone)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub shop_domain: ShopDomain,
    /// Platform API access token (absent until onboarding completes).
    pub access_token: Option<SecretString>,
    /// Shared secret the platform signs webhooks with.
    pub webhook_secret: Option<SecretString>,
    /// Operator acknowledgment that unsigned webhooks may be accepted while
    /// no secret is configured.
    pub allow_unverified_webhooks: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for Tenant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tenant")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("shop_domain", &self.shop_domain)
            .field("access_token", &self.access_token.as_ref().map(|_| "[REDACTED]"))
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[REDACTED]"))
            .field("allow_unverified_webhooks", &self.allow_unverified_webhooks)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// How webhooks for a tenant are authenticated.
#[derive(Debug, Clone, Copy)]
pub enum WebhookVerification<'a> {
    /// Verify the HMAC signature with this secret.
    Signed(&'a SecretString),
    /// No secret, and the operator acknowledged unsigned delivery.
    UnverifiedAcknowledged,
    /// No secret and no acknowledgment: webhooks are refused.
    Refused,
}

impl Tenant {
    /// Credential for platform API calls, if the tenant has a token.
    #[must_use]
    pub fn credential(&self) -> Option<StoreCredential> {
        self.access_token.as_ref().map(|token| StoreCredential {
            shop_domain: self.shop_domain.clone(),
            access_token: token.clone(),
        })
    }

    /// The webhook verification mode this tenant is in.
    #[must_use]
    pub fn webhook_verification(&self) -> WebhookVerification<'_> {
        match (&self.webhook_secret, self.allow_unverified_webhooks) {
            (Some(secret), _) => WebhookVerification::Signed(secret),
            (None, true) => WebhookVerification::UnverifiedAcknowledged,
            (None, false) => WebhookVerification::Refused,
        }
    }
}

/// Authenticated address of one tenant's shop.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct StoreCredential {
    pub shop_domain: ShopDomain,
    pub access_token: SecretString,
}

impl std::fmt::Debug for StoreCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredential")
            .field("shop_domain", &self.shop_domain)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Input for onboarding a tenant.
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub shop_domain: ShopDomain,
    pub access_token: Option<SecretString>,
    pub webhook_secret: Option<SecretString>,
    pub allow_unverified_webhooks: bool,
}

/// Credential update for an existing tenant.
///
/// `None` fields are left unchanged.
#[derive(Debug, Clone, Default)]
pub struct TenantCredentials {
    pub access_token: Option<SecretString>,
    pub webhook_secret: Option<SecretString>,
    pub allow_unverified_webhooks: Option<bool>,
}
