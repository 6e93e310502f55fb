//! Shop domain type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Suffix of every platform-hosted shop domain.
const PLATFORM_SUFFIX: &str = ".myshopify.com";

/// Errors that can occur when parsing a [`ShopDomain`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    /// The input string is empty.
    #[error("shop domain cannot be empty")]
    Empty,
    /// The input is longer than a DNS name may be.
    #[error("shop domain must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains characters that cannot appear in a hostname.
    #[error("shop domain contains invalid character {0:?}")]
    InvalidCharacter(char),
}

/// A normalized shop domain (e.g. `acme.myshopify.com`).
///
/// The domain is the tenant's public identity towards the platform: it is
/// where API calls go and what webhooks carry in `X-Shopify-Shop-Domain`.
/// Parsing normalizes so that lookups by header value match the stored
/// tenant regardless of how the operator typed it at onboarding.
///
/// ## Normalization
///
/// - Surrounding whitespace, `https://`/`http://` and trailing `/` removed
/// - Lowercased
/// - `.myshopify.com` appended when absent
///
/// ## Examples
///
/// ```
/// use shop_insights_core::ShopDomain;
///
/// let domain = ShopDomain::parse("https://Acme-Store/").unwrap();
/// assert_eq!(domain.as_str(), "acme-store.myshopify.com");
///
/// assert!(ShopDomain::parse("").is_err());
/// assert!(ShopDomain::parse("bad domain").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Maximum length of a DNS name.
    pub const MAX_LENGTH: usize = 253;

    /// Parse and normalize a `ShopDomain`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty after trimming, is too long,
    /// or contains characters other than ASCII alphanumerics, `-` and `.`.
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        let lowered = s.trim().to_ascii_lowercase();
        let without_scheme = lowered
            .strip_prefix("https://")
            .or_else(|| lowered.strip_prefix("http://"))
            .unwrap_or(&lowered);
        let host = without_scheme.trim_end_matches('/').to_string();

        if host.is_empty() {
            return Err(ShopDomainError::Empty);
        }

        if let Some(c) = host
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '.'))
        {
            return Err(ShopDomainError::InvalidCharacter(c));
        }

        let full = if host.ends_with(PLATFORM_SUFFIX) {
            host
        } else {
            format!("{host}{PLATFORM_SUFFIX}")
        };

        if full.len() > Self::MAX_LENGTH {
            return Err(ShopDomainError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        Ok(Self(full))
    }

    /// Returns the domain as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The shop handle (the part before `.myshopify.com`).
    #[must_use]
    pub fn handle(&self) -> &str {
        self.0.strip_suffix(PLATFORM_SUFFIX).unwrap_or(&self.0)
    }
}

impl fmt::Display for ShopDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ShopDomain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ShopDomain {
    type Error = ShopDomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ShopDomain> for String {
    fn from(domain: ShopDomain) -> Self {
        domain.0
    }
}

impl core::str::FromStr for ShopDomain {
    type Err = ShopDomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
