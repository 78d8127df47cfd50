//! Shop (tenant) domain.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Default suffix every Shopify store domain carries.
pub const DEFAULT_STORE_SUFFIX: &str = ".myshopify.com";

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ShopDomainError {
    #[error("shop domain cannot be empty")]
    Empty,
    #[error("shop domain must end with {suffix}")]
    WrongSuffix { suffix: String },
    #[error("shop domain contains invalid characters")]
    InvalidCharacters,
}

/// A tenant store, identified by its `*.myshopify.com` domain.
///
/// Every row the service persists is scoped by this value. Parsing lowercases
/// the input and strips a leading scheme or trailing slash, which is how shop
/// values arrive from query strings, form fields and session-token `dest`
/// claims.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShopDomain(String);

impl ShopDomain {
    /// Parse against the default `.myshopify.com` suffix.
    ///
    /// # Errors
    ///
    /// See [`ShopDomain::parse_with_suffix`].
    pub fn parse(s: &str) -> Result<Self, ShopDomainError> {
        Self::parse_with_suffix(s, DEFAULT_STORE_SUFFIX)
    }

    /// Parse a shop domain that must end with `suffix`.
    ///
    /// # Errors
    ///
    /// Returns an error if the normalized value is empty, does not end with
    /// `suffix`, has nothing before the suffix, or contains characters other
    /// than ASCII alphanumerics, `-` and `.`.
    pub fn parse_with_suffix(s: &str, suffix: &str) -> Result<Self, ShopDomainError> {
        let trimmed = s.trim();
        let without_scheme = trimmed
            .strip_prefix("https://")
            .or_else(|| trimmed.strip_prefix("http://"))
            .unwrap_or(trimmed);
        let host = without_scheme.trim_end_matches('/').to_ascii_lowercase();

        if host.is_empty() {
            return Err(ShopDomainError::Empty);
        }
        let suffix = suffix.to_ascii_lowercase();
        let Some(name) = host.strip_suffix(suffix.as_str()) else {
            return Err(ShopDomainError::WrongSuffix { suffix });
        };
        if name.is_empty() {
            return Err(ShopDomainError::WrongSuffix { suffix });
        }
        if !host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.')
        {
            return Err(ShopDomainError::InvalidCharacters);
        }

        Ok(Self(host))
    }

    /// Wrap a value read back from storage without re-validating it.
    #[must_use]
    pub const fn from_trusted(s: String) -> Self {
        Self(s)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
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

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for ShopDomain {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for ShopDomain {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <String as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(s))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for ShopDomain {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <String as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes() {
        let shop = ShopDomain::parse(" https://Cool-Shop.myshopify.com/ ").unwrap();
        assert_eq!(shop.as_str(), "cool-shop.myshopify.com");
    }

    #[test]
    fn test_parse_rejects_other_hosts() {
        assert!(matches!(
            ShopDomain::parse("evil.example.com"),
            Err(ShopDomainError::WrongSuffix { .. })
        ));
        assert!(matches!(
            ShopDomain::parse(".myshopify.com"),
            Err(ShopDomainError::WrongSuffix { .. })
        ));
        assert_eq!(ShopDomain::parse(""), Err(ShopDomainError::Empty));
    }

    #[test]
    fn test_parse_rejects_injection() {
        assert_eq!(
            ShopDomain::parse("a/b?.myshopify.com"),
            Err(ShopDomainError::InvalidCharacters)
        );
    }

    #[test]
    fn test_custom_suffix() {
        let shop = ShopDomain::parse_with_suffix("dev.shop.test", ".shop.test").unwrap();
        assert_eq!(shop.to_string(), "dev.shop.test");
        assert!(ShopDomain::parse_with_suffix("dev.myshopify.com", ".shop.test").is_err());
    }
}
