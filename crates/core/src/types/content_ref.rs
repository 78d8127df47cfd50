//! Catalog content references and suffix identity.
//!
//! Shopify hands out ids in two shapes: namespaced global ids such as
//! `gid://shopify/Product/123` and bare numeric ids such as `123` (theme
//! Liquid exposes the latter). Two references name the same item when their
//! last `/`-delimited segment is equal.

/// Last `/`-delimited segment of a reference.
///
/// ```
/// use gallery_flow_core::extract_id;
///
/// assert_eq!(extract_id("gid://shopify/Product/123"), "123");
/// assert_eq!(extract_id("123"), "123");
/// assert_eq!(extract_id("gid://shopify/Product/"), "");
/// ```
#[must_use]
pub fn extract_id(reference: &str) -> &str {
    reference.rsplit('/').next().unwrap_or(reference)
}

/// Suffix identity between two optional references.
///
/// Absent or empty references never match anything, including each other.
///
/// ```
/// use gallery_flow_core::matches_content_id;
///
/// assert!(matches_content_id(Some("gid://shopify/Product/55"), Some("55")));
/// assert!(!matches_content_id(Some("55"), None));
/// assert!(!matches_content_id(None, None));
/// ```
#[must_use]
pub fn matches_content_id(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) if !a.is_empty() && !b.is_empty() => {
            let (a, b) = (extract_id(a), extract_id(b));
            !a.is_empty() && a == b
        }
        _ => false,
    }
}
