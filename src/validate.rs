//! Input validation for domains and identifiers
//!
//! Everything that ends up in a command argument, a file name or an SQL
//! identifier passes through here first.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::error::{Error, Result};

/// Maximum length of a fully qualified domain name
pub const MAX_DOMAIN_LEN: usize = 253;

/// Maximum identifier length (MySQL user names and Linux logins both cap at 32)
pub const MAX_IDENTIFIER_LEN: usize = 32;

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,63}$")
        .expect("domain pattern is valid")
});

static IDENTIFIER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").expect("identifier pattern is valid"));

static PHP_VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+\.[0-9]+$").expect("php version pattern is valid"));

/// Check a hostname: dot-separated labels of 1-63 alphanumerics/hyphens
/// (no leading or trailing hyphen), alphabetic TLD, at most 253 characters.
///
/// Case-insensitive.
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > MAX_DOMAIN_LEN {
        return false;
    }
    DOMAIN_RE.is_match(&domain.to_ascii_lowercase())
}

/// Check a site/database/user identifier: letter first, then letters,
/// digits or underscores, at most [`MAX_IDENTIFIER_LEN`] characters.
pub fn is_valid_identifier(name: &str) -> bool {
    !name.is_empty() && name.len() <= MAX_IDENTIFIER_LEN && IDENTIFIER_RE.is_match(name)
}

/// Check a PHP version label like "8.3"
pub fn is_valid_php_version(version: &str) -> bool {
    PHP_VERSION_RE.is_match(version)
}

/// Validate an identifier, naming its kind in the error
pub fn require_identifier(name: &str, kind: &str) -> Result<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "invalid {kind} '{name}': use letters, digits and underscores, \
             starting with a letter, at most {MAX_IDENTIFIER_LEN} characters"
        )))
    }
}

/// Validate a primary domain and its aliases.
///
/// Returns the lowercased domains, primary first. Fails on the first
/// invalid domain or on a domain repeated within the request.
pub fn validate_domains(primary: &str, aliases: &[String]) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut domains = Vec::with_capacity(aliases.len() + 1);

    for (i, domain) in std::iter::once(primary)
        .chain(aliases.iter().map(String::as_str))
        .enumerate()
    {
        if !is_valid_domain(domain) {
            let role = if i == 0 { "primary domain" } else { "alias" };
            return Err(Error::Validation(format!("invalid {role}: '{domain}'")));
        }
        let lower = domain.to_ascii_lowercase();
        if !seen.insert(lower.clone()) {
            return Err(Error::Validation(format!("duplicate domain: '{domain}'")));
        }
        domains.push(lower);
    }

    Ok(domains)
}

/// Derive a valid identifier from a domain: non-alphanumerics become
/// underscores, a prefix is added, and the result is truncated.
///
/// `wp_` + "shop-1.example.com" → `wp_shop_1_example_com`
pub fn identifier_from_domain(prefix: &str, domain: &str) -> String {
    let mut ident: String = prefix
        .chars()
        .chain(domain.chars())
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    ident.truncate(MAX_IDENTIFIER_LEN);
    ident
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_domains() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("www.example.com"));
        assert!(is_valid_domain("sub.domain.example.com"));
        assert!(is_valid_domain("Example.COM"));
        assert!(is_valid_domain("xn--bcher-kva.example"));
        assert!(is_valid_domain("a-b.c-d.org"));
    }

    #[test]
    fn test_invalid_domains() {
        assert!(!is_valid_domain(""));
        assert!(!is_valid_domain("invalid"));
        assert!(!is_valid_domain(".example.com"));
        assert!(!is_valid_domain("example..com"));
        assert!(!is_valid_domain("-example.com"));
        assert!(!is_valid_domain("example-.com"));
        assert!(!is_valid_domain("example.com."));
        assert!(!is_valid_domain("example.c0m"));
    }

    #[test]
    fn test_label_and_total_length_limits() {
        let label63 = "a".repeat(63);
        let label64 = "a".repeat(64);
        assert!(is_valid_domain(&format!("{label63}.com")));
        assert!(!is_valid_domain(&format!("{label64}.com")));

        // 4 x 63-char labels + 4 dots + "com" = 259 chars
        let long = format!("{label63}.{label63}.{label63}.{label63}.com");
        assert!(long.len() > MAX_DOMAIN_LEN);
        assert!(!is_valid_domain(&long));
    }

    #[test]
    fn test_domain_rejects_shell_metacharacters() {
        for bad in [
            "example.com;rm -rf /",
            "example.com|cat",
            "ex`id`ample.com",
            "example .com",
            "example.com\n",
            "\texample.com",
            "$(id).example.com",
            "example.com&",
        ] {
            assert!(!is_valid_domain(bad), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_identifiers() {
        assert!(is_valid_identifier("example_db"));
        assert!(is_valid_identifier("user123"));
        assert!(is_valid_identifier(&"a".repeat(MAX_IDENTIFIER_LEN)));

        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("123leading"));
        assert!(!is_valid_identifier("has-dash"));
        assert!(!is_valid_identifier("has space"));
        assert!(!is_valid_identifier("db`; DROP"));
        assert!(!is_valid_identifier(&"a".repeat(MAX_IDENTIFIER_LEN + 1)));
    }

    #[test]
    fn test_validate_domains() {
        let domains = validate_domains("Example.com", &["www.example.com".to_string()]).unwrap();
        assert_eq!(domains, vec!["example.com", "www.example.com"]);

        let err = validate_domains("notadomain", &[]).unwrap_err();
        assert!(err.to_string().contains("invalid primary domain"));

        let err = validate_domains("example.com", &["EXAMPLE.com".to_string()]).unwrap_err();
        assert!(err.to_string().contains("duplicate domain"));

        let err = validate_domains("example.com", &["bad_alias".to_string()]).unwrap_err();
        assert!(err.to_string().contains("invalid alias"));
    }

    #[test]
    fn test_identifier_from_domain() {
        assert_eq!(
            identifier_from_domain("wp_", "shop-1.example.com"),
            "wp_shop_1_example_com"
        );
        let long = identifier_from_domain("wp_", &format!("{}.com", "a".repeat(60)));
        assert_eq!(long.len(), MAX_IDENTIFIER_LEN);
        assert!(is_valid_identifier(&long));
    }

    #[test]
    fn test_php_version() {
        assert!(is_valid_php_version("8.3"));
        assert!(!is_valid_php_version("8"));
        assert!(!is_valid_php_version("8.3; id"));
    }
}
