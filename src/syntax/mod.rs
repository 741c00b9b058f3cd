//! Structural validation of an address. Pure and synchronous: invalid input
//! yields a failing [`CheckResult`], never an error.

mod disposable;
mod domain;
mod local;

pub use disposable::is_disposable_domain;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::check::{CheckResult, Stage};
use domain::check_domain;
use local::check_local;

const MAX_ADDRESS_LEN: usize = 254;

/// An address that passed the structural checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedAddress {
    pub local: String,
    /// Lower-cased domain as written (may contain Unicode).
    pub domain: String,
    /// IDNA/punycode form used for DNS and SMTP.
    pub ascii_domain: String,
}

impl NormalizedAddress {
    /// `local@domain` with the domain case-normalized.
    pub fn email(&self) -> String {
        format!("{}@{}", self.local, self.domain)
    }

    /// Address used on the wire (ASCII domain).
    pub fn ascii_email(&self) -> String {
        format!("{}@{}", self.local, self.ascii_domain)
    }
}

/// Splits, normalizes and checks `raw`, returning every reason it is unusable.
pub fn parse_address(raw: &str) -> Result<NormalizedAddress, Vec<String>> {
    let input = raw.trim();
    let mut reasons = Vec::new();

    if input.len() > MAX_ADDRESS_LEN {
        reasons.push(format!("total length {} > {MAX_ADDRESS_LEN}", input.len()));
    }

    let parts: Vec<&str> = input.split('@').collect();
    if parts.len() != 2 {
        reasons.push("must contain exactly one '@'".to_string());
        return Err(reasons);
    }
    let (local, domain) = (parts[0], parts[1]);

    check_local(local, &mut reasons);
    let ascii_domain = check_domain(domain, &mut reasons);

    match ascii_domain {
        Some(ascii_domain) if reasons.is_empty() => Ok(NormalizedAddress {
            local: local.to_string(),
            domain: domain.to_lowercase(),
            ascii_domain,
        }),
        _ => Err(reasons),
    }
}

/// Checks only the domain part with the same rules as [`parse_address`].
pub fn parse_domain(raw: &str) -> Result<String, Vec<String>> {
    let mut reasons = Vec::new();
    let ascii = check_domain(raw.trim(), &mut reasons);
    match ascii {
        Some(ascii) if reasons.is_empty() => Ok(ascii),
        _ => Err(reasons),
    }
}

/// Syntax stage entry point.
pub fn check_syntax(raw: &str) -> CheckResult {
    match parse_address(raw) {
        Ok(address) => syntax_result(&address),
        Err(reasons) => syntax_failure(&reasons),
    }
}

pub(crate) fn syntax_failure(reasons: &[String]) -> CheckResult {
    CheckResult::fail(
        Stage::Syntax,
        format!("email syntax is invalid: {}", reasons.join("; ")),
    )
    .with_detail("error_type", "syntax_error")
    .with_detail("reasons", json!(reasons))
}

pub(crate) fn syntax_result(address: &NormalizedAddress) -> CheckResult {
    CheckResult::pass(Stage::Syntax, "email syntax is valid")
        .with_detail("normalized_email", address.email())
        .with_detail("local_part", address.local.as_str())
        .with_detail("domain", address.domain.as_str())
        .with_detail("ascii_domain", address.ascii_domain.as_str())
        .with_detail("is_disposable", is_disposable_domain(&address.ascii_domain))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_basic() {
        let r = check_syntax("user@example.com");
        assert!(r.valid, "{}", r.message);
        assert_eq!(r.stage, Stage::Syntax);
        assert_eq!(r.detail_str("normalized_email"), Some("user@example.com"));
        assert_eq!(r.detail_str("local_part"), Some("user"));
        assert_eq!(r.detail_str("domain"), Some("example.com"));
    }

    #[test]
    fn trims_and_lowercases_domain_only() {
        let r = check_syntax("  John.Doe@Example.COM \n");
        assert!(r.valid, "{}", r.message);
        assert_eq!(r.detail_str("normalized_email"), Some("John.Doe@example.com"));
    }

    #[test]
    fn rejects_double_at() {
        let r = check_syntax("a@@b.com");
        assert!(!r.valid);
        assert!(r.message.contains("exactly one '@'"));
        assert_eq!(r.detail_str("error_type"), Some("syntax_error"));
    }

    #[test]
    fn rejects_domain_without_dot() {
        let r = check_syntax("user@localhost");
        assert!(!r.valid);
        assert!(r.message.contains("at least one dot"));
    }

    #[test]
    fn flags_disposable_domain_without_failing() {
        let r = check_syntax("someone@mailinator.com");
        assert!(r.valid);
        assert_eq!(r.detail_bool("is_disposable"), Some(true));
    }

    #[test]
    fn parse_domain_rejects_garbage() {
        assert_eq!(parse_domain("Example.org").as_deref(), Ok("example.org"));
        assert!(parse_domain("exa mple.org").is_err());
        assert!(parse_domain("").is_err());
    }

    proptest! {
        #[test]
        fn without_at_sign_is_invalid(s in "[^@]{0,80}") {
            prop_assert!(!check_syntax(&s).valid);
        }

        #[test]
        fn empty_local_part_is_invalid(domain in "[a-z]{1,12}\\.[a-z]{2,6}") {
            let input = format!("@{domain}");
            prop_assert!(!check_syntax(&input).valid);
        }

        #[test]
        fn empty_domain_is_invalid(local in "[a-z0-9]{1,20}") {
            let input = format!("{local}@");
            prop_assert!(!check_syntax(&input).valid);
        }

        #[test]
        fn simple_addresses_are_valid(local in "[a-z0-9]{1,20}", domain in "[a-z]{1,12}\\.[a-z]{2,6}") {
            let input = format!("{local}@{domain}");
            let result = check_syntax(&input);
            prop_assert!(result.valid, "{}", result.message);
            prop_assert_eq!(result.detail_str("normalized_email"), Some(input.as_str()));
        }
    }
}
