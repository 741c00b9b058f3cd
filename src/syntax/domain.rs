/// IDNA conversion + label checks. Pushes invalidating reasons into `reasons`
/// and returns the lower-cased ASCII form when conversion succeeded.
pub(crate) fn check_domain(domain: &str, reasons: &mut Vec<String>) -> Option<String> {
    if domain.is_empty() {
        reasons.push("domain part is empty".to_string());
        return None;
    }

    let domain_ascii = match idna::domain_to_ascii(domain) {
        Ok(d) => d.to_ascii_lowercase(),
        Err(_) => {
            reasons.push("domain punycode conversion failed".to_string());
            return None;
        }
    };

    if domain_ascii.is_empty() {
        reasons.push("domain empty after IDNA conversion".to_string());
        return None;
    }

    if !domain_ascii.contains('.') {
        reasons.push("domain must contain at least one dot".to_string());
    }

    let mut labels = domain_ascii.split('.').peekable();
    while let Some(label) = labels.next() {
        if label.is_empty() {
            reasons.push("empty domain label".to_string());
            continue;
        }
        if label.len() > 63 {
            reasons.push(format!(
                "domain label '{}' length {} > 63",
                label,
                label.len()
            ));
        }
        if label.starts_with('-') || label.ends_with('-') {
            reasons.push(format!(
                "domain label '{}' cannot start/end with '-'",
                label
            ));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            reasons.push(format!("domain label '{}' has invalid chars", label));
        }
        if labels.peek().is_none() && domain_ascii.contains('.') && !is_valid_tld(label) {
            reasons.push(format!("top-level domain '{}' is not valid", label));
        }
    }

    Some(domain_ascii)
}

fn is_valid_tld(label: &str) -> bool {
    label.starts_with("xn--") || (label.len() >= 2 && label.chars().all(|c| c.is_ascii_alphabetic()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_domain_ok() {
        let mut reasons = vec![];
        let ascii = check_domain("Example.COM", &mut reasons);
        assert!(reasons.is_empty(), "{:?}", reasons);
        assert_eq!(ascii.as_deref(), Some("example.com"));
    }

    #[test]
    fn label_too_long() {
        let long = "a".repeat(64);
        let mut reasons = vec![];
        check_domain(&format!("{}.com", long), &mut reasons);
        assert!(!reasons.is_empty());
    }

    #[test]
    fn numeric_tld_rejected() {
        let mut reasons = vec![];
        check_domain("example.123", &mut reasons);
        assert!(reasons.iter().any(|r| r.contains("top-level")));
    }

    #[test]
    fn idn_domain_converted() {
        let mut reasons = vec![];
        let ascii = check_domain("exämple.com", &mut reasons);
        assert!(reasons.is_empty(), "{:?}", reasons);
        assert!(ascii.expect("ascii").starts_with("xn--"));
    }
}
