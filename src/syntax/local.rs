/// atext ASCII + '.' non initial/terminal, no "..".
pub(crate) fn is_local_valid(s: &str) -> bool {
    if s.starts_with('.') || s.ends_with('.') || s.contains("..") {
        return false;
    }
    s.chars().all(|c| {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                '!' | '#'
                    | '$'
                    | '%'
                    | '&'
                    | '\''
                    | '*'
                    | '+'
                    | '-'
                    | '/'
                    | '='
                    | '?'
                    | '^'
                    | '_'
                    | '`'
                    | '{'
                    | '|'
                    | '}'
                    | '~'
                    | '.'
            )
    })
}

/// Pushes the reasons the local part is unusable into `reasons`.
pub(crate) fn check_local(local: &str, reasons: &mut Vec<String>) {
    if local.is_empty() || local.len() > 64 {
        reasons.push(format!(
            "local part length {} invalid (1..=64)",
            local.len()
        ));
        return;
    }
    if !is_local_valid(local) {
        reasons.push("local part has disallowed characters or dot placement".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dots_placement() {
        assert!(!is_local_valid(".abc"));
        assert!(!is_local_valid("abc."));
        assert!(!is_local_valid("a..b"));
        assert!(is_local_valid("a.b"));
    }

    #[test]
    fn quoted_and_spaces_rejected() {
        assert!(!is_local_valid("\"a b\""));
        assert!(!is_local_valid("a b"));
        assert!(is_local_valid("first+tag"));
    }

    #[test]
    fn empty_local_reports_length() {
        let mut reasons = vec![];
        check_local("", &mut reasons);
        assert_eq!(reasons.len(), 1);
        assert!(reasons[0].contains("length 0"));
    }
}
