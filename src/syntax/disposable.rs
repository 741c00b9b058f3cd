use phf::phf_set;

/// Well-known throwaway mailbox providers.
static DISPOSABLE_DOMAINS: phf::Set<&'static str> = phf_set! {
    "10minutemail.com",
    "20minutemail.com",
    "30minutemail.com",
    "1secmail.com",
    "guerrillamail.com",
    "guerrillamailblock.com",
    "sharklasers.com",
    "pokemail.net",
    "spam4.me",
    "mailinator.com",
    "maildrop.cc",
    "mailnesia.com",
    "mytrashmail.com",
    "tempmail.org",
    "tempmail.net",
    "temp-mail.org",
    "tempail.com",
    "throwaway.email",
    "getnada.com",
    "nada.email",
    "dispostable.com",
    "trashmail.com",
    "trashmail.net",
    "trashymail.com",
    "yopmail.com",
    "yopmail.net",
    "yopmail.org",
    "mohmal.com",
    "meltmail.com",
    "anonmails.de",
    "armyspy.com",
    "binkmail.com",
    "bccto.me",
    "chacuo.net",
};

/// True when `ascii_domain` (or one of its parent domains) is a known
/// disposable provider.
pub fn is_disposable_domain(ascii_domain: &str) -> bool {
    let domain = ascii_domain.trim_end_matches('.');
    let mut candidate = domain;
    loop {
        if DISPOSABLE_DOMAINS.contains(candidate) {
            return true;
        }
        match candidate.split_once('.') {
            Some((_, rest)) if rest.contains('.') => candidate = rest,
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_subdomain_match() {
        assert!(is_disposable_domain("mailinator.com"));
        assert!(is_disposable_domain("eu.mailinator.com"));
        assert!(!is_disposable_domain("example.com"));
        assert!(!is_disposable_domain("com"));
    }
}
