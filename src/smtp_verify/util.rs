use rand::{Rng, distributions::Alphanumeric};

use crate::smtp_verify::types::MailboxVerdict;

pub fn random_local_part(len: usize) -> String {
    let length = len.clamp(10, 32);
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}

pub fn confidence_for(verdict: &MailboxVerdict) -> f32 {
    match verdict {
        MailboxVerdict::Deliverable | MailboxVerdict::Rejected => 0.95,
        MailboxVerdict::CatchAll => 0.7,
        _ => 0.4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_local_part_is_lowercase_alphanumeric() {
        let local = random_local_part(3);
        assert_eq!(local.len(), 10);
        assert!(
            local
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
        assert_ne!(random_local_part(12), random_local_part(12));
    }

    #[test]
    fn conclusive_verdicts_are_most_confident() {
        assert!(confidence_for(&MailboxVerdict::Deliverable) > confidence_for(&MailboxVerdict::CatchAll));
        assert!(confidence_for(&MailboxVerdict::CatchAll) > confidence_for(&MailboxVerdict::Unreachable));
    }
}
