use phf::phf_map;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProviderKind {
    Free,
    Business,
    Custom,
}

/// Mail hosting inferred from the MX hosts of a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailProvider {
    #[serde(rename = "type")]
    pub kind: ProviderKind,
    pub name: Option<String>,
}

impl EmailProvider {
    fn custom() -> Self {
        Self {
            kind: ProviderKind::Custom,
            name: None,
        }
    }
}

// Keyed by MX host suffix; the longest matching suffix wins.
static MX_PROVIDERS: phf::Map<&'static str, (ProviderKind, &'static str)> = phf_map! {
    "gmail-smtp-in.l.google.com" => (ProviderKind::Free, "Gmail"),
    "googlemail.com" => (ProviderKind::Free, "Gmail"),
    "aspmx.l.google.com" => (ProviderKind::Business, "Google Workspace"),
    "google.com" => (ProviderKind::Business, "Google Workspace"),
    "olc.protection.outlook.com" => (ProviderKind::Free, "Outlook"),
    "hotmail.com" => (ProviderKind::Free, "Outlook"),
    "outlook.com" => (ProviderKind::Free, "Outlook"),
    "protection.outlook.com" => (ProviderKind::Business, "Microsoft 365"),
    "outlook.office365.com" => (ProviderKind::Business, "Microsoft 365"),
    "yahoodns.net" => (ProviderKind::Free, "Yahoo"),
    "yahoo.com" => (ProviderKind::Free, "Yahoo"),
    "mx.aol.com" => (ProviderKind::Free, "AOL"),
    "icloud.com" => (ProviderKind::Free, "iCloud"),
    "me.com" => (ProviderKind::Free, "iCloud"),
    "protonmail.ch" => (ProviderKind::Free, "ProtonMail"),
    "yandex.net" => (ProviderKind::Free, "Yandex"),
    "yandex.ru" => (ProviderKind::Free, "Yandex"),
    "zoho.com" => (ProviderKind::Free, "Zoho"),
    "messagingengine.com" => (ProviderKind::Free, "Fastmail"),
    "tutanota.de" => (ProviderKind::Free, "Tutanota"),
    "amazonaws.com" => (ProviderKind::Business, "Amazon SES"),
    "sendgrid.net" => (ProviderKind::Business, "SendGrid"),
    "mailgun.org" => (ProviderKind::Business, "Mailgun"),
    "postmarkapp.com" => (ProviderKind::Business, "Postmark"),
    "mandrillapp.com" => (ProviderKind::Business, "Mandrill"),
    "mailchimp.com" => (ProviderKind::Business, "Mailchimp"),
};

fn lookup_host(host: &str) -> Option<(ProviderKind, &'static str)> {
    let host = host.trim_end_matches('.');
    let mut rest = host;
    loop {
        if let Some(hit) = MX_PROVIDERS.get(rest) {
            return Some(*hit);
        }
        match rest.split_once('.') {
            Some((_, tail)) if tail.contains('.') => rest = tail,
            _ => return None,
        }
    }
}

/// First MX host (in preference order) with a known provider decides.
pub fn detect_provider(hosts: &[String]) -> EmailProvider {
    hosts
        .iter()
        .find_map(|host| lookup_host(&host.to_ascii_lowercase()))
        .map(|(kind, name)| EmailProvider {
            kind,
            name: Some(name.to_string()),
        })
        .unwrap_or_else(EmailProvider::custom)
}
