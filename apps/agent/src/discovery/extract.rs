//! Email extraction, filtering, and ranking primitives.

use std::sync::OnceLock;

use regex::Regex;
use url::Url;

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}")
            .expect("email pattern compiles")
    })
}

/// Domains that show up in page chrome, trackers, and CDNs, never as a real
/// hiring contact.
const SKIP_DOMAINS: &[&str] = &[
    "example.com",
    "test.com",
    "linkedin.com",
    "licdn.com",
    "facebook.com",
    "twitter.com",
    "x.com",
    "google.com",
    "googleapis.com",
    "github.com",
    "githubusercontent.com",
    "sentry.io",
    "gravatar.com",
    "wp.com",
    "wordpress.com",
    "w3.org",
    "schema.org",
    "cloudflare.com",
    "amazonaws.com",
    "gstatic.com",
    "bootstrapcdn.com",
    "jquery.com",
];

/// Local parts that cannot receive an application.
const SKIP_PREFIXES: &[&str] = &[
    "noreply",
    "no-reply",
    "donotreply",
    "do-not-reply",
    "mailer-daemon",
    "postmaster",
    "webmaster",
    "admin",
    "support",
    "abuse",
    "security",
    "privacy",
];

/// Local-part substrings that mark a hiring inbox, in pattern-guess order.
pub const HR_PREFIXES: &[&str] = &[
    "hr",
    "careers",
    "jobs",
    "hiring",
    "recruiting",
    "recruitment",
    "talent",
    "apply",
    "career",
    "people",
];

/// Paths tried on an employer site, most likely to carry a contact first.
pub const CAREER_PATHS: &[&str] = &[
    "/careers",
    "/jobs",
    "/contact",
    "/about",
    "/contact-us",
    "/about-us",
    "/work-with-us",
    "/join-us",
    "/join",
    "/hiring",
];

/// Whether an address is worth sending an application to.
pub fn is_plausible_contact(email: &str) -> bool {
    let lower = email.to_lowercase();
    let Some((prefix, domain)) = lower.split_once('@') else {
        return false;
    };

    if SKIP_DOMAINS.contains(&domain) {
        return false;
    }
    if SKIP_PREFIXES.contains(&prefix) {
        return false;
    }
    // Regex matches can swallow adjacent image filenames.
    if domain.ends_with(".png") || domain.ends_with(".jpg") || domain.ends_with(".gif") {
        return false;
    }
    if email.len() > 80 {
        return false;
    }
    true
}

/// All plausible contact addresses in `text`, lowercased, first occurrence
/// order, deduplicated.
pub fn extract_emails(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for m in email_regex().find_iter(text) {
        let email = m.as_str().to_lowercase();
        if is_plausible_contact(&email) && seen.insert(email.clone()) {
            out.push(email);
        }
    }
    out
}

/// Reorders addresses so hiring inboxes come first. Stable within each group.
pub fn rank_addresses(emails: Vec<String>) -> Vec<String> {
    let (hr, other): (Vec<String>, Vec<String>) = emails.into_iter().partition(|email| {
        let prefix = email.split('@').next().unwrap_or("").to_lowercase();
        HR_PREFIXES.iter().any(|hr| prefix.contains(hr))
    });
    hr.into_iter().chain(other).collect()
}

/// Guessed hiring addresses for a domain, most common prefixes first.
pub fn hr_pattern_addresses(domain: &str) -> Vec<String> {
    HR_PREFIXES
        .iter()
        .take(6)
        .map(|prefix| format!("{prefix}@{domain}"))
        .collect()
}

/// Last-resort guess at an employer's website from its name.
pub fn guessed_site(employer: &str) -> Option<String> {
    let slug: String = employer
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    if slug.is_empty() {
        return None;
    }
    Some(format!("https://www.{slug}.com"))
}

/// The registrable-ish host of a URL with any leading `www.` stripped.
pub fn domain_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}
