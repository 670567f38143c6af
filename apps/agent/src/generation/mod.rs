//! Application email generation.
//!
//! Generation never fails the pipeline: any LLM error or unparseable response
//! falls back to a template filled from the candidate profile.

pub mod prompts;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::ProfileConfig;
use crate::llm_client::LlmClient;
use crate::models::JobRecord;

const MAX_DESCRIPTION_CHARS: usize = 3000;
const MAX_RESUME_CHARS: usize = 4000;

/// Produces the (subject, body) of an application email for a job.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        job: &JobRecord,
        resume_text: &str,
        profile: &ProfileConfig,
    ) -> (String, String);
}

pub struct LlmGenerator {
    llm: LlmClient,
}

impl LlmGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentGenerator for LlmGenerator {
    async fn generate(
        &self,
        job: &JobRecord,
        resume_text: &str,
        profile: &ProfileConfig,
    ) -> (String, String) {
        let title = clean_for_email(&job.title);
        let employer = clean_for_email(&job.employer);

        let prompt = build_prompt(job, &title, &employer, resume_text, profile);

        match self.llm.call(&prompt, prompts::SYSTEM_PROMPT).await {
            Ok(response) => {
                if let Some(text) = response.text() {
                    if let Some((subject, body)) = parse_response(text) {
                        info!("Generated email for: {} at {}", title, employer);
                        return (clean_for_email(&subject), body);
                    }
                    warn!("Could not parse LLM response, using fallback");
                } else {
                    warn!("Empty LLM response, using fallback");
                }
            }
            Err(err) => {
                warn!("LLM call failed: {}. Using fallback template", err);
            }
        }

        fallback_email(&title, &employer, profile)
    }
}

fn build_prompt(
    job: &JobRecord,
    title: &str,
    employer: &str,
    resume_text: &str,
    profile: &ProfileConfig,
) -> String {
    let location = if job.location.is_empty() {
        "Not specified"
    } else {
        job.location.as_str()
    };
    let description = if job.description.is_empty() {
        "No description available"
    } else {
        truncate_chars(&job.description, MAX_DESCRIPTION_CHARS)
    };
    let resume = if resume_text.is_empty() {
        "No resume provided"
    } else {
        truncate_chars(resume_text, MAX_RESUME_CHARS)
    };

    prompts::EMAIL_PROMPT_TEMPLATE
        .replace("{job_title}", title)
        .replace("{employer}", employer)
        .replace("{location}", location)
        .replace("{description}", description)
        .replace("{resume_text}", resume)
        .replace("{candidate_name}", &profile.name)
        .replace("{candidate_email}", &profile.email)
        .replace("{candidate_phone}", &profile.phone)
}

pub fn fallback_email(title: &str, employer: &str, profile: &ProfileConfig) -> (String, String) {
    let subject = prompts::FALLBACK_SUBJECT
        .replace("{job_title}", title)
        .replace("{employer}", employer);
    let body = prompts::FALLBACK_BODY
        .replace("{job_title}", title)
        .replace("{employer}", employer)
        .replace("{candidate_name}", &profile.name)
        .replace("{candidate_email}", &profile.email)
        .replace("{candidate_phone}", &profile.phone);
    (subject, body)
}

/// Parses a `SUBJECT: ... / BODY: ...` response. Both markers are matched
/// case-insensitively; `None` when either part is missing or empty.
pub fn parse_response(text: &str) -> Option<(String, String)> {
    let lines: Vec<&str> = text.trim().lines().collect();

    let mut subject = String::new();
    let mut body_start = 0;
    for (i, line) in lines.iter().enumerate() {
        let stripped = line.trim();
        if stripped.to_uppercase().starts_with("SUBJECT:") {
            subject = stripped["SUBJECT:".len()..].trim().to_string();
            body_start = i + 1;
            break;
        }
    }

    let rest = &lines[body_start.min(lines.len())..];
    let body_marker = rest
        .iter()
        .position(|line| line.trim().to_uppercase().starts_with("BODY:"));
    let remaining = match body_marker {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    let body = remaining.join("\n").trim().to_string();

    if subject.is_empty() || body.is_empty() {
        None
    } else {
        Some((subject, body))
    }
}

/// Strips hashtags, collapses whitespace, and trims stray edge pipes from
/// scraped text before it lands in an email.
pub fn clean_for_email(text: &str) -> String {
    use regex::Regex;
    use std::sync::OnceLock;

    static HASHTAG: OnceLock<Regex> = OnceLock::new();
    static SPACES: OnceLock<Regex> = OnceLock::new();

    let hashtag = HASHTAG.get_or_init(|| Regex::new(r"#\w+").expect("hashtag pattern compiles"));
    let spaces = SPACES.get_or_init(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

    let cleaned = hashtag.replace_all(text, "");
    let cleaned = spaces.replace_all(&cleaned, " ");
    cleaned
        .trim()
        .trim_start_matches('|')
        .trim_end_matches('|')
        .trim()
        .to_string()
}

/// Char-boundary-safe prefix of at most `max` characters.
fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ProfileConfig {
        ProfileConfig {
            name: "Jane Doe".to_string(),
            email: "jane@example.org".to_string(),
            phone: "+1 555 0100".to_string(),
            resume_pdf: "resume.pdf".into(),
        }
    }

    #[test]
    fn test_parse_well_formed_response() {
        let text = "SUBJECT: Application for Engineer\n\nBODY:\nDear team,\n\nHello.\n";
        let (subject, body) = parse_response(text).unwrap();
        assert_eq!(subject, "Application for Engineer");
        assert_eq!(body, "Dear team,\n\nHello.");
    }

    #[test]
    fn test_parse_is_case_insensitive_on_markers() {
        let text = "subject: Hi there\nbody:\nSome body text";
        let (subject, body) = parse_response(text).unwrap();
        assert_eq!(subject, "Hi there");
        assert_eq!(body, "Some body text");
    }

    #[test]
    fn test_parse_without_body_marker_uses_remainder() {
        let text = "SUBJECT: Hi\nDear team,\nregards";
        let (subject, body) = parse_response(text).unwrap();
        assert_eq!(subject, "Hi");
        assert_eq!(body, "Dear team,\nregards");
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        assert!(parse_response("just some prose with no markers").is_none());
        assert!(parse_response("SUBJECT: Hi\nBODY:\n").is_none());
    }

    #[test]
    fn test_fallback_carries_profile_fields() {
        let (subject, body) = fallback_email("Engineer", "Acme", &profile());
        assert_eq!(subject, "Application for Engineer at Acme");
        assert!(body.contains("Engineer"));
        assert!(body.contains("Acme"));
        assert!(body.contains("Jane Doe"));
        assert!(body.contains("jane@example.org"));
        assert!(body.contains("+1 555 0100"));
    }

    #[test]
    fn test_clean_strips_hashtags_and_pipes() {
        assert_eq!(
            clean_for_email("| Senior  Engineer #hiring #remote |"),
            "Senior Engineer"
        );
        assert_eq!(clean_for_email("Acme   Corp"), "Acme Corp");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "héllo wörld";
        assert_eq!(truncate_chars(text, 4), "héll");
        assert_eq!(truncate_chars("short", 100), "short");
    }
}
