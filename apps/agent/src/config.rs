use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables (and `.env`
/// when present). Required variables fail fast at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub anthropic_api_key: String,
    /// X API v2 bearer token; the Twitter feed skips itself when unset.
    pub twitter_bearer_token: Option<String>,
    pub profile: ProfileConfig,
    pub search: SearchConfig,
    pub email: EmailConfig,
    pub limits: LimitsConfig,
    pub schedule: ScheduleConfig,
    pub rust_log: String,
}

/// The candidate on whose behalf applications are sent.
#[derive(Debug, Clone)]
pub struct ProfileConfig {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub resume_pdf: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceLevel {
    Junior,
    Mid,
    Senior,
}

impl ExperienceLevel {
    /// LinkedIn's `f_E` experience filter code.
    pub fn linkedin_code(&self) -> &'static str {
        match self {
            ExperienceLevel::Junior => "2",
            ExperienceLevel::Mid => "3",
            ExperienceLevel::Senior => "4",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub keywords: Vec<String>,
    pub locations: Vec<String>,
    pub experience_level: ExperienceLevel,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            keywords: vec![
                "full stack developer".to_string(),
                "software engineer".to_string(),
                "react developer".to_string(),
                "node.js developer".to_string(),
            ],
            locations: vec!["remote".to_string()],
            experience_level: ExperienceLevel::Mid,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub address: String,
    pub app_password: String,
    pub sender_name: String,
}

#[derive(Debug, Clone, Copy)]
pub struct LimitsConfig {
    pub max_per_run: u32,
    pub max_per_day: u32,
}

#[derive(Debug, Clone, Copy)]
pub struct ScheduleConfig {
    pub interval_hours: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_vars(&|key| std::env::var(key).ok())
    }

    /// The actual loader, over an arbitrary variable lookup so tests don't
    /// have to touch the process environment.
    fn from_vars(get: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let search = SearchConfig {
            keywords: env_list(get, "SEARCH_KEYWORDS")
                .unwrap_or_else(|| SearchConfig::default().keywords),
            locations: env_list(get, "SEARCH_LOCATIONS")
                .unwrap_or_else(|| SearchConfig::default().locations),
            experience_level: parse_experience(
                &get("EXPERIENCE_LEVEL").unwrap_or_else(|| "mid".to_string()),
            )?,
        };

        Ok(Config {
            db_path: PathBuf::from(
                get("DATABASE_PATH").unwrap_or_else(|| "jobs.db".to_string()),
            ),
            anthropic_api_key: require_env(get, "ANTHROPIC_API_KEY")?,
            twitter_bearer_token: get("TWITTER_BEARER_TOKEN").filter(|t| !t.trim().is_empty()),
            profile: ProfileConfig {
                name: require_env(get, "CANDIDATE_NAME")?,
                email: require_env(get, "CANDIDATE_EMAIL")?,
                phone: get("CANDIDATE_PHONE").unwrap_or_default(),
                resume_pdf: PathBuf::from(
                    get("RESUME_PDF").unwrap_or_else(|| "resume.pdf".to_string()),
                ),
            },
            search,
            email: EmailConfig {
                smtp_host: get("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
                smtp_port: env_parsed(get, "SMTP_PORT", 587u16)?,
                address: require_env(get, "SMTP_ADDRESS")?,
                app_password: require_env(get, "SMTP_APP_PASSWORD")?,
                sender_name: get("SMTP_SENDER_NAME")
                    .or_else(|| get("CANDIDATE_NAME"))
                    .context("SMTP_SENDER_NAME or CANDIDATE_NAME must be set")?,
            },
            limits: LimitsConfig {
                max_per_run: env_parsed(get, "MAX_APPLICATIONS_PER_RUN", 10u32)?,
                max_per_day: env_parsed(get, "MAX_APPLICATIONS_PER_DAY", 30u32)?,
            },
            schedule: ScheduleConfig {
                interval_hours: env_parsed(get, "SCHEDULE_INTERVAL_HOURS", 6u64)?,
            },
            rust_log: get("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn require_env(get: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<String> {
    get(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Comma-separated list variable; `None` when unset or blank.
fn env_list(get: &dyn Fn(&str) -> Option<String>, key: &str) -> Option<Vec<String>> {
    let raw = get(key)?;
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

fn env_parsed<T: std::str::FromStr>(
    get: &dyn Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("'{key}' is invalid: {e}")),
        None => Ok(default),
    }
}

fn parse_experience(raw: &str) -> Result<ExperienceLevel> {
    match raw.trim().to_lowercase().as_str() {
        "junior" => Ok(ExperienceLevel::Junior),
        "mid" => Ok(ExperienceLevel::Mid),
        "senior" => Ok(ExperienceLevel::Senior),
        other => anyhow::bail!("EXPERIENCE_LEVEL must be junior|mid|senior, got '{other}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experience_level_parses() {
        assert_eq!(parse_experience("senior").unwrap(), ExperienceLevel::Senior);
        assert_eq!(parse_experience(" Mid ").unwrap(), ExperienceLevel::Mid);
        assert!(parse_experience("principal").is_err());
    }

    #[test]
    fn test_experience_level_linkedin_codes() {
        assert_eq!(ExperienceLevel::Junior.linkedin_code(), "2");
        assert_eq!(ExperienceLevel::Mid.linkedin_code(), "3");
        assert_eq!(ExperienceLevel::Senior.linkedin_code(), "4");
    }

    #[test]
    fn test_default_search_config() {
        let search = SearchConfig::default();
        assert!(!search.keywords.is_empty());
        assert_eq!(search.locations, vec!["remote".to_string()]);
    }

    fn vars<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("ANTHROPIC_API_KEY", "sk-test"),
        ("CANDIDATE_NAME", "Jane Doe"),
        ("CANDIDATE_EMAIL", "jane@example.org"),
        ("SMTP_ADDRESS", "jane@example.org"),
        ("SMTP_APP_PASSWORD", "hunter2"),
    ];

    #[test]
    fn test_load_errors_on_missing_required_variable() {
        let without_key: Vec<_> = REQUIRED
            .iter()
            .copied()
            .filter(|(k, _)| *k != "ANTHROPIC_API_KEY")
            .collect();
        let err = Config::from_vars(&vars(&without_key)).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_load_applies_defaults() {
        let config = Config::from_vars(&vars(REQUIRED)).unwrap();
        assert_eq!(config.db_path, PathBuf::from("jobs.db"));
        assert_eq!(config.email.smtp_host, "smtp.gmail.com");
        assert_eq!(config.email.smtp_port, 587);
        assert_eq!(config.email.sender_name, "Jane Doe");
        assert_eq!(config.limits.max_per_run, 10);
        assert_eq!(config.limits.max_per_day, 30);
        assert_eq!(config.schedule.interval_hours, 6);
        assert!(config.twitter_bearer_token.is_none());
        assert_eq!(config.search.experience_level, ExperienceLevel::Mid);
    }

    #[test]
    fn test_load_rejects_unparseable_number() {
        let mut pairs: Vec<_> = REQUIRED.to_vec();
        pairs.push(("MAX_APPLICATIONS_PER_RUN", "many"));
        let err = Config::from_vars(&vars(&pairs)).unwrap_err();
        assert!(err.to_string().contains("MAX_APPLICATIONS_PER_RUN"));
    }
}
