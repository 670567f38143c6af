//! Priority scoring and one-per-employer selection.
//!
//! Scoring is a pure function of the posting's text. Selection collapses a
//! candidate batch to at most one job per employer, skipping employers that
//! have already been contacted.

use std::collections::{HashMap, HashSet};

use crate::models::JobRecord;

/// JS/TS ecosystem markers anywhere in title + description.
const ECOSYSTEM_KEYWORDS: &[&str] = &[
    "javascript",
    "typescript",
    "js ",
    "ts ",
    "react",
    "node.js",
    "nodejs",
    "next.js",
    "nextjs",
    "nestjs",
];

const FULL_STACK_KEYWORDS: &[&str] = &["full stack", "fullstack", "full-stack"];
const FRONTEND_KEYWORDS: &[&str] = &["frontend", "front-end", "front end"];
const BACKEND_KEYWORDS: &[&str] = &["backend", "back-end", "back end"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}

/// Scores a job by role preference (higher = better).
///
/// +100 for JS/TS ecosystem keywords; +50/+30/+20 for full-stack / frontend /
/// backend in the title, mutually exclusive in that priority order; +40 for
/// React Native anywhere.
pub fn priority_score(job: &JobRecord) -> u32 {
    let title = job.title.to_lowercase();
    let combined = format!("{} {}", title, job.description.to_lowercase());

    let mut score = 0;

    if contains_any(&combined, ECOSYSTEM_KEYWORDS) {
        score += 100;
    }

    if contains_any(&title, FULL_STACK_KEYWORDS) {
        score += 50;
    } else if contains_any(&title, FRONTEND_KEYWORDS) {
        score += 30;
    } else if contains_any(&title, BACKEND_KEYWORDS) {
        score += 20;
    }

    if combined.contains("react native") {
        score += 40;
    }

    score
}

/// Keeps the highest-scoring job per employer, dropping employers in
/// `contacted`. Ties keep whichever job was encountered first, and output
/// order follows the first occurrence of each winning employer.
pub fn select_one_per_employer(
    jobs: Vec<JobRecord>,
    contacted: &HashSet<String>,
) -> Vec<JobRecord> {
    let mut order: Vec<String> = Vec::new();
    let mut best: HashMap<String, (JobRecord, u32)> = HashMap::new();

    for job in jobs {
        let key = job.employer_key();
        if contacted.contains(&key) {
            continue;
        }
        let score = priority_score(&job);
        match best.get(&key) {
            None => {
                order.push(key.clone());
                best.insert(key, (job, score));
            }
            Some((_, current)) if score > *current => {
                best.insert(key, (job, score));
            }
            Some(_) => {}
        }
    }

    order
        .into_iter()
        .filter_map(|key| best.remove(&key))
        .map(|(job, _)| job)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Source;
    use chrono::Utc;

    fn job(title: &str, employer: &str, description: &str) -> JobRecord {
        JobRecord {
            title: title.to_string(),
            employer: employer.to_string(),
            location: String::new(),
            description: description.to_string(),
            contact_email: "hr@example.org".to_string(),
            source: Source::Linkedin,
            source_id: String::new(),
            source_url: String::new(),
            discovered_at: Utc::now(),
        }
    }

    #[test]
    fn test_ecosystem_keyword_scores_100() {
        assert_eq!(priority_score(&job("TypeScript Engineer", "A", "")), 100);
        assert_eq!(priority_score(&job("Engineer", "A", "we use React")), 100);
    }

    #[test]
    fn test_role_keywords_are_mutually_exclusive_in_priority_order() {
        // Title matches both full-stack and backend; only the 50 applies.
        let j = job("Full Stack / Backend Engineer", "A", "");
        assert_eq!(priority_score(&j), 50);

        let j = job("Frontend and Backend Engineer", "A", "");
        assert_eq!(priority_score(&j), 30);

        let j = job("Backend Engineer", "A", "");
        assert_eq!(priority_score(&j), 20);
    }

    #[test]
    fn test_react_native_bonus_stacks() {
        let j = job("Full Stack Developer", "A", "React Native experience required");
        // 100 (react) + 50 (full stack) + 40 (react native)
        assert_eq!(priority_score(&j), 190);
    }

    #[test]
    fn test_score_is_monotonic_under_keyword_addition() {
        let base = job("Engineer", "A", "we build things");
        let mut enriched = base.clone();
        enriched.title = "Engineer (TypeScript)".to_string();
        assert!(priority_score(&enriched) >= priority_score(&base));
    }

    #[test]
    fn test_zero_score_for_unrelated_job() {
        assert_eq!(priority_score(&job("Accountant", "A", "ledgers")), 0);
    }

    #[test]
    fn test_selection_keeps_best_job_per_employer() {
        let jobs = vec![
            job("Backend Engineer", "Acme", ""),       // 20
            job("Full Stack Engineer", "Acme", "js "), // 150
            job("Frontend Engineer", "Globex", ""),    // 30
        ];
        let selected = select_one_per_employer(jobs, &HashSet::new());
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].title, "Full Stack Engineer");
        assert_eq!(selected[0].employer, "Acme");
        assert_eq!(selected[1].employer, "Globex");
    }

    #[test]
    fn test_selection_never_duplicates_employer_key() {
        let jobs = vec![
            job("Backend Engineer", "Acme", ""),
            job("Backend Engineer", " ACME ", ""),
            job("Backend Engineer", "acme", ""),
        ];
        let selected = select_one_per_employer(jobs, &HashSet::new());
        assert_eq!(selected.len(), 1);
    }

    #[test]
    fn test_selection_excludes_contacted_employers() {
        let contacted: HashSet<String> = ["acme".to_string()].into_iter().collect();
        let jobs = vec![
            job("Full Stack Engineer", "Acme", ""),
            job("Frontend Engineer", "Globex", ""),
        ];
        let selected = select_one_per_employer(jobs, &contacted);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].employer, "Globex");
    }

    #[test]
    fn test_selection_ties_keep_first_encountered() {
        let mut first = job("Backend Engineer", "Acme", "");
        first.source_id = "first".to_string();
        let mut second = job("Backend Developer", "Acme", "");
        second.source_id = "second".to_string();

        let selected = select_one_per_employer(vec![first, second], &HashSet::new());
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].source_id, "first");
    }

    #[test]
    fn test_selection_preserves_first_occurrence_order() {
        let jobs = vec![
            job("Engineer", "Zeta", ""),
            job("Engineer", "Alpha", ""),
            job("Full Stack Engineer", "Zeta", ""),
        ];
        let selected = select_one_per_employer(jobs, &HashSet::new());
        assert_eq!(selected[0].employer, "Zeta");
        assert_eq!(selected[1].employer, "Alpha");
    }
}
