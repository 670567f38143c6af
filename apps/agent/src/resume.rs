//! Resume loading: plain text for the generator, the PDF for attaching.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::config::ProfileConfig;

/// The candidate's resume as plain text, for prompt context.
///
/// Extracts text from the configured PDF; falls back to a sibling `.txt`
/// file; returns an empty string (with a warning) when neither is usable.
pub fn resume_text(profile: &ProfileConfig) -> String {
    let pdf = &profile.resume_pdf;

    if pdf.is_file() {
        match pdf_extract::extract_text(pdf) {
            Ok(text) if !text.trim().is_empty() => {
                info!("Loaded resume text from {}", pdf.display());
                return text;
            }
            Ok(_) => warn!("Resume PDF {} extracted as empty", pdf.display()),
            Err(err) => warn!("Could not extract text from {}: {}", pdf.display(), err),
        }
    }

    let txt = pdf.with_extension("txt");
    if txt.is_file() {
        match std::fs::read_to_string(&txt) {
            Ok(text) if !text.trim().is_empty() => {
                info!("Loaded resume text from {}", txt.display());
                return text;
            }
            Ok(_) => {}
            Err(err) => warn!("Could not read {}: {}", txt.display(), err),
        }
    }

    warn!(
        "No resume text available ({} missing or unreadable); emails will be generic",
        pdf.display()
    );
    String::new()
}

/// The PDF to attach to outgoing emails, when it exists.
pub fn attachment_path(profile: &ProfileConfig) -> Option<PathBuf> {
    if profile.resume_pdf.is_file() {
        Some(profile.resume_pdf.clone())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(resume_pdf: PathBuf) -> ProfileConfig {
        ProfileConfig {
            name: "Jane Doe".to_string(),
            email: "jane@example.org".to_string(),
            phone: String::new(),
            resume_pdf,
        }
    }

    #[test]
    fn test_missing_resume_yields_empty_text_and_no_attachment() {
        let p = profile(PathBuf::from("/nonexistent/resume.pdf"));
        assert_eq!(resume_text(&p), "");
        assert_eq!(attachment_path(&p), None);
    }

    #[test]
    fn test_txt_sibling_used_when_pdf_absent() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("resume.pdf");
        std::fs::write(dir.path().join("resume.txt"), "Jane Doe. Rust engineer.").unwrap();

        let p = profile(pdf);
        assert_eq!(resume_text(&p), "Jane Doe. Rust engineer.");
        // No PDF on disk, so nothing to attach.
        assert_eq!(attachment_path(&p), None);
    }

    #[test]
    fn test_attachment_path_when_pdf_exists() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("resume.pdf");
        std::fs::write(&pdf, b"%PDF-1.4 not really").unwrap();

        let p = profile(pdf.clone());
        assert_eq!(attachment_path(&p), Some(pdf));
    }
}
