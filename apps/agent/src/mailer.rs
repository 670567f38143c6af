//! SMTP delivery of application emails.
//!
//! Sending reports success as a plain bool: a failed send is an expected
//! runtime condition (logged and skipped), never a pipeline error.

use std::path::Path;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{info, warn};

use crate::config::EmailConfig;

#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one email, optionally with a PDF attachment. Returns whether
    /// delivery was accepted by the SMTP server.
    async fn send(&self, to: &str, subject: &str, body: &str, attachment: Option<&Path>) -> bool;
}

pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    fn build_message(
        &self,
        to: &str,
        subject: &str,
        body: &str,
        attachment: Option<&Path>,
    ) -> Option<Message> {
        let from = format!("{} <{}>", self.config.sender_name, self.config.address);
        let builder = Message::builder()
            .from(match from.parse() {
                Ok(mailbox) => mailbox,
                Err(err) => {
                    warn!("Invalid sender address '{}': {}", from, err);
                    return None;
                }
            })
            .reply_to(match self.config.address.parse() {
                Ok(mailbox) => mailbox,
                Err(err) => {
                    warn!("Invalid reply-to address '{}': {}", self.config.address, err);
                    return None;
                }
            })
            .to(match to.parse() {
                Ok(mailbox) => mailbox,
                Err(err) => {
                    warn!("Invalid recipient address '{}': {}", to, err);
                    return None;
                }
            })
            .subject(subject);

        let text_part = SinglePart::builder()
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string());

        let message = match attachment.and_then(|path| read_attachment(path)) {
            Some((filename, bytes)) => builder.multipart(
                MultiPart::mixed().singlepart(text_part).singlepart(
                    Attachment::new(filename).body(bytes, ContentType::parse("application/pdf").ok()?),
                ),
            ),
            None => builder.singlepart(text_part),
        };

        match message {
            Ok(message) => Some(message),
            Err(err) => {
                warn!("Failed to build email to {}: {}", to, err);
                None
            }
        }
    }
}

/// Reads the attachment, or `None` with a warning; the email still goes out
/// without it.
fn read_attachment(path: &Path) -> Option<(String, Vec<u8>)> {
    match std::fs::read(path) {
        Ok(bytes) => {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "resume.pdf".to_string());
            Some((filename, bytes))
        }
        Err(err) => {
            warn!("Could not read attachment {}: {}", path.display(), err);
            None
        }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, to: &str, subject: &str, body: &str, attachment: Option<&Path>) -> bool {
        let Some(message) = self.build_message(to, subject, body, attachment) else {
            return false;
        };

        let transport = match AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(
            &self.config.smtp_host,
        ) {
            Ok(builder) => builder
                .port(self.config.smtp_port)
                .credentials(Credentials::new(
                    self.config.address.clone(),
                    self.config.app_password.clone(),
                ))
                .build(),
            Err(err) => {
                warn!("SMTP transport setup failed: {}", err);
                return false;
            }
        };

        match transport.send(message).await {
            Ok(_) => {
                info!("Email sent to {}", to);
                true
            }
            Err(err) => {
                warn!("Failed to send email to {}: {}", to, err);
                false
            }
        }
    }
}
