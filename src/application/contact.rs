use std::{sync::Arc, time::Instant};

use metrics::{counter, histogram};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::contact::{ContactSubmission, ContactValidationError};

use super::repos::{MailError, Mailer, OutgoingMail};

const SOURCE: &str = "solar_leveling::application::contact";

pub const METRIC_CONTACT_SENT_TOTAL: &str = "solar_leveling_contact_sent_total";
pub const METRIC_CONTACT_SEND_MS: &str = "solar_leveling_contact_send_ms";

#[derive(Debug, Error)]
pub enum ContactError {
    #[error(transparent)]
    Invalid(#[from] ContactValidationError),
    #[error("failed to deliver contact notification")]
    Delivery(#[source] MailError),
}

/// Turns a validated contact-form submission into an operator notification.
#[derive(Clone)]
pub struct ContactService {
    mailer: Arc<dyn Mailer>,
    site_name: String,
}

impl ContactService {
    pub fn new(mailer: Arc<dyn Mailer>, site_name: impl Into<String>) -> Self {
        Self {
            mailer,
            site_name: site_name.into(),
        }
    }

    pub async fn submit(&self, submission: ContactSubmission) -> Result<(), ContactError> {
        submission.validate()?;

        let mail = self.compose(&submission);
        let started = Instant::now();
        let result = self.mailer.send(mail).await;
        histogram!(METRIC_CONTACT_SEND_MS).record(started.elapsed().as_secs_f64() * 1000.0);

        match result {
            Ok(()) => {
                counter!(METRIC_CONTACT_SENT_TOTAL, "result" => "ok").increment(1);
                info!(target: SOURCE, "contact notification sent");
                Ok(())
            }
            Err(err) => {
                counter!(METRIC_CONTACT_SENT_TOTAL, "result" => "error").increment(1);
                warn!(target: SOURCE, error = %err, "contact notification failed");
                Err(ContactError::Delivery(err))
            }
        }
    }

    fn compose(&self, submission: &ContactSubmission) -> OutgoingMail {
        let mut text = format!(
            "New contact form submission\n\nName: {}\nEmail: {}\nPhone: {}\n",
            submission.full_name(),
            submission.email.trim(),
            submission.phone.trim(),
        );
        if let Some(message) = submission.message_text() {
            text.push_str("\nMessage:\n");
            text.push_str(message);
            text.push('\n');
        }

        OutgoingMail {
            subject: format!(
                "New {} inquiry from {}",
                self.site_name,
                submission.full_name()
            ),
            text,
            reply_to: Some(submission.email.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<OutgoingMail>>,
        reject: Option<u16>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
            if let Some(status) = self.reject {
                return Err(MailError::Rejected(status));
            }
            self.sent.lock().expect("lock").push(mail);
            Ok(())
        }
    }

    fn submission(message: Option<&str>) -> ContactSubmission {
        ContactSubmission {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "123-456-7890".into(),
            message: message.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn valid_submission_is_relayed_with_reply_to() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = ContactService::new(mailer.clone(), "Solar Leveling");

        service
            .submit(submission(Some("Call me after 5")))
            .await
            .expect("sent");

        let sent = mailer.sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "New Solar Leveling inquiry from Ada Lovelace");
        assert_eq!(sent[0].reply_to.as_deref(), Some("ada@example.com"));
        assert!(sent[0].text.contains("Phone: 123-456-7890"));
        assert!(sent[0].text.contains("Call me after 5"));
    }

    #[tokio::test]
    async fn invalid_submission_never_reaches_the_mailer() {
        let mailer = Arc::new(RecordingMailer::default());
        let service = ContactService::new(mailer.clone(), "Solar Leveling");

        let mut bad = submission(None);
        bad.email = "not-an-email".into();
        assert!(matches!(
            service.submit(bad).await,
            Err(ContactError::Invalid(_))
        ));
        assert!(mailer.sent.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn relay_rejection_is_a_delivery_error() {
        let mailer = Arc::new(RecordingMailer {
            reject: Some(403),
            ..RecordingMailer::default()
        });
        let service = ContactService::new(mailer, "Solar Leveling");
        assert!(matches!(
            service.submit(submission(None)).await,
            Err(ContactError::Delivery(MailError::Rejected(403)))
        ));
    }
}
