//! Lead-capture contact form submission and its field rules.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

// (123) 456-7890, 123-456-7890, 123.456.7890, 1234567890
static PHONE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?([0-9]{3})\)?[-. ]?([0-9]{3})[-. ]?([0-9]{4})$")
        .expect("phone pattern compiles")
});

pub fn validate_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

pub fn validate_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSubmission {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("contact submission has {} invalid field(s)", .fields.len())]
pub struct ContactValidationError {
    pub fields: Vec<FieldError>,
}

impl ContactValidationError {
    /// First message, suitable for a single inline banner.
    pub fn summary(&self) -> &'static str {
        self.fields
            .first()
            .map(|error| error.message)
            .unwrap_or("Please check the form and try again")
    }
}

impl ContactSubmission {
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        let mut fields = Vec::new();

        if self.first_name.trim().is_empty() {
            fields.push(FieldError {
                field: "firstName",
                message: "Please enter your first name",
            });
        }
        if self.last_name.trim().is_empty() {
            fields.push(FieldError {
                field: "lastName",
                message: "Please enter your last name",
            });
        }
        if !validate_email(self.email.trim()) {
            fields.push(FieldError {
                field: "email",
                message: "Please enter a valid email address",
            });
        }
        if !validate_phone(self.phone.trim()) {
            fields.push(FieldError {
                field: "phone",
                message: "Please enter a valid phone number",
            });
        }

        if fields.is_empty() {
            Ok(())
        } else {
            Err(ContactValidationError { fields })
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
    }

    /// The message with surrounding whitespace removed, or `None` when blank.
    pub fn message_text(&self) -> Option<&str> {
        self.message
            .as_deref()
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn submission() -> ContactSubmission {
        ContactSubmission {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "ada@example.com".into(),
            phone: "(123) 456-7890".into(),
            message: None,
        }
    }

    #[test]
    fn email_requires_a_dotted_domain() {
        assert!(!validate_email("a@b"));
        assert!(validate_email("a@b.com"));
        assert!(!validate_email("a b@c.com"));
        assert!(!validate_email("@b.com"));
    }

    #[test]
    fn phone_accepts_common_us_formats() {
        assert!(validate_phone("1234567890"));
        assert!(validate_phone("123-456-7890"));
        assert!(validate_phone("(123) 456-7890"));
        assert!(validate_phone("123.456.7890"));
        assert!(!validate_phone("12345"));
        assert!(!validate_phone("123-456-789"));
    }

    #[test]
    fn valid_submission_passes() {
        assert!(submission().validate().is_ok());
    }

    #[test]
    fn every_invalid_field_is_reported() {
        let invalid = ContactSubmission {
            first_name: " ".into(),
            email: "nope".into(),
            phone: "12345".into(),
            ..submission()
        };
        let err = invalid.validate().expect_err("invalid");
        let fields: Vec<_> = err.fields.iter().map(|error| error.field).collect();
        assert_eq!(fields, ["firstName", "email", "phone"]);
        assert_eq!(err.summary(), "Please enter your first name");
    }

    #[test]
    fn blank_message_is_treated_as_absent() {
        let with_blank = ContactSubmission {
            message: Some("   ".into()),
            ..submission()
        };
        assert_eq!(with_blank.message_text(), None);
    }

    #[test]
    fn submission_reads_camel_case_json() {
        let json = r#"{"firstName":"A","lastName":"B","email":"a@b.com","phone":"1234567890"}"#;
        let parsed: ContactSubmission = serde_json::from_str(json).expect("parses");
        assert_eq!(parsed.first_name, "A");
        assert_eq!(parsed.message, None);
    }
}
