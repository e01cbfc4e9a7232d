//! Time-boxed admin access marker carried in cookies.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use time::{
    Duration, OffsetDateTime, PrimitiveDateTime,
    format_description::well_known::{Iso8601, Rfc3339},
};

pub const AUTHENTICATED_COOKIE: &str = "isAuthenticated";
/// RFC 3339 issue time. A date-time without an offset is read as UTC.
pub const TIMESTAMP_COOKIE: &str = "authTimestamp";
pub const SIGNATURE_COOKIE: &str = "authSignature";

type HmacSha256 = Hmac<Sha256>;

/// Cookie values relevant to the gate, as read from the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionCookies<'a> {
    pub authenticated: Option<&'a str>,
    pub timestamp: Option<&'a str>,
    pub signature: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    MissingMarker,
    MalformedTimestamp,
    Expired,
    BadSignature,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::MissingMarker => "missing_marker",
            DenyReason::MalformedTimestamp => "malformed_timestamp",
            DenyReason::Expired => "expired",
            DenyReason::BadSignature => "bad_signature",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Granted,
    Denied(DenyReason),
}

/// Cookie values to set after a successful login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedSession {
    pub timestamp: String,
    pub signature: Option<String>,
}

#[derive(Debug, Error)]
pub enum AccessError {
    #[error("failed to format session timestamp: {0}")]
    Timestamp(#[from] time::error::Format),
    #[error("session secret cannot key the signature")]
    Key,
}

#[derive(Debug, Clone)]
pub struct AccessGate {
    ttl: Duration,
    secret: Option<String>,
    password: Option<String>,
}

impl AccessGate {
    pub fn new(ttl: Duration, secret: Option<String>, password: Option<String>) -> Self {
        Self {
            ttl,
            secret,
            password,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Whether `/login` is served at all.
    pub fn login_enabled(&self) -> bool {
        self.password.is_some()
    }

    /// Granted iff the marker is `"true"`, the timestamp is younger than the ttl and, when a
    /// secret is configured, the signature matches the timestamp.
    pub fn evaluate(&self, cookies: &SessionCookies<'_>, now: OffsetDateTime) -> AccessDecision {
        if cookies.authenticated != Some("true") {
            return AccessDecision::Denied(DenyReason::MissingMarker);
        }
        let Some(raw_timestamp) = cookies.timestamp else {
            return AccessDecision::Denied(DenyReason::MissingMarker);
        };
        let Some(issued_at) = parse_issued_at(raw_timestamp) else {
            return AccessDecision::Denied(DenyReason::MalformedTimestamp);
        };
        if now - issued_at >= self.ttl {
            return AccessDecision::Denied(DenyReason::Expired);
        }

        if let Some(secret) = &self.secret {
            let valid = match (cookies.signature, sign(secret, raw_timestamp)) {
                (Some(given), Some(expected)) => {
                    bool::from(given.as_bytes().ct_eq(expected.as_bytes()))
                }
                _ => false,
            };
            if !valid {
                return AccessDecision::Denied(DenyReason::BadSignature);
            }
        }

        AccessDecision::Granted
    }

    pub fn issue(&self, now: OffsetDateTime) -> Result<IssuedSession, AccessError> {
        let timestamp = now.format(&Rfc3339)?;
        let signature = match &self.secret {
            Some(secret) => Some(sign(secret, &timestamp).ok_or(AccessError::Key)?),
            None => None,
        };
        Ok(IssuedSession {
            timestamp,
            signature,
        })
    }

    pub fn verify_password(&self, candidate: &str) -> bool {
        match &self.password {
            Some(password) => bool::from(password.as_bytes().ct_eq(candidate.as_bytes())),
            None => false,
        }
    }
}

fn sign(secret: &str, timestamp: &str) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(timestamp.as_bytes());
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn parse_issued_at(raw: &str) -> Option<OffsetDateTime> {
    OffsetDateTime::parse(raw, &Rfc3339).ok().or_else(|| {
        PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)
            .ok()
            .map(PrimitiveDateTime::assume_utc)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const NOW: OffsetDateTime = datetime!(2024-06-01 12:00 UTC);

    fn gate(secret: Option<&str>) -> AccessGate {
        AccessGate::new(
            Duration::hours(24),
            secret.map(str::to_string),
            Some("hunter2".into()),
        )
    }

    fn cookies<'a>(timestamp: &'a str, signature: Option<&'a str>) -> SessionCookies<'a> {
        SessionCookies {
            authenticated: Some("true"),
            timestamp: Some(timestamp),
            signature,
        }
    }

    #[test]
    fn missing_cookies_are_denied() {
        assert_eq!(
            gate(None).evaluate(&SessionCookies::default(), NOW),
            AccessDecision::Denied(DenyReason::MissingMarker)
        );
        let wrong_marker = SessionCookies {
            authenticated: Some("yes"),
            timestamp: Some("2024-06-01T11:00:00Z"),
            signature: None,
        };
        assert_eq!(
            gate(None).evaluate(&wrong_marker, NOW),
            AccessDecision::Denied(DenyReason::MissingMarker)
        );
    }

    #[test]
    fn window_is_twenty_four_hours() {
        let gate = gate(None);
        assert_eq!(
            gate.evaluate(&cookies("2024-06-01T11:00:00Z", None), NOW),
            AccessDecision::Granted
        );
        assert_eq!(
            gate.evaluate(&cookies("2024-05-31T11:00:00Z", None), NOW),
            AccessDecision::Denied(DenyReason::Expired)
        );
        assert_eq!(
            gate.evaluate(&cookies("2024-05-31T12:00:00Z", None), NOW),
            AccessDecision::Denied(DenyReason::Expired)
        );
    }

    #[test]
    fn timestamp_without_offset_is_utc() {
        let gate = gate(None);
        assert_eq!(
            gate.evaluate(&cookies("2024-06-01T11:00:00", None), NOW),
            AccessDecision::Granted
        );
        assert_eq!(
            gate.evaluate(&cookies("2024-05-31T11:00:00.000", None), NOW),
            AccessDecision::Denied(DenyReason::Expired)
        );
    }

    #[test]
    fn unparsable_timestamp_is_denied() {
        assert_eq!(
            gate(None).evaluate(&cookies("yesterday", None), NOW),
            AccessDecision::Denied(DenyReason::MalformedTimestamp)
        );
    }

    #[test]
    fn signed_sessions_round_trip() {
        let gate = gate(Some("s3cret"));
        let issued = gate.issue(datetime!(2024-06-01 11:00 UTC)).expect("issue");
        let signature = issued.signature.as_deref().expect("signed");
        assert_eq!(
            gate.evaluate(&cookies(&issued.timestamp, Some(signature)), NOW),
            AccessDecision::Granted
        );
        assert_eq!(
            gate.evaluate(&cookies(&issued.timestamp, None), NOW),
            AccessDecision::Denied(DenyReason::BadSignature)
        );
        assert_eq!(
            gate.evaluate(&cookies("2024-06-01T11:30:00Z", Some(signature)), NOW),
            AccessDecision::Denied(DenyReason::BadSignature)
        );
    }

    #[test]
    fn password_check() {
        let gate = gate(None);
        assert!(gate.login_enabled());
        assert!(gate.verify_password("hunter2"));
        assert!(!gate.verify_password("hunter3"));
        assert!(!AccessGate::new(Duration::hours(1), None, None).verify_password(""));
    }
}
