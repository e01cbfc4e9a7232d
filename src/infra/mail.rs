//! Outbound notification mail through an HTTPS JSON relay.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Serialize;
use tracing::debug;

use crate::{
    application::repos::{MailError, Mailer, OutgoingMail},
    infra::error::InfraError,
};

const SOURCE: &str = "solar_leveling::infra::mail";

#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: Client,
    relay_url: Url,
    api_key: Option<String>,
    from: String,
    to: Option<String>,
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
}

impl HttpMailer {
    pub fn new(
        relay_url: Url,
        api_key: Option<String>,
        from: String,
        to: Option<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(concat!("solar-leveling/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            relay_url,
            api_key,
            from,
            to,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && self.to.is_some()
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        let (Some(api_key), Some(to)) = (&self.api_key, &self.to) else {
            return Err(MailError::NotConfigured);
        };

        let body = RelayMessage {
            from: &self.from,
            to,
            subject: &mail.subject,
            text: &mail.text,
            reply_to: mail.reply_to.as_deref(),
        };
        let response = self
            .client
            .post(self.relay_url.clone())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| MailError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected(status.as_u16()));
        }
        debug!(target: SOURCE, status = status.as_u16(), "relay accepted message");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mailer(api_key: Option<&str>, to: Option<&str>) -> HttpMailer {
        HttpMailer::new(
            Url::parse("https://relay.example.test/emails").expect("url"),
            api_key.map(str::to_string),
            "Solar Leveling <noreply@example.test>".to_string(),
            to.map(str::to_string),
            Duration::from_secs(1),
        )
        .expect("client")
    }

    fn mail() -> OutgoingMail {
        OutgoingMail {
            subject: "hello".into(),
            text: "body".into(),
            reply_to: None,
        }
    }

    #[tokio::test]
    async fn missing_credentials_fail_before_any_request() {
        for mailer in [
            mailer(None, Some("ops@example.test")),
            mailer(Some("key"), None),
        ] {
            assert!(!mailer.is_configured());
            assert!(matches!(
                mailer.send(mail()).await,
                Err(MailError::NotConfigured)
            ));
        }
    }

    #[test]
    fn relay_body_omits_absent_reply_to() {
        let body = RelayMessage {
            from: "a",
            to: "b",
            subject: "c",
            text: "d",
            reply_to: None,
        };
        let value = serde_json::to_value(&body).expect("serializes");
        assert_eq!(
            value,
            serde_json::json!({"from": "a", "to": "b", "subject": "c", "text": "d"})
        );
    }
}
