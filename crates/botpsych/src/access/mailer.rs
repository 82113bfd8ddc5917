use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use super::domain::VerificationNotice;
use super::repository::{MailError, VerificationMailer};
use crate::config::MailConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const VERIFICATION_SUBJECT: &str = "Verify Your Email for BotPsych";

/// Delivers verification links through the Resend `POST /emails` API.
#[derive(Debug, Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    url: String,
}

impl ResendMailer {
    pub fn new(config: &MailConfig, api_key: impl Into<String>) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|error| MailError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            from: config.from.clone(),
            url: format!("{}/emails", config.endpoint.trim_end_matches('/')),
        })
    }

    /// `None` when no API key is configured.
    pub fn from_config(config: &MailConfig) -> Result<Option<Self>, MailError> {
        match config.api_key.as_deref() {
            Some(key) => Self::new(config, key).map(Some),
            None => Ok(None),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl VerificationMailer for ResendMailer {
    async fn send_verification(&self, notice: &VerificationNotice) -> Result<(), MailError> {
        let request = SendEmailRequest::verification(&self.from, notice);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|error| MailError::Transport(error.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "mail provider rejected verification email");
            return Err(MailError::Transport(format!(
                "request failed with status {status}"
            )));
        }

        debug!(email = %notice.email, "verification email accepted");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct SendEmailRequest {
    from: String,
    to: Vec<String>,
    subject: &'static str,
    text: String,
}

impl SendEmailRequest {
    pub(crate) fn verification(from: &str, notice: &VerificationNotice) -> Self {
        Self {
            from: from.to_string(),
            to: vec![notice.email.clone()],
            subject: VERIFICATION_SUBJECT,
            text: format!(
                "Hi {name},\n\n\
                 Thanks for signing up for BotPsych. Confirm your email address by opening \
                 the link below:\n\n{url}\n\n\
                 If you did not create an account, you can ignore this message.\n",
                name = notice.name,
                url = notice.verification_url,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(api_key: Option<&str>) -> MailConfig {
        MailConfig {
            api_key: api_key.map(str::to_string),
            from: "BotPsych <onboarding@botpsy.test>".to_string(),
            endpoint: "https://mail.example.test/".to_string(),
        }
    }

    fn notice() -> VerificationNotice {
        VerificationNotice {
            name: "Asha".to_string(),
            email: "asha@example.com".to_string(),
            verification_url: "https://botpsy.test/verify-email?token=abc123".to_string(),
        }
    }

    #[test]
    fn request_addresses_the_new_account() {
        let request = SendEmailRequest::verification("BotPsych <onboarding@botpsy.test>", &notice());
        let value = serde_json::to_value(&request).expect("serializes");

        assert_eq!(value["from"], "BotPsych <onboarding@botpsy.test>");
        assert_eq!(value["to"], serde_json::json!(["asha@example.com"]));
        assert_eq!(value["subject"], VERIFICATION_SUBJECT);
        let text = value["text"].as_str().expect("text body");
        assert!(text.starts_with("Hi Asha,"));
        assert!(text.contains("https://botpsy.test/verify-email?token=abc123"));
    }

    #[test]
    fn mailer_posts_to_the_emails_endpoint() {
        let mailer = ResendMailer::new(&config(Some("re_test")), "re_test").expect("client builds");
        assert_eq!(mailer.url(), "https://mail.example.test/emails");
    }

    #[test]
    fn missing_key_means_no_mailer() {
        assert!(ResendMailer::from_config(&config(None))
            .expect("config accepted")
            .is_none());
    }
}
