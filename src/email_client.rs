//! Outbound mail dispatcher.
//!
//! Posts a JSON payload to the configured mail delivery service. Dispatch is
//! fire-and-forget from the caller's point of view: routes spawn the send in
//! the background and failures are logged here, never surfaced to the
//! request that triggered them.

use serde::Serialize;

use crate::configuration::EmailSettings;
use crate::error::EmailError;

#[derive(Clone)]
pub struct EmailClient {
    http_client: reqwest::Client,
    service_url: String,
    sender: String,
    /// Public origin of this service, used to build confirmation links.
    app_base_url: String,
}

#[derive(Serialize)]
struct SendEmailRequest {
    from: String,
    to: String,
    subject: String,
    html: String,
}

impl EmailClient {
    pub fn new(settings: &EmailSettings, app_base_url: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            service_url: settings.service_url.clone(),
            sender: settings.sender.clone(),
            app_base_url,
        }
    }

    /// Send the email-confirmation message for a freshly registered (or
    /// still unconfirmed) account.
    pub async fn send_confirmation(
        &self,
        recipient: &str,
        username: &str,
        confirmation_token: &str,
    ) -> Result<(), EmailError> {
        let link = format!(
            "{}/api/auth/confirmed_email/{}",
            self.app_base_url, confirmation_token
        );
        let html = format!(
            "<p>Hi {username},</p>\
             <p>Welcome! Please <a href=\"{link}\">click here</a> to confirm your email address.</p>",
        );

        let url = format!("{}/email", self.service_url);
        let request = SendEmailRequest {
            from: self.sender.clone(),
            to: recipient.to_string(),
            subject: "Confirm your email".to_string(),
            html,
        };

        self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmailError::ServiceUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        Ok(())
    }
}

/// Background dispatch helper: spawn the send and log the outcome. The
/// confirmation token is not logged.
pub fn dispatch_confirmation(client: EmailClient, recipient: String, username: String, token: String) {
    tokio::spawn(async move {
        match client.send_confirmation(&recipient, &username, &token).await {
            Ok(()) => tracing::info!("confirmation email dispatched"),
            Err(e) => tracing::error!(error = %e, "failed to send confirmation email"),
        }
    });
}
