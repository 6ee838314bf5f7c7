use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::authentication::Credentials,
};
use tracing::{error, info};

use crate::config::Config;

/// Outgoing notification mail. Without SMTP credentials every send is
/// logged instead of delivered, which keeps local setups working.
#[derive(Clone)]
pub struct Mailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: String,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Self {
        let transport = match (&config.smtp_user, &config.smtp_pass) {
            (Some(user), Some(pass)) => {
                match AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_relay) {
                    Ok(builder) => Some(
                        builder
                            .credentials(Credentials::new(user.clone(), pass.clone()))
                            .build(),
                    ),
                    Err(e) => {
                        error!(error = %e, relay = %config.smtp_relay, "Invalid SMTP relay, mail will be logged only");
                        None
                    }
                }
            }
            _ => None,
        };

        let sender = config
            .smtp_user
            .clone()
            .unwrap_or_else(|| "noreply@azienda.it".to_string());

        Mailer {
            transport,
            from: format!("Ferie Manager <{}>", sender),
        }
    }

    /// Fire-and-forget: a failed notification is logged, never bubbled into
    /// the request that triggered it.
    pub async fn send(&self, to: &str, subject: &str, body: &str) {
        let Some(transport) = &self.transport else {
            info!(to, subject, body, "mock email (SMTP not configured)");
            return;
        };

        let from: Mailbox = match self.from.parse() {
            Ok(m) => m,
            Err(e) => {
                error!(error = %e, from = %self.from, "Invalid sender address");
                return;
            }
        };
        let to_mailbox: Mailbox = match to.parse() {
            Ok(m) => m,
            Err(e) => {
                error!(error = %e, to, "Invalid recipient address");
                return;
            }
        };

        let message = match Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
        {
            Ok(m) => m,
            Err(e) => {
                error!(error = %e, to, "Failed to build email");
                return;
            }
        };

        match transport.send(message).await {
            Ok(_) => info!(to, subject, "Email sent"),
            Err(e) => error!(error = %e, to, "Email send failed"),
        }
    }
}
