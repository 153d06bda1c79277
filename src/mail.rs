//! Outbound mail for one-time codes and password-reset links.

use async_trait::async_trait;

use crate::error::AppError;

pub const OTP_SUBJECT: &str = "Account verification code";
pub const RESET_SUBJECT: &str = "Reset your password";

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl Mail {
    pub fn otp(email: &str, name: &str, otp: &str) -> Self {
        Self {
            to: email.to_string(),
            subject: OTP_SUBJECT.to_string(),
            body: format!(
                "Hello {}, your one-time password for account verification is {}. \
                 It expires in 5 minutes.",
                name, otp
            ),
        }
    }

    pub fn password_reset(email: &str, link: &str) -> Self {
        Self {
            to: email.to_string(),
            subject: RESET_SUBJECT.to_string(),
            body: format!(
                "You have requested to reset your password. Open {} to choose a new one. \
                 If you did not request this, please ignore this email.",
                link
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: Mail) -> Result<(), AppError>;
}

/// Writes every message to the application log instead of a mail server.
///
/// Bodies carry one-time codes and reset tokens, so they are only logged at `debug`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

impl LogMailer {
    fn summary(mail: &Mail) -> String {
        format!("mail to={} subject={:?}", mail.to, mail.subject)
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: Mail) -> Result<(), AppError> {
        log::info!("{}", Self::summary(&mail));
        log::debug!("mail body to={}: {:?}", mail.to, mail.body);
        Ok(())
    }
}
