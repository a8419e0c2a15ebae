use async_trait::async_trait;
use lettre::{
    message::header::ContentType, transport::smtp::authentication::Credentials, Message,
    SmtpTransport, Transport,
};
use service_core::error::AppError;
use std::time::Duration;

#[async_trait]
pub trait EmailProvider: Send + Sync {
    async fn send_verification_email(
        &self,
        to_email: &str,
        verification_token: &str,
        base_url: &str,
    ) -> Result<(), AppError>;

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        reset_token: &str,
        base_url: &str,
    ) -> Result<(), AppError>;

    async fn send_invitation_email(
        &self,
        to_email: &str,
        clinic_name: &str,
        member_role: &str,
        invite_url: &str,
    ) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct EmailService {
    mailer: SmtpTransport,
    from_email: String,
}

impl EmailService {
    pub fn new(config: &crate::config::SmtpConfig) -> Result<Self, AppError> {
        let creds = Credentials::new(config.user.clone(), config.password.clone());

        let mailer = SmtpTransport::relay(&config.host)
            .map_err(|e| AppError::InternalError(anyhow::anyhow!(e.to_string())))?
            .credentials(creds)
            .port(587)
            .timeout(Some(Duration::from_secs(10)))
            .build();

        tracing::info!(host = %config.host, "Email service initialized");

        Ok(Self {
            mailer,
            from_email: config.from_email.clone(),
        })
    }

    async fn send_email(
        &self,
        to_email: &str,
        subject: &str,
        plain_body: &str,
        html_body: &str,
    ) -> Result<(), AppError> {
        let email = Message::builder()
            .from(self.from_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .to(to_email.parse().map_err(
                |e: lettre::address::AddressError| AppError::InternalError(e.into()),
            )?)
            .subject(subject)
            .multipart(
                lettre::message::MultiPart::alternative()
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(plain_body.to_string()),
                    )
                    .singlepart(
                        lettre::message::SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )
            .map_err(|e| AppError::InternalError(e.into()))?;

        // SmtpTransport is blocking; keep it off the async runtime
        let mailer = self.mailer.clone();
        let result = tokio::task::spawn_blocking(move || mailer.send(&email))
            .await
            .map_err(|e| AppError::InternalError(e.into()))?;

        match result {
            Ok(_) => {
                tracing::info!(
                    to = %to_email,
                    subject = %subject,
                    "Email sent successfully"
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e.to_string(),
                    to = %to_email,
                    "Failed to send email"
                );
                Err(AppError::EmailError(e.to_string()))
            }
        }
    }
}

#[async_trait]
impl EmailProvider for EmailService {
    async fn send_verification_email(
        &self,
        to_email: &str,
        verification_token: &str,
        base_url: &str,
    ) -> Result<(), AppError> {
        let verification_link = format!("{}/auth/verify?token={}", base_url, verification_token);

        let html_body = format!(
            r###"<html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>Welcome! Please verify your email</h2>
                    <p>Thank you for registering. Please click the link below to verify your email address:</p>
                    <p>
                        <a href="{}" style="background-color: #4CAF50; color: white; padding: 14px 20px; text-decoration: none; border-radius: 4px;">
                            Verify Email
                        </a>
                    </p>
                    <p style="color: #666; font-size: 12px;">
                        This link will expire in 24 hours. If you didn't request this, please ignore this email.
                    </p>
                </body>
            </html>"###,
            verification_link
        );

        let plain_body = format!(
            "Welcome! Please verify your email\n\nThank you for registering. Please visit the following link to verify your email address:\n\n{}\n\nThis link will expire in 24 hours. If you didn't request this, please ignore this email.",
            verification_link
        );

        self.send_email(to_email, "Verify Your Email Address", &plain_body, &html_body)
            .await
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        reset_token: &str,
        base_url: &str,
    ) -> Result<(), AppError> {
        let reset_link = format!("{}/auth/password-reset/confirm?token={}", base_url, reset_token);

        let html_body = format!(
            r###"<html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>Password Reset Request</h2>
                    <p>We received a request to reset your password. Click the link below to set a new password:</p>
                    <p>
                        <a href="{}" style="background-color: #2196F3; color: white; padding: 14px 20px; text-decoration: none; border-radius: 4px;">
                            Reset Password
                        </a>
                    </p>
                    <p style="color: #666; font-size: 12px;">
                        This link will expire in 1 hour. If you didn't request this, please ignore this email.
                    </p>
                </body>
            </html>"###,
            reset_link
        );

        let plain_body = format!(
            "Password Reset Request\n\nWe received a request to reset your password. Please visit the following link to set a new password:\n\n{}\n\nThis link will expire in 1 hour. If you didn't request this, please ignore this email.",
            reset_link
        );

        self.send_email(to_email, "Reset Your Password", &plain_body, &html_body)
            .await
    }

    async fn send_invitation_email(
        &self,
        to_email: &str,
        clinic_name: &str,
        member_role: &str,
        invite_url: &str,
    ) -> Result<(), AppError> {
        let html_body = format!(
            r###"<html>
                <body style="font-family: Arial, sans-serif;">
                    <h2>You have been invited to join {}</h2>
                    <p>You were invited as <strong>{}</strong>. Click the link below to accept the invitation:</p>
                    <p>
                        <a href="{}" style="background-color: #4CAF50; color: white; padding: 14px 20px; text-decoration: none; border-radius: 4px;">
                            Accept Invitation
                        </a>
                    </p>
                    <p style="color: #666; font-size: 12px;">
                        This invitation expires in 7 days. If you weren't expecting it, please ignore this email.
                    </p>
                </body>
            </html>"###,
            clinic_name, member_role, invite_url
        );

        let plain_body = format!(
            "You have been invited to join {}\n\nYou were invited as {}. Please visit the following link to accept the invitation:\n\n{}\n\nThis invitation expires in 7 days. If you weren't expecting it, please ignore this email.",
            clinic_name, member_role, invite_url
        );

        self.send_email(to_email, "Clinic Invitation", &plain_body, &html_body)
            .await
    }
}

/// Email recorded by the mock, so tests can recover tokens that are only
/// stored hashed.
#[derive(Debug, Clone)]
pub struct RecordedEmail {
    pub to: String,
    pub kind: String,
    pub token: String,
}

#[derive(Default)]
pub struct MockEmailService {
    pub sent: std::sync::Mutex<Vec<RecordedEmail>>,
}

impl MockEmailService {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, to: &str, kind: &str, token: &str) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(RecordedEmail {
                to: to.to_string(),
                kind: kind.to_string(),
                token: token.to_string(),
            });
        }
    }

    /// Latest recorded token of the given kind sent to the address.
    pub fn last_token_for(&self, to: &str, kind: &str) -> Option<String> {
        self.sent.lock().ok().and_then(|sent| {
            sent.iter()
                .rev()
                .find(|e| e.to == to && e.kind == kind)
                .map(|e| e.token.clone())
        })
    }
}

#[async_trait]
impl EmailProvider for MockEmailService {
    async fn send_verification_email(
        &self,
        to_email: &str,
        verification_token: &str,
        _base_url: &str,
    ) -> Result<(), AppError> {
        self.record(to_email, "verification", verification_token);
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        to_email: &str,
        reset_token: &str,
        _base_url: &str,
    ) -> Result<(), AppError> {
        self.record(to_email, "password_reset", reset_token);
        Ok(())
    }

    async fn send_invitation_email(
        &self,
        to_email: &str,
        _clinic_name: &str,
        _member_role: &str,
        invite_url: &str,
    ) -> Result<(), AppError> {
        self.record(to_email, "invitation", invite_url);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_service_creation() {
        let config = crate::config::SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            user: "test@gmail.com".to_string(),
            password: "test_password".to_string(),
            from_email: "test@gmail.com".to_string(),
        };

        let service = EmailService::new(&config);
        assert!(service.is_ok());
    }

    #[tokio::test]
    async fn mock_records_latest_token() {
        let mock = MockEmailService::new();
        mock.send_verification_email("a@b.com", "tok-1", "http://x")
            .await
            .unwrap();
        mock.send_verification_email("a@b.com", "tok-2", "http://x")
            .await
            .unwrap();

        assert_eq!(
            mock.last_token_for("a@b.com", "verification"),
            Some("tok-2".to_string())
        );
        assert_eq!(mock.last_token_for("a@b.com", "password_reset"), None);
    }
}
