//! Email service for verification codes, password resets and order receipts.
//!
//! Uses SMTP via lettre for delivery with Askama HTML + plain text templates.
//! Without SMTP configuration nothing is sent: [`deliver`] logs a preview
//! instead, which is how codes are read during local development.

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use thiserror::Error;

use pawfect_core::Email;

use crate::config::{EmailConfig, Environment};
use crate::models::Order;

#[derive(Template)]
#[template(path = "email/verification_code.html")]
struct VerificationCodeHtml<'a> {
    name: &'a str,
    code: &'a str,
    minutes: i64,
}

#[derive(Template)]
#[template(path = "email/verification_code.txt")]
struct VerificationCodeText<'a> {
    name: &'a str,
    code: &'a str,
    minutes: i64,
}

#[derive(Template)]
#[template(path = "email/password_reset.html")]
struct PasswordResetHtml<'a> {
    reset_url: &'a str,
    minutes: i64,
}

#[derive(Template)]
#[template(path = "email/password_reset.txt")]
struct PasswordResetText<'a> {
    reset_url: &'a str,
    minutes: i64,
}

struct ReceiptLine {
    name: String,
    quantity: i32,
    amount: String,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    order_number: &'a str,
    ship_to: &'a str,
    lines: &'a [ReceiptLine],
    subtotal: &'a str,
    tax: &'a str,
    shipping: &'a str,
    total: &'a str,
    order_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    order_number: &'a str,
    ship_to: &'a str,
    lines: &'a [ReceiptLine],
    subtotal: &'a str,
    tax: &'a str,
    shipping: &'a str,
    total: &'a str,
    order_url: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// No SMTP transport in production.
    #[error("SMTP is not configured")]
    NotConfigured,
}

/// A transactional message and the data it needs.
#[derive(Debug, Clone, Copy)]
pub enum Notification<'a> {
    VerificationCode {
        name: &'a str,
        code: &'a str,
        minutes: i64,
    },
    PasswordReset {
        reset_url: &'a str,
        minutes: i64,
    },
    OrderConfirmation {
        order: &'a Order,
        order_url: &'a str,
    },
}

fn money(amount: Decimal) -> String {
    format!("{amount:.2}")
}

impl Notification<'_> {
    /// Which template this is. Safe to log, unlike the subject, which can
    /// carry a verification code.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::VerificationCode { .. } => "verification_code",
            Self::PasswordReset { .. } => "password_reset",
            Self::OrderConfirmation { .. } => "order_confirmation",
        }
    }

    #[must_use]
    pub fn subject(&self) -> String {
        match self {
            Self::VerificationCode { code, .. } => {
                format!("{code} is your Pawfect Supply verification code")
            }
            Self::PasswordReset { .. } => "Reset your Pawfect Supply password".to_owned(),
            Self::OrderConfirmation { order, .. } => {
                format!("Order {} confirmed", order.order_number)
            }
        }
    }

    /// The actionable part of the message, logged when SMTP is not configured.
    #[must_use]
    pub fn preview(&self) -> String {
        match self {
            Self::VerificationCode { code, .. } => format!("code={code}"),
            Self::PasswordReset { reset_url, .. } => format!("link={reset_url}"),
            Self::OrderConfirmation { order, order_url } => {
                format!("order={} total={} link={order_url}", order.order_number, money(order.totals.total))
            }
        }
    }

    /// Render `(text, html)` bodies.
    ///
    /// # Errors
    ///
    /// Returns `EmailError::Template` if a template fails to render.
    pub fn render(&self) -> Result<(String, String), EmailError> {
        match *self {
            Self::VerificationCode {
                name,
                code,
                minutes,
            } => Ok((
                VerificationCodeText {
                    name,
                    code,
                    minutes,
                }
                .render()?,
                VerificationCodeHtml {
                    name,
                    code,
                    minutes,
                }
                .render()?,
            )),
            Self::PasswordReset { reset_url, minutes } => Ok((
                PasswordResetText { reset_url, minutes }.render()?,
                PasswordResetHtml { reset_url, minutes }.render()?,
            )),
            Self::OrderConfirmation { order, order_url } => {
                let lines: Vec<ReceiptLine> = order
                    .items
                    .iter()
                    .map(|item| ReceiptLine {
                        name: item.name.clone(),
                        quantity: item.quantity,
                        amount: money(item.line_total()),
                    })
                    .collect();
                let ship_to = order.shipping_address.single_line();
                let subtotal = money(order.totals.subtotal);
                let tax = money(order.totals.tax);
                let shipping = money(order.totals.shipping_cost);
                let total = money(order.totals.total);

                let text = OrderConfirmationText {
                    order_number: &order.order_number,
                    ship_to: &ship_to,
                    lines: &lines,
                    subtotal: &subtotal,
                    tax: &tax,
                    shipping: &shipping,
                    total: &total,
                    order_url,
                }
                .render()?;
                let html = OrderConfirmationHtml {
                    order_number: &order.order_number,
                    ship_to: &ship_to,
                    lines: &lines,
                    subtotal: &subtotal,
                    tax: &tax,
                    shipping: &shipping,
                    total: &total,
                    order_url,
                }
                .render()?;
                Ok((text, html))
            }
        }
    }
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Render and send a notification.
    ///
    /// # Errors
    ///
    /// Returns error if the template fails to render or the message fails to send.
    pub async fn send(&self, to: &Email, notification: &Notification<'_>) -> Result<(), EmailError> {
        let (text, html) = notification.render()?;
        self.send_multipart_email(to.as_str(), &notification.subject(), &text, &html)
            .await?;

        tracing::info!(to = %to, kind = notification.kind(), "Email sent successfully");
        Ok(())
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;
        Ok(())
    }
}

/// Send a notification, degrading gracefully outside production.
///
/// - No SMTP configured in development: logs a preview and returns `Ok`.
/// - Send failure in development: logs and returns `Ok`.
/// - Production: any failure is returned, and codes or links are never logged.
///
/// # Errors
///
/// Returns `EmailError::NotConfigured` or the send error, only when running
/// in production.
pub async fn deliver(
    service: Option<&EmailService>,
    environment: Environment,
    to: &Email,
    notification: Notification<'_>,
) -> Result<(), EmailError> {
    let Some(service) = service else {
        if environment.is_production() {
            tracing::error!(
                to = %to,
                kind = notification.kind(),
                "SMTP not configured in production, email not sent"
            );
            return Err(EmailError::NotConfigured);
        }
        tracing::warn!(
            to = %to,
            subject = %notification.subject(),
            preview = %notification.preview(),
            "SMTP not configured, email not sent"
        );
        return Ok(());
    };

    match service.send(to, &notification).await {
        Ok(()) => Ok(()),
        Err(e) if environment.is_production() => Err(e),
        Err(e) => {
            tracing::warn!(
                to = %to,
                error = %e,
                preview = %notification.preview(),
                "Email send failed, continuing outside production"
            );
            Ok(())
        }
    }
}

/// Generate a 6-digit verification code.
#[must_use]
pub fn generate_verification_code() -> String {
    use rand::Rng;
    let code: u32 = rand::rng().random_range(100_000..1_000_000);
    code.to_string()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_verification_code_format() {
        let code = generate_verification_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn test_generate_verification_code_range() {
        for _ in 0..100 {
            let code: u32 = generate_verification_code().parse().expect("valid number");
            assert!(code >= 100_000);
            assert!(code < 1_000_000);
        }
    }

    #[test]
    fn test_verification_code_renders_both_bodies() {
        let notification = Notification::VerificationCode {
            name: "Milo",
            code: "482913",
            minutes: 10,
        };
        let (text, html) = notification.render().unwrap();

        assert!(text.contains("482913"));
        assert!(html.contains("482913"));
        assert!(text.contains("10 minutes"));
        assert!(notification.subject().starts_with("482913"));
        assert_eq!(notification.preview(), "code=482913");
    }

    #[test]
    fn test_reset_preview_is_the_link() {
        let notification = Notification::PasswordReset {
            reset_url: "https://pawfect.test/reset-password?token=abc",
            minutes: 60,
        };
        assert_eq!(
            notification.preview(),
            "link=https://pawfect.test/reset-password?token=abc"
        );
    }

    #[tokio::test]
    async fn test_deliver_without_smtp_previews_in_development() {
        let to = Email::parse("owner@example.com").unwrap();
        let notification = Notification::PasswordReset {
            reset_url: "https://pawfect.test/reset-password?token=abc",
            minutes: 60,
        };

        let result = deliver(None, Environment::Development, &to, notification).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_deliver_without_smtp_fails_in_production() {
        let to = Email::parse("owner@example.com").unwrap();
        let notification = Notification::VerificationCode {
            name: "Biscuit",
            code: "482913",
            minutes: 10,
        };

        let result = deliver(None, Environment::Production, &to, notification).await;
        assert!(matches!(result, Err(EmailError::NotConfigured)));
    }
}
