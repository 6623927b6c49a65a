//! Transport backends: SMTP, Gmail (OAuth2/XOAUTH2), and console.

mod console;
mod gmail;
mod smtp;

pub use console::ConsoleBackend;
pub use gmail::{GmailBackend, GmailSettings};
pub use smtp::{SmtpBackend, SmtpSettings};

use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::Message;

use super::{Email, EmailError};

/// Build a lettre [`Message`] from an [`Email`].
///
/// The uniqueness reference, when present, becomes the RFC message id.
pub(crate) fn build_message(email: &Email) -> Result<Message, EmailError> {
    email.validate()?;

    let from_addr = email.from.as_deref().ok_or(EmailError::NoSender)?;
    let from: Mailbox = from_addr
        .parse()
        .map_err(|_| EmailError::InvalidAddress(from_addr.to_string()))?;

    let mut builder = Message::builder().from(from);

    for to_addr in &email.to {
        let to: Mailbox = to_addr
            .parse()
            .map_err(|_| EmailError::InvalidAddress(to_addr.clone()))?;
        builder = builder.to(to);
    }

    let subject = email.subject.as_deref().ok_or(EmailError::NoSubject)?;
    builder = builder.subject(subject);

    if let Some(reference) = &email.reference {
        builder = builder.message_id(Some(format!("<{reference}@dripline>")));
    }

    let message = match (&email.html, &email.text) {
        (Some(html), Some(text)) => builder.multipart(
            MultiPart::alternative()
                .singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_PLAIN)
                        .body(text.clone()),
                )
                .singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_HTML)
                        .body(html.clone()),
                ),
        ),
        (Some(html), None) => builder
            .header(header::ContentType::TEXT_HTML)
            .body(html.clone()),
        (None, Some(text)) => builder
            .header(header::ContentType::TEXT_PLAIN)
            .body(text.clone()),
        (None, None) => return Err(EmailError::NoContent),
    }
    .map_err(|e| EmailError::smtp(e.to_string()))?;

    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_message_text_only() {
        let email = Email::new()
            .to("recipient@example.com")
            .from("sender@example.com")
            .subject("Test Email")
            .text("This is a test email");

        assert!(build_message(&email).is_ok());
    }

    #[test]
    fn test_build_message_html_and_text() {
        let email = Email::new()
            .to("recipient@example.com")
            .from("sender@example.com")
            .subject("Test Email")
            .text("This is plain text")
            .html("<h1>This is HTML</h1>");

        assert!(build_message(&email).is_ok());
    }

    #[test]
    fn test_build_message_carries_reference() {
        let email = Email::new()
            .to("recipient@example.com")
            .from("sender@example.com")
            .subject("Test Email")
            .html("<p>hi</p>")
            .reference("1700000000000.deadbeef");

        let message = build_message(&email).unwrap();
        let rendered = String::from_utf8(message.formatted()).unwrap();
        assert!(rendered.contains("1700000000000.deadbeef@dripline"));
    }

    #[test]
    fn test_build_message_rejects_bad_mailbox() {
        let email = Email::new()
            .to("has@valid-shape.but still fails parse@@")
            .from("sender@example.com")
            .subject("Test")
            .text("body");

        assert!(matches!(
            build_message(&email),
            Err(EmailError::InvalidAddress(_))
        ));
    }
}
