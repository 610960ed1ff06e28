use async_trait::async_trait;
use common::err_context::ErrorContextExt;
use common::settings::EmailClientSettings;
use reqwest::Client;
use serde::Serialize;

use crate::domain::ports::secondary::{Email, EmailError as Error, EmailService};
use crate::domain::EmailAddress;

#[derive(Debug, Clone)]
pub struct EmailClient {
    // This is the client end of a connection to an email service API.
    http_client: Client,
    // This is the URL of the Email server
    server_url: String,
    // This is the sender of the email sent to the end user.
    sender: EmailAddress,
    authorization_token: String,
}

impl EmailClient {
    pub async fn new(settings: EmailClientSettings) -> Result<EmailClient, Error> {
        let sender =
            EmailAddress::parse(settings.sender_email).map_err(|err| Error::Configuration {
                context: format!("Could not parse Email Client Service Sender: {err}"),
            })?;
        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout))
            .build()
            .map_err(|err| Error::Configuration {
                context: format!("Could not build http client: {err}"),
            })?;
        Ok(EmailClient {
            http_client,
            server_url: settings.server_url,
            sender,
            authorization_token: settings.authorization_token,
        })
    }
}

#[async_trait]
impl EmailService for EmailClient {
    async fn send_email(&self, email: Email) -> Result<(), Error> {
        let Email {
            to,
            subject,
            text_content,
            html_content,
        } = email;

        let url = format!("{}/email", self.server_url);

        let request_body = SendEmailRequest {
            to: to.as_ref(),
            from: self.sender.as_ref(),
            subject: &subject,
            text_content: &text_content,
            html_content: html_content.as_deref(),
        };

        self.http_client
            .post(&url)
            .header("X-Postmark-Server-Token", &self.authorization_token)
            .json(&request_body)
            .send()
            .await
            .context("http client request to email service")?
            .error_for_status()
            .context("http client response")?;

        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text_content: &'a str,
    // Plain-text-only messages must not carry an empty html part.
    #[serde(skip_serializing_if = "Option::is_none")]
    html_content: Option<&'a str>,
}

#[cfg(test)]
mod tests {
    use crate::domain::ports::secondary::{Email, EmailService};
    use crate::domain::EmailAddress;
    use crate::services::email::EmailClient;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::lorem::en::{Paragraph, Sentence};
    use fake::{Fake, Faker};
    use speculoos::prelude::*;
    use wiremock::matchers::{any, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    use common::settings::EmailClientSettings;

    // Used by wiremock to ensure that our request sent
    // to the email service has all the fields required.
    struct SendEmailBodyMatcher {
        expect_html: bool,
    }

    impl wiremock::Match for SendEmailBodyMatcher {
        fn matches(&self, request: &Request) -> bool {
            // Try to parse the body's json
            let result: Result<serde_json::Value, _> = serde_json::from_slice(&request.body);
            if let Ok(body) = result {
                body.get("From").is_some()
                    && body.get("To").is_some()
                    && body.get("Subject").is_some()
                    && body.get("TextContent").is_some()
                    && body.get("HtmlContent").is_some() == self.expect_html
            } else {
                false
            }
        }
    }

    /// Generate a random email subject
    fn subject() -> String {
        Sentence(1..2).fake()
    }

    /// Generate some random email content
    fn content() -> String {
        Paragraph(1..10).fake()
    }

    /// Generate a random recipient email
    fn email_addr() -> EmailAddress {
        EmailAddress::parse(SafeEmail().fake::<String>()).unwrap()
    }

    fn email_settings(server_url: String, timeout: u64) -> EmailClientSettings {
        EmailClientSettings {
            server_url,
            sender_email: SafeEmail().fake(),
            authorization_token: Faker.fake::<String>(),
            timeout,
        }
    }

    #[tokio::test]
    async fn send_email_should_fire_a_request_to_server_url() {
        // Arrange
        let mock_server = MockServer::start().await;
        let email_client = EmailClient::new(email_settings(mock_server.uri(), 10))
            .await
            .expect("email client");

        Mock::given(header_exists("X-Postmark-Server-Token"))
            .and(header("Content-Type", "application/json"))
            .and(path("/email"))
            .and(method("POST"))
            .and(SendEmailBodyMatcher { expect_html: true })
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let email = Email {
            to: email_addr(),
            subject: subject(),
            text_content: content(),
            html_content: Some(content()),
        };

        // Act
        let _ = email_client.send_email(email).await;
        // Assert
        // wiremock asserts on drop
    }

    #[tokio::test]
    async fn send_email_omits_the_html_part_when_there_is_none() {
        // Arrange
        let mock_server = MockServer::start().await;
        let email_client = EmailClient::new(email_settings(mock_server.uri(), 10))
            .await
            .expect("email client");

        Mock::given(path("/email"))
            .and(method("POST"))
            .and(SendEmailBodyMatcher { expect_html: false })
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let email = Email {
            to: email_addr(),
            subject: subject(),
            text_content: content(),
            html_content: None,
        };

        // Act
        let _ = email_client.send_email(email).await;
        // Assert
        // wiremock asserts on drop
    }

    #[tokio::test]
    async fn send_email_succeeds_if_the_server_returns_200() {
        // Arrange
        let mock_server = MockServer::start().await;
        let email_client = EmailClient::new(email_settings(mock_server.uri(), 10))
            .await
            .expect("email client");

        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let email = Email {
            to: email_addr(),
            subject: subject(),
            text_content: content(),
            html_content: Some(content()),
        };

        // Act
        let outcome = email_client.send_email(email).await;

        // Assert
        assert_that(&outcome).is_ok();
    }

    #[tokio::test]
    async fn send_email_fails_if_the_server_returns_500() {
        // Arrange
        let mock_server = MockServer::start().await;
        let email_client = EmailClient::new(email_settings(mock_server.uri(), 10))
            .await
            .expect("email client");

        Mock::given(any())
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let email = Email {
            to: email_addr(),
            subject: subject(),
            text_content: content(),
            html_content: None,
        };

        // Act
        let outcome = email_client.send_email(email).await;

        // Assert
        assert_that(&outcome).is_err();
    }

    #[tokio::test]
    async fn send_email_times_out_if_the_server_takes_too_long() {
        // In this test, we have the email_client with a
        // short timeout, _shorter_ than the response from the
        // mock_server, to test the response
        // Arrange
        let mock_server = MockServer::start().await;
        let email_client = EmailClient::new(email_settings(mock_server.uri(), 3))
            .await
            .expect("email client");

        let response = ResponseTemplate::new(200).set_delay(std::time::Duration::from_secs(6));

        Mock::given(any())
            .respond_with(response)
            .expect(1)
            .mount(&mock_server)
            .await;

        let email = Email {
            to: email_addr(),
            subject: subject(),
            text_content: content(),
            html_content: None,
        };

        // Act
        let outcome = email_client.send_email(email).await;

        assert_that(&outcome).is_err();
    }
}
