use std::time::Duration;

use error_stack::{Report, ResultExt};
use futures::future::BoxFuture;

use crate::error::NotifyError;
use crate::notifier::Notifier;

pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Sends messages to a single Telegram chat through the Bot API.
pub struct TelegramNotifier {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(
        api_base: &str,
        bot_token: &str,
        chat_id: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, api_base, bot_token, chat_id))
    }

    pub fn with_client(
        client: reqwest::Client,
        api_base: &str,
        bot_token: &str,
        chat_id: &str,
    ) -> Self {
        Self {
            client,
            endpoint: send_message_url(api_base, bot_token),
            chat_id: chat_id.to_owned(),
        }
    }
}

fn send_message_url(api_base: &str, bot_token: &str) -> String {
    format!("{}/bot{}/sendMessage", api_base.trim_end_matches('/'), bot_token)
}

impl Notifier for TelegramNotifier {
    fn notify(&self, message: &str) -> BoxFuture<'_, Result<(), Report<NotifyError>>> {
        let message = message.to_owned();
        Box::pin(async move {
            let params = [("chat_id", self.chat_id.as_str()), ("text", message.as_str())];

            let response = self
                .client
                .post(&self.endpoint)
                .form(&params)
                .send()
                .await
                // reqwest errors embed the URL, which carries the bot token
                .map_err(|e| e.without_url())
                .change_context(NotifyError::Request)?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Report::new(NotifyError::Delivery)
                    .attach(format!("HTTP status: {status}"))
                    .attach(format!("body: {body}")));
            }

            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{direct_client, serve_once};

    #[tokio::test]
    async fn posts_chat_id_and_text_as_form_fields() {
        let (base_url, server) = serve_once("200 OK", r#"{"ok":true}"#).await;
        let notifier = TelegramNotifier::with_client(direct_client(), &base_url, "123:abc", "42");

        notifier.notify("BTCUSDT Above 70000").await.unwrap();

        let request = server.await.unwrap();
        assert!(
            request
                .request_line
                .starts_with("POST /bot123:abc/sendMessage "),
            "unexpected request line: {}",
            request.request_line
        );
        assert_eq!(request.body, "chat_id=42&text=BTCUSDT+Above+70000");
    }

    #[tokio::test]
    async fn rejected_message_is_delivery_error() {
        let (base_url, server) = serve_once(
            "401 Unauthorized",
            r#"{"ok":false,"error_code":401,"description":"Unauthorized"}"#,
        )
        .await;
        let notifier = TelegramNotifier::with_client(direct_client(), &base_url, "bad", "42");

        let err = notifier.notify("hello").await.unwrap_err();

        assert!(matches!(err.current_context(), NotifyError::Delivery));
        server.await.unwrap();
    }

    #[test]
    fn send_message_url_embeds_token() {
        assert_eq!(
            send_message_url("https://api.telegram.org/", "123:abc"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    #[tokio::test]
    async fn unreachable_endpoint_reports_request_error() {
        // Bind and release a port so nothing is listening on it
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier =
            TelegramNotifier::with_client(direct_client(), &format!("http://{addr}"), "token", "chat");
        let err = notifier.notify("hello").await.unwrap_err();
        assert!(matches!(err.current_context(), NotifyError::Request));
    }
}
