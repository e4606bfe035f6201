use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use super::{EventNotifier, NotifyError};

const WEBHOOK_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct WebhookMessage {
    id: String,
}

/// Announces events through an incoming Discord webhook.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: Url,
}

impl WebhookNotifier {
    pub fn new(url: Url) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECONDS))
            .build()?;
        Ok(Self { client, url })
    }

    fn execute_url(&self) -> Url {
        let mut url = self.url.clone();
        // ask Discord to return the created message so its id can be logged
        url.query_pairs_mut().append_pair("wait", "true");
        url
    }
}

#[async_trait]
impl EventNotifier for WebhookNotifier {
    async fn announce(&self, content: &str) -> Result<Option<String>, NotifyError> {
        let response = self
            .client
            .post(self.execute_url())
            .json(&WebhookPayload { content })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "discord webhook rejected announcement");
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let message_id = match response.json::<WebhookMessage>().await {
            Ok(message) => Some(message.id),
            Err(_) => None,
        };
        info!(message_id = ?message_id, "event announcement posted via webhook");
        Ok(message_id)
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;

    /// Accepts one connection, answers with `status` and `body`, and returns
    /// the raw request text.
    async fn one_shot_server(status: &'static str, body: &'static str) -> (Url, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.expect("read");
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.expect("write");
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        let url = Url::parse(&format!("http://{addr}/api/webhooks/1/token")).expect("url");
        (url, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    #[tokio::test]
    async fn posts_content_and_returns_message_id() {
        let (url, server) = one_shot_server("200 OK", r#"{"id":"1122"}"#).await;
        let notifier = WebhookNotifier::new(url).expect("notifier");

        let id = notifier
            .announce("Party tonight! event_id:abc-123")
            .await
            .expect("announce");
        assert_eq!(id.as_deref(), Some("1122"));

        let request = server.await.expect("server");
        assert!(request.starts_with("POST /api/webhooks/1/token?wait=true"));
        assert!(request.contains(r#"{"content":"Party tonight! event_id:abc-123"}"#));
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (url, server) = one_shot_server("400 Bad Request", r#"{"message":"bad"}"#).await;
        let notifier = WebhookNotifier::new(url).expect("notifier");

        let err = notifier.announce("hello").await.expect_err("rejected");
        assert!(matches!(err, NotifyError::Status { status: 400, .. }));
        server.await.expect("server");
    }
}
