use super::util::with_retry;
use crate::core::config::FetchConfig;
use crate::core::feed::{FeedProvider, export_url};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tracing::debug;

/// Fetches feed exports over HTTP.
pub struct HttpFeedProvider {
    client: reqwest::Client,
    retries: usize,
    retry_delay_ms: u64,
}

impl HttpFeedProvider {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            retries: config.retries,
            retry_delay_ms: config.retry_delay_ms,
        })
    }
}

#[async_trait]
impl FeedProvider for HttpFeedProvider {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let url = export_url(url);
        debug!("Requesting feed from {}", url);

        let response = with_retry(
            || async { self.client.get(&url).send().await },
            self.retries,
            self.retry_delay_ms,
        )
        .await
        .with_context(|| format!("Failed to send request to {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Feed request to {} failed with status {}", url, status));
        }

        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {url}"))?;
        debug!("Received {} bytes from {}", text.len(), url);
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn create_mock_server(feed_path: &str, status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(feed_path))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider() -> HttpFeedProvider {
        HttpFeedProvider::new(&FetchConfig {
            retries: 0,
            retry_delay_ms: 1,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_text() {
        let body = "Data,Valor,Descricao\n01/01/2024,10,Cafe\n";
        let mock_server = create_mock_server("/feeds/pix.csv", 200, body).await;

        let text = provider()
            .fetch_text(&format!("{}/feeds/pix.csv", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(text, body);
    }

    #[tokio::test]
    async fn test_error_status_is_an_error() {
        let mock_server = create_mock_server("/feeds/pix.csv", 404, "missing").await;

        let result = provider()
            .fetch_text(&format!("{}/feeds/pix.csv", mock_server.uri()))
            .await;
        let err = result.unwrap_err().to_string();
        assert!(err.contains("404"), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_only_sheets_host_is_rewritten() {
        let body = "05/03/2024,10,Cafe\n";
        let mock_server = create_mock_server("/spreadsheets/d/abc123/edit", 200, body).await;

        let text = provider()
            .fetch_text(&format!("{}/spreadsheets/d/abc123/edit", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(text, body);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let result = provider().fetch_text("http://127.0.0.1:9/feed.csv").await;
        assert!(result.is_err());
    }
}
