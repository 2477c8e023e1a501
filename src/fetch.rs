use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::{Result, ScheduleError};

/// Source of raw page markup, addressed by path relative to the site root.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, path: &str, query: &[(&str, &str)]) -> Result<String>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("bgtu-schedule/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| {
                ScheduleError::SourceUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, path: &str, query: &[(&str, &str)]) -> Result<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, params = ?query, "Fetching page");

        let response = self.client.get(&url).query(query).send().await.map_err(|e| {
            warn!(url = %url, error = %e, "Fetch failed");
            ScheduleError::SourceUnavailable(format!("Failed to fetch {}: {}", url, e))
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = %status, "Source answered with an error status");
            return Err(ScheduleError::SourceUnavailable(format!(
                "HTTP error {} from {}",
                status, url
            )));
        }

        let html = response.text().await?;
        debug!(url = %url, bytes = html.len(), "Received page");
        Ok(html)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::StaticPages;
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let fetcher =
            HttpFetcher::new("https://www.tu-bryansk.ru/", Duration::from_secs(15)).unwrap();
        assert_eq!(fetcher.base_url, "https://www.tu-bryansk.ru");
    }

    #[tokio::test]
    async fn test_static_pages_records_requests() {
        let pages = StaticPages::new().with_page("/a", "<p>a</p>");
        assert_eq!(pages.fetch("/a", &[("x", "1")]).await.unwrap(), "<p>a</p>");
        assert!(matches!(
            pages.fetch("/b", &[]).await,
            Err(ScheduleError::SourceUnavailable(_))
        ));
        assert_eq!(pages.request_count("/a"), 1);
        assert_eq!(pages.last_query("/a"), vec![("x".to_string(), "1".to_string())]);
    }
}
