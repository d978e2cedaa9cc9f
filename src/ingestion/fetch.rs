//! HTTP collaborator that fetches raw page HTML.
//!
//! Whatever status the wiki returns is data: success carries the body, an
//! error status carries none, and both are recorded by the caller as the
//! page's terminal fetch state. Only transport-level failures surface as
//! errors.

use reqwest::Client;
use tracing::debug;

use crate::types::RagError;

/// Result of one page fetch.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: u16,
    /// Present only when the response status was a success.
    pub html: Option<String>,
}

/// Fetches pages from `https://{project}.org/wiki/{page}`.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: Client,
    base_override: Option<String>,
}

impl PageFetcher {
    pub fn new(user_agent: &str) -> Result<Self, RagError> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_override: None,
        })
    }

    /// Replaces the `https://{project}.org` base, for tests and mirrors.
    #[must_use]
    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_override = Some(base.into());
        self
    }

    /// Builds the page URL. Non-ASCII characters are dropped, matching how
    /// page names arrive already percent-encoded in pageview dumps.
    fn page_url(&self, project: &str, page: &str) -> String {
        let raw = match &self.base_override {
            Some(base) => format!("{base}/wiki/{page}"),
            None => format!("https://{project}.org/wiki/{page}"),
        };
        raw.chars().filter(char::is_ascii).collect()
    }

    pub async fn fetch(&self, project: &str, page: &str) -> Result<FetchOutcome, RagError> {
        let url = self.page_url(project, page);
        debug!(%url, "fetching page");
        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();
        let html = if response.status().is_success() {
            Some(response.text().await?)
        } else {
            None
        };
        Ok(FetchOutcome { status, html })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_is_project_scoped() {
        let fetcher = PageFetcher::new("Mozilla/5.0").unwrap();
        assert_eq!(
            fetcher.page_url("en.wikipedia", "Ozone"),
            "https://en.wikipedia.org/wiki/Ozone"
        );
    }

    #[test]
    fn page_url_drops_non_ascii() {
        let fetcher = PageFetcher::new("Mozilla/5.0").unwrap();
        assert_eq!(
            fetcher.page_url("en.wikipedia", "Café"),
            "https://en.wikipedia.org/wiki/Caf"
        );
    }

    #[test]
    fn base_override_rewrites_host() {
        let fetcher = PageFetcher::new("Mozilla/5.0")
            .unwrap()
            .with_base_url("http://127.0.0.1:8080");
        assert_eq!(
            fetcher.page_url("en.wikipedia", "Ozone"),
            "http://127.0.0.1:8080/wiki/Ozone"
        );
    }
}
