//! reqwest による HTTP トランスポート

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::Client;
use tracing::debug;

use crate::config::TransportConfig;
use crate::error::ScraperError;
use crate::traits::{Page, Transport};

#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, ScraperError> {
        let redirect = if config.follow_redirects {
            Policy::limited(config.max_redirects)
        } else {
            Policy::none()
        };

        let mut builder = Client::builder()
            .user_agent(&config.user_agent)
            .redirect(redirect)
            .cookie_store(config.cookie_persistence);

        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| ScraperError::Transport(format!("クライアント初期化: {}", e)))?;

        Ok(Self { client })
    }

    async fn read_page(response: reqwest::Response) -> Result<Page, ScraperError> {
        let url = response.url().clone();
        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        debug!("Fetched {} ({} bytes)", url, body.len());

        Ok(Page { url, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Page, ScraperError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::read_page(response).await
    }

    async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<Page, ScraperError> {
        debug!("POST {} ({} fields)", url, fields.len());
        let response = self.client.post(url).form(fields).send().await?;
        Self::read_page(response).await
    }
}
