//! HTTP client for a running diagnosis server's probe endpoints

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

/// Client for the diagnosis server
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

/// Probe answer: whether the endpoint reported success, plus its body
#[derive(Debug)]
pub struct Probe<T> {
    pub ok: bool,
    pub body: T,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid server URL")?;

        Ok(Self { client, base_url })
    }

    /// GET a probe endpoint.
    ///
    /// Probes answer 503 with a JSON body when not healthy/ready, so 503 is
    /// parsed rather than treated as a transport error.
    pub async fn probe<T: DeserializeOwned>(&self, path: &str) -> Result<Probe<T>> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to reach diagnosis server")?;

        let status = response.status();
        if !status.is_success() && status != StatusCode::SERVICE_UNAVAILABLE {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Server error ({}): {}", status, body);
        }

        let body = response.json().await.context("Failed to parse response")?;
        Ok(Probe {
            ok: status.is_success(),
            body,
        })
    }
}
