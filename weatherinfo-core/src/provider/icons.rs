use async_trait::async_trait;
use reqwest::Client;

use crate::error::NetworkError;

use super::{IconClient, IconFetch};

const DEFAULT_BASE_URL: &str = "https://openweathermap.org";

/// Fetches OpenWeather condition icons (`/img/wn/{id}@2x.png`).
#[derive(Debug, Clone)]
pub struct OpenWeatherIcons {
    base_url: String,
    http: Client,
}

impl OpenWeatherIcons {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL, Client::new())
    }

    pub fn with_base_url(base_url: &str, http: Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn icon_url(&self, icon_id: &str) -> String {
        format!("{}/img/wn/{}@2x.png", self.base_url, icon_id)
    }
}

impl Default for OpenWeatherIcons {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IconClient for OpenWeatherIcons {
    async fn fetch_icon(&self, icon_id: &str) -> Result<IconFetch, NetworkError> {
        if icon_id.is_empty() {
            return Ok(IconFetch::NoIcon);
        }

        // Icon ids are short codes like "50d"; anything else would escape the path.
        if !icon_id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(NetworkError::Unknown(format!("Invalid icon id '{icon_id}'")));
        }

        let res = self.http.get(self.icon_url(icon_id)).send().await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(NetworkError::from_status(status, &body));
        }

        let bytes = res.bytes().await?;
        if bytes.is_empty() {
            return Err(NetworkError::Unknown(format!("Icon '{icon_id}' came back empty")));
        }

        tracing::debug!(icon_id, size = bytes.len(), "Icon fetched");
        Ok(IconFetch::Icon(bytes.to_vec()))
    }
}
