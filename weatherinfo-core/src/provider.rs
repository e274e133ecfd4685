use crate::{
    Config,
    error::NetworkError,
    location::Geocoder,
    model::{Coordinates, WeatherReading},
    provider::{icons::OpenWeatherIcons, openweather::OpenWeatherClient},
};
use async_trait::async_trait;
use reqwest::Client;
use std::{fmt::Debug, sync::Arc, time::Duration};

pub mod icons;
pub mod openweather;

const USER_AGENT: &str = concat!("weatherinfo/", env!("CARGO_PKG_VERSION"));

/// Current conditions for a pair of coordinates. One request, no retries.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn fetch_weather(&self, coordinates: Coordinates)
    -> Result<WeatherReading, NetworkError>;
}

/// Outcome of an icon lookup that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IconFetch {
    Icon(Vec<u8>),
    /// The reading had no icon id; nothing was requested.
    NoIcon,
}

/// Raw icon image bytes for a condition icon id.
#[async_trait]
pub trait IconClient: Send + Sync + Debug {
    async fn fetch_icon(&self, icon_id: &str) -> Result<IconFetch, NetworkError>;
}

/// The remote collaborators of the pipeline, built from one config.
#[derive(Debug, Clone)]
pub struct RemoteClients {
    pub weather: Arc<dyn WeatherClient>,
    pub icons: Arc<dyn IconClient>,
    pub geocoder: Arc<dyn Geocoder>,
}

/// Shared HTTP client with the configured timeout.
pub fn http_client(timeout: Duration) -> Result<Client, NetworkError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| NetworkError::Unknown(format!("Failed to build HTTP client: {e}")))
}

/// Construct the OpenWeather-backed clients from config.
pub fn clients_from_config(config: &Config) -> anyhow::Result<RemoteClients> {
    let api_key = config.require_api_key()?;
    let http = http_client(config.request_timeout())?;

    let weather = Arc::new(OpenWeatherClient::with_base_url(
        api_key,
        &config.endpoints.weather_url,
        &config.endpoints.geocoding_url,
        http.clone(),
    ));
    let icons = Arc::new(OpenWeatherIcons::with_base_url(&config.endpoints.icon_url, http));

    Ok(RemoteClients {
        weather: weather.clone(),
        icons,
        geocoder: weather,
    })
}
