use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::{
    error::NetworkError,
    location::{GeocodedPlace, Geocoder},
    model::{Coordinates, WeatherReading},
};

use super::WeatherClient;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// OpenWeather current-weather and direct-geocoding client.
///
/// Requests `units=metric`, so temperatures arrive in °C. The remaining
/// measurements are stored as reported.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    weather_url: String,
    geocoding_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL, DEFAULT_BASE_URL, Client::new())
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        weather_url: &str,
        geocoding_url: &str,
        http: Client,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            weather_url: weather_url.trim_end_matches('/').to_string(),
            geocoding_url: geocoding_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, NetworkError> {
        let res = self.http.get(url).query(query).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            tracing::debug!(%status, what, "OpenWeather request failed");
            return Err(NetworkError::from_status(status, &body));
        }

        serde_json::from_str(&body)
            .map_err(|e| NetworkError::Unknown(format!("Failed to parse OpenWeather {what} JSON: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    #[serde(default)]
    pressure: i64,
    #[serde(default)]
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Default, Deserialize)]
struct OwWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    dt: Option<i64>,
    main: OwMain,
    #[serde(default)]
    visibility: i64,
    #[serde(default)]
    wind: OwWind,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

const PA_PER_HPA: i64 = 100;
const METRES_PER_KM: i64 = 1000;

/// m/s to km/h, rounded to one decimal place.
fn ms_to_kmh(speed: f64) -> f64 {
    (speed * 36.0).round() / 10.0
}

impl From<OwCurrentResponse> for WeatherReading {
    fn from(parsed: OwCurrentResponse) -> Self {
        // No condition entries is valid: render without description or icon.
        let (description, icon_id) = parsed
            .weather
            .into_iter()
            .next()
            .map(|w| (w.description, w.icon))
            .unwrap_or_default();

        WeatherReading {
            location_name: parsed.name,
            temperature: parsed.main.temp,
            feels_like: parsed.main.feels_like,
            min_temperature: parsed.main.temp_min,
            max_temperature: parsed.main.temp_max,
            description,
            icon_id,
            pressure: parsed.main.pressure * PA_PER_HPA,
            humidity: parsed.main.humidity,
            visibility: parsed.visibility / METRES_PER_KM,
            wind_speed: ms_to_kmh(parsed.wind.speed),
            observed_at: parsed.dt.and_then(unix_to_utc),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    name: String,
    lat: f64,
    lon: f64,
    country: Option<String>,
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn fetch_weather(
        &self,
        coordinates: Coordinates,
    ) -> Result<WeatherReading, NetworkError> {
        let url = format!("{}/data/2.5/weather", self.weather_url);

        let parsed: OwCurrentResponse = self
            .get_json(
                &url,
                &[
                    ("lat", coordinates.latitude.to_string()),
                    ("lon", coordinates.longitude.to_string()),
                    ("appid", self.api_key.clone()),
                    ("units", "metric".to_string()),
                ],
                "current weather",
            )
            .await?;

        let reading = WeatherReading::from(parsed);
        tracing::debug!(location = %reading.location_name, "OpenWeather current weather received");
        Ok(reading)
    }
}

#[async_trait]
impl Geocoder for OpenWeatherClient {
    async fn forward(&self, place: &str) -> Result<Option<GeocodedPlace>, NetworkError> {
        let url = format!("{}/geo/1.0/direct", self.geocoding_url);

        let entries: Vec<OwGeoEntry> = self
            .get_json(
                &url,
                &[
                    ("q", place.to_string()),
                    ("limit", "1".to_string()),
                    ("appid", self.api_key.clone()),
                ],
                "geocoding",
            )
            .await?;

        Ok(entries.into_iter().next().map(|entry| {
            let name = match entry.country {
                Some(country) if !country.is_empty() => format!("{}, {}", entry.name, country),
                _ => entry.name,
            };
            GeocodedPlace {
                name,
                coordinates: Coordinates::new(entry.lat, entry.lon),
            }
        }))
    }
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}
