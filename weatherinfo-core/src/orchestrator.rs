//! The fetch-with-cache-fallback pipeline.
//!
//! `Idle → Resolving → FetchingWeather → FetchingIcon → Persisting → Done`,
//! with failures in the first three stages going to `FallbackToCache`.
//! Steps run strictly in order. Nothing is kept between calls except what
//! the cache stores.

use std::{fmt::Display, sync::Arc};

use crate::{
    cache::WeatherCache,
    location::LocationResolver,
    model::{FailureNotice, FetchResult, FetchState, LocationRequest, WeatherReading},
    provider::{IconClient, IconFetch, WeatherClient},
};

#[derive(Debug, Clone)]
pub struct WeatherFetchOrchestrator {
    resolver: LocationResolver,
    weather: Arc<dyn WeatherClient>,
    icons: Arc<dyn IconClient>,
    cache: Arc<dyn WeatherCache>,
}

impl WeatherFetchOrchestrator {
    pub fn new(
        resolver: LocationResolver,
        weather: Arc<dyn WeatherClient>,
        icons: Arc<dyn IconClient>,
        cache: Arc<dyn WeatherCache>,
    ) -> Self {
        Self {
            resolver,
            weather,
            icons,
            cache,
        }
    }

    /// Run one fetch. Never returns an error: failures become `Cached` or
    /// `Empty` with a notice.
    pub async fn fetch(&self, request: &LocationRequest) -> FetchResult {
        transition(FetchState::Resolving);
        let location = match self.resolver.resolve(request).await {
            Ok(location) => location,
            Err(e) => return self.fall_back(FetchState::Resolving, e).await,
        };

        transition(FetchState::FetchingWeather);
        let mut reading = match self.weather.fetch_weather(location.coordinates).await {
            Ok(reading) => reading,
            Err(e) => return self.fall_back(FetchState::FetchingWeather, e).await,
        };
        if let Some(label) = location.label {
            reading.location_name = label;
        }

        if !reading.has_icon() {
            // Only records with a renderable icon are cached.
            tracing::info!(location = %reading.location_name, "Fresh weather without icon");
            transition(FetchState::Done);
            return FetchResult::Fresh {
                reading,
                icon: None,
            };
        }

        transition(FetchState::FetchingIcon);
        let icon = match self.icons.fetch_icon(&reading.icon_id).await {
            Ok(IconFetch::Icon(bytes)) => bytes,
            Ok(IconFetch::NoIcon) => {
                transition(FetchState::Done);
                return FetchResult::Fresh {
                    reading,
                    icon: None,
                };
            }
            Err(e) => return self.fall_back(FetchState::FetchingIcon, e).await,
        };

        transition(FetchState::Persisting);
        self.persist(&reading, &icon).await;

        tracing::info!(location = %reading.location_name, "Fresh weather delivered");
        transition(FetchState::Done);
        FetchResult::Fresh {
            reading,
            icon: Some(icon),
        }
    }

    async fn persist(&self, reading: &WeatherReading, icon: &[u8]) {
        if let Err(e) = self.cache.write(reading, icon).await {
            tracing::warn!(error = %e, "Failed to cache weather record; delivering fresh data anyway");
        }
    }

    async fn fall_back(&self, stage: FetchState, error: impl Display) -> FetchResult {
        tracing::warn!(%stage, error = %error, "Live fetch failed");
        transition(FetchState::FallbackToCache);

        let notice = FailureNotice::new(stage, error.to_string());
        let result = match self.cache.read().await {
            Some(record) => {
                tracing::info!(location = %record.reading.location_name, "Serving cached weather");
                FetchResult::Cached { record, notice }
            }
            None => {
                tracing::info!("No cached weather to fall back to");
                FetchResult::Empty { notice }
            }
        };

        transition(FetchState::Done);
        result
    }
}

fn transition(state: FetchState) {
    tracing::debug!(%state, "Weather fetch state");
}
