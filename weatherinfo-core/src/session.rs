//! UI-facing entry point: last request wins.
//!
//! Every fetch gets a token from a monotonically increasing counter. A result
//! is shown only if its token is still the newest one when it arrives, so a
//! slow superseded fetch can never overwrite a newer request's state.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::watch;

use crate::{
    Config,
    cache::FileWeatherCache,
    location::{DeviceLocation, LocationResolver},
    model::{FailureNotice, FetchResult, FetchState, LocationRequest},
    orchestrator::WeatherFetchOrchestrator,
    provider::clients_from_config,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn get(self) -> u64 {
        self.0
    }
}

/// The UI-visible state: the latest delivered result and its request.
#[derive(Debug, Clone, PartialEq)]
pub struct Displayed {
    pub token: RequestToken,
    pub result: FetchResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Delivered(FetchResult),
    /// A newer request was issued before this one finished; its result was dropped.
    Superseded,
}

#[derive(Debug, Clone)]
pub struct WeatherSession {
    orchestrator: WeatherFetchOrchestrator,
    latest: Arc<AtomicU64>,
    display: Arc<watch::Sender<Option<Displayed>>>,
}

impl WeatherSession {
    pub fn new(orchestrator: WeatherFetchOrchestrator) -> Self {
        let (display, _) = watch::channel(None);
        Self {
            orchestrator,
            latest: Arc::new(AtomicU64::new(0)),
            display: Arc::new(display),
        }
    }

    /// Wire the OpenWeather clients and the file cache from config.
    pub fn from_config(config: &Config, device: Option<DeviceLocation>) -> anyhow::Result<Self> {
        let clients = clients_from_config(config)?;
        let cache = FileWeatherCache::new(config.resolved_cache_path()?);
        let resolver = LocationResolver::new(clients.geocoder, device, config.location_timeout());

        Ok(Self::new(WeatherFetchOrchestrator::new(
            resolver,
            clients.weather,
            clients.icons,
            Arc::new(cache),
        )))
    }

    /// Issue the token for a new request, superseding all earlier ones.
    pub fn begin(&self) -> RequestToken {
        RequestToken(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest.load(Ordering::SeqCst) == token.0
    }

    /// Publish `result` if `token` is still the newest request.
    pub fn deliver(&self, token: RequestToken, result: FetchResult) -> Delivery {
        let shown = result.clone();
        let delivered = self.display.send_if_modified(|slot| {
            if !self.is_current(token) {
                return false;
            }
            *slot = Some(Displayed { token, result });
            true
        });

        if delivered {
            Delivery::Delivered(shown)
        } else {
            tracing::debug!(token = token.0, "Discarding superseded weather result");
            Delivery::Superseded
        }
    }

    /// Run a fetch and deliver its result under last-request-wins rules.
    pub async fn fetch(&self, request: &LocationRequest) -> Delivery {
        let token = self.begin();
        tracing::debug!(token = token.0, ?request, "Weather fetch requested");

        let orchestrator = self.orchestrator.clone();
        let owned = request.clone();
        let result = match tokio::spawn(async move { orchestrator.fetch(&owned).await }).await {
            Ok(result) => result,
            Err(e) => {
                // The pipeline died mid-flight; there is no stage to fall back from.
                tracing::error!(token = token.0, error = %e, "Weather fetch aborted");
                FetchResult::Failed(FailureNotice::new(
                    FetchState::Idle,
                    "The weather request stopped unexpectedly.",
                ))
            }
        };
        self.deliver(token, result)
    }

    /// Watch the UI-visible state.
    pub fn subscribe(&self) -> watch::Receiver<Option<Displayed>> {
        self.display.subscribe()
    }

    pub fn displayed(&self) -> Option<Displayed> {
        self.display.borrow().clone()
    }
}
