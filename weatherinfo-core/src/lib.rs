//! Core library for the `weatherinfo` app.
//!
//! This crate defines:
//! - The fetch pipeline: resolve a location, fetch weather and its icon,
//!   persist the last good reading, fall back to it when live data fails
//! - Last-request-wins delivery for the UI
//! - The display model for readings
//! - Configuration handling
//!
//! It is used by `weatherinfo-cli`, but any front end can drive
//! [`WeatherSession`] and render the [`FetchResult`] it delivers.

pub mod cache;
pub mod config;
pub mod error;
pub mod location;
pub mod model;
pub mod orchestrator;
pub mod provider;
pub mod session;
pub mod view;

pub use cache::{FileWeatherCache, WeatherCache};
pub use config::{Config, Endpoints};
pub use error::{LocationError, NetworkError, StorageError};
pub use location::{DeviceFeed, DeviceFix, DeviceLocation, LocationResolver, device_location};
pub use model::{
    CachedWeatherRecord, Coordinates, FailureNotice, FetchResult, FetchState, LocationRequest,
    WeatherReading,
};
pub use orchestrator::WeatherFetchOrchestrator;
pub use provider::{IconClient, IconFetch, WeatherClient};
pub use session::{Delivery, Displayed, RequestToken, WeatherSession};
pub use view::WeatherView;
