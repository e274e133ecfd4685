use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LocationError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Reject NaN/infinite values and anything outside the WGS84 ranges.
    pub fn validate(self) -> Result<Self, LocationError> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);

        if lat_ok && lon_ok {
            Ok(self)
        } else {
            Err(LocationError::InvalidCoordinates {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// What the UI asks the pipeline to fetch weather for.
#[derive(Debug, Clone, PartialEq)]
pub enum LocationRequest {
    /// Explicit coordinates, e.g. a search result the user picked.
    /// `label` replaces the service's station name when present.
    Coordinates {
        coordinates: Coordinates,
        label: Option<String>,
    },
    /// A place name to forward-geocode. Blank names mean "no override" and
    /// resolve like [`LocationRequest::CurrentDevice`].
    Place(String),
    /// Wherever the device currently is.
    CurrentDevice,
}

impl LocationRequest {
    pub fn coordinates(latitude: f64, longitude: f64) -> Self {
        Self::Coordinates {
            coordinates: Coordinates::new(latitude, longitude),
            label: None,
        }
    }

    pub fn place(name: impl Into<String>) -> Self {
        Self::Place(name.into())
    }

    pub fn with_label(self, label: impl Into<String>) -> Self {
        match self {
            Self::Coordinates { coordinates, .. } => Self::Coordinates {
                coordinates,
                label: Some(label.into()),
            },
            other => other,
        }
    }
}

/// Output of the location resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLocation {
    pub coordinates: Coordinates,
    pub label: Option<String>,
}

/// One point-in-time observation, exactly as the weather service reported it.
///
/// Temperatures are in °C at full precision. Truncation to whole degrees is a
/// display concern, see [`crate::view::WeatherView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    pub location_name: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub min_temperature: f64,
    pub max_temperature: f64,
    /// Empty when the service sent no condition entries.
    pub description: String,
    /// Empty when the service sent no condition entries.
    pub icon_id: String,
    pub pressure: i64,
    pub humidity: i64,
    pub visibility: i64,
    pub wind_speed: f64,
    #[serde(default)]
    pub observed_at: Option<DateTime<Utc>>,
}

impl WeatherReading {
    pub fn has_icon(&self) -> bool {
        !self.icon_id.is_empty()
    }
}

/// The single persisted entity: a reading together with its icon image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedWeatherRecord {
    pub reading: WeatherReading,
    /// Stored as a base64 string.
    #[serde(with = "base64_bytes")]
    pub icon: Vec<u8>,
}

mod base64_bytes {
    use base64::{Engine, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(de::Error::custom)
    }
}

/// Pipeline stages. Failures in `Resolving`, `FetchingWeather` or
/// `FetchingIcon` move to `FallbackToCache`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FetchState {
    Idle,
    Resolving,
    FetchingWeather,
    FetchingIcon,
    Persisting,
    FallbackToCache,
    Done,
}

impl fmt::Display for FetchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Resolving => "resolving location",
            Self::FetchingWeather => "fetching weather",
            Self::FetchingIcon => "fetching icon",
            Self::Persisting => "persisting",
            Self::FallbackToCache => "falling back to cache",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// User-facing explanation of why live data could not be shown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureNotice {
    pub stage: FetchState,
    pub message: String,
}

impl FailureNotice {
    pub fn new(stage: FetchState, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }

    /// Short alert title.
    pub fn headline(&self) -> &'static str {
        match self.stage {
            FetchState::Resolving => "Location unavailable",
            FetchState::Idle => "Weather unavailable",
            _ => "No Internet",
        }
    }
}

impl fmt::Display for FailureNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.headline(), self.message)
    }
}

/// What a fetch hands back to the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    /// Live data. `icon` is `None` when the reading carries no icon id.
    Fresh {
        reading: WeatherReading,
        icon: Option<Vec<u8>>,
    },
    /// Live data was unavailable; this is the last stored record.
    Cached {
        record: CachedWeatherRecord,
        notice: FailureNotice,
    },
    /// Live data was unavailable and nothing has been stored yet.
    Empty { notice: FailureNotice },
    /// The fetch was aborted before it could reach the cache fallback.
    Failed(FailureNotice),
}

impl FetchResult {
    pub fn reading(&self) -> Option<&WeatherReading> {
        match self {
            Self::Fresh { reading, .. } => Some(reading),
            Self::Cached { record, .. } => Some(&record.reading),
            Self::Empty { .. } | Self::Failed(_) => None,
        }
    }

    pub fn icon(&self) -> Option<&[u8]> {
        match self {
            Self::Fresh { icon, .. } => icon.as_deref(),
            Self::Cached { record, .. } => Some(&record.icon),
            Self::Empty { .. } | Self::Failed(_) => None,
        }
    }

    pub fn notice(&self) -> Option<&FailureNotice> {
        match self {
            Self::Fresh { .. } => None,
            Self::Cached { notice, .. } | Self::Empty { notice } | Self::Failed(notice) => {
                Some(notice)
            }
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, Self::Fresh { .. })
    }
}
