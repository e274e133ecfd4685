//! Turns a [`LocationRequest`] into coordinates to query.

use std::{fmt::Debug, sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    error::{LocationError, NetworkError},
    model::{Coordinates, LocationRequest, ResolvedLocation},
};

pub mod device;

pub use device::{DeviceFeed, DeviceFix, DeviceLocation, FixRequest, device_location};

/// A place found by forward geocoding.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub name: String,
    pub coordinates: Coordinates,
}

/// Forward geocoding: place name to coordinates.
#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// `Ok(None)` when the service knows no such place.
    async fn forward(&self, place: &str) -> Result<Option<GeocodedPlace>, NetworkError>;
}

#[derive(Debug, Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    device: Option<DeviceLocation>,
    fix_timeout: Duration,
}

impl LocationResolver {
    /// `device` may be `None` on hosts without a location source; device
    /// requests then fail with [`LocationError::PositionUnknown`].
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        device: Option<DeviceLocation>,
        fix_timeout: Duration,
    ) -> Self {
        Self {
            geocoder,
            device,
            fix_timeout,
        }
    }

    pub async fn resolve(
        &self,
        request: &LocationRequest,
    ) -> Result<ResolvedLocation, LocationError> {
        match request {
            LocationRequest::Coordinates { coordinates, label } => Ok(ResolvedLocation {
                coordinates: coordinates.validate()?,
                label: label.clone().filter(|l| !l.trim().is_empty()),
            }),
            LocationRequest::Place(name) if !name.trim().is_empty() => {
                self.resolve_place(name.trim()).await
            }
            // Blank place names fall through to the device position.
            LocationRequest::Place(_) | LocationRequest::CurrentDevice => {
                let device = self.device.as_ref().ok_or(LocationError::PositionUnknown)?;
                let coordinates = device.current_fix(self.fix_timeout).await?;
                Ok(ResolvedLocation {
                    coordinates,
                    label: None,
                })
            }
        }
    }

    async fn resolve_place(&self, name: &str) -> Result<ResolvedLocation, LocationError> {
        let place = self
            .geocoder
            .forward(name)
            .await?
            .ok_or_else(|| LocationError::PlaceNotFound(name.to_string()))?;

        tracing::debug!(query = name, resolved = %place.name, "Geocoded place");

        Ok(ResolvedLocation {
            coordinates: place.coordinates.validate()?,
            label: Some(place.name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct FakeGeocoder {
        calls: Mutex<Vec<String>>,
        outcome: Option<Result<Option<GeocodedPlace>, NetworkError>>,
    }

    #[async_trait]
    impl Geocoder for FakeGeocoder {
        async fn forward(&self, place: &str) -> Result<Option<GeocodedPlace>, NetworkError> {
            self.calls.lock().unwrap().push(place.to_string());
            self.outcome.clone().unwrap_or(Ok(None))
        }
    }

    fn resolver(geocoder: FakeGeocoder, device: Option<DeviceLocation>) -> LocationResolver {
        LocationResolver::new(Arc::new(geocoder), device, Duration::from_millis(200))
    }

    #[tokio::test]
    async fn coordinates_pass_through() {
        let r = resolver(FakeGeocoder::default(), None);
        let resolved = r
            .resolve(&LocationRequest::coordinates(23.7104, 90.4074).with_label("Dhaka"))
            .await
            .expect("valid coordinates");

        assert_eq!(resolved.coordinates, Coordinates::new(23.7104, 90.4074));
        assert_eq!(resolved.label.as_deref(), Some("Dhaka"));
    }

    #[tokio::test]
    async fn blank_label_is_dropped() {
        let r = resolver(FakeGeocoder::default(), None);
        let resolved = r
            .resolve(&LocationRequest::coordinates(0.0, 0.0).with_label("  "))
            .await
            .expect("valid coordinates");
        assert_eq!(resolved.label, None);
    }

    #[tokio::test]
    async fn invalid_coordinates_are_rejected() {
        let r = resolver(FakeGeocoder::default(), None);
        let err = r
            .resolve(&LocationRequest::coordinates(123.0, 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, LocationError::InvalidCoordinates { .. }));
    }

    #[tokio::test]
    async fn place_is_geocoded_and_labelled() {
        let geocoder = FakeGeocoder {
            outcome: Some(Ok(Some(GeocodedPlace {
                name: "Dhaka, BD".into(),
                coordinates: Coordinates::new(23.7104, 90.4074),
            }))),
            ..FakeGeocoder::default()
        };
        let r = resolver(geocoder, None);

        let resolved = r
            .resolve(&LocationRequest::place("  Dhaka "))
            .await
            .expect("known place");
        assert_eq!(resolved.coordinates, Coordinates::new(23.7104, 90.4074));
        assert_eq!(resolved.label.as_deref(), Some("Dhaka, BD"));
    }

    #[tokio::test]
    async fn unknown_place_is_unavailable() {
        let r = resolver(FakeGeocoder::default(), None);
        let err = r.resolve(&LocationRequest::place("Atlantis")).await.unwrap_err();
        assert_eq!(err, LocationError::PlaceNotFound("Atlantis".into()));
    }

    #[tokio::test]
    async fn geocoding_network_failure_is_unavailable() {
        let geocoder = FakeGeocoder {
            outcome: Some(Err(NetworkError::Transient("offline".into()))),
            ..FakeGeocoder::default()
        };
        let r = resolver(geocoder, None);
        let err = r.resolve(&LocationRequest::place("Dhaka")).await.unwrap_err();
        assert!(matches!(err, LocationError::Geocoding(NetworkError::Transient(_))));
    }

    #[tokio::test]
    async fn blank_place_uses_device_position() {
        let (location, feed) = device_location();
        let here = Coordinates::new(51.5, -0.12);
        tokio::spawn(feed.answer_all_with(DeviceFix::Position(here)));

        let geocoder = FakeGeocoder::default();
        let r = LocationResolver::new(Arc::new(geocoder), Some(location), Duration::from_secs(2));

        let resolved = r.resolve(&LocationRequest::place("")).await.expect("device fix");
        assert_eq!(resolved.coordinates, here);
        assert_eq!(resolved.label, None);

        let resolved = r
            .resolve(&LocationRequest::CurrentDevice)
            .await
            .expect("device fix");
        assert_eq!(resolved.coordinates, here);
    }

    #[tokio::test]
    async fn device_request_without_source_is_unavailable() {
        let r = resolver(FakeGeocoder::default(), None);
        let err = r.resolve(&LocationRequest::CurrentDevice).await.unwrap_err();
        assert_eq!(err, LocationError::PositionUnknown);
    }

    #[tokio::test]
    async fn blank_place_never_hits_geocoder() {
        let geocoder = Arc::new(FakeGeocoder::default());
        let r = LocationResolver::new(geocoder.clone(), None, Duration::from_millis(50));
        let _ = r.resolve(&LocationRequest::place("   ")).await;
        assert!(geocoder.calls.lock().unwrap().is_empty());
    }
}
