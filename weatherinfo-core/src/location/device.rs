//! Channel between the resolver and the platform location source.
//!
//! The resolver asks for a position by bumping a request counter; the
//! platform side answers by publishing a fix tagged with the request it
//! answers. The fix slot holds only the latest value, and a waiter accepts
//! the first fix tagged with its own request (or a newer one). Anything
//! older is stale and ignored.

use std::{sync::Arc, time::Duration};

use tokio::sync::watch;

use crate::{error::LocationError, model::Coordinates};

/// What the platform location source reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DeviceFix {
    Position(Coordinates),
    Denied,
    Unknown,
}

/// Identifies one location request issued by the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FixRequest(pub u64);

#[derive(Debug, Clone, Copy)]
struct TaggedFix {
    request: FixRequest,
    fix: DeviceFix,
}

/// Create a connected resolver-side handle and platform-side feed.
pub fn device_location() -> (DeviceLocation, DeviceFeed) {
    let (request_tx, request_rx) = watch::channel(0u64);
    let (fix_tx, fix_rx) = watch::channel(None);

    (
        DeviceLocation {
            requests: Arc::new(request_tx),
            fixes: fix_rx,
        },
        DeviceFeed {
            requests: request_rx,
            fixes: fix_tx,
        },
    )
}

/// Resolver side: request a position and wait for its answer.
#[derive(Debug, Clone)]
pub struct DeviceLocation {
    requests: Arc<watch::Sender<u64>>,
    fixes: watch::Receiver<Option<TaggedFix>>,
}

impl DeviceLocation {
    /// Issue a new location request and wait for exactly one fix answering it.
    pub async fn current_fix(&self, timeout: Duration) -> Result<Coordinates, LocationError> {
        let mut id = 0;
        self.requests.send_modify(|n| {
            *n += 1;
            id = *n;
        });
        let request = FixRequest(id);
        tracing::debug!(request = id, "Requested device location");

        let mut fixes = self.fixes.clone();
        let answered = tokio::time::timeout(
            timeout,
            fixes.wait_for(|slot| matches!(slot, Some(tagged) if tagged.request >= request)),
        )
        .await
        .map_err(|_| LocationError::Timeout(timeout))?
        .map_err(|_| LocationError::PositionUnknown)?;

        let tagged = (*answered).ok_or(LocationError::PositionUnknown)?;

        match tagged.fix {
            DeviceFix::Position(coordinates) => coordinates.validate(),
            DeviceFix::Denied => Err(LocationError::PermissionDenied),
            DeviceFix::Unknown => Err(LocationError::PositionUnknown),
        }
    }
}

/// Platform side: receives location requests and publishes fixes.
#[derive(Debug)]
pub struct DeviceFeed {
    requests: watch::Receiver<u64>,
    fixes: watch::Sender<Option<TaggedFix>>,
}

impl DeviceFeed {
    /// Wait for the next location request. Returns `None` once every
    /// [`DeviceLocation`] handle is gone.
    pub async fn next_request(&mut self) -> Option<FixRequest> {
        self.requests.changed().await.ok()?;
        Some(FixRequest(*self.requests.borrow_and_update()))
    }

    /// Answer `request`. Replaces whatever fix was published before.
    pub fn publish(&self, request: FixRequest, fix: DeviceFix) {
        self.fixes.send_replace(Some(TaggedFix { request, fix }));
    }

    /// Answer every request with the same fix until the resolver side is dropped.
    pub async fn answer_all_with(mut self, fix: DeviceFix) {
        while let Some(request) = self.next_request().await {
            self.publish(request, fix);
        }
    }
}
