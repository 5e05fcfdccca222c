use serde::{Deserialize, Serialize};
use std::mem;

use crate::capabilities::MapHandle;
use crate::config::GeoviewConfig;
use crate::event::{LngLat, PixelPoint, ValidationError};
use crate::geocoding::GeocodingClient;
use crate::overlay::OverlayStatus;
use crate::sidebar::{Padding, SidebarState};
use crate::suggestion::SuggestionState;
use crate::{
    DEFAULT_BEARING, DEFAULT_CENTER, DEFAULT_PITCH, DEFAULT_ZOOM, MAX_ZOOM, MIN_ZOOM, SELECTION_ZOOM,
};

// --- Map instance lifecycle ---

/// At most one map exists per controller. Every state after `Unmounted`
/// keeps its handle so `Unmount` can always tear down what the shell built.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum MapLifecycle {
    #[default]
    Unmounted,
    Loading {
        handle: MapHandle,
    },
    Ready {
        handle: MapHandle,
    },
    Failed {
        handle: MapHandle,
        reason: String,
    },
}

/// Proof that the base style of a map has finished loading.
///
/// Only [`MapLifecycle::mark_ready`] can produce one, and it does so once per
/// map instance. Source, layer and marker operations require it.
#[derive(Debug)]
pub struct StyleReady {
    handle: MapHandle,
}

impl StyleReady {
    pub fn handle(&self) -> &MapHandle {
        &self.handle
    }
}

impl MapLifecycle {
    pub fn handle(&self) -> Option<&MapHandle> {
        match self {
            MapLifecycle::Unmounted => None,
            MapLifecycle::Loading { handle }
            | MapLifecycle::Ready { handle }
            | MapLifecycle::Failed { handle, .. } => Some(handle),
        }
    }

    /// Handle camera commands may target. A failed map takes none.
    pub fn camera_handle(&self) -> Option<&MapHandle> {
        match self {
            MapLifecycle::Loading { handle } | MapLifecycle::Ready { handle } => Some(handle),
            MapLifecycle::Unmounted | MapLifecycle::Failed { .. } => None,
        }
    }

    pub fn is_current(&self, handle: &MapHandle) -> bool {
        self.handle() == Some(handle)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, MapLifecycle::Ready { .. })
    }

    /// `Loading → Ready` for the current map. Repeated or foreign ready
    /// signals yield `None`.
    pub fn mark_ready(&mut self, handle: &MapHandle) -> Option<StyleReady> {
        match self {
            MapLifecycle::Loading { handle: current } if current == handle => {
                let handle = current.clone();
                *self = MapLifecycle::Ready {
                    handle: handle.clone(),
                };
                Some(StyleReady { handle })
            }
            _ => None,
        }
    }

    /// Returns whether the state changed.
    pub fn fail(&mut self, reason: impl Into<String>) -> bool {
        match self {
            MapLifecycle::Loading { handle } | MapLifecycle::Ready { handle } => {
                let handle = handle.clone();
                *self = MapLifecycle::Failed {
                    handle,
                    reason: reason.into(),
                };
                true
            }
            MapLifecycle::Unmounted | MapLifecycle::Failed { .. } => false,
        }
    }

    /// Resets to `Unmounted`, handing back whatever handle was held.
    pub fn take_handle(&mut self) -> Option<MapHandle> {
        match mem::take(self) {
            MapLifecycle::Unmounted => None,
            MapLifecycle::Loading { handle }
            | MapLifecycle::Ready { handle }
            | MapLifecycle::Failed { handle, .. } => Some(handle),
        }
    }

    pub fn status(&self) -> MapStatus {
        match self {
            MapLifecycle::Unmounted => MapStatus::Unmounted,
            MapLifecycle::Loading { .. } => MapStatus::Loading,
            MapLifecycle::Ready { .. } => MapStatus::Ready,
            MapLifecycle::Failed { reason, .. } => MapStatus::Failed {
                reason: reason.clone(),
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapStatus {
    Unmounted,
    Loading,
    Ready,
    Failed { reason: String },
}

// --- Camera ---

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ZoomLevel {
    value: f64,
}

impl ZoomLevel {
    /// Zoom the camera flies to when an address is picked.
    pub const SELECTION: Self = Self {
        value: SELECTION_ZOOM,
    };

    pub fn new(value: f64) -> Result<Self, ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::InvalidZoom(value));
        }
        Ok(Self {
            value: value.clamp(MIN_ZOOM, MAX_ZOOM),
        })
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.value
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self {
            value: DEFAULT_ZOOM,
        }
    }
}

impl TryFrom<f64> for ZoomLevel {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ZoomLevel> for f64 {
    fn from(zoom: ZoomLevel) -> Self {
        zoom.value
    }
}

/// Last known camera. Written on construction, on core-issued flights and on
/// every `CameraMoved` report, so the proximity hint follows the visible map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapViewport {
    pub center: LngLat,
    pub zoom: ZoomLevel,
    pub pitch: f64,
    pub bearing: f64,
    /// Space reserved for open side panels.
    pub padding: Padding,
}

impl Default for MapViewport {
    fn default() -> Self {
        Self {
            center: DEFAULT_CENTER,
            zoom: ZoomLevel::default(),
            pitch: DEFAULT_PITCH,
            bearing: DEFAULT_BEARING,
            padding: SidebarState::default().padding(),
        }
    }
}

impl MapViewport {
    pub fn apply(&mut self, report: CameraReport) {
        self.center = report.center;
        self.zoom = report.zoom;
        self.pitch = report.pitch;
        self.bearing = report.bearing;
    }
}

/// Camera as reported by the shell after the user moved the map.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraReport {
    pub center: LngLat,
    pub zoom: ZoomLevel,
    pub pitch: f64,
    pub bearing: f64,
}

// --- Diagnostics ---

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerReadout {
    pub point: PixelPoint,
    pub lng_lat: LngLat,
}

impl PointerReadout {
    /// Two JSON lines: pixel position, then geographic position.
    pub fn display(&self) -> String {
        #[derive(Serialize)]
        struct Geo {
            lng: f64,
            lat: f64,
        }

        let geo = Geo {
            lng: self.lng_lat.lng(),
            lat: self.lng_lat.lat(),
        };
        let point = serde_json::to_string(&self.point).unwrap_or_default();
        let geo = serde_json::to_string(&geo).unwrap_or_default();
        format!("{point}\n{geo}")
    }
}

/// Outcome of the last reverse lookup that did not resolve an address.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LookupNotice {
    NotFound,
    Failed(String),
}

// --- Model ---

#[derive(Debug, Default)]
pub struct Model {
    pub config: Option<GeoviewConfig>,
    pub geocoder: Option<GeocodingClient>,

    pub map: MapLifecycle,
    pub viewport: MapViewport,
    pub overlay: OverlayStatus,

    pub search: SuggestionState,
    pub lookup_notice: Option<LookupNotice>,

    pub sidebar: SidebarState,
    pub pointer: Option<PointerReadout>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_ready_only_from_loading() {
        let handle = MapHandle::generate();
        let mut lifecycle = MapLifecycle::Loading {
            handle: handle.clone(),
        };

        let proof = lifecycle.mark_ready(&handle).unwrap();
        assert_eq!(proof.handle(), &handle);
        assert!(lifecycle.is_ready());

        // repeated signal
        assert!(lifecycle.mark_ready(&handle).is_none());
    }

    #[test]
    fn test_ready_for_other_handle_ignored() {
        let mut lifecycle = MapLifecycle::Loading {
            handle: MapHandle::generate(),
        };
        assert!(lifecycle.mark_ready(&MapHandle::generate()).is_none());
        assert_matches!(lifecycle, MapLifecycle::Loading { .. });
    }

    #[test]
    fn test_failed_keeps_handle() {
        let handle = MapHandle::generate();
        let mut lifecycle = MapLifecycle::Loading {
            handle: handle.clone(),
        };
        assert!(lifecycle.fail("webgl unavailable"));
        assert!(lifecycle.camera_handle().is_none());
        assert!(lifecycle.mark_ready(&handle).is_none());
        assert_eq!(
            lifecycle.status(),
            MapStatus::Failed {
                reason: "webgl unavailable".into()
            }
        );

        assert_eq!(lifecycle.take_handle(), Some(handle));
        assert_eq!(lifecycle, MapLifecycle::Unmounted);
        assert_eq!(lifecycle.take_handle(), None);
    }

    #[test]
    fn test_zoom_clamped() {
        assert_eq!(ZoomLevel::new(25.0).unwrap().value(), MAX_ZOOM);
        assert_eq!(ZoomLevel::new(1.0).unwrap().value(), MIN_ZOOM);
        assert_eq!(ZoomLevel::new(14.0).unwrap().value(), 14.0);
        assert!(ZoomLevel::new(f64::NAN).is_err());
    }

    #[test]
    fn test_default_viewport() {
        let viewport = MapViewport::default();
        assert_eq!(viewport.center, DEFAULT_CENTER);
        assert_eq!(viewport.zoom.value(), 10.0);
        assert_eq!(viewport.pitch, 45.0);
        assert_eq!(viewport.padding, Padding { left: 300, right: 0 });
    }

    #[test]
    fn test_camera_report_keeps_padding() {
        let mut viewport = MapViewport {
            padding: Padding { left: 0, right: 300 },
            ..MapViewport::default()
        };
        viewport.apply(CameraReport {
            center: LngLat::new(-104.99, 39.74).unwrap(),
            zoom: ZoomLevel::new(12.0).unwrap(),
            pitch: 0.0,
            bearing: 0.0,
        });
        assert_eq!(viewport.padding, Padding { left: 0, right: 300 });
        assert_eq!(viewport.zoom.value(), 12.0);
    }

    #[test]
    fn test_pointer_display() {
        let readout = PointerReadout {
            point: PixelPoint { x: 12.5, y: 40.0 },
            lng_lat: LngLat::new(-105.0, 39.5).unwrap(),
        };
        assert_eq!(
            readout.display(),
            "{\"x\":12.5,\"y\":40.0}\n{\"lng\":-105.0,\"lat\":39.5}"
        );
    }
}
