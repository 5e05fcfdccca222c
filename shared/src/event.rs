use serde::{Deserialize, Serialize};
use std::fmt;

use crate::capabilities::{MapHandle, MapOutput};
use crate::config::GeoviewConfig;
use crate::geocoding::{GeocodingError, SuggestionResult};
use crate::model::CameraReport;
use crate::overlay::StyleLayer;
use crate::sidebar::Side;
use crate::suggestion::RequestToken;

// --- Typed IDs ---

macro_rules! typed_id {
    ($name:ident) => {
        #[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq, Hash)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

typed_id!(ContainerId);
typed_id!(SuggestionId);

// --- Coordinate: validated, NaN-safe, serialized as [lng, lat] ---

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(try_from = "[f64; 2]", into = "[f64; 2]")]
pub struct LngLat {
    lng: f64,
    lat: f64,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid coordinate: lng={0}, lat={1}")]
    InvalidCoordinate(f64, f64),
    #[error("invalid zoom: {0}")]
    InvalidZoom(f64),
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Result<Self, ValidationError> {
        if !lng.is_finite()
            || !lat.is_finite()
            || !(-90.0..=90.0).contains(&lat)
            || !(-180.0..=180.0).contains(&lng)
        {
            return Err(ValidationError::InvalidCoordinate(lng, lat));
        }
        Ok(Self { lng, lat })
    }

    /// Like [`LngLat::new`], but first wraps the longitude into `[-180, 180)`.
    /// Pointer and click positions can lie on a repeated world copy.
    pub fn wrapping(lng: f64, lat: f64) -> Result<Self, ValidationError> {
        if !lng.is_finite() {
            return Err(ValidationError::InvalidCoordinate(lng, lat));
        }
        Self::new(wrap_longitude(lng), lat)
    }

    /// For constants known to be in range.
    pub(crate) const fn new_unchecked(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }
}

fn wrap_longitude(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}

impl PartialEq for LngLat {
    fn eq(&self, other: &Self) -> bool {
        self.lng.to_bits() == other.lng.to_bits() && self.lat.to_bits() == other.lat.to_bits()
    }
}

impl TryFrom<[f64; 2]> for LngLat {
    type Error = ValidationError;

    fn try_from([lng, lat]: [f64; 2]) -> Result<Self, Self::Error> {
        Self::new(lng, lat)
    }
}

impl From<LngLat> for [f64; 2] {
    fn from(value: LngLat) -> Self {
        [value.lng, value.lat]
    }
}

impl fmt::Display for LngLat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lng, self.lat)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PixelPoint {
    pub x: f64,
    pub y: f64,
}

// --- Event enum ---
//
// Shell-originated variants come first; variants carrying geocoding results
// are only ever produced inside the core, so they never cross the bridge.

#[derive(Clone, Debug, Deserialize)]
pub enum Event {
    Configure(GeoviewConfig),

    Mount {
        container: ContainerId,
    },
    Unmount,
    MapFailed {
        handle: MapHandle,
        reason: String,
    },
    StyleLoaded {
        handle: MapHandle,
        layers: Vec<StyleLayer>,
    },
    CameraMoved {
        handle: MapHandle,
        camera: CameraReport,
    },
    PointerMoved {
        handle: MapHandle,
        point: PixelPoint,
        lng: f64,
        lat: f64,
    },
    MapClicked {
        handle: MapHandle,
        lng: f64,
        lat: f64,
    },

    AddressInputChanged(String),
    SuggestionSelected(usize),
    SuggestionsDismissed,
    SidebarToggled(Side),

    #[serde(skip)]
    ForwardSearchCompleted {
        token: RequestToken,
        result: Result<Vec<SuggestionResult>, GeocodingError>,
    },
    #[serde(skip)]
    ReverseLookupCompleted {
        token: RequestToken,
        result: Result<Vec<SuggestionResult>, GeocodingError>,
    },
}

impl Event {
    /// Event for the answer to a one-time style-ready registration.
    pub fn from_style_output(handle: MapHandle, output: MapOutput) -> Self {
        match output {
            MapOutput::StyleLoaded { layers } => Event::StyleLoaded { handle, layers },
            MapOutput::Failed { reason } => Event::MapFailed { handle, reason },
            MapOutput::Done => Event::MapFailed {
                handle,
                reason: "style-ready registration answered without a style".to_string(),
            },
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Event::Configure(_) => "configure",
            Event::Mount { .. } => "mount",
            Event::Unmount => "unmount",
            Event::MapFailed { .. } => "map_failed",
            Event::StyleLoaded { .. } => "style_loaded",
            Event::CameraMoved { .. } => "camera_moved",
            Event::PointerMoved { .. } => "pointer_moved",
            Event::MapClicked { .. } => "map_clicked",
            Event::AddressInputChanged(_) => "address_input_changed",
            Event::SuggestionSelected(_) => "suggestion_selected",
            Event::SuggestionsDismissed => "suggestions_dismissed",
            Event::SidebarToggled(_) => "sidebar_toggled",
            Event::ForwardSearchCompleted { .. } => "forward_search_completed",
            Event::ReverseLookupCompleted { .. } => "reverse_lookup_completed",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Event::MapClicked { .. }
                | Event::AddressInputChanged(_)
                | Event::SuggestionSelected(_)
                | Event::SuggestionsDismissed
                | Event::SidebarToggled(_)
        )
    }
}
