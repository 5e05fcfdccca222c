use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::event::{ContainerId, LngLat};
use crate::model::{MapViewport, StyleReady};
use crate::overlay::{LayerSpec, Marker, SourceSpec, StyleLayer};
use crate::sidebar::Padding;
use crate::{FADE_DURATION_MS, MAX_ZOOM, MIN_ZOOM};

/// Identifies one map instance built by the shell.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MapHandle(Uuid);

impl MapHandle {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MapHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "map-{}", self.0.simple())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct Interactions {
    pub interactive: bool,
    pub attribution: bool,
    pub drag_rotate: bool,
    pub drag_pan: bool,
    pub touch_zoom_rotate: bool,
    pub scroll_zoom: bool,
    pub double_click_zoom: bool,
    pub box_zoom: bool,
    pub keyboard: bool,
}

impl Default for Interactions {
    fn default() -> Self {
        Self {
            interactive: true,
            attribution: true,
            drag_rotate: true,
            drag_pan: true,
            touch_zoom_rotate: true,
            scroll_zoom: true,
            double_click_zoom: true,
            box_zoom: true,
            keyboard: true,
        }
    }
}

#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct MapOptions {
    pub container: ContainerId,
    /// Carries the API key.
    pub style: String,
    pub center: LngLat,
    pub zoom: f64,
    pub pitch: f64,
    pub bearing: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub fade_duration_ms: u32,
    pub antialias: bool,
    pub interactions: Interactions,
}

impl MapOptions {
    pub fn new(container: ContainerId, style: &url::Url, viewport: &MapViewport) -> Self {
        Self {
            container,
            style: style.to_string(),
            center: viewport.center,
            zoom: viewport.zoom.value(),
            pitch: viewport.pitch,
            bearing: viewport.bearing,
            min_zoom: MIN_ZOOM,
            max_zoom: MAX_ZOOM,
            fade_duration_ms: FADE_DURATION_MS,
            antialias: true,
            interactions: Interactions::default(),
        }
    }
}

// Redacted: the style URL embeds the API key.
impl fmt::Debug for MapOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapOptions")
            .field("container", &self.container)
            .field("style", &"[REDACTED]")
            .field("center", &self.center)
            .field("zoom", &self.zoom)
            .field("pitch", &self.pitch)
            .field("bearing", &self.bearing)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ControlPosition {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DrawMode {
    Polygon,
    Rectangle,
    Circle,
    Freehand,
    AngledRectangle,
    Sector,
    Select,
    DeleteSelection,
    Delete,
    Download,
}

impl DrawMode {
    pub const ALL: [DrawMode; 10] = [
        DrawMode::Polygon,
        DrawMode::Rectangle,
        DrawMode::Circle,
        DrawMode::Freehand,
        DrawMode::AngledRectangle,
        DrawMode::Sector,
        DrawMode::Select,
        DrawMode::DeleteSelection,
        DrawMode::Delete,
        DrawMode::Download,
    ];
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapControl {
    Geolocate {
        high_accuracy: bool,
        track_user_location: bool,
    },
    Navigation {
        position: ControlPosition,
    },
    Draw {
        modes: Vec<DrawMode>,
        open: bool,
        position: ControlPosition,
    },
}

impl MapControl {
    pub fn geolocate() -> Self {
        MapControl::Geolocate {
            high_accuracy: true,
            track_user_location: true,
        }
    }

    pub fn navigation() -> Self {
        MapControl::Navigation {
            position: ControlPosition::TopRight,
        }
    }

    pub fn draw() -> Self {
        MapControl::Draw {
            modes: DrawMode::ALL.to_vec(),
            open: true,
            position: ControlPosition::TopRight,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapListener {
    /// Answered with `Event::PointerMoved`.
    PointerMove,
    /// Answered with `Event::MapClicked`.
    Click,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MapOperation {
    Create {
        handle: MapHandle,
        options: MapOptions,
    },
    AddControl {
        handle: MapHandle,
        control: MapControl,
    },
    Listen {
        handle: MapHandle,
        listener: MapListener,
    },
    OnceStyleLoaded {
        handle: MapHandle,
    },
    AddSource {
        handle: MapHandle,
        id: String,
        source: SourceSpec,
    },
    AddLayer {
        handle: MapHandle,
        layer: LayerSpec,
        before: Option<String>,
    },
    AddMarker {
        handle: MapHandle,
        marker: Marker,
    },
    FlyTo {
        handle: MapHandle,
        center: LngLat,
        zoom: f64,
        duration_ms: Option<u32>,
    },
    EaseTo {
        handle: MapHandle,
        padding: Padding,
        duration_ms: u32,
    },
    Remove {
        handle: MapHandle,
    },
}

impl MapOperation {
    pub fn handle(&self) -> &MapHandle {
        match self {
            MapOperation::Create { handle, .. }
            | MapOperation::AddControl { handle, .. }
            | MapOperation::Listen { handle, .. }
            | MapOperation::OnceStyleLoaded { handle }
            | MapOperation::AddSource { handle, .. }
            | MapOperation::AddLayer { handle, .. }
            | MapOperation::AddMarker { handle, .. }
            | MapOperation::FlyTo { handle, .. }
            | MapOperation::EaseTo { handle, .. }
            | MapOperation::Remove { handle } => handle,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MapOutput {
    Done,
    StyleLoaded { layers: Vec<StyleLayer> },
    Failed { reason: String },
}

impl Operation for MapOperation {
    type Output = MapOutput;
}

/// The map rendering engine, driven by the shell.
pub struct Map<E> {
    context: CapabilityContext<MapOperation, E>,
}

impl<Ev> Capability<Ev> for Map<Ev> {
    type Operation = MapOperation;
    type MappedSelf<MappedEv> = Map<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Map::new(self.context.map_event(f))
    }
}

impl<E> Map<E>
where
    E: 'static,
{
    pub fn new(context: CapabilityContext<MapOperation, E>) -> Self {
        Self { context }
    }

    pub fn create(&self, handle: MapHandle, options: MapOptions) {
        self.notify(MapOperation::Create { handle, options });
    }

    pub fn add_control(&self, handle: MapHandle, control: MapControl) {
        self.notify(MapOperation::AddControl { handle, control });
    }

    pub fn listen(&self, handle: MapHandle, listener: MapListener) {
        self.notify(MapOperation::Listen { handle, listener });
    }

    /// One-time registration; the shell answers once the base style is loaded.
    pub fn once_style_loaded<F>(&self, handle: MapHandle, callback: F)
    where
        F: FnOnce(MapOutput) -> E + Send + 'static,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let output = ctx
                .request_from_shell(MapOperation::OnceStyleLoaded { handle })
                .await;
            ctx.update_app(callback(output));
        });
    }

    pub fn add_source(&self, ready: &StyleReady, id: String, source: SourceSpec) {
        self.notify(MapOperation::AddSource {
            handle: ready.handle().clone(),
            id,
            source,
        });
    }

    pub fn add_layer(&self, ready: &StyleReady, layer: LayerSpec, before: Option<String>) {
        self.notify(MapOperation::AddLayer {
            handle: ready.handle().clone(),
            layer,
            before,
        });
    }

    pub fn add_marker(&self, ready: &StyleReady, marker: Marker) {
        self.notify(MapOperation::AddMarker {
            handle: ready.handle().clone(),
            marker,
        });
    }

    pub fn fly_to(&self, handle: MapHandle, center: LngLat, zoom: f64, duration_ms: Option<u32>) {
        self.notify(MapOperation::FlyTo {
            handle,
            center,
            zoom,
            duration_ms,
        });
    }

    pub fn ease_to(&self, handle: MapHandle, padding: Padding, duration_ms: u32) {
        self.notify(MapOperation::EaseTo {
            handle,
            padding,
            duration_ms,
        });
    }

    pub fn remove(&self, handle: MapHandle) {
        self.notify(MapOperation::Remove { handle });
    }

    fn notify(&self, operation: MapOperation) {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            ctx.notify_shell(operation).await;
        });
    }
}
