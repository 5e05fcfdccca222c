#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::needless_pass_by_value)]

pub mod capabilities;
pub mod config;
pub mod event;
pub mod geocoding;
pub mod model;
pub mod overlay;
pub mod sidebar;
pub mod suggestion;

use serde::{Deserialize, Serialize};

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use config::{ConfigError, GeoviewConfig};
pub use crux_core::{render::Render, App as CruxApp};
pub use event::{ContainerId, Event, LngLat, PixelPoint, SuggestionId};
pub use geocoding::{GeocodingClient, GeocodingError, ReverseOutcome, SuggestionResult};
pub use model::{LookupNotice, MapLifecycle, MapStatus, MapViewport, Model, ZoomLevel};
pub use overlay::{OverlayError, OverlayPlan, OverlayStatus};
pub use sidebar::{Padding, Side, SidebarState};
pub use suggestion::{AddressSelection, RequestToken, SearchPhase, SuggestionState};

pub const DEFAULT_CENTER: LngLat = LngLat::new_unchecked(-105.021_078_586_578_37, 39.542_374_528_018_03);
pub const DEFAULT_ZOOM: f64 = 10.0;
pub const DEFAULT_PITCH: f64 = 45.0;
pub const DEFAULT_BEARING: f64 = 0.0;
pub const MIN_ZOOM: f64 = 5.0;
pub const MAX_ZOOM: f64 = 20.0;
pub const SELECTION_ZOOM: f64 = 14.0;
pub const FADE_DURATION_MS: u32 = 300;

// --- View model ---

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SuggestionView {
    pub id: String,
    pub label: String,
}

impl From<&SuggestionResult> for SuggestionView {
    fn from(result: &SuggestionResult) -> Self {
        Self {
            id: result.id.to_string(),
            label: result.display_name.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SidebarView {
    pub left_open: bool,
    pub right_open: bool,
    pub left_glyph: String,
    pub right_glyph: String,
    pub padding: Padding,
}

impl From<SidebarState> for SidebarView {
    fn from(state: SidebarState) -> Self {
        Self {
            left_open: state.left,
            right_open: state.right,
            left_glyph: state.toggle_glyph(Side::Left).to_string(),
            right_glyph: state.toggle_glyph(Side::Right).to_string(),
            padding: state.padding(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ViewModel {
    pub map_status: MapStatus,
    pub overlay_status: OverlayStatus,
    pub address_text: String,
    /// Pretty-printed resolved selection, for the detail panel.
    pub selection_detail: Option<String>,
    pub suggestions: Vec<SuggestionView>,
    pub is_searching: bool,
    pub lookup_notice: Option<LookupNotice>,
    pub sidebar: SidebarView,
    pub pointer_readout: Option<String>,
}

pub mod app {
    use tracing::{debug, error, info, warn};

    use super::*;
    use crate::capabilities::{MapControl, MapHandle, MapListener, MapOptions};
    use crate::geocoding::Dispatch;
    use crate::model::{PointerReadout, StyleReady};
    use crate::overlay::{OverlayStep, StyleLayer};
    use crate::sidebar::SIDEBAR_EASE_MS;
    use crate::suggestion::Applied;

    #[derive(Default)]
    pub struct App;

    impl App {
        fn initialize(container: ContainerId, model: &mut Model, caps: &Capabilities) {
            if let Some(handle) = model.map.handle() {
                debug!(%handle, "map already mounted, ignoring mount");
                return;
            }
            let Some(config) = model.config.as_ref() else {
                warn!(%container, "mount before configuration, skipping");
                return;
            };

            let handle = MapHandle::generate();
            let options = MapOptions::new(container, &config.style_url(), &model.viewport);
            info!(%handle, container = %options.container, "creating map");

            caps.map.create(handle.clone(), options);
            caps.map.add_control(handle.clone(), MapControl::geolocate());
            caps.map.add_control(handle.clone(), MapControl::navigation());
            caps.map.add_control(handle.clone(), MapControl::draw());
            caps.map.listen(handle.clone(), MapListener::PointerMove);

            let ready_for = handle.clone();
            caps.map.once_style_loaded(handle.clone(), move |output| {
                Event::from_style_output(ready_for, output)
            });
            caps.map.listen(handle.clone(), MapListener::Click);

            model.map = MapLifecycle::Loading { handle };
            model.overlay = OverlayStatus::Pending;
        }

        fn dispose(model: &mut Model, caps: &Capabilities) {
            match model.map.take_handle() {
                Some(handle) => {
                    info!(%handle, "removing map");
                    caps.map.remove(handle);
                }
                None => debug!("unmount without a map"),
            }
            model.pointer = None;
            model.overlay = OverlayStatus::Pending;
        }

        fn on_style_loaded(
            handle: &MapHandle,
            layers: &[StyleLayer],
            model: &mut Model,
            caps: &Capabilities,
        ) {
            let Some(ready) = model.map.mark_ready(handle) else {
                debug!(%handle, "style ready signal ignored");
                return;
            };
            info!(%handle, style_layers = layers.len(), "base style loaded");

            let Some(config) = model.config.as_ref() else {
                error!(%handle, "style loaded without configuration");
                model.overlay = OverlayStatus::Failed("missing configuration".to_string());
                return;
            };

            model.overlay = match Self::install_overlays(&ready, &config.tiles_url(), layers, caps)
            {
                Ok(()) => OverlayStatus::Installed,
                Err(e) => {
                    error!(%handle, error = %e, "overlay installation failed");
                    OverlayStatus::Failed(e.to_string())
                }
            };
        }

        /// The plan is built in full before anything is issued, so a failure
        /// leaves the map without partial overlays.
        fn install_overlays(
            ready: &StyleReady,
            tiles_url: &url::Url,
            layers: &[StyleLayer],
            caps: &Capabilities,
        ) -> Result<(), OverlayError> {
            let plan = OverlayPlan::build(tiles_url, layers)?;
            debug!(anchor = ?plan.anchor(), steps = plan.steps().len(), "installing overlays");

            for step in plan.into_steps() {
                match step {
                    OverlayStep::Source { id, source } => caps.map.add_source(ready, id, source),
                    OverlayStep::Layer { layer, before } => caps.map.add_layer(ready, layer, before),
                    OverlayStep::Marker(marker) => caps.map.add_marker(ready, marker),
                }
            }
            Ok(())
        }

        fn fly_to(model: &mut Model, caps: &Capabilities, center: LngLat, zoom: ZoomLevel) {
            model.viewport.center = center;
            model.viewport.zoom = zoom;
            match model.map.camera_handle() {
                Some(handle) => caps.map.fly_to(handle.clone(), center, zoom.value(), None),
                None => debug!(%center, "no live map, camera flight skipped"),
            }
        }

        fn ease_to(model: &mut Model, caps: &Capabilities) {
            let padding = model.sidebar.padding();
            model.viewport.padding = padding;
            match model.map.camera_handle() {
                Some(handle) => caps.map.ease_to(handle.clone(), padding, SIDEBAR_EASE_MS),
                None => debug!(?padding, "no live map, padding transition skipped"),
            }
        }

        fn search(text: String, model: &mut Model, caps: &Capabilities) {
            let token = model.search.edit(text.as_str());
            let Some(geocoder) = model.geocoder.as_ref() else {
                warn!(%token, "search before configuration, skipping");
                return;
            };

            match geocoder.forward_search(&caps.http, token, &text, model.viewport.center) {
                Ok(Dispatch::Sent) => {
                    debug!(%token, proximity = %model.viewport.center, "forward search sent");
                    model.search.mark_fetching(token);
                }
                Ok(Dispatch::Skipped) => debug!(%token, "query too short, not sent"),
                Err(e) => warn!(%token, error = %e, "forward search not sent"),
            }
        }

        fn reverse_lookup(at: LngLat, model: &mut Model, caps: &Capabilities) {
            let token = model.search.issue_token();
            model.lookup_notice = None;

            let sent = match model.geocoder.as_ref() {
                Some(geocoder) => geocoder.reverse_lookup(&caps.http, token, at),
                None => Err(GeocodingError::InvalidUrl("geocoding is not configured".to_string())),
            };
            match sent {
                Ok(()) => debug!(%token, %at, "reverse lookup sent"),
                Err(e) => {
                    warn!(%token, %at, error = %e, "reverse lookup not sent");
                    Self::settle_reverse(token, ReverseOutcome::Error(e), model);
                }
            }
        }

        fn settle_reverse(token: RequestToken, outcome: ReverseOutcome, model: &mut Model) {
            if model.search.apply_reverse(token, &outcome) == Applied::Stale {
                debug!(%token, "discarding stale reverse lookup response");
                return;
            }
            model.lookup_notice = match outcome {
                ReverseOutcome::Resolved { candidates, .. } => {
                    debug!(%token, candidates = candidates.len(), "address resolved");
                    None
                }
                ReverseOutcome::NotFound => {
                    info!(%token, "no address at clicked location");
                    Some(LookupNotice::NotFound)
                }
                ReverseOutcome::Error(e) => {
                    warn!(%token, error = %e, "reverse lookup failed");
                    Some(LookupNotice::Failed(e.to_string()))
                }
            };
        }
    }

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            let event_name = event.name();
            if event.is_user_initiated() {
                debug!(event = event_name, "user action");
            }

            match event {
                Event::Configure(config) => {
                    info!(
                        geocoding = %config.geocoding_base(),
                        "configuration received"
                    );
                    model.geocoder = Some(GeocodingClient::new(&config));
                    model.config = Some(config);
                }

                Event::Mount { container } => {
                    Self::initialize(container, model, caps);
                    caps.render.render();
                }

                Event::Unmount => {
                    Self::dispose(model, caps);
                    caps.render.render();
                }

                Event::MapFailed { handle, reason } => {
                    if !model.map.is_current(&handle) {
                        debug!(%handle, "failure report for a stale map");
                        return;
                    }
                    if model.map.fail(reason.as_str()) {
                        warn!(%handle, %reason, "map failed");
                        caps.render.render();
                    }
                }

                Event::StyleLoaded { handle, layers } => {
                    Self::on_style_loaded(&handle, &layers, model, caps);
                    caps.render.render();
                }

                Event::CameraMoved { handle, camera } => {
                    if model.map.is_current(&handle) {
                        debug!(center = %camera.center, zoom = camera.zoom.value(), "camera moved");
                        model.viewport.apply(camera);
                    }
                }

                Event::PointerMoved {
                    handle,
                    point,
                    lng,
                    lat,
                } => {
                    if !model.map.is_current(&handle) {
                        return;
                    }
                    match LngLat::wrapping(lng, lat) {
                        Ok(lng_lat) => {
                            model.pointer = Some(PointerReadout { point, lng_lat });
                            caps.render.render();
                        }
                        Err(e) => debug!(error = %e, "pointer outside the map"),
                    }
                }

                Event::MapClicked { handle, lng, lat } => {
                    if !model.map.is_current(&handle) {
                        debug!(%handle, "click on a stale map");
                        return;
                    }
                    match LngLat::wrapping(lng, lat) {
                        Ok(at) => Self::reverse_lookup(at, model, caps),
                        Err(e) => warn!(error = %e, "click outside valid coordinates"),
                    }
                    caps.render.render();
                }

                Event::AddressInputChanged(text) => {
                    Self::search(text, model, caps);
                    caps.render.render();
                }

                Event::ForwardSearchCompleted { token, result } => {
                    let suggestions = result.unwrap_or_else(|e| {
                        warn!(%token, error = %e, "forward search failed");
                        Vec::new()
                    });
                    let count = suggestions.len();
                    match model.search.complete_forward(token, suggestions) {
                        Applied::Yes => {
                            debug!(%token, count, "suggestions updated");
                            caps.render.render();
                        }
                        Applied::Stale => debug!(%token, "discarding stale forward search response"),
                    }
                }

                Event::ReverseLookupCompleted { token, result } => {
                    Self::settle_reverse(token, ReverseOutcome::from(result), model);
                    caps.render.render();
                }

                Event::SuggestionSelected(index) => {
                    let Some(chosen) = model.search.select(index) else {
                        debug!(index, "selection outside the suggestion list");
                        return;
                    };
                    info!(id = %chosen.id, "suggestion selected");
                    model.lookup_notice = None;
                    Self::fly_to(model, caps, chosen.coordinates, ZoomLevel::SELECTION);
                    caps.render.render();
                }

                Event::SuggestionsDismissed => {
                    model.search.dismiss();
                    caps.render.render();
                }

                Event::SidebarToggled(side) => {
                    model.sidebar = model.sidebar.toggled(side);
                    debug!(?side, open = model.sidebar.is_open(side), "sidebar toggled");
                    Self::ease_to(model, caps);
                    caps.render.render();
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            let selection = model.search.selection();

            ViewModel {
                map_status: model.map.status(),
                overlay_status: model.overlay.clone(),
                address_text: selection.display_text().to_string(),
                selection_detail: selection
                    .resolved()
                    .and_then(|result| serde_json::to_string_pretty(result).ok()),
                suggestions: model
                    .search
                    .suggestions()
                    .iter()
                    .map(SuggestionView::from)
                    .collect(),
                is_searching: matches!(model.search.phase(), SearchPhase::Fetching(_)),
                lookup_notice: model.lookup_notice.clone(),
                sidebar: model.sidebar.into(),
                pointer_readout: model.pointer.as_ref().map(PointerReadout::display),
            }
        }
    }
}
