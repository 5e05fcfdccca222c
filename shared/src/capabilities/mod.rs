mod map;

pub use self::map::{
    ControlPosition, DrawMode, Interactions, Map, MapControl, MapHandle, MapListener,
    MapOperation, MapOptions, MapOutput,
};

pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::event::Event;

#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
    pub map: Map<Event>,
}
