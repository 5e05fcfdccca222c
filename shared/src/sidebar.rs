use serde::{Deserialize, Serialize};

/// Horizontal space one open panel takes over the map.
pub const SIDEBAR_WIDTH_PX: u32 = 300;
pub const SIDEBAR_EASE_MS: u32 = 1000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub left: u32,
    pub right: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SidebarState {
    pub left: bool,
    pub right: bool,
}

impl Default for SidebarState {
    fn default() -> Self {
        Self {
            left: true,
            right: false,
        }
    }
}

impl SidebarState {
    #[must_use]
    pub fn toggled(self, side: Side) -> Self {
        match side {
            Side::Left => Self {
                left: !self.left,
                ..self
            },
            Side::Right => Self {
                right: !self.right,
                ..self
            },
        }
    }

    #[must_use]
    pub const fn is_open(self, side: Side) -> bool {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    /// Always derived from both flags, never adjusted incrementally.
    #[must_use]
    pub const fn padding(self) -> Padding {
        Padding {
            left: if self.left { SIDEBAR_WIDTH_PX } else { 0 },
            right: if self.right { SIDEBAR_WIDTH_PX } else { 0 },
        }
    }

    /// Arrow drawn on the panel's toggle tab: points the way the panel will move.
    #[must_use]
    pub const fn toggle_glyph(self, side: Side) -> &'static str {
        match (side, self.is_open(side)) {
            (Side::Left, true) | (Side::Right, false) => "←",
            (Side::Left, false) | (Side::Right, true) => "→",
        }
    }
}
