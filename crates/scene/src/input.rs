use foundation::{LngLat, PointId};

use crate::view::ViewState;

/// Keyboard modifiers held during a click.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        meta: false,
        shift: false,
        alt: false,
    };

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn meta() -> Self {
        Self {
            meta: true,
            ..Self::NONE
        }
    }

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn is_create_gesture(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Input reported by the map surface.
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    /// User pan/zoom. Reported continuously while the camera moves.
    Moved(ViewState),
    MarkerClicked(PointId),
    MapClicked { at: LngLat, modifiers: Modifiers },
}

/// What a bare map click turns into.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ClickAction {
    OpenCreateForm(LngLat),
    RequestLogin,
    Ignore,
}

/// Only a modified click opens the create affordance, and only for a
/// signed-in user; anyone else is sent to login instead.
pub fn route_map_click(at: LngLat, modifiers: Modifiers, authenticated: bool) -> ClickAction {
    if !modifiers.is_create_gesture() {
        return ClickAction::Ignore;
    }
    if !authenticated {
        return ClickAction::RequestLogin;
    }
    ClickAction::OpenCreateForm(at)
}

#[cfg(test)]
mod tests {
    use foundation::LngLat;

    use super::*;

    #[test]
    fn plain_click_is_ignored() {
        let at = LngLat::new(1.0, 2.0);
        assert_eq!(route_map_click(at, Modifiers::NONE, true), ClickAction::Ignore);
        assert_eq!(route_map_click(at, Modifiers::NONE, false), ClickAction::Ignore);
    }

    #[test]
    fn modified_click_is_gated_on_auth() {
        let at = LngLat::new(1.0, 2.0);
        assert_eq!(route_map_click(at, Modifiers::meta(), false), ClickAction::RequestLogin);
        assert_eq!(
            route_map_click(at, Modifiers::ctrl(), true),
            ClickAction::OpenCreateForm(at)
        );
    }

    #[test]
    fn shift_alone_is_not_a_create_gesture() {
        let m = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        assert!(!m.is_create_gesture());
    }
}
