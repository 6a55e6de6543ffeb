//! The boundary between the layout core and whatever actually owns the
//! screen. Everything the core needs from a windowing platform goes through
//! [`Host`]; the core never learns which platform it is running on.

use serde::{Deserialize, Serialize};

use crate::sys::geometry::{Point, Rect};
use crate::sys::hotkey::Hotkey;

/// An identifier representing a window.
///
/// Stable for as long as the underlying host window is open. It is not
/// stable across restarts of the host.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct WindowId(pub u32);

impl WindowId {
    pub fn new(raw: u32) -> Self { WindowId(raw) }
}

/// An identifier representing one physical display.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct DisplayId(pub u32);

impl DisplayId {
    pub fn new(raw: u32) -> Self { DisplayId(raw) }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScreenInfo {
    pub id: DisplayId,
    /// The usable area of the screen, excluding host reservations such as
    /// menu bars or docks.
    pub visible_frame: Rect,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub title: String,
    pub app: String,
    pub frame: Rect,
}

/// Capabilities the layout core consumes from the windowing platform.
///
/// Implementations are expected to be cheap to call and to tolerate
/// requests for windows that have just closed: `window_frame` returns
/// `None` and `set_window_frame`/`focus_window` return `false` instead of
/// failing loudly. All calls happen from the single reactor thread.
pub trait Host {
    fn screens(&self) -> Vec<ScreenInfo>;

    /// Currently open, user-facing windows. Popups, panels and other
    /// non-normal windows are the host's job to filter out.
    fn windows(&self) -> Vec<WindowInfo>;

    fn window_frame(&self, id: WindowId) -> Option<Rect>;

    /// Repositions and resizes a window. Returns `false` when the host
    /// rejects the change, typically because the window is gone.
    fn set_window_frame(&self, id: WindowId, frame: Rect) -> bool;

    /// Requests focus. The host may not honor the request immediately;
    /// callers that care must poll [`Host::focused_window`].
    fn focus_window(&self, id: WindowId) -> bool;

    fn focused_window(&self) -> Option<WindowId>;

    /// Moves the mouse pointer. Only used when mouse-follows-focus is
    /// enabled.
    fn warp_mouse(&self, point: Point);

    /// Registers a global hotkey. Presses come back through the host's
    /// event delivery; a `false` return means the combination is taken or
    /// unsupported.
    fn register_hotkey(&self, hotkey: &Hotkey) -> bool;
}
