use tracing::debug;

use crate::common::config::LayoutSettings;
use crate::sys::geometry::{Point, Rect, Round, SameAs};
use crate::sys::host::{Host, WindowId};

/// How many times to re-request focus before giving up. Hosts are known to
/// bounce focus back to the previously focused window right after a
/// request, so a single fire-and-forget call is not enough.
const FOCUS_ATTEMPTS: usize = 25;

/// A host window plus the rectangle its region has assigned to it. The
/// assigned rect is the slot boundary; what actually reaches the host is
/// the margined variant, or the slightly grown "fat" variant while the
/// window is focused.
#[derive(Clone, Debug, PartialEq)]
pub struct WrappedWindow {
    id: WindowId,
    frame: Rect,
}

impl WrappedWindow {
    pub fn new(id: WindowId, frame: Rect) -> Self { WrappedWindow { id, frame } }

    pub fn id(&self) -> WindowId { self.id }

    pub fn frame(&self) -> Rect { self.frame }

    pub fn top_left(&self) -> Point { self.frame.origin }

    /// The resting shape: inset half the margin on every side, so two
    /// neighboring slots end up a full margin apart.
    pub fn with_margin(&self, margin: f64) -> Rect {
        self.frame.inset(margin / 2.0).round()
    }

    /// The focused shape: an eighth of the margin larger than the margined
    /// frame on every side, spilling into the surrounding gutters.
    pub fn with_fat(&self, margin: f64) -> Rect {
        self.frame.inset(margin * 3.0 / 8.0).round()
    }

    /// Replaces the assigned rect and immediately pushes the margined or
    /// fat variant to the host, depending on who holds focus right now.
    pub fn update_frame<H: Host>(&mut self, host: &H, frame: Rect, settings: &LayoutSettings) {
        self.frame = frame;
        self.apply(host, settings);
    }

    /// Re-applies the current shape. A host refusal means the window is
    /// gone; the close event will clean it up, so it is only worth a trace
    /// here.
    pub fn apply<H: Host>(&self, host: &H, settings: &LayoutSettings) {
        let focused = host.focused_window() == Some(self.id);
        let target = if focused && settings.grow_focused {
            self.with_fat(settings.margin)
        } else {
            self.with_margin(settings.margin)
        };
        if let Some(current) = host.window_frame(self.id)
            && current.same_as(target)
        {
            return;
        }
        if !host.set_window_frame(self.id, target) {
            debug!(window = ?self.id, "host rejected frame update");
        }
    }

    /// Requests focus and polls until the host confirms it landed on this
    /// window. Returns whether the host ever agreed.
    pub fn focus<H: Host>(&self, host: &H, settings: &LayoutSettings) -> bool {
        let mut confirmed = false;
        for _ in 0..FOCUS_ATTEMPTS {
            host.focus_window(self.id);
            if host.focused_window() == Some(self.id) {
                confirmed = true;
                break;
            }
        }
        if !confirmed {
            debug!(window = ?self.id, "host never confirmed focus");
            return false;
        }
        if settings.grow_focused {
            host.set_window_frame(self.id, self.with_fat(settings.margin));
        }
        true
    }

    /// Puts the resting shape back, undoing any focus growth.
    pub fn unfocus<H: Host>(&self, host: &H, settings: &LayoutSettings) {
        host.set_window_frame(self.id, self.with_margin(settings.margin));
    }
}
