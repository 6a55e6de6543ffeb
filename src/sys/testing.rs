//! In-memory host and storage used by the test suites.

use std::cell::{Cell, RefCell};

use crate::common::collections::HashMap;
use crate::sys::geometry::{Point, Rect};
use crate::sys::host::{DisplayId, Host, ScreenInfo, WindowId, WindowInfo};
use crate::sys::hotkey::Hotkey;
use crate::sys::storage::{Storage, StorageError};

/// A scriptable [`Host`]: screens are fixed at construction, windows are
/// registered by the test, and focus requests can be made to misbehave the
/// way real hosts do.
pub struct FakeHost {
    screens: Vec<ScreenInfo>,
    windows: RefCell<Vec<WindowInfo>>,
    focused: Cell<Option<WindowId>>,
    /// Number of upcoming focus requests the host will accept but not
    /// honor, mimicking the focus bounce-back quirk.
    focus_denials: Cell<u32>,
    focus_requests: Cell<u32>,
    warped: Cell<Option<Point>>,
    hotkeys: RefCell<Vec<Hotkey>>,
}

impl FakeHost {
    pub fn new(screens: Vec<ScreenInfo>) -> Self {
        FakeHost {
            screens,
            windows: RefCell::new(Vec::new()),
            focused: Cell::new(None),
            focus_denials: Cell::new(0),
            focus_requests: Cell::new(0),
            warped: Cell::new(None),
            hotkeys: RefCell::new(Vec::new()),
        }
    }

    pub fn single_screen(width: f64, height: f64) -> Self {
        FakeHost::new(vec![ScreenInfo {
            id: DisplayId::new(1),
            visible_frame: Rect::new(0.0, 0.0, width, height),
        }])
    }

    pub fn dual_screen(width: f64, height: f64) -> Self {
        FakeHost::new(vec![
            ScreenInfo {
                id: DisplayId::new(1),
                visible_frame: Rect::new(0.0, 0.0, width, height),
            },
            ScreenInfo {
                id: DisplayId::new(2),
                visible_frame: Rect::new(width, 0.0, width, height),
            },
        ])
    }

    pub fn add_window(&self, id: WindowId, frame: Rect) {
        self.windows.borrow_mut().push(WindowInfo {
            id,
            title: format!("window {}", id.0),
            app: "test".into(),
            frame,
        });
    }

    pub fn close_window(&self, id: WindowId) {
        self.windows.borrow_mut().retain(|w| w.id != id);
        if self.focused.get() == Some(id) {
            self.focused.set(None);
        }
    }

    pub fn frame_of(&self, id: WindowId) -> Option<Rect> {
        self.windows.borrow().iter().find(|w| w.id == id).map(|w| w.frame)
    }

    pub fn deny_focus(&self, requests: u32) {
        self.focus_denials.set(requests);
    }

    pub fn focus_requests(&self) -> u32 { self.focus_requests.get() }

    pub fn last_warp(&self) -> Option<Point> { self.warped.get() }

    pub fn set_focused(&self, id: Option<WindowId>) {
        self.focused.set(id);
    }

    pub fn registered_hotkeys(&self) -> Vec<Hotkey> { self.hotkeys.borrow().clone() }
}

impl Host for FakeHost {
    fn screens(&self) -> Vec<ScreenInfo> { self.screens.clone() }

    fn windows(&self) -> Vec<WindowInfo> { self.windows.borrow().clone() }

    fn window_frame(&self, id: WindowId) -> Option<Rect> { self.frame_of(id) }

    fn set_window_frame(&self, id: WindowId, frame: Rect) -> bool {
        let mut windows = self.windows.borrow_mut();
        match windows.iter_mut().find(|w| w.id == id) {
            Some(window) => {
                window.frame = frame;
                true
            }
            None => false,
        }
    }

    fn focus_window(&self, id: WindowId) -> bool {
        self.focus_requests.set(self.focus_requests.get() + 1);
        if self.windows.borrow().iter().all(|w| w.id != id) {
            return false;
        }
        if self.focus_denials.get() > 0 {
            self.focus_denials.set(self.focus_denials.get() - 1);
            return true;
        }
        self.focused.set(Some(id));
        true
    }

    fn focused_window(&self) -> Option<WindowId> { self.focused.get() }

    fn warp_mouse(&self, point: Point) {
        self.warped.set(Some(point));
    }

    fn register_hotkey(&self, hotkey: &Hotkey) -> bool {
        self.hotkeys.borrow_mut().push(hotkey.clone());
        true
    }
}

/// [`Storage`] that never touches disk.
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl Storage for MemoryStore {
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.get(key).cloned())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.entries.remove(key);
        Ok(())
    }
}
