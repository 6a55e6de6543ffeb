use serde::{Deserialize, Serialize};

use crate::common::collections::HashMap;
use crate::common::config::LayoutSettings;
use crate::layout::grid::{self, AdjacentEdges, Direction, Orientation};
use crate::layout::window::WrappedWindow;
use crate::sys::geometry::{Point, Rect};
use crate::sys::host::{DisplayId, Host, WindowId};

/// Id-based link to a region, usable across displays.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionRef {
    pub display: DisplayId,
    pub region: String,
}

impl RegionRef {
    pub fn new(display: DisplayId, region: impl Into<String>) -> Self {
        RegionRef { display, region: region.into() }
    }
}

/// Static, per-direction links to neighboring regions, drawn from
/// configuration. A missing entry means the edge of the display graph.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Adjacency {
    pub north: Option<RegionRef>,
    pub south: Option<RegionRef>,
    pub east: Option<RegionRef>,
    pub west: Option<RegionRef>,
}

impl Adjacency {
    pub fn get(&self, direction: Direction) -> Option<&RegionRef> {
        match direction {
            Direction::North => self.north.as_ref(),
            Direction::South => self.south.as_ref(),
            Direction::East => self.east.as_ref(),
            Direction::West => self.west.as_ref(),
        }
    }
}

/// A named rectangular sub-area of one display holding an ordered list of
/// windows. Order is placement: slot 0 is leftmost (horizontal) or topmost
/// (vertical).
///
/// Every mutation of membership or order rebuilds the position index; the
/// caller (or the mutating method itself) must reconcile before the
/// mutation counts as done, so no region is left holding stale window
/// geometry.
#[derive(Clone, Debug)]
pub struct Region {
    name: String,
    display: DisplayId,
    frame: Rect,
    orientation: Orientation,
    is_default: bool,
    adjacent: Adjacency,
    windows: Vec<WrappedWindow>,
    index: HashMap<WindowId, usize>,
}

impl Region {
    pub fn new(
        name: impl Into<String>,
        display: DisplayId,
        frame: Rect,
        orientation: Orientation,
        is_default: bool,
        adjacent: Adjacency,
    ) -> Self {
        Region {
            name: name.into(),
            display,
            frame,
            orientation,
            is_default,
            adjacent,
            windows: Vec::new(),
            index: HashMap::default(),
        }
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn display(&self) -> DisplayId { self.display }

    pub fn frame(&self) -> Rect { self.frame }

    pub fn orientation(&self) -> Orientation { self.orientation }

    pub fn is_default(&self) -> bool { self.is_default }

    pub fn adjacent(&self) -> &Adjacency { &self.adjacent }

    pub fn region_ref(&self) -> RegionRef { RegionRef::new(self.display, self.name.clone()) }

    pub fn windows(&self) -> &[WrappedWindow] { &self.windows }

    pub fn len(&self) -> usize { self.windows.len() }

    pub fn is_empty(&self) -> bool { self.windows.is_empty() }

    pub fn position_of(&self, id: WindowId) -> Option<usize> { self.index.get(&id).copied() }

    pub fn window(&self, id: WindowId) -> Option<&WrappedWindow> {
        self.position_of(id).and_then(|i| self.windows.get(i))
    }

    pub fn window_at(&self, index: usize) -> Option<&WrappedWindow> { self.windows.get(index) }

    pub fn contains(&self, id: WindowId) -> bool { self.index.contains_key(&id) }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, win) in self.windows.iter().enumerate() {
            self.index.insert(win.id(), i);
        }
    }

    pub fn add_window_start(&mut self, window: WrappedWindow) {
        self.windows.insert(0, window);
        self.reindex();
    }

    pub fn add_window_before(&mut self, window: WrappedWindow, index: usize) {
        let index = index.min(self.windows.len());
        self.windows.insert(index, window);
        self.reindex();
    }

    pub fn add_window_after(&mut self, window: WrappedWindow, index: usize) {
        let index = (index + 1).min(self.windows.len());
        self.windows.insert(index, window);
        self.reindex();
    }

    pub fn add_window_end(&mut self, window: WrappedWindow) {
        match self.windows.len() {
            0 => self.add_window_start(window),
            len => self.add_window_after(window, len - 1),
        }
    }

    /// Removes a window from this region and reindexes. Deliberately does
    /// not reconcile, so callers can batch removals; the global window
    /// index is the engine's to clean up.
    pub fn take_window(&mut self, id: WindowId) -> Option<WrappedWindow> {
        let position = self.position_of(id)?;
        let window = self.windows.remove(position);
        self.reindex();
        Some(window)
    }

    /// Which sides touch another region on this same display. Cross-display
    /// adjacency gets no seam correction; the screen edge is still a screen
    /// edge.
    pub fn local_edges(&self) -> AdjacentEdges {
        let mut edges = AdjacentEdges::empty();
        for direction in [Direction::North, Direction::South, Direction::East, Direction::West] {
            if let Some(target) = self.adjacent.get(direction)
                && target.display == self.display
            {
                edges |= AdjacentEdges::from_direction(direction);
            }
        }
        edges
    }

    /// Current sub-rectangle per slot. Also used for hit-testing, so this
    /// must match what reconcile hands the windows.
    pub fn sub_regions(&self, margin: f64) -> Vec<Rect> {
        grid::sub_regions(
            self.frame,
            self.orientation,
            self.windows.len(),
            self.local_edges(),
            margin,
        )
    }

    /// Recomputes every member's slot rectangle and pushes it to the host.
    /// Idempotent; an empty region is a no-op.
    pub fn reconcile<H: Host>(&mut self, host: &H, settings: &LayoutSettings) {
        if self.windows.is_empty() {
            return;
        }
        let boxes = self.sub_regions(settings.margin);
        for (window, frame) in self.windows.iter_mut().zip(boxes) {
            window.update_frame(host, frame, settings);
        }
    }

    /// The slot pair `(current, neighbor)` for a directional action that
    /// stays inside this region: the direction runs along this region's
    /// axis and a neighboring slot exists. `None` means the action has to
    /// cross to an adjacent region instead.
    pub fn internal_neighbor(&self, id: WindowId, direction: Direction) -> Option<(usize, usize)> {
        if direction.orientation() != self.orientation {
            return None;
        }
        let current = self.position_of(id)?;
        let neighbor = current.checked_add_signed(direction.index_step())?;
        (neighbor < self.windows.len()).then_some((current, neighbor))
    }

    /// Exchanges two slots and reconciles. Both moving and swapping within
    /// a region are this same reorder.
    pub fn swap_with_neighbor<H: Host>(
        &mut self,
        host: &H,
        settings: &LayoutSettings,
        current: usize,
        neighbor: usize,
    ) {
        self.windows.swap(current, neighbor);
        self.reindex();
        self.reconcile(host, settings);
    }

    /// Hands focus from one slot to another. Returns the newly focused
    /// window once the host confirms.
    pub fn focus_neighbor<H: Host>(
        &self,
        host: &H,
        settings: &LayoutSettings,
        current: usize,
        neighbor: usize,
    ) -> Option<WindowId> {
        let next = self.windows.get(neighbor)?;
        let confirmed = next.focus(host, settings);
        if let Some(previous) = self.windows.get(current) {
            previous.unfocus(host, settings);
        }
        if settings.mouse_follows_focus {
            host.warp_mouse(next.top_left());
        }
        confirmed.then(|| next.id())
    }
}

/// Index of the candidate whose top-left corner is closest to `coords`.
/// `None` when there are no candidates; callers must cope.
pub fn find_closest_window(coords: Point, candidates: &[WrappedWindow]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, window) in candidates.iter().enumerate() {
        let distance = coords.distance_to(window.top_left());
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((i, distance));
        }
    }
    best.map(|(i, _)| i)
}

/// True cross-region swap: the two windows trade slots between the two
/// regions' sequences. Both regions are reindexed; reconciling is the
/// caller's job.
pub fn exchange(a: &mut Region, slot_a: usize, b: &mut Region, slot_b: usize) {
    std::mem::swap(&mut a.windows[slot_a], &mut b.windows[slot_b]);
    a.reindex();
    b.reindex();
}
