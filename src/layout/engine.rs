use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::collections::{HashMap, HashSet};
use crate::common::config::{DisplayDef, LayoutSettings};
use crate::layout::display::Display;
use crate::layout::grid::{self, Action, BeforeOrAfter, Direction, Orientation};
use crate::layout::region::{self, Adjacency, Region, RegionRef, find_closest_window};
use crate::layout::window::WrappedWindow;
use crate::sys::geometry::{Point, Rect};
use crate::sys::host::{DisplayId, Host, WindowId, WindowInfo};

const SNAPSHOT_VERSION: u32 = 1;

/// Name given to the synthetic region covering a display the configuration
/// says nothing about.
const FALLBACK_REGION: &str = "main";

/// The whole layout world: every display, every region, and the one index
/// mapping each tracked window to the region that owns it.
///
/// Ownership is strict: a window id appears in exactly one region's list,
/// and `region_map` always points at that region. Only the engine writes
/// `region_map`; the graph itself is rebuilt wholesale by [`LayoutEngine::init`]
/// and never modified structurally between inits.
pub struct LayoutEngine {
    displays: HashMap<DisplayId, Display>,
    display_order: Vec<DisplayId>,
    region_map: HashMap<WindowId, RegionRef>,
    focused: Option<WindowId>,
    settings: LayoutSettings,
}

/// Result of hit-testing a point against the current sub-rectangles.
#[derive(Clone, Debug, PartialEq)]
pub struct RegionHit {
    pub region: RegionRef,
    pub frame: Rect,
    pub index: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LayoutSnapshot {
    pub version: u32,
    pub displays: Vec<DisplaySnapshot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    pub display: DisplayId,
    pub regions: Vec<RegionSnapshot>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RegionSnapshot {
    pub name: String,
    pub windows: Vec<WindowId>,
}

impl LayoutEngine {
    pub fn new(settings: LayoutSettings) -> Self {
        LayoutEngine {
            displays: HashMap::default(),
            display_order: Vec::new(),
            region_map: HashMap::default(),
            focused: None,
            settings,
        }
    }

    pub fn settings(&self) -> &LayoutSettings { &self.settings }

    pub fn focused(&self) -> Option<WindowId> { self.focused }

    pub fn display(&self, id: DisplayId) -> Option<&Display> { self.displays.get(&id) }

    /// Displays in host enumeration order.
    pub fn displays(&self) -> impl Iterator<Item = &Display> {
        self.display_order.iter().filter_map(|id| self.displays.get(id))
    }

    pub fn region(&self, rref: &RegionRef) -> Option<&Region> {
        self.displays.get(&rref.display)?.region(&rref.region)
    }

    fn region_mut(&mut self, rref: &RegionRef) -> Option<&mut Region> {
        self.displays.get_mut(&rref.display)?.region_mut(&rref.region)
    }

    pub fn tracked_window_count(&self) -> usize { self.region_map.len() }

    /// Builds (or rebuilds) the display/region graph from the host's live
    /// screens plus static configuration, then populates it: from a
    /// snapshot when one is given, by spreading the currently open windows
    /// across regions otherwise. Every region is reconciled before this
    /// returns.
    pub fn init<H: Host>(&mut self, host: &H, defs: &[DisplayDef], snapshot: Option<LayoutSnapshot>) {
        self.displays.clear();
        self.display_order.clear();
        self.region_map.clear();
        self.focused = None;

        let screens = host.screens();
        let windows = host.windows();

        for (position, screen) in screens.iter().enumerate() {
            let mut display = Display::new(screen.id, screen.visible_frame);
            let def = defs.iter().find(|d| d.index == position);
            match def {
                Some(def) if !def.regions.is_empty() => {
                    for region_def in &def.regions {
                        display.insert_region(Region::new(
                            region_def.name.clone(),
                            screen.id,
                            region_def.rect.resolve(screen.visible_frame),
                            region_def.orientation,
                            region_def.is_default,
                            resolve_adjacency(&region_def.adjacent, &screens),
                        ));
                    }
                }
                _ => {
                    display.insert_region(Region::new(
                        FALLBACK_REGION,
                        screen.id,
                        screen.visible_frame,
                        Orientation::default(),
                        true,
                        Adjacency::default(),
                    ));
                }
            }
            self.display_order.push(screen.id);
            self.displays.insert(screen.id, display);
        }

        match snapshot {
            Some(snapshot) => {
                let mut placed = HashSet::default();
                self.rehydrate(&snapshot, &windows, &mut placed);
                // windows the snapshot does not cover land in default regions
                for info in windows.iter().filter(|w| !placed.contains(&w.id)) {
                    self.window_opened(host, info.clone());
                }
            }
            None => self.spread_windows(&windows),
        }

        let settings = self.settings.clone();
        for display in self.displays.values_mut() {
            display.distribute(host, &settings);
        }
        debug!(
            displays = self.display_order.len(),
            windows = self.region_map.len(),
            "layout graph initialized"
        );
    }

    fn rehydrate(
        &mut self,
        snapshot: &LayoutSnapshot,
        windows: &[WindowInfo],
        placed: &mut HashSet<WindowId>,
    ) {
        if snapshot.version != SNAPSHOT_VERSION {
            warn!(version = snapshot.version, "discarding snapshot with unknown version");
            return;
        }
        let live: HashMap<WindowId, &WindowInfo> = windows.iter().map(|w| (w.id, w)).collect();
        for display_snap in &snapshot.displays {
            let Some(display) = self.displays.get_mut(&display_snap.display) else {
                continue;
            };
            for region_snap in &display_snap.regions {
                let Some(region) = display.region_mut(&region_snap.name) else {
                    continue;
                };
                for id in &region_snap.windows {
                    let Some(info) = live.get(id) else { continue };
                    if !placed.insert(*id) {
                        continue;
                    }
                    region.add_window_end(WrappedWindow::new(*id, info.frame));
                    self.region_map
                        .insert(*id, RegionRef::new(display_snap.display, region_snap.name.clone()));
                }
            }
        }
    }

    /// Deals the given windows across each display's regions, round-robin
    /// with remainder: the first `n % k` regions get the extra window.
    fn spread_windows(&mut self, windows: &[WindowInfo]) {
        let mut per_display: HashMap<DisplayId, Vec<WindowInfo>> = HashMap::default();
        for info in windows {
            let display = self
                .display_order
                .iter()
                .find(|id| {
                    self.displays
                        .get(id)
                        .is_some_and(|d| d.frame().contains(info.frame.origin))
                })
                .or(self.display_order.first())
                .copied();
            if let Some(display) = display {
                per_display.entry(display).or_default().push(info.clone());
            }
        }
        for display_id in self.display_order.clone() {
            let Some(infos) = per_display.remove(&display_id) else { continue };
            let Some(display) = self.displays.get_mut(&display_id) else { continue };
            let names = display.region_names().to_vec();
            let groups = distribute_windows(infos, names.len());
            for (name, group) in names.iter().zip(groups) {
                let Some(region) = display.region_mut(name) else { continue };
                for info in group {
                    region.add_window_end(WrappedWindow::new(info.id, info.frame));
                    self.region_map.insert(info.id, RegionRef::new(display_id, name.clone()));
                }
            }
        }
    }

    /// Resolves a host window to its wrapper and owning region. `None`
    /// means the window is untracked; callers must check.
    pub fn find_window(&self, id: WindowId) -> Option<(&Region, &WrappedWindow)> {
        let rref = self.region_map.get(&id)?;
        let region = self.region(rref)?;
        let window = region.window(id)?;
        Some((region, window))
    }

    pub fn region_of(&self, id: WindowId) -> Option<&RegionRef> { self.region_map.get(&id) }

    fn lookup_window(&self, id: WindowId) -> Option<&WrappedWindow> {
        self.find_window(id).map(|(_, window)| window)
    }

    /// First sub-rectangle strictly containing `point`, scanning displays
    /// and regions in configuration order. Points on slot boundaries match
    /// nothing.
    pub fn find_region_position(&self, point: Point) -> Option<RegionHit> {
        for display in self.displays() {
            for region in display.regions() {
                for (index, frame) in
                    region.sub_regions(self.settings.margin).into_iter().enumerate()
                {
                    if frame.contains_inside(point) {
                        return Some(RegionHit { region: region.region_ref(), frame, index });
                    }
                }
            }
        }
        None
    }

    /// Region whose own frame strictly contains `point`. Coarser than
    /// [`LayoutEngine::find_region_position`]; in particular it can hit
    /// empty regions.
    pub fn find_region_at(&self, point: Point) -> Option<RegionRef> {
        for display in self.displays() {
            for region in display.regions() {
                if region.frame().contains_inside(point) {
                    return Some(region.region_ref());
                }
            }
        }
        None
    }

    /// Directional action entry point. Decides between the in-region and
    /// cross-region variant of the action and runs it to completion,
    /// reconciling everything it touched.
    pub fn handle_action<H: Host>(
        &mut self,
        host: &H,
        action: Action,
        id: WindowId,
        direction: Direction,
    ) {
        let Some(rref) = self.region_map.get(&id).cloned() else {
            debug!(window = ?id, "action on untracked window");
            return;
        };
        let internal = self.region(&rref).and_then(|r| r.internal_neighbor(id, direction));
        match (action, internal) {
            (Action::Move | Action::Swap, Some((current, neighbor))) => {
                let settings = self.settings.clone();
                if let Some(region) = self.region_mut(&rref) {
                    region.swap_with_neighbor(host, &settings, current, neighbor);
                }
            }
            (Action::Focus, Some((current, neighbor))) => {
                let focused = self
                    .region(&rref)
                    .and_then(|r| r.focus_neighbor(host, &self.settings, current, neighbor));
                if let Some(next) = focused {
                    self.focused = Some(next);
                }
            }
            (Action::Move, None) => self.move_to_region(host, &rref, id, direction, false),
            (Action::Swap, None) => self.move_to_region(host, &rref, id, direction, true),
            (Action::Focus, None) => self.focus_toward(host, &rref, id, direction),
        }
    }

    fn move_to_region<H: Host>(
        &mut self,
        host: &H,
        source: &RegionRef,
        id: WindowId,
        direction: Direction,
        is_swap: bool,
    ) {
        let Some(dest) =
            self.region(source).and_then(|r| r.adjacent().get(direction)).cloned()
        else {
            debug!(%direction, "no adjacent region");
            return;
        };
        if dest == *source {
            return;
        }
        if self.region(&dest).is_none() {
            warn!(region = %dest.region, "adjacency points at a missing region");
            return;
        }
        self.place_windows(host, source, &dest, id, is_swap);
    }

    /// Moves or swaps `id` from `source_ref` into `dest_ref`, anchored at
    /// the destination window closest to it. Updates the ownership index
    /// and reconciles both regions.
    fn place_windows<H: Host>(
        &mut self,
        host: &H,
        source_ref: &RegionRef,
        dest_ref: &RegionRef,
        id: WindowId,
        is_swap: bool,
    ) {
        let settings = self.settings.clone();
        let Some(mut source) = self
            .displays
            .get_mut(&source_ref.display)
            .and_then(|d| d.take_region(&source_ref.region))
        else {
            return;
        };
        if let Some(dest) =
            self.displays.get_mut(&dest_ref.display).and_then(|d| d.region_mut(&dest_ref.region))
        {
            let moving_slot = source.position_of(id);
            let closest = source
                .window(id)
                .map(WrappedWindow::top_left)
                .and_then(|origin| find_closest_window(origin, dest.windows()));
            match (moving_slot, closest) {
                (Some(slot), Some(other_slot)) if is_swap => {
                    let other = dest.windows()[other_slot].id();
                    region::exchange(&mut source, slot, dest, other_slot);
                    self.region_map.insert(id, dest_ref.clone());
                    self.region_map.insert(other, source_ref.clone());
                }
                (Some(_), _) => {
                    if let Some(window) = source.take_window(id) {
                        let reference = window.top_left();
                        insert_by_proximity(dest, window, reference);
                        self.region_map.insert(id, dest_ref.clone());
                    }
                }
                (None, _) => {}
            }
            source.reconcile(host, &settings);
            dest.reconcile(host, &settings);
        }
        if let Some(display) = self.displays.get_mut(&source_ref.display) {
            display.put_region(source);
        }
    }

    /// Cross-region focus. Falls back to the "almost adjacent" direction
    /// when no neighbor is configured, and chains through empty regions
    /// rather than giving up on them.
    fn focus_toward<H: Host>(
        &mut self,
        host: &H,
        source_ref: &RegionRef,
        id: WindowId,
        direction: Direction,
    ) {
        let Some(source_region) = self.region(source_ref) else { return };
        let origin = source_region.window(id).map(WrappedWindow::top_left);
        let Some(mut target) = source_region
            .adjacent()
            .get(direction)
            .or_else(|| source_region.adjacent().get(direction.fallback()))
            .cloned()
        else {
            debug!(%direction, "nothing adjacent to focus");
            return;
        };

        let mut visited: HashSet<RegionRef> = HashSet::default();
        visited.insert(source_ref.clone());
        let dest = loop {
            if !visited.insert(target.clone()) {
                debug!(region = %target.region, "adjacency cycle while searching for focus");
                return;
            }
            let Some(region) = self.region(&target) else {
                warn!(region = %target.region, "adjacency points at a missing region");
                return;
            };
            if !region.is_empty() {
                break region;
            }
            // empty region: forward the request to its own same-direction
            // neighbor instead of failing
            match region.adjacent().get(direction).cloned() {
                Some(next) => target = next,
                None => {
                    debug!(%direction, "ran out of regions to focus");
                    return;
                }
            }
        };

        let slot = origin.and_then(|o| find_closest_window(o, dest.windows())).unwrap_or(0);
        let Some(next) = dest.window_at(slot) else { return };
        let next_id = next.id();
        let next_top_left = next.top_left();
        let confirmed = next.focus(host, &self.settings);
        if let Some(previous) = self.region(source_ref).and_then(|r| r.window(id)) {
            previous.unfocus(host, &self.settings);
        }
        if self.settings.mouse_follows_focus {
            host.warp_mouse(next_top_left);
        }
        if confirmed {
            self.focused = Some(next_id);
        }
    }

    /// Tracks a newly observed window: it joins the default region of the
    /// display under its top-left corner.
    pub fn window_opened<H: Host>(&mut self, host: &H, info: WindowInfo) {
        if self.region_map.contains_key(&info.id) {
            return;
        }
        let Some(rref) = self.region_for_new_window(info.frame.origin) else {
            warn!(window = ?info.id, "no display to place window on");
            return;
        };
        let settings = self.settings.clone();
        self.region_map.insert(info.id, rref.clone());
        if let Some(region) = self.region_mut(&rref) {
            region.add_window_end(WrappedWindow::new(info.id, info.frame));
            region.reconcile(host, &settings);
        }
    }

    fn region_for_new_window(&self, origin: Point) -> Option<RegionRef> {
        let display = self
            .displays()
            .find(|d| d.frame().contains(origin))
            .or_else(|| self.displays().next())?;
        let name = display.default_region_name()?;
        Some(RegionRef::new(display.id(), name))
    }

    /// Drops a window from tracking without reconciling, so callers can
    /// batch. Returns the region that owned it.
    pub fn remove_window(&mut self, id: WindowId) -> Option<RegionRef> {
        let rref = self.region_map.remove(&id)?;
        if let Some(region) = self.region_mut(&rref) {
            region.take_window(id);
        }
        if self.focused == Some(id) {
            self.focused = None;
        }
        Some(rref)
    }

    pub fn window_closed<H: Host>(&mut self, host: &H, id: WindowId) {
        let settings = self.settings.clone();
        if let Some(rref) = self.remove_window(id)
            && let Some(region) = self.region_mut(&rref)
        {
            region.reconcile(host, &settings);
        }
    }

    /// Reacts to a host-initiated focus change: the previous window shrinks
    /// back to its margined frame, the new one grows if tracked.
    pub fn window_focused<H: Host>(&mut self, host: &H, id: WindowId) {
        if self.focused == Some(id) {
            return;
        }
        if let Some(previous) = self.focused.take()
            && let Some(window) = self.lookup_window(previous)
        {
            window.unfocus(host, &self.settings);
        }
        if let Some(window) = self.lookup_window(id) {
            window.apply(host, &self.settings);
        }
        self.focused = Some(id);
    }

    /// Resolves a finished drag: the window joins whatever slot (or
    /// region) sits under the drop point, or snaps back to its current
    /// slot if the point lands nowhere useful.
    pub fn complete_drag<H: Host>(&mut self, host: &H, id: WindowId, point: Point) {
        let Some(source) = self.region_map.get(&id).cloned() else {
            debug!(window = ?id, "drag of untracked window");
            return;
        };
        let settings = self.settings.clone();
        if let Some(hit) = self.find_region_position(point) {
            if hit.region == source {
                if let Some(region) = self.region_mut(&hit.region) {
                    reorder_within(region, id, &hit, point);
                    region.reconcile(host, &settings);
                }
            } else {
                self.transfer_dragged(host, &source, &hit, id, point);
            }
            return;
        }
        match self.find_region_at(point) {
            Some(dest) if dest != source => self.transfer_loose(host, &source, &dest, id, point),
            _ => {
                // dropped on a gutter of its own region, or outside every
                // region: snap back
                if let Some(region) = self.region_mut(&source) {
                    region.reconcile(host, &settings);
                }
            }
        }
    }

    /// Drop landed on a concrete slot of another region.
    fn transfer_dragged<H: Host>(
        &mut self,
        host: &H,
        source_ref: &RegionRef,
        hit: &RegionHit,
        id: WindowId,
        point: Point,
    ) {
        let settings = self.settings.clone();
        let Some(mut source) = self
            .displays
            .get_mut(&source_ref.display)
            .and_then(|d| d.take_region(&source_ref.region))
        else {
            return;
        };
        if let Some(dest) = self
            .displays
            .get_mut(&hit.region.display)
            .and_then(|d| d.region_mut(&hit.region.region))
        {
            if let Some(window) = source.take_window(id) {
                match grid::before_or_after(point, hit.frame, dest.orientation()) {
                    BeforeOrAfter::Before => dest.add_window_before(window, hit.index),
                    BeforeOrAfter::After => dest.add_window_after(window, hit.index),
                }
                self.region_map.insert(id, hit.region.clone());
            }
            source.reconcile(host, &settings);
            dest.reconcile(host, &settings);
        }
        if let Some(display) = self.displays.get_mut(&source_ref.display) {
            display.put_region(source);
        }
    }

    /// Drop landed inside another region but not on any slot (the region
    /// may well be empty).
    fn transfer_loose<H: Host>(
        &mut self,
        host: &H,
        source_ref: &RegionRef,
        dest_ref: &RegionRef,
        id: WindowId,
        point: Point,
    ) {
        let settings = self.settings.clone();
        let Some(mut source) = self
            .displays
            .get_mut(&source_ref.display)
            .and_then(|d| d.take_region(&source_ref.region))
        else {
            return;
        };
        if let Some(dest) =
            self.displays.get_mut(&dest_ref.display).and_then(|d| d.region_mut(&dest_ref.region))
        {
            if let Some(window) = source.take_window(id) {
                insert_by_proximity(dest, window, point);
                self.region_map.insert(id, dest_ref.clone());
            }
            source.reconcile(host, &settings);
            dest.reconcile(host, &settings);
        }
        if let Some(display) = self.displays.get_mut(&source_ref.display) {
            display.put_region(source);
        }
    }

    pub fn snapshot(&self) -> LayoutSnapshot {
        LayoutSnapshot {
            version: SNAPSHOT_VERSION,
            displays: self
                .displays()
                .map(|display| DisplaySnapshot {
                    display: display.id(),
                    regions: display
                        .regions()
                        .map(|region| RegionSnapshot {
                            name: region.name().to_string(),
                            windows: region.windows().iter().map(WrappedWindow::id).collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }
}

/// Inserts into a region next to the member closest to `reference`, on the
/// side the destination's axis says the reference falls on. An empty
/// region gets the window as its first member.
fn insert_by_proximity(dest: &mut Region, window: WrappedWindow, reference: Point) {
    match find_closest_window(reference, dest.windows()) {
        None => dest.add_window_start(window),
        Some(closest) => {
            let anchor = dest.windows()[closest].top_left();
            let after = match dest.orientation() {
                Orientation::Vertical => grid::is_below(reference, anchor),
                Orientation::Horizontal => grid::is_after(reference, anchor),
            };
            if after {
                dest.add_window_after(window, closest);
            } else {
                dest.add_window_before(window, closest);
            }
        }
    }
}

/// Reorders a window within its own region onto the dropped-on slot,
/// landing before or after it depending on which half of the slot the
/// point is in.
fn reorder_within(region: &mut Region, id: WindowId, hit: &RegionHit, point: Point) {
    let Some(current) = region.position_of(id) else { return };
    let side = grid::before_or_after(point, hit.frame, region.orientation());
    let mut slot = hit.index;
    if current < slot {
        // removing the window shifts every later slot down one
        slot -= 1;
    }
    if let Some(window) = region.take_window(id) {
        match side {
            BeforeOrAfter::Before => region.add_window_before(window, slot),
            BeforeOrAfter::After => region.add_window_after(window, slot),
        }
    }
}

/// Splits `items` into `groups` chunks, front-loading the remainder: seven
/// windows over three regions come out `[3, 2, 2]`.
pub fn distribute_windows<T>(items: Vec<T>, groups: usize) -> Vec<Vec<T>> {
    if groups == 0 {
        return Vec::new();
    }
    let base = items.len() / groups;
    let remainder = items.len() % groups;
    let mut iter = items.into_iter();
    (0..groups)
        .map(|slot| {
            let take = if slot < remainder { base + 1 } else { base };
            iter.by_ref().take(take).collect()
        })
        .collect()
}

fn resolve_adjacency(
    def: &crate::common::config::AdjacencyDef,
    screens: &[crate::sys::host::ScreenInfo],
) -> Adjacency {
    let resolve = |target: &Option<crate::common::config::RegionTarget>| {
        target.as_ref().and_then(|t| {
            let screen = screens.get(t.display)?;
            Some(RegionRef::new(screen.id, t.region.clone()))
        })
    };
    Adjacency {
        north: resolve(&def.north),
        south: resolve(&def.south),
        east: resolve(&def.east),
        west: resolve(&def.west),
    }
}
