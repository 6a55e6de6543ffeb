use crate::common::collections::HashMap;
use crate::common::config::LayoutSettings;
use crate::layout::region::Region;
use crate::sys::geometry::Rect;
use crate::sys::host::{DisplayId, Host};

/// One physical screen and its static set of named regions. Region
/// membership is fixed by configuration; only the regions' window contents
/// change at runtime. Config order is preserved so distribution and
/// hit-testing stay deterministic.
#[derive(Clone, Debug)]
pub struct Display {
    id: DisplayId,
    frame: Rect,
    regions: HashMap<String, Region>,
    order: Vec<String>,
}

impl Display {
    pub fn new(id: DisplayId, frame: Rect) -> Self {
        Display {
            id,
            frame,
            regions: HashMap::default(),
            order: Vec::new(),
        }
    }

    pub fn id(&self) -> DisplayId { self.id }

    pub fn frame(&self) -> Rect { self.frame }

    pub fn insert_region(&mut self, region: Region) {
        let name = region.name().to_string();
        if self.regions.insert(name.clone(), region).is_none() {
            self.order.push(name);
        }
    }

    pub fn region(&self, name: &str) -> Option<&Region> { self.regions.get(name) }

    pub fn region_mut(&mut self, name: &str) -> Option<&mut Region> { self.regions.get_mut(name) }

    pub fn region_count(&self) -> usize { self.order.len() }

    /// Regions in configuration order.
    pub fn regions(&self) -> impl Iterator<Item = &Region> {
        self.order.iter().filter_map(|name| self.regions.get(name))
    }

    pub fn region_names(&self) -> &[String] { &self.order }

    /// The fallback region for windows nothing else claims. Falls back to
    /// the first configured region if no region is flagged default.
    pub fn default_region_name(&self) -> Option<&str> {
        self.regions()
            .find(|r| r.is_default())
            .map(Region::name)
            .or_else(|| self.order.first().map(String::as_str))
    }

    /// Reconciles every region on this display.
    pub fn distribute<H: Host>(&mut self, host: &H, settings: &LayoutSettings) {
        for region in self.regions.values_mut() {
            region.reconcile(host, settings);
        }
    }

    /// Temporarily removes a region so the engine can hold it mutably next
    /// to another region. Must be paired with [`Display::put_region`].
    pub(crate) fn take_region(&mut self, name: &str) -> Option<Region> {
        self.regions.remove(name)
    }

    pub(crate) fn put_region(&mut self, region: Region) {
        self.regions.insert(region.name().to_string(), region);
    }
}
