use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::actor::reactor::WmCommand;
use crate::common::collections::{HashMap, HashSet};
use crate::layout::grid::Orientation;
use crate::sys::geometry::Rect;
use crate::sys::hotkey::Hotkey;

pub fn data_dir() -> PathBuf { dirs::home_dir().unwrap().join(".mosaic") }

pub fn store_file() -> PathBuf { data_dir().join("store.json") }

pub fn config_file() -> PathBuf {
    dirs::home_dir().unwrap().join(".config").join("mosaic").join("config.toml")
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: LayoutSettings,
    /// Static region graph, one entry per display index. Displays without
    /// an entry get a single full-screen default region.
    #[serde(default)]
    pub displays: Vec<DisplayDef>,
    /// Command name -> hotkey spec, e.g. `focus_west = "alt+h"`.
    #[serde(default)]
    pub keys: HashMap<String, String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Gutter between windows and around region edges, in pixels.
    #[serde(default = "default_margin")]
    pub margin: f64,
    /// Grow the focused window slightly beyond its slot.
    #[serde(default = "yes")]
    pub grow_focused: bool,
    /// Warp the pointer to a window when focus is handed to it.
    #[serde(default = "no")]
    pub mouse_follows_focus: bool,
    /// Reload the saved layout on startup.
    #[serde(default = "yes")]
    pub auto_restore: bool,
    /// Quiet period after the last drag sample before a drop is resolved.
    #[serde(default = "default_drag_settle_ms")]
    pub drag_settle_ms: u64,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            margin: default_margin(),
            grow_focused: true,
            mouse_follows_focus: false,
            auto_restore: true,
            drag_settle_ms: default_drag_settle_ms(),
        }
    }
}

fn yes() -> bool { true }
fn no() -> bool { false }
fn default_margin() -> f64 { 30.0 }
fn default_drag_settle_ms() -> u64 { 250 }

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct DisplayDef {
    /// Position in the host's screen enumeration.
    pub index: usize,
    #[serde(default)]
    pub regions: Vec<RegionDef>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct RegionDef {
    /// Unique within its display.
    pub name: String,
    /// Fractions of the display's visible frame, all in `[0, 1]`.
    pub rect: RelativeRect,
    #[serde(default)]
    pub orientation: Orientation,
    /// Fallback region for windows nothing else claims. Exactly one per
    /// display.
    #[serde(rename = "default", default)]
    pub is_default: bool,
    #[serde(default)]
    pub adjacent: AdjacencyDef,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct AdjacencyDef {
    pub north: Option<RegionTarget>,
    pub south: Option<RegionTarget>,
    pub east: Option<RegionTarget>,
    pub west: Option<RegionTarget>,
}

impl AdjacencyDef {
    pub fn entries(&self) -> impl Iterator<Item = (&'static str, &RegionTarget)> {
        [
            ("north", self.north.as_ref()),
            ("south", self.south.as_ref()),
            ("east", self.east.as_ref()),
            ("west", self.west.as_ref()),
        ]
        .into_iter()
        .filter_map(|(name, target)| target.map(|t| (name, t)))
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct RegionTarget {
    pub display: usize,
    pub region: String,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Copy)]
#[serde(deny_unknown_fields)]
pub struct RelativeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl RelativeRect {
    /// Scales the fractions onto a concrete screen frame.
    pub fn resolve(&self, frame: Rect) -> Rect {
        Rect::new(
            frame.origin.x + self.x * frame.size.width,
            frame.origin.y + self.y * frame.size.height,
            self.width * frame.size.width,
            self.height * frame.size.height,
        )
    }

    fn in_unit_range(&self) -> bool {
        let within = |v: f64| (0.0..=1.0).contains(&v);
        within(self.x) && within(self.y) && within(self.width) && within(self.height)
    }
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("parsing config from {}", path.display()))?;
        Ok(config)
    }

    /// Parsed keybindings, skipping entries that fail to parse (validate
    /// reports those).
    pub fn keybindings(&self) -> Vec<(WmCommand, Hotkey)> {
        self.keys
            .iter()
            .filter_map(|(command, spec)| {
                let command = WmCommand::from_str(command).ok()?;
                let hotkey = Hotkey::from_str(spec).ok()?;
                Some((command, hotkey))
            })
            .collect()
    }

    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.settings.margin < 0.0 {
            issues.push(format!("settings.margin must not be negative ({})", self.settings.margin));
        }
        if self.settings.drag_settle_ms == 0 {
            issues.push("settings.drag_settle_ms must be at least 1".to_string());
        }

        let mut seen_indexes = HashSet::default();
        for display in &self.displays {
            if !seen_indexes.insert(display.index) {
                issues.push(format!("display {} is configured twice", display.index));
            }
        }

        for display in &self.displays {
            let mut names = HashSet::default();
            let mut defaults = 0usize;
            for region in &display.regions {
                if region.name.is_empty() {
                    issues.push(format!("display {} has a region with an empty name", display.index));
                }
                if !names.insert(region.name.as_str()) {
                    issues.push(format!(
                        "display {} declares region '{}' twice",
                        display.index, region.name
                    ));
                }
                if region.is_default {
                    defaults += 1;
                }
                if !region.rect.in_unit_range() {
                    issues.push(format!(
                        "region '{}' on display {} has rect fractions outside [0, 1]",
                        region.name, display.index
                    ));
                }
                for (direction, target) in region.adjacent.entries() {
                    if !self.region_exists(target) {
                        issues.push(format!(
                            "region '{}' on display {} points {} at unknown region '{}' on display {}",
                            region.name, display.index, direction, target.region, target.display
                        ));
                    }
                }
            }
            match defaults {
                1 => {}
                0 if display.regions.is_empty() => {}
                0 => issues.push(format!("display {} has no default region", display.index)),
                _ => issues.push(format!(
                    "display {} has {} default regions, expected exactly one",
                    display.index, defaults
                )),
            }
        }

        let mut seen_hotkeys: HashMap<Hotkey, &str> = HashMap::default();
        for (command, spec) in &self.keys {
            if WmCommand::from_str(command).is_err() {
                issues.push(format!("unknown command '{command}' in [keys]"));
            }
            match Hotkey::from_str(spec) {
                Ok(hotkey) => {
                    if let Some(other) = seen_hotkeys.insert(hotkey, command.as_str()) {
                        issues.push(format!(
                            "hotkey '{spec}' is bound to both '{other}' and '{command}'"
                        ));
                    }
                }
                Err(err) => issues.push(format!("command '{command}': {err}")),
            }
        }

        issues
    }

    fn region_exists(&self, target: &RegionTarget) -> bool {
        self.displays
            .iter()
            .find(|d| d.index == target.display)
            .is_some_and(|d| d.regions.iter().any(|r| r.name == target.region))
    }
}
