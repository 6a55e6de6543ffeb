//! Sub-rectangle partition math and the direction vocabulary the layout
//! core is built on. Everything here is pure; the same functions feed both
//! real window placement and pointer hit-testing, so they must stay
//! deterministic.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::sys::geometry::{Point, Rect};

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Orientation {
    #[default]
    Horizontal,
    Vertical,
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    pub fn orientation(self) -> Orientation {
        match self {
            Direction::North | Direction::South => Orientation::Vertical,
            Direction::East | Direction::West => Orientation::Horizontal,
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::East => Direction::West,
            Direction::West => Direction::East,
        }
    }

    /// Step applied to a window's slot index when moving within a region:
    /// north/west walk toward slot 0, south/east away from it.
    pub fn index_step(self) -> isize {
        match self {
            Direction::North | Direction::West => -1,
            Direction::South | Direction::East => 1,
        }
    }

    /// The "almost adjacent" direction tried when a region has no neighbor
    /// configured in the requested direction. Sparse adjacency tables stay
    /// navigable this way.
    pub fn fallback(self) -> Direction {
        match self {
            Direction::East => Direction::South,
            Direction::South => Direction::East,
            Direction::West => Direction::North,
            Direction::North => Direction::West,
        }
    }
}

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Action {
    Move,
    Focus,
    Swap,
}

bitflags! {
    /// Which sides of a region touch another region on the same display,
    /// as opposed to a screen edge.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct AdjacentEdges: u8 {
        const NORTH = 1 << 0;
        const SOUTH = 1 << 1;
        const EAST  = 1 << 2;
        const WEST  = 1 << 3;
    }
}

impl AdjacentEdges {
    pub fn from_direction(direction: Direction) -> AdjacentEdges {
        match direction {
            Direction::North => AdjacentEdges::NORTH,
            Direction::South => AdjacentEdges::SOUTH,
            Direction::East => AdjacentEdges::EAST,
            Direction::West => AdjacentEdges::WEST,
        }
    }
}

/// The correction applied to every sub-rectangle of a region that borders
/// other regions on its own display. An interior seam gets margin from both
/// sides, so each region pulls the shared edge inward by a quarter margin;
/// screen edges are left alone. Each direction contributes independently
/// and the contributions add up.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct EdgeOffset {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl EdgeOffset {
    pub fn apply_to(&self, rect: Rect) -> Rect {
        Rect::new(
            rect.origin.x + self.x,
            rect.origin.y + self.y,
            rect.size.width + self.width,
            rect.size.height + self.height,
        )
    }
}

pub fn offset(edges: AdjacentEdges, margin: f64) -> EdgeOffset {
    let seam = margin / 4.0;
    let mut out = EdgeOffset::default();
    if edges.contains(AdjacentEdges::NORTH) {
        out.y += seam;
        out.height -= seam;
    }
    if edges.contains(AdjacentEdges::SOUTH) {
        out.height -= seam;
    }
    if edges.contains(AdjacentEdges::WEST) {
        out.x += seam;
        out.width -= seam;
    }
    if edges.contains(AdjacentEdges::EAST) {
        out.width -= seam;
    }
    out
}

/// Partitions `frame` into `count` rectangles along the orientation's axis.
///
/// Slot `i` starts at `i * frame_len / count` plus half a margin and gives
/// up half a margin of length; the cross axis is inset half a margin on
/// both sides. Adjacent slots end up separated by half-margin gutters and
/// the whole partition tiles the frame exactly, which pointer hit-testing
/// depends on. `count == 0` yields an empty vec.
pub fn sub_regions(
    frame: Rect,
    orientation: Orientation,
    count: usize,
    edges: AdjacentEdges,
    margin: f64,
) -> Vec<Rect> {
    if count == 0 {
        return Vec::new();
    }
    let correction = offset(edges, margin);
    let n = count as f64;
    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let i = i as f64;
        let slot = match orientation {
            Orientation::Horizontal => {
                let width = frame.size.width / n;
                Rect::new(
                    frame.origin.x + i * width + margin / 2.0,
                    frame.origin.y + margin / 2.0,
                    width - margin / 2.0,
                    frame.size.height - margin,
                )
            }
            Orientation::Vertical => {
                let height = frame.size.height / n;
                Rect::new(
                    frame.origin.x + margin / 2.0,
                    frame.origin.y + i * height + margin / 2.0,
                    frame.size.width - margin,
                    height - margin / 2.0,
                )
            }
        };
        out.push(correction.apply_to(slot));
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BeforeOrAfter {
    Before,
    After,
}

/// Which half of `frame` the point falls in along the orientation's axis.
/// The midpoint itself counts as `After`.
pub fn before_or_after(point: Point, frame: Rect, orientation: Orientation) -> BeforeOrAfter {
    let in_first_half = match orientation {
        Orientation::Horizontal => point.x < frame.mid().x,
        Orientation::Vertical => point.y < frame.mid().y,
    };
    if in_first_half {
        BeforeOrAfter::Before
    } else {
        BeforeOrAfter::After
    }
}

/// True when `a` sits below `b` on screen (y grows downward).
pub fn is_below(a: Point, b: Point) -> bool { a.y > b.y }

/// True when `a` sits to the right of `b`.
pub fn is_after(a: Point, b: Point) -> bool { a.x > b.x }
