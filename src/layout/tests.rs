use std::collections::HashSet;

use pretty_assertions::assert_eq;

use crate::common::config::{
    AdjacencyDef, DisplayDef, LayoutSettings, RegionDef, RegionTarget, RelativeRect,
};
use crate::layout::engine::{LayoutEngine, distribute_windows};
use crate::layout::grid::{Action, Direction, Orientation};
use crate::layout::region::{Adjacency, Region};
use crate::layout::window::WrappedWindow;
use crate::sys::geometry::{Point, Rect};
use crate::sys::host::{DisplayId, Host, WindowId};
use crate::sys::testing::FakeHost;

fn w(raw: u32) -> WindowId {
    WindowId::new(raw)
}

fn settings() -> LayoutSettings {
    LayoutSettings { margin: 30.0, ..LayoutSettings::default() }
}

fn rel(x: f64, y: f64, width: f64, height: f64) -> RelativeRect {
    RelativeRect { x, y, width, height }
}

fn target(display: usize, region: &str) -> Option<RegionTarget> {
    Some(RegionTarget { display, region: region.into() })
}

/// One display split in half: "main" (horizontal row, default) on the
/// left, "side" (vertical stack) on the right.
fn split_defs() -> Vec<DisplayDef> {
    vec![DisplayDef {
        index: 0,
        regions: vec![
            RegionDef {
                name: "main".into(),
                rect: rel(0.0, 0.0, 0.5, 1.0),
                orientation: Orientation::Horizontal,
                is_default: true,
                adjacent: AdjacencyDef { east: target(0, "side"), ..AdjacencyDef::default() },
            },
            RegionDef {
                name: "side".into(),
                rect: rel(0.5, 0.0, 0.5, 1.0),
                orientation: Orientation::Vertical,
                is_default: false,
                adjacent: AdjacencyDef { west: target(0, "main"), ..AdjacencyDef::default() },
            },
        ],
    }]
}

/// Three columns chained west-to-east.
fn column_defs() -> Vec<DisplayDef> {
    let column = |name: &str, x: f64, west: Option<RegionTarget>, east: Option<RegionTarget>| {
        RegionDef {
            name: name.into(),
            rect: rel(x, 0.0, 1.0 / 3.0, 1.0),
            orientation: Orientation::Vertical,
            is_default: name == "left",
            adjacent: AdjacencyDef { west, east, ..AdjacencyDef::default() },
        }
    };
    vec![DisplayDef {
        index: 0,
        regions: vec![
            column("left", 0.0, None, target(0, "center")),
            column("center", 1.0 / 3.0, target(0, "left"), target(0, "right")),
            column("right", 2.0 / 3.0, target(0, "center"), None),
        ],
    }]
}

fn engine_with(host: &FakeHost, defs: &[DisplayDef], windows: u32) -> LayoutEngine {
    for i in 1..=windows {
        host.add_window(w(i), Rect::new(10.0 * i as f64, 10.0, 300.0, 300.0));
    }
    let mut engine = LayoutEngine::new(settings());
    engine.init(host, defs, None);
    engine
}

fn region_windows(engine: &LayoutEngine, display: u32, name: &str) -> Vec<WindowId> {
    let rref = crate::layout::region::RegionRef::new(DisplayId::new(display), name);
    engine
        .region(&rref)
        .map(|r| r.windows().iter().map(WrappedWindow::id).collect())
        .unwrap_or_default()
}

/// Every tracked window is owned by exactly one region, the ownership
/// index agrees, and every region's position index inverts its window
/// list.
fn assert_world_consistent(engine: &LayoutEngine) {
    let mut seen = HashSet::new();
    for display in engine.displays() {
        for region in display.regions() {
            for (i, window) in region.windows().iter().enumerate() {
                assert!(seen.insert(window.id()), "{:?} owned twice", window.id());
                assert_eq!(region.position_of(window.id()), Some(i));
                assert_eq!(engine.region_of(window.id()), Some(&region.region_ref()));
            }
        }
    }
    assert_eq!(seen.len(), engine.tracked_window_count());
}

mod region_bookkeeping {
    use super::*;
    use pretty_assertions::assert_eq;

    fn bare_region() -> Region {
        Region::new(
            "main",
            DisplayId::new(1),
            Rect::new(0.0, 0.0, 1000.0, 500.0),
            Orientation::Horizontal,
            true,
            Adjacency::default(),
        )
    }

    #[test]
    fn position_index_inverts_the_window_list() {
        let mut region = bare_region();
        region.add_window_start(WrappedWindow::new(w(1), Rect::default()));
        region.add_window_end(WrappedWindow::new(w(2), Rect::default()));
        region.add_window_before(WrappedWindow::new(w(3), Rect::default()), 1);
        region.add_window_after(WrappedWindow::new(w(4), Rect::default()), 0);

        for (i, window) in region.windows().iter().enumerate() {
            assert_eq!(region.position_of(window.id()), Some(i));
        }

        region.take_window(w(3));
        region.take_window(w(1));
        for (i, window) in region.windows().iter().enumerate() {
            assert_eq!(region.position_of(window.id()), Some(i));
        }
        assert_eq!(region.position_of(w(1)), None);
    }

    #[test]
    fn take_window_on_absent_id_is_none() {
        let mut region = bare_region();
        assert!(region.take_window(w(9)).is_none());
    }

    #[test]
    fn reconcile_is_idempotent() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        host.add_window(w(1), Rect::new(0.0, 0.0, 100.0, 100.0));
        host.add_window(w(2), Rect::new(0.0, 0.0, 100.0, 100.0));

        let mut region = bare_region();
        region.add_window_end(WrappedWindow::new(w(1), Rect::default()));
        region.add_window_end(WrappedWindow::new(w(2), Rect::default()));

        let cfg = settings();
        region.reconcile(&host, &cfg);
        let first = (host.frame_of(w(1)), host.frame_of(w(2)));
        region.reconcile(&host, &cfg);
        let second = (host.frame_of(w(1)), host.frame_of(w(2)));
        assert_eq!(first, second);
    }

    #[test]
    fn reconcile_of_empty_region_is_a_no_op() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut region = bare_region();
        region.reconcile(&host, &settings());
    }

    #[test]
    fn swap_twice_restores_order() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        for i in 1..=3 {
            host.add_window(w(i), Rect::new(0.0, 0.0, 100.0, 100.0));
        }
        let mut region = bare_region();
        for i in 1..=3 {
            region.add_window_end(WrappedWindow::new(w(i), Rect::default()));
        }
        let cfg = settings();
        let before: Vec<_> = region.windows().iter().map(WrappedWindow::id).collect();
        region.swap_with_neighbor(&host, &cfg, 0, 1);
        region.swap_with_neighbor(&host, &cfg, 0, 1);
        let after: Vec<_> = region.windows().iter().map(WrappedWindow::id).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn reconciled_windows_get_margined_slots() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        host.add_window(w(1), Rect::new(0.0, 0.0, 100.0, 100.0));
        host.add_window(w(2), Rect::new(0.0, 0.0, 100.0, 100.0));

        let mut region = bare_region();
        region.add_window_end(WrappedWindow::new(w(1), Rect::default()));
        region.add_window_end(WrappedWindow::new(w(2), Rect::default()));
        region.reconcile(&host, &settings());

        // slot (15, 15, 485, 470) inset by half the margin on every side
        assert_eq!(host.frame_of(w(1)), Some(Rect::new(30.0, 30.0, 455.0, 440.0)));
        assert_eq!(host.frame_of(w(2)), Some(Rect::new(530.0, 30.0, 455.0, 440.0)));
    }
}

mod directional_actions {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn internal_move_swaps_with_the_neighbor() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 3);
        // ceil(3/2) = 2 windows in main, 1 in side
        assert_eq!(region_windows(&engine, 1, "main"), vec![w(1), w(2)]);

        engine.handle_action(&host, Action::Move, w(1), Direction::East);
        assert_eq!(region_windows(&engine, 1, "main"), vec![w(2), w(1)]);
        assert_world_consistent(&engine);
    }

    #[test]
    fn move_without_adjacency_is_a_no_op() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 1);
        let before = engine.snapshot();

        // main has nothing to the west
        engine.handle_action(&host, Action::Move, w(1), Direction::West);
        assert_eq!(engine.snapshot(), before);
        assert_world_consistent(&engine);
    }

    #[test]
    fn action_on_untracked_window_is_a_no_op() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 1);
        let before = engine.snapshot();
        engine.handle_action(&host, Action::Move, w(42), Direction::East);
        assert_eq!(engine.snapshot(), before);
    }

    #[test_log::test]
    fn cross_region_move_conserves_windows() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 3);
        let total = engine.tracked_window_count();

        // w2 sits at the east edge of main, so east crosses into side
        engine.handle_action(&host, Action::Move, w(2), Direction::East);
        assert_eq!(region_windows(&engine, 1, "main"), vec![w(1)]);
        assert_eq!(region_windows(&engine, 1, "side").len(), 2);
        assert_eq!(engine.tracked_window_count(), total);
        assert_world_consistent(&engine);
    }

    #[test]
    fn cross_region_move_into_empty_region_inserts_first() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 1);
        assert!(region_windows(&engine, 1, "side").is_empty());

        engine.handle_action(&host, Action::Move, w(1), Direction::East);
        assert_eq!(region_windows(&engine, 1, "main"), Vec::<WindowId>::new());
        assert_eq!(region_windows(&engine, 1, "side"), vec![w(1)]);
        assert_world_consistent(&engine);
    }

    #[test]
    fn cross_region_swap_trades_slots() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 3);
        assert_eq!(region_windows(&engine, 1, "main"), vec![w(1), w(2)]);
        assert_eq!(region_windows(&engine, 1, "side"), vec![w(3)]);

        engine.handle_action(&host, Action::Swap, w(2), Direction::East);
        assert_eq!(region_windows(&engine, 1, "main"), vec![w(1), w(3)]);
        assert_eq!(region_windows(&engine, 1, "side"), vec![w(2)]);
        assert_world_consistent(&engine);
    }

    #[test]
    fn internal_focus_moves_to_the_neighbor() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 3);
        // main: [w1, w2]
        host.set_focused(Some(w(1)));

        engine.handle_action(&host, Action::Focus, w(1), Direction::East);
        assert_eq!(host.focused_window(), Some(w(2)));
        assert_eq!(engine.focused(), Some(w(2)));
    }

    #[test]
    fn cross_region_focus_lands_on_the_closest_window() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 4);
        // main: [w1, w2], side: [w3, w4] stacked vertically
        assert_eq!(region_windows(&engine, 1, "side"), vec![w(3), w(4)]);
        host.set_focused(Some(w(2)));

        engine.handle_action(&host, Action::Focus, w(2), Direction::East);
        // w2's slot is in the upper half, so the top of the stack is closer
        assert_eq!(host.focused_window(), Some(w(3)));
    }

    #[test]
    fn focus_chains_through_an_empty_region() {
        let host = FakeHost::single_screen(1200.0, 600.0);
        let mut engine = engine_with(&host, &column_defs(), 2);
        // left: [w1], center: [w2], right: []
        engine.handle_action(&host, Action::Move, w(2), Direction::East);
        assert!(region_windows(&engine, 1, "center").is_empty());
        assert_eq!(region_windows(&engine, 1, "right"), vec![w(2)]);

        host.set_focused(Some(w(1)));
        engine.handle_action(&host, Action::Focus, w(1), Direction::East);
        assert_eq!(host.focused_window(), Some(w(2)));
    }

    #[test]
    fn focus_falls_back_to_the_related_direction() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        // main knows nothing to its south; the east neighbor stands in
        let mut engine = engine_with(&host, &split_defs(), 2);
        host.set_focused(Some(w(1)));

        engine.handle_action(&host, Action::Focus, w(1), Direction::South);
        assert_eq!(host.focused_window(), Some(w(2)));
    }

    #[test]
    fn focus_toward_nothing_is_a_no_op() {
        let host = FakeHost::single_screen(1200.0, 600.0);
        let mut engine = engine_with(&host, &column_defs(), 1);
        host.set_focused(Some(w(1)));

        // left's west and its fallback north are both unconfigured
        engine.handle_action(&host, Action::Focus, w(1), Direction::West);
        assert_eq!(host.focused_window(), Some(w(1)));
    }

    #[test]
    fn mouse_follows_focus_warps_the_pointer() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        for i in 1..=2 {
            host.add_window(w(i), Rect::new(10.0 * i as f64, 10.0, 300.0, 300.0));
        }
        let mut engine = LayoutEngine::new(LayoutSettings {
            margin: 30.0,
            mouse_follows_focus: true,
            ..LayoutSettings::default()
        });
        engine.init(&host, &split_defs(), None);
        assert_eq!(host.last_warp(), None);

        engine.handle_action(&host, Action::Focus, w(1), Direction::East);
        let warped = host.last_warp().expect("pointer should have moved");
        let side_slot = engine
            .region(&crate::layout::region::RegionRef::new(DisplayId::new(1), "side"))
            .and_then(|r| r.window(w(2)))
            .map(|win| win.top_left())
            .unwrap();
        assert_eq!(warped, side_slot);
    }
}

mod drag_resolution {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test_log::test]
    fn drop_into_an_empty_region_makes_it_the_sole_member() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 1);
        assert_eq!(region_windows(&engine, 1, "main"), vec![w(1)]);

        engine.complete_drag(&host, w(1), Point::new(750.0, 250.0));
        assert_eq!(region_windows(&engine, 1, "main"), Vec::<WindowId>::new());
        assert_eq!(region_windows(&engine, 1, "side"), vec![w(1)]);
        assert_world_consistent(&engine);
    }

    #[test]
    fn drop_onto_a_slot_inserts_beside_it() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 4);
        // side: [w3, w4] stacked vertically
        let side = crate::layout::region::RegionRef::new(DisplayId::new(1), "side");
        let slots = engine.region(&side).unwrap().sub_regions(30.0);

        // drop w1 onto the lower half of w4's slot: it lands after w4
        let below = Point::new(slots[1].mid().x, slots[1].mid().y + 10.0);
        engine.complete_drag(&host, w(1), below);
        assert_eq!(region_windows(&engine, 1, "side"), vec![w(3), w(4), w(1)]);
        assert_world_consistent(&engine);
    }

    #[test]
    fn drop_on_a_boundary_hits_nothing() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let engine = engine_with(&host, &split_defs(), 2);
        let main = crate::layout::region::RegionRef::new(DisplayId::new(1), "main");
        let slots = engine.region(&main).unwrap().sub_regions(30.0);

        // exactly on the top edge of the first slot
        let boundary = Point::new(slots[0].mid().x, slots[0].min().y);
        assert_eq!(engine.find_region_position(boundary), None);
    }

    #[test]
    fn drop_outside_every_region_snaps_back() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 2);
        let before = engine.snapshot();

        engine.complete_drag(&host, w(1), Point::new(-50.0, -50.0));
        assert_eq!(engine.snapshot(), before);
        assert_world_consistent(&engine);
    }

    #[test]
    fn reorder_within_a_region_by_dropping_on_a_slot() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 6);
        // main: [w1, w2, w3], side: [w4, w5, w6]
        assert_eq!(region_windows(&engine, 1, "main"), vec![w(1), w(2), w(3)]);
        let main = crate::layout::region::RegionRef::new(DisplayId::new(1), "main");
        let slots = engine.region(&main).unwrap().sub_regions(30.0);

        // drop w1 onto the right half of the last slot
        let point = Point::new(slots[2].mid().x + 10.0, slots[2].mid().y);
        engine.complete_drag(&host, w(1), point);
        assert_eq!(region_windows(&engine, 1, "main"), vec![w(2), w(3), w(1)]);
        assert_world_consistent(&engine);
    }
}

mod orchestration {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn distribute_windows_front_loads_the_remainder() {
        let groups = distribute_windows((1..=7).collect::<Vec<_>>(), 3);
        assert_eq!(groups, vec![vec![1, 2, 3], vec![4, 5], vec![6, 7]]);

        let exact = distribute_windows((1..=6).collect::<Vec<_>>(), 3);
        assert_eq!(exact, vec![vec![1, 2], vec![3, 4], vec![5, 6]]);

        let sparse = distribute_windows(vec![1], 3);
        assert_eq!(sparse, vec![vec![1], vec![], vec![]]);

        assert_eq!(distribute_windows(Vec::<u32>::new(), 0), Vec::<Vec<u32>>::new());
    }

    #[test]
    fn init_spreads_windows_across_regions_in_order() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let engine = engine_with(&host, &split_defs(), 5);
        assert_eq!(region_windows(&engine, 1, "main"), vec![w(1), w(2), w(3)]);
        assert_eq!(region_windows(&engine, 1, "side"), vec![w(4), w(5)]);
        assert_world_consistent(&engine);
    }

    #[test]
    fn unconfigured_display_gets_one_default_region() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let engine = engine_with(&host, &[], 2);
        assert_eq!(region_windows(&engine, 1, "main"), vec![w(1), w(2)]);
        assert_world_consistent(&engine);
    }

    #[test]
    fn windows_split_across_displays_by_position() {
        let host = FakeHost::dual_screen(1000.0, 500.0);
        host.add_window(w(1), Rect::new(100.0, 10.0, 300.0, 300.0));
        host.add_window(w(2), Rect::new(1100.0, 10.0, 300.0, 300.0));
        let mut engine = LayoutEngine::new(settings());
        engine.init(&host, &[], None);

        assert_eq!(region_windows(&engine, 1, "main"), vec![w(1)]);
        assert_eq!(region_windows(&engine, 2, "main"), vec![w(2)]);
        assert_world_consistent(&engine);
    }

    #[test]
    fn opened_windows_join_the_default_region() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 1);

        host.add_window(w(9), Rect::new(20.0, 20.0, 200.0, 200.0));
        let info = host.windows().into_iter().find(|i| i.id == w(9)).unwrap();
        engine.window_opened(&host, info);
        assert_eq!(region_windows(&engine, 1, "main"), vec![w(1), w(9)]);
        assert_world_consistent(&engine);
    }

    #[test]
    fn closing_a_window_releases_its_slot() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 3);
        host.close_window(w(1));
        engine.window_closed(&host, w(1));

        assert_eq!(region_windows(&engine, 1, "main"), vec![w(2)]);
        assert_eq!(engine.region_of(w(1)), None);
        assert_world_consistent(&engine);

        // the survivor now owns the whole region width
        let full = host.frame_of(w(2)).unwrap();
        assert!(full.size.width > 400.0);
    }

    #[test]
    fn find_window_is_falsy_for_untracked_ids() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let engine = engine_with(&host, &split_defs(), 1);
        assert!(engine.find_window(w(1)).is_some());
        assert!(engine.find_window(w(77)).is_none());
    }

    #[test]
    fn focus_growth_follows_host_focus_changes() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 2);

        host.set_focused(Some(w(1)));
        engine.window_focused(&host, w(1));
        let (_, first) = engine.find_window(w(1)).unwrap();
        assert_eq!(host.frame_of(w(1)), Some(first.with_fat(30.0)));

        host.set_focused(Some(w(2)));
        engine.window_focused(&host, w(2));
        let (_, first) = engine.find_window(w(1)).unwrap();
        let (_, second) = engine.find_window(w(2)).unwrap();
        assert_eq!(host.frame_of(w(1)), Some(first.with_margin(30.0)));
        assert_eq!(host.frame_of(w(2)), Some(second.with_fat(30.0)));
    }
}

mod snapshots {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn snapshot_restores_membership() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 4);
        engine.handle_action(&host, Action::Move, w(2), Direction::East);
        let saved = engine.snapshot();

        let mut fresh = LayoutEngine::new(settings());
        fresh.init(&host, &split_defs(), Some(saved.clone()));
        assert_eq!(fresh.snapshot(), saved);
        assert_world_consistent(&fresh);
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let engine = engine_with(&host, &split_defs(), 3);
        let saved = engine.snapshot();
        let blob = serde_json::to_string(&saved).unwrap();
        let parsed: crate::layout::engine::LayoutSnapshot = serde_json::from_str(&blob).unwrap();
        assert_eq!(parsed, saved);
    }

    #[test]
    fn restore_filters_windows_that_no_longer_exist() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 4);
        let saved = engine.snapshot();

        host.close_window(w(2));
        engine.init(&host, &split_defs(), Some(saved));
        assert_eq!(engine.region_of(w(2)), None);
        assert_eq!(engine.tracked_window_count(), 3);
        assert_world_consistent(&engine);
    }

    #[test]
    fn restore_places_unknown_windows_in_the_default_region() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 2);
        let saved = engine.snapshot();

        host.add_window(w(10), Rect::new(40.0, 40.0, 200.0, 200.0));
        engine.init(&host, &split_defs(), Some(saved));
        assert_eq!(engine.region_of(w(10)).map(|r| r.region.as_str()), Some("main"));
        assert_world_consistent(&engine);
    }

    #[test]
    fn unknown_snapshot_versions_are_discarded() {
        let host = FakeHost::single_screen(1000.0, 500.0);
        let mut engine = engine_with(&host, &split_defs(), 2);
        let mut saved = engine.snapshot();
        saved.version = 99;
        // membership falls back to the default region instead of the
        // snapshot's placement
        engine.init(&host, &split_defs(), Some(saved));
        assert_eq!(engine.tracked_window_count(), 2);
        assert_world_consistent(&engine);
    }
}
