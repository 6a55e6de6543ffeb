//! The single place where host events and key-bound commands become layout
//! mutations. Events are processed one at a time, each handler running to
//! completion before the next is looked at, so the layout state never sees
//! a partial mutation. The one piece of asynchrony is the drag debounce
//! timer, which re-enters the loop as an ordinary event.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::actor::drag::DragDebouncer;
use crate::actor::{Receiver, Sender};
use crate::common::config::Config;
use crate::layout::engine::{LayoutEngine, LayoutSnapshot};
use crate::layout::grid::{Action, Direction};
use crate::sys::geometry::Point;
use crate::sys::host::{Host, WindowId, WindowInfo};
use crate::sys::storage::Storage;

const LAST_LAYOUT_KEY: &str = "layout/last";
const DEFAULT_LAYOUT_KEY: &str = "layout/default";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WmCommand {
    Move(Direction),
    Focus(Direction),
    Swap(Direction),
    SaveLayout,
    SaveDefaultLayout,
    RestoreLayout,
    Redistribute,
}

impl FromStr for WmCommand {
    type Err = anyhow::Error;

    /// Parses the `[keys]` table spelling: an action word, optionally
    /// followed by `_<direction>` (`focus_west`, `swap_north`,
    /// `save_layout`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "save_layout" => return Ok(WmCommand::SaveLayout),
            "save_default_layout" => return Ok(WmCommand::SaveDefaultLayout),
            "restore_layout" => return Ok(WmCommand::RestoreLayout),
            "redistribute" => return Ok(WmCommand::Redistribute),
            _ => {}
        }
        let (action, direction) = s
            .split_once('_')
            .ok_or_else(|| anyhow::anyhow!("unknown command '{s}'"))?;
        let direction = Direction::from_str(direction)
            .map_err(|_| anyhow::anyhow!("unknown direction in command '{s}'"))?;
        match Action::from_str(action) {
            Ok(Action::Move) => Ok(WmCommand::Move(direction)),
            Ok(Action::Focus) => Ok(WmCommand::Focus(direction)),
            Ok(Action::Swap) => Ok(WmCommand::Swap(direction)),
            Err(_) => Err(anyhow::anyhow!("unknown command '{s}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    WindowOpened(WindowInfo),
    WindowClosed(WindowId),
    WindowFocused(WindowId),
    /// One pointer sample of an in-progress window drag.
    DragSample { window: WindowId, point: Point },
    /// The debounce timer for the given generation elapsed.
    DragSettled { generation: u64 },
    Command(WmCommand),
    /// Display configuration changed; the whole graph is rebuilt, keeping
    /// current region membership.
    ScreensChanged,
}

pub struct Reactor<H, S> {
    engine: LayoutEngine,
    host: H,
    storage: S,
    config: Config,
    drag: DragDebouncer,
    drag_window: Option<WindowId>,
    dragging: bool,
    events_tx: Sender<Event>,
}

impl<H: Host, S: Storage> Reactor<H, S> {
    pub fn new(host: H, storage: S, config: Config, events_tx: Sender<Event>) -> Self {
        let quiet = Duration::from_millis(config.settings.drag_settle_ms);
        let mut reactor = Reactor {
            engine: LayoutEngine::new(config.settings.clone()),
            host,
            storage,
            drag: DragDebouncer::new(quiet),
            drag_window: None,
            dragging: false,
            events_tx,
            config,
        };
        for (command, hotkey) in reactor.config.keybindings() {
            if !reactor.host.register_hotkey(&hotkey) {
                warn!(%hotkey, ?command, "host refused hotkey registration");
            }
        }
        let snapshot = if reactor.config.settings.auto_restore {
            reactor.load_snapshot(DEFAULT_LAYOUT_KEY).or_else(|| reactor.load_snapshot(LAST_LAYOUT_KEY))
        } else {
            None
        };
        reactor.engine.init(&reactor.host, &reactor.config.displays, snapshot);
        reactor
    }

    pub fn engine(&self) -> &LayoutEngine { &self.engine }

    pub fn is_dragging(&self) -> bool { self.dragging }

    pub async fn run(mut self, mut events: Receiver<Event>) {
        while let Some((span, event)) = events.recv().await {
            let _guard = span.enter();
            self.handle_event(event);
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        debug!(?event, "reactor event");
        match event {
            Event::WindowOpened(info) => self.engine.window_opened(&self.host, info),
            Event::WindowClosed(id) => self.engine.window_closed(&self.host, id),
            Event::WindowFocused(id) => self.engine.window_focused(&self.host, id),
            Event::DragSample { window, point } => self.on_drag_sample(window, point),
            Event::DragSettled { generation } => self.on_drag_settled(generation),
            Event::Command(command) => self.handle_command(command),
            Event::ScreensChanged => {
                let snapshot = self.engine.snapshot();
                self.engine.init(&self.host, &self.config.displays, Some(snapshot));
            }
        }
    }

    fn on_drag_sample(&mut self, window: WindowId, point: Point) {
        let sample = self.drag.on_sample(point);
        if sample.burst_started {
            self.on_drag_started(window);
        }
        self.drag_window = Some(window);
        let tx = self.events_tx.clone();
        // Outside a runtime (tests) the caller drives DragSettled itself.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                tokio::time::sleep(sample.quiet).await;
                tx.send(Event::DragSettled { generation: sample.generation });
            });
        }
    }

    /// Fires on the first sample of every burst, before any debouncing.
    fn on_drag_started(&mut self, window: WindowId) {
        debug!(?window, "drag started");
        self.dragging = true;
    }

    fn on_drag_settled(&mut self, generation: u64) {
        let Some(point) = self.drag.settle(generation) else { return };
        self.dragging = false;
        if let Some(window) = self.drag_window.take() {
            self.engine.complete_drag(&self.host, window, point);
        }
    }

    fn handle_command(&mut self, command: WmCommand) {
        match command {
            WmCommand::Move(direction) => self.directional(Action::Move, direction),
            WmCommand::Focus(direction) => self.directional(Action::Focus, direction),
            WmCommand::Swap(direction) => self.directional(Action::Swap, direction),
            WmCommand::SaveLayout => self.save_snapshot(LAST_LAYOUT_KEY),
            WmCommand::SaveDefaultLayout => self.save_snapshot(DEFAULT_LAYOUT_KEY),
            WmCommand::RestoreLayout => {
                let snapshot = self
                    .load_snapshot(LAST_LAYOUT_KEY)
                    .or_else(|| self.load_snapshot(DEFAULT_LAYOUT_KEY));
                if snapshot.is_some() {
                    self.engine.init(&self.host, &self.config.displays, snapshot);
                } else {
                    warn!("no saved layout to restore");
                }
            }
            WmCommand::Redistribute => {
                self.engine.init(&self.host, &self.config.displays, None)
            }
        }
    }

    /// Directional commands act on the window the host says is focused,
    /// falling back to our own notion when the host has none.
    fn directional(&mut self, action: Action, direction: Direction) {
        let Some(window) = self.host.focused_window().or(self.engine.focused()) else {
            debug!("directional command with nothing focused");
            return;
        };
        self.engine.handle_action(&self.host, action, window, direction);
    }

    fn save_snapshot(&mut self, key: &str) {
        let snapshot = self.engine.snapshot();
        match serde_json::to_string(&snapshot) {
            Ok(blob) => match self.storage.set(key, &blob) {
                Ok(()) => info!(key, "layout saved"),
                Err(err) => warn!(key, %err, "failed to persist layout"),
            },
            Err(err) => warn!(%err, "failed to serialize layout"),
        }
    }

    fn load_snapshot(&self, key: &str) -> Option<LayoutSnapshot> {
        let blob = match self.storage.get(key) {
            Ok(blob) => blob?,
            Err(err) => {
                warn!(key, %err, "failed to read saved layout");
                return None;
            }
        };
        match serde_json::from_str(&blob) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                warn!(key, %err, "saved layout is unreadable, ignoring it");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::actor;
    use crate::common::config::{Config, LayoutSettings};
    use crate::sys::geometry::Rect;
    use crate::sys::testing::{FakeHost, MemoryStore};

    fn reactor_with(windows: &[(u32, Rect)]) -> Reactor<FakeHost, MemoryStore> {
        let host = FakeHost::single_screen(1000.0, 500.0);
        for (id, frame) in windows {
            host.add_window(WindowId::new(*id), *frame);
        }
        let mut config = Config {
            settings: LayoutSettings { margin: 30.0, ..LayoutSettings::default() },
            ..Config::default()
        };
        config.keys.insert("focus_west".into(), "alt+h".into());
        let (tx, _rx) = actor::channel();
        Reactor::new(host, MemoryStore::default(), config, tx)
    }

    #[test]
    fn commands_parse_from_key_names() {
        assert_eq!(
            "focus_west".parse::<WmCommand>().unwrap(),
            WmCommand::Focus(Direction::West)
        );
        assert_eq!("move_north".parse::<WmCommand>().unwrap(), WmCommand::Move(Direction::North));
        assert_eq!("swap_east".parse::<WmCommand>().unwrap(), WmCommand::Swap(Direction::East));
        assert_eq!("save_layout".parse::<WmCommand>().unwrap(), WmCommand::SaveLayout);
        assert!("focus_everywhere".parse::<WmCommand>().is_err());
        assert!("juggle_west".parse::<WmCommand>().is_err());
        assert!("focus".parse::<WmCommand>().is_err());
    }

    #[test]
    fn keybindings_are_registered_with_the_host() {
        let reactor = reactor_with(&[]);
        let expected: crate::sys::hotkey::Hotkey = "alt+h".parse().unwrap();
        assert_eq!(reactor.host.registered_hotkeys(), vec![expected]);
    }

    #[test]
    fn drag_sets_the_flag_on_the_first_sample_only() {
        let mut reactor = reactor_with(&[(1, Rect::new(0.0, 0.0, 400.0, 400.0))]);
        assert!(!reactor.is_dragging());

        reactor.handle_event(Event::DragSample {
            window: WindowId::new(1),
            point: Point::new(100.0, 100.0),
        });
        assert!(reactor.is_dragging());

        reactor.handle_event(Event::DragSample {
            window: WindowId::new(1),
            point: Point::new(120.0, 100.0),
        });
        assert!(reactor.is_dragging());
    }

    #[test]
    fn stale_settle_does_not_finish_the_drag() {
        let mut reactor = reactor_with(&[(1, Rect::new(0.0, 0.0, 400.0, 400.0))]);
        reactor.handle_event(Event::DragSample {
            window: WindowId::new(1),
            point: Point::new(100.0, 100.0),
        });
        reactor.handle_event(Event::DragSample {
            window: WindowId::new(1),
            point: Point::new(200.0, 100.0),
        });

        // generation 1 was superseded by the second sample
        reactor.handle_event(Event::DragSettled { generation: 1 });
        assert!(reactor.is_dragging());

        reactor.handle_event(Event::DragSettled { generation: 2 });
        assert!(!reactor.is_dragging());
    }

    #[test]
    fn open_and_close_keep_the_engine_consistent() {
        let mut reactor = reactor_with(&[(1, Rect::new(0.0, 0.0, 400.0, 400.0))]);
        assert_eq!(reactor.engine().tracked_window_count(), 1);

        let info = WindowInfo {
            id: WindowId::new(2),
            title: "editor".into(),
            app: "editor".into(),
            frame: Rect::new(500.0, 0.0, 400.0, 400.0),
        };
        reactor.handle_event(Event::WindowOpened(info));
        assert_eq!(reactor.engine().tracked_window_count(), 2);

        reactor.handle_event(Event::WindowClosed(WindowId::new(2)));
        assert_eq!(reactor.engine().tracked_window_count(), 1);
    }

    #[test]
    fn save_then_restore_round_trips_through_storage() {
        let mut reactor = reactor_with(&[
            (1, Rect::new(0.0, 0.0, 400.0, 400.0)),
            (2, Rect::new(500.0, 0.0, 400.0, 400.0)),
        ]);
        reactor.handle_event(Event::Command(WmCommand::SaveLayout));
        let before = reactor.engine().snapshot();

        reactor.handle_event(Event::Command(WmCommand::RestoreLayout));
        assert_eq!(reactor.engine().snapshot(), before);
    }

    #[test]
    fn screens_changed_preserves_membership() {
        let mut reactor = reactor_with(&[
            (1, Rect::new(0.0, 0.0, 400.0, 400.0)),
            (2, Rect::new(500.0, 0.0, 400.0, 400.0)),
        ]);
        let before = reactor.engine().snapshot();
        reactor.handle_event(Event::ScreensChanged);
        assert_eq!(reactor.engine().snapshot(), before);
    }
}
