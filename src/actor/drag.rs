//! Coalescing of pointer-drag bursts. Hosts deliver a stream of move
//! samples while the user drags a window; acting on each one would thrash
//! the layout, so the actual region reassignment runs only after a quiet
//! period. The timer itself lives in the reactor; this type owns the
//! bookkeeping that makes cancel-and-reschedule correct.

use std::time::Duration;

use crate::sys::geometry::Point;

/// What the reactor should do with a freshly recorded sample.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sample {
    /// Token to hand back via [`DragDebouncer::settle`] when the quiet
    /// period for this sample elapses. Superseded by any newer sample.
    pub generation: u64,
    pub quiet: Duration,
    /// True exactly once per burst, on its first sample. The reactor's
    /// burst-start side effect (raising the dragging flag) hangs off this.
    pub burst_started: bool,
}

#[derive(Debug)]
pub struct DragDebouncer {
    quiet: Duration,
    generation: u64,
    pending: Option<Point>,
}

impl DragDebouncer {
    pub fn new(quiet: Duration) -> Self {
        DragDebouncer { quiet, generation: 0, pending: None }
    }

    pub fn quiet_period(&self) -> Duration { self.quiet }

    pub fn is_active(&self) -> bool { self.pending.is_some() }

    /// Records a sample, invalidating any timer armed for an earlier one.
    pub fn on_sample(&mut self, point: Point) -> Sample {
        let burst_started = self.pending.is_none();
        self.generation += 1;
        self.pending = Some(point);
        Sample { generation: self.generation, quiet: self.quiet, burst_started }
    }

    /// A timer for `generation` fired. Yields the coalesced point when the
    /// generation is still current; a stale timer yields nothing and the
    /// burst stays open for its newer timer. At most one settle per burst.
    pub fn settle(&mut self, generation: u64) -> Option<Point> {
        if generation != self.generation {
            return None;
        }
        self.pending.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn debouncer() -> DragDebouncer { DragDebouncer::new(Duration::from_millis(250)) }

    #[test]
    fn first_sample_opens_the_burst() {
        let mut drag = debouncer();
        let first = drag.on_sample(Point::new(1.0, 1.0));
        assert!(first.burst_started);
        assert!(drag.is_active());

        let second = drag.on_sample(Point::new(2.0, 2.0));
        assert!(!second.burst_started);
        assert!(second.generation > first.generation);
    }

    #[test]
    fn stale_timers_are_ignored() {
        let mut drag = debouncer();
        let first = drag.on_sample(Point::new(1.0, 1.0));
        let second = drag.on_sample(Point::new(5.0, 5.0));

        assert_eq!(drag.settle(first.generation), None);
        assert!(drag.is_active());
        assert_eq!(drag.settle(second.generation), Some(Point::new(5.0, 5.0)));
        assert!(!drag.is_active());
    }

    #[test]
    fn settles_at_most_once_per_burst() {
        let mut drag = debouncer();
        let sample = drag.on_sample(Point::new(3.0, 4.0));
        assert_eq!(drag.settle(sample.generation), Some(Point::new(3.0, 4.0)));
        assert_eq!(drag.settle(sample.generation), None);
    }

    #[test]
    fn a_new_burst_starts_after_settling() {
        let mut drag = debouncer();
        let a = drag.on_sample(Point::new(0.0, 0.0));
        drag.settle(a.generation);

        let b = drag.on_sample(Point::new(9.0, 9.0));
        assert!(b.burst_started);
        assert_eq!(drag.settle(b.generation), Some(Point::new(9.0, 9.0)));
    }

    #[test]
    fn latest_point_wins() {
        let mut drag = debouncer();
        for i in 0..10 {
            drag.on_sample(Point::new(i as f64, 0.0));
        }
        let last = drag.on_sample(Point::new(99.0, 0.0));
        assert_eq!(drag.settle(last.generation), Some(Point::new(99.0, 0.0)));
    }
}
