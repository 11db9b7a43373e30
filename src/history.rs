use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// Source of "now" for the debounce window.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    Appended,
    Replaced,
}

/// Linear snapshot history; every commit stores a complete new value.
#[derive(Debug, Clone)]
pub struct HistoryBuffer<T> {
    entries: Vec<T>,
    cursor: usize,
    last_commit: Instant,
    debounce: Duration,
    capacity: usize,
}

impl<T: Clone> HistoryBuffer<T> {
    pub fn with_settings(initial: T, debounce: Duration, capacity: usize, now: Instant) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            last_commit: now,
            debounce,
            capacity: capacity.max(1),
        }
    }

    pub fn current(&self) -> &T {
        &self.entries[self.cursor]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A forced commit after a quiet period of at least the debounce window
    /// opens a new undo step; anything else overwrites the entry under the
    /// cursor, so a burst of edits collapses into one step.
    pub fn commit_at<F>(&mut self, now: Instant, producer: F, force_new_entry: bool) -> CommitKind
    where
        F: FnOnce(&T) -> T,
    {
        let next = producer(self.current());
        let quiet = now.saturating_duration_since(self.last_commit) >= self.debounce;
        // Entries past the cursor belong to an abandoned branch either way.
        self.entries.truncate(self.cursor + 1);
        if force_new_entry && quiet {
            self.push(next, now);
            CommitKind::Appended
        } else {
            self.entries[self.cursor] = next;
            CommitKind::Replaced
        }
    }

    /// Opens a new undo step regardless of the debounce window.
    pub fn append_at<F>(&mut self, now: Instant, producer: F) -> CommitKind
    where
        F: FnOnce(&T) -> T,
    {
        let next = producer(self.current());
        self.entries.truncate(self.cursor + 1);
        self.push(next, now);
        CommitKind::Appended
    }

    fn push(&mut self, next: T, now: Instant) {
        self.entries.push(next);
        if self.entries.len() > self.capacity {
            let overflow = self.entries.len() - self.capacity;
            self.entries.drain(0..overflow);
        }
        self.cursor = self.entries.len() - 1;
        self.last_commit = now;
    }

    pub fn can_go_back(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_go_forward(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    pub fn go_back(&mut self) -> &T {
        if self.can_go_back() {
            self.cursor -= 1;
        }
        self.current()
    }

    pub fn go_forward(&mut self) -> &T {
        if self.can_go_forward() {
            self.cursor += 1;
        }
        self.current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(5);

    fn buffer(clock: &ManualClock) -> HistoryBuffer<i32> {
        HistoryBuffer::with_settings(0, WINDOW, 50, clock.now())
    }

    #[test]
    fn burst_inside_window_yields_one_entry() {
        let clock = ManualClock::new();
        let mut history = buffer(&clock);
        clock.advance(Duration::from_secs(6));
        for _ in 0..5 {
            history.commit_at(clock.now(), |n| n + 1, true);
            clock.advance(Duration::from_millis(500));
        }
        assert_eq!(history.len(), 2);
        assert_eq!(*history.current(), 5);
        assert_eq!(*history.go_back(), 0);
    }

    #[test]
    fn commits_separated_by_quiet_period_yield_separate_entries() {
        let clock = ManualClock::new();
        let mut history = buffer(&clock);
        clock.advance(Duration::from_secs(6));
        history.commit_at(clock.now(), |n| n + 1, true);
        clock.advance(Duration::from_secs(6));
        history.commit_at(clock.now(), |n| n + 1, true);
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);
    }

    #[test]
    fn first_window_after_creation_coalesces_into_initial_entry() {
        let clock = ManualClock::new();
        let mut history = buffer(&clock);
        let kind = history.commit_at(clock.now(), |_| 7, true);
        assert_eq!(kind, CommitKind::Replaced);
        assert_eq!(history.len(), 1);
        assert!(!history.can_go_back());
    }

    #[test]
    fn unforced_commit_never_opens_a_step() {
        let clock = ManualClock::new();
        let mut history = buffer(&clock);
        clock.advance(Duration::from_secs(60));
        assert_eq!(
            history.commit_at(clock.now(), |_| 3, false),
            CommitKind::Replaced
        );
        assert_eq!(history.len(), 1);
        // The quiet period was not consumed by the unforced commit.
        assert_eq!(
            history.commit_at(clock.now(), |n| n + 1, true),
            CommitKind::Appended
        );
        assert_eq!(*history.current(), 4);
    }

    #[test]
    fn zero_window_disables_coalescing() {
        let clock = ManualClock::new();
        let mut history = HistoryBuffer::with_settings(0, Duration::ZERO, 50, clock.now());
        for _ in 0..3 {
            history.commit_at(clock.now(), |n| n + 1, true);
        }
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn undo_redo_round_trip() {
        let clock = ManualClock::new();
        let mut history = buffer(&clock);
        clock.advance(WINDOW);
        history.commit_at(clock.now(), |n| n + 10, true);
        let committed = *history.current();
        history.go_back();
        assert_eq!(*history.go_forward(), committed);
    }

    #[test]
    fn navigation_at_boundaries_is_a_no_op() {
        let clock = ManualClock::new();
        let mut history = buffer(&clock);
        assert!(!history.can_go_back());
        assert_eq!(*history.go_back(), 0);
        assert!(!history.can_go_back());
        assert!(!history.can_go_forward());
        assert_eq!(*history.go_forward(), 0);
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn commit_after_undo_discards_redo_branch() {
        let clock = ManualClock::new();
        let mut history = buffer(&clock);
        for step in 1..=3 {
            clock.advance(WINDOW);
            history.commit_at(clock.now(), move |_| step, true);
        }
        history.go_back();
        history.go_back();
        assert!(history.can_go_forward());
        clock.advance(WINDOW);
        history.commit_at(clock.now(), |_| 42, true);
        assert!(!history.can_go_forward());
        assert_eq!(history.len(), 3);
        assert_eq!(*history.current(), 42);
    }

    #[test]
    fn capacity_drops_oldest_entries() {
        let clock = ManualClock::new();
        let mut history = HistoryBuffer::with_settings(0, WINDOW, 3, clock.now());
        for step in 1..=5 {
            clock.advance(WINDOW);
            history.commit_at(clock.now(), move |_| step, true);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);
        assert_eq!(*history.current(), 5);
        assert_eq!(*history.go_back(), 4);
        assert_eq!(*history.go_back(), 3);
        assert!(!history.can_go_back());
    }

    #[test]
    fn append_ignores_the_window_and_restarts_it() {
        let clock = ManualClock::new();
        let mut history = buffer(&clock);
        assert_eq!(history.append_at(clock.now(), |_| 1), CommitKind::Appended);
        assert_eq!(history.len(), 2);
        assert_eq!(
            history.commit_at(clock.now(), |n| n + 1, true),
            CommitKind::Replaced
        );
        assert_eq!(*history.current(), 2);
        assert_eq!(*history.go_back(), 0);
    }

    #[test]
    fn capacity_is_at_least_one() {
        let clock = ManualClock::new();
        let mut history = HistoryBuffer::with_settings(0, Duration::ZERO, 0, clock.now());
        history.commit_at(clock.now(), |_| 1, true);
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
        assert_eq!(*history.current(), 1);
    }
}
