//! Refresh state machine.
//!
//! ```text
//!             request_refresh              timer fires
//!   Idle ─────────────────────> Debouncing ───────────> Scanning
//!    ^  └──────────── request_refresh_immediate ────────────┘ │
//!    └──────────────────── scan_finished ─────────────────────┘
//! ```
//!
//! Requests made while `Scanning` only set `pending_refresh`; the finished
//! scan then arms a single short follow-up timer. `paused` overrides
//! everything: requests are ignored until it is cleared.
//!
//! The machine does no IO. Each transition returns a [`RefreshAction`] for the
//! coordinator to carry out. Timers carry the generation they were armed with
//! so a superseded timer cannot start a scan.

use std::time::Duration;

use lintlens_config::RefreshSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Debouncing,
    Scanning,
}

/// Delays used by the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTimings {
    pub debounce: Duration,
    pub follow_up_delay: Duration,
}

impl Default for RefreshTimings {
    fn default() -> Self {
        Self::from(&RefreshSettings::default())
    }
}

impl From<&RefreshSettings> for RefreshTimings {
    fn from(settings: &RefreshSettings) -> Self {
        Self {
            debounce: settings.debounce(),
            follow_up_delay: settings.follow_up_delay(),
        }
    }
}

/// What the coordinator must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshAction {
    /// Nothing changed.
    None,
    /// A scan is running; the request was folded into `pending_refresh`.
    Queued,
    /// Replace any armed timer with one that fires after `delay`.
    ArmTimer { generation: u64, delay: Duration },
    /// Cancel any armed timer and start a scan now.
    StartScan,
    /// Pause took effect: cancel the timer, empty the display, clear the badge.
    Paused,
}

/// How a finished scan should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanCompletion {
    /// False when the scan was running at pause time.
    pub publish: bool,
    pub next: RefreshAction,
}

#[derive(Debug, Clone)]
pub struct ScanState {
    phase: Phase,
    paused: bool,
    pending_refresh: bool,
    /// Set when pause lands mid-scan; that scan's result is dropped.
    discard_in_flight: bool,
    generation: u64,
    timings: RefreshTimings,
    navigation_index: Option<usize>,
    flat_len: usize,
}

impl ScanState {
    #[must_use]
    pub fn new(timings: RefreshTimings) -> Self {
        Self {
            phase: Phase::Idle,
            paused: false,
            pending_refresh: false,
            discard_in_flight: false,
            generation: 0,
            timings,
            navigation_index: None,
            flat_len: 0,
        }
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[cfg(test)]
    fn is_refreshing(&self) -> bool {
        self.phase == Phase::Scanning
    }

    #[cfg(test)]
    fn pending_refresh(&self) -> bool {
        self.pending_refresh
    }

    pub fn set_timings(&mut self, timings: RefreshTimings) {
        self.timings = timings;
    }

    fn arm(&mut self, delay: Duration) -> RefreshAction {
        self.generation += 1;
        self.phase = Phase::Debouncing;
        RefreshAction::ArmTimer {
            generation: self.generation,
            delay,
        }
    }

    fn start(&mut self) -> RefreshAction {
        self.generation += 1;
        self.phase = Phase::Scanning;
        RefreshAction::StartScan
    }

    /// Debounced refresh: (re)start the quiet window.
    pub fn request_refresh(&mut self) -> RefreshAction {
        if self.paused {
            return RefreshAction::None;
        }
        match self.phase {
            Phase::Idle | Phase::Debouncing => self.arm(self.timings.debounce),
            Phase::Scanning => {
                self.pending_refresh = true;
                RefreshAction::Queued
            }
        }
    }

    /// Explicit refresh: skip the quiet window.
    pub fn request_refresh_immediate(&mut self) -> RefreshAction {
        if self.paused {
            return RefreshAction::None;
        }
        match self.phase {
            Phase::Idle | Phase::Debouncing => self.start(),
            Phase::Scanning => {
                self.pending_refresh = true;
                RefreshAction::Queued
            }
        }
    }

    /// A timer armed with `generation` fired.
    pub fn timer_elapsed(&mut self, generation: u64) -> RefreshAction {
        if self.paused || self.phase != Phase::Debouncing || generation != self.generation {
            return RefreshAction::None;
        }
        self.start()
    }

    /// The running scan completed, successfully or not.
    pub fn scan_finished(&mut self) -> ScanCompletion {
        let publish = !self.discard_in_flight && !self.paused;
        self.discard_in_flight = false;
        self.phase = Phase::Idle;

        let next = if self.paused {
            self.pending_refresh = false;
            RefreshAction::None
        } else if self.pending_refresh {
            self.pending_refresh = false;
            self.arm(self.timings.follow_up_delay)
        } else {
            RefreshAction::None
        };
        ScanCompletion { publish, next }
    }

    pub fn set_paused(&mut self, paused: bool) -> RefreshAction {
        if paused == self.paused {
            return RefreshAction::None;
        }
        self.paused = paused;

        if paused {
            self.pending_refresh = false;
            self.navigation_index = None;
            self.flat_len = 0;
            match self.phase {
                Phase::Debouncing => {
                    self.generation += 1;
                    self.phase = Phase::Idle;
                }
                Phase::Scanning => self.discard_in_flight = true,
                Phase::Idle => {}
            }
            return RefreshAction::Paused;
        }

        match self.phase {
            // The paused-era scan is still running; run once more after it.
            Phase::Scanning => {
                self.pending_refresh = true;
                RefreshAction::Queued
            }
            Phase::Idle | Phase::Debouncing => self.start(),
        }
    }

    #[must_use]
    pub fn navigation_index(&self) -> Option<usize> {
        self.navigation_index
    }

    /// A new flat list was published. The cursor survives if still in range.
    pub fn set_flat_len(&mut self, len: usize) {
        self.flat_len = len;
        if self.navigation_index.is_some_and(|i| i >= len) {
            self.navigation_index = None;
        }
    }

    /// Same list, different order: the cursor no longer means anything.
    pub fn reset_navigation(&mut self, len: usize) {
        self.flat_len = len;
        self.navigation_index = None;
    }

    /// Advance with wrap-around; the first call selects the first entry.
    pub fn navigate_next(&mut self) -> Option<usize> {
        if self.flat_len == 0 {
            return None;
        }
        let next = match self.navigation_index {
            Some(i) => (i + 1) % self.flat_len,
            None => 0,
        };
        self.navigation_index = Some(next);
        Some(next)
    }

    /// Step back with wrap-around; the first call selects the last entry.
    pub fn navigate_previous(&mut self) -> Option<usize> {
        if self.flat_len == 0 {
            return None;
        }
        let previous = match self.navigation_index {
            Some(0) | None => self.flat_len - 1,
            Some(i) => i - 1,
        };
        self.navigation_index = Some(previous);
        Some(previous)
    }

    pub fn navigate_to(&mut self, index: usize) -> Option<usize> {
        if index >= self.flat_len {
            return None;
        }
        self.navigation_index = Some(index);
        Some(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ScanState {
        ScanState::new(RefreshTimings::default())
    }

    #[test]
    fn debounce_rearms_with_new_generation() {
        let mut s = state();
        let first = s.request_refresh();
        let second = s.request_refresh();
        assert_eq!(
            first,
            RefreshAction::ArmTimer {
                generation: 1,
                delay: Duration::from_millis(500)
            }
        );
        assert_eq!(
            second,
            RefreshAction::ArmTimer {
                generation: 2,
                delay: Duration::from_millis(500)
            }
        );
        assert_eq!(s.phase(), Phase::Debouncing);

        assert_eq!(s.timer_elapsed(1), RefreshAction::None);
        assert_eq!(s.timer_elapsed(2), RefreshAction::StartScan);
        assert!(s.is_refreshing());
    }

    #[test]
    fn immediate_skips_debounce_and_invalidates_timer() {
        let mut s = state();
        s.request_refresh();
        assert_eq!(s.request_refresh_immediate(), RefreshAction::StartScan);
        assert_eq!(s.timer_elapsed(1), RefreshAction::None);
    }

    #[test]
    fn requests_while_scanning_queue_one_follow_up() {
        let mut s = state();
        s.request_refresh_immediate();
        assert_eq!(s.request_refresh(), RefreshAction::Queued);
        assert_eq!(s.request_refresh_immediate(), RefreshAction::Queued);
        assert!(s.pending_refresh());

        let done = s.scan_finished();
        assert!(done.publish);
        assert!(matches!(
            done.next,
            RefreshAction::ArmTimer { delay, .. } if delay == Duration::from_millis(100)
        ));
        assert!(!s.pending_refresh());

        let RefreshAction::ArmTimer { generation, .. } = done.next else {
            unreachable!()
        };
        assert_eq!(s.timer_elapsed(generation), RefreshAction::StartScan);
        assert_eq!(s.scan_finished().next, RefreshAction::None);
        assert_eq!(s.phase(), Phase::Idle);
    }

    #[test]
    fn paused_ignores_requests() {
        let mut s = state();
        assert_eq!(s.set_paused(true), RefreshAction::Paused);
        assert_eq!(s.request_refresh(), RefreshAction::None);
        assert_eq!(s.request_refresh_immediate(), RefreshAction::None);
        assert_eq!(s.phase(), Phase::Idle);
        assert!(!s.pending_refresh());
        assert_eq!(s.set_paused(true), RefreshAction::None);
    }

    #[test]
    fn pause_cancels_debounce() {
        let mut s = state();
        s.request_refresh();
        s.set_paused(true);
        assert_eq!(s.phase(), Phase::Idle);
        assert_eq!(s.timer_elapsed(1), RefreshAction::None);
    }

    #[test]
    fn unpause_starts_one_scan() {
        let mut s = state();
        s.set_paused(true);
        assert_eq!(s.set_paused(false), RefreshAction::StartScan);
        assert_eq!(s.request_refresh_immediate(), RefreshAction::Queued);
    }

    #[test]
    fn scan_running_at_pause_is_discarded() {
        let mut s = state();
        s.request_refresh_immediate();
        s.set_paused(true);
        let done = s.scan_finished();
        assert!(!done.publish);
        assert_eq!(done.next, RefreshAction::None);
    }

    #[test]
    fn unpause_mid_scan_discards_and_follows_up() {
        let mut s = state();
        s.request_refresh_immediate();
        s.set_paused(true);
        assert_eq!(s.set_paused(false), RefreshAction::Queued);
        let done = s.scan_finished();
        assert!(!done.publish);
        assert!(matches!(done.next, RefreshAction::ArmTimer { .. }));
    }

    #[test]
    fn navigation_wraps() {
        let mut s = state();
        assert_eq!(s.navigate_next(), None);
        s.set_flat_len(3);
        assert_eq!(s.navigate_next(), Some(0));
        assert_eq!(s.navigate_next(), Some(1));
        assert_eq!(s.navigate_next(), Some(2));
        assert_eq!(s.navigate_next(), Some(0));
        assert_eq!(s.navigate_previous(), Some(2));
        assert_eq!(s.navigate_to(1), Some(1));
        assert_eq!(s.navigate_to(3), None);
        assert_eq!(s.navigation_index(), Some(1));
    }

    #[test]
    fn previous_from_nothing_selects_last() {
        let mut s = state();
        s.set_flat_len(4);
        assert_eq!(s.navigate_previous(), Some(3));
    }

    #[test]
    fn shrinking_list_resets_out_of_range_cursor() {
        let mut s = state();
        s.set_flat_len(5);
        s.navigate_to(4);
        s.set_flat_len(5);
        assert_eq!(s.navigation_index(), Some(4));
        s.set_flat_len(2);
        assert_eq!(s.navigation_index(), None);
    }

    #[test]
    fn pause_clears_cursor() {
        let mut s = state();
        s.set_flat_len(2);
        s.navigate_next();
        s.set_paused(true);
        assert_eq!(s.navigation_index(), None);
        assert_eq!(s.navigate_next(), None);
    }
}
