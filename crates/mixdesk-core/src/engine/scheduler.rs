//! Look-ahead event scheduler
//!
//! Runs on a coarse periodic tick (25 ms by default) measured on the
//! absolute audio clock. Each tick hands out every event due before
//! `now + lookahead`, so the caller can arm it on the audio thread at its
//! exact frame instead of reacting late by up to one tick.

/// An event released by the scheduler, with its target frame
#[derive(Debug, Clone, PartialEq)]
pub struct DueEvent<E> {
    pub at_frame: u64,
    pub event: E,
}

pub struct LookaheadScheduler<E> {
    tick_frames: u64,
    lookahead_frames: u64,
    last_tick: Option<u64>,
    /// Pending events, ordered by frame
    pending: Vec<DueEvent<E>>,
}

impl<E> LookaheadScheduler<E> {
    /// Tick and window lengths are in frames of the audio clock
    pub fn new(tick_frames: u64, lookahead_frames: u64) -> Self {
        Self {
            tick_frames: tick_frames.max(1),
            lookahead_frames,
            last_tick: None,
            pending: Vec::new(),
        }
    }

    /// Build from millisecond settings at `sample_rate`
    pub fn from_ms(tick_ms: u32, lookahead_ms: u32, sample_rate: u32) -> Self {
        let frames = |ms: u32| ms as u64 * sample_rate as u64 / 1000;
        Self::new(frames(tick_ms), frames(lookahead_ms).max(frames(tick_ms)))
    }

    pub fn tick_frames(&self) -> u64 {
        self.tick_frames
    }

    pub fn lookahead_frames(&self) -> u64 {
        self.lookahead_frames
    }

    /// Queue `event` for `at_frame`
    pub fn schedule(&mut self, at_frame: u64, event: E) {
        let index = self.pending.partition_point(|e| e.at_frame <= at_frame);
        self.pending.insert(index, DueEvent { at_frame, event });
    }

    /// Drop every pending event and restart the tick phase
    pub fn clear(&mut self) {
        self.pending.clear();
        self.last_tick = None;
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Whether a tick is due at `now`
    pub fn is_tick_due(&self, now: u64) -> bool {
        match self.last_tick {
            None => true,
            Some(last) => now >= last + self.tick_frames,
        }
    }

    /// Run a tick if one is due and release events inside the window
    pub fn poll(&mut self, now: u64) -> Vec<DueEvent<E>> {
        if !self.is_tick_due(now) {
            return Vec::new();
        }
        self.last_tick = Some(now);

        let horizon = now.saturating_add(self.lookahead_frames);
        let due = self.pending.partition_point(|e| e.at_frame <= horizon);
        self.pending.drain(..due).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_period_follows_clock() {
        // 25 ms / 100 ms at 48 kHz
        let mut s: LookaheadScheduler<&str> = LookaheadScheduler::from_ms(25, 100, 48000);
        assert_eq!(s.tick_frames(), 1200);
        assert_eq!(s.lookahead_frames(), 4800);

        assert!(s.is_tick_due(0));
        s.poll(0);
        assert!(!s.is_tick_due(1199));
        assert!(s.is_tick_due(1200));
    }

    #[test]
    fn test_events_released_within_lookahead() {
        let mut s = LookaheadScheduler::new(1200, 4800);
        s.schedule(10_000, "late");
        s.schedule(4_000, "early");

        let due = s.poll(0);
        assert_eq!(due, vec![DueEvent { at_frame: 4_000, event: "early" }]);

        // Not yet a tick
        assert!(s.poll(1_000).is_empty());

        let due = s.poll(6_000);
        assert_eq!(due[0].event, "late");
        assert_eq!(s.pending(), 0);
    }

    #[test]
    fn test_clear_drops_events() {
        let mut s = LookaheadScheduler::new(1200, 4800);
        s.schedule(100, 1);
        s.clear();
        assert!(s.poll(0).is_empty());
    }
}
