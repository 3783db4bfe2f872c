//! Absolute audio clock
//!
//! Counts frames delivered to the output. The audio thread is the only
//! writer; control-side readers derive time from it instead of wall clock.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

/// Shared frame counter of the output stream
#[derive(Debug, Clone)]
pub struct AudioClock {
    frames: Arc<AtomicU64>,
    sample_rate: Arc<AtomicU32>,
}

impl AudioClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            frames: Arc::new(AtomicU64::new(0)),
            sample_rate: Arc::new(AtomicU32::new(sample_rate.max(1))),
        }
    }

    /// Frames rendered since the stream started
    #[inline]
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Sample rate the clock counts in
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    /// Current time in seconds
    pub fn now_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate() as f64
    }

    /// Convert a duration in seconds to frames at the clock's rate
    pub fn secs_to_frames(&self, secs: f64) -> u64 {
        (secs.max(0.0) * self.sample_rate() as f64).round() as u64
    }

    /// Advance by a rendered block (audio thread only)
    #[inline]
    pub fn advance(&self, frames: usize) {
        self.frames.fetch_add(frames as u64, Ordering::Release);
    }

    /// Rebind to the negotiated device rate before the stream starts
    pub(crate) fn set_sample_rate(&self, sample_rate: u32) {
        self.sample_rate.store(sample_rate.max(1), Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_advances_in_frames() {
        let clock = AudioClock::new(48000);
        let reader = clock.clone();
        clock.advance(24000);
        assert_eq!(reader.frames(), 24000);
        assert!((reader.now_secs() - 0.5).abs() < 1e-9);
        assert_eq!(reader.secs_to_frames(0.025), 1200);
    }
}
