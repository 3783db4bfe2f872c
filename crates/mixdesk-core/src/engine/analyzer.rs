//! Master bus analyzer (control side)
//!
//! Drains the mono tap the master bus fills on the audio thread and turns
//! it into snapshots:
//! - **time domain**: the most recent `history_size` samples
//! - **frequency**: `fft_size / 2` byte magnitudes from a Blackman-windowed
//!   FFT over the newest `fft_size` samples, smoothed over time and mapped
//!   from `[min_db, max_db]` onto 0..255
//!
//! Snapshots are overwritten on every poll and never persisted.

use std::collections::VecDeque;
use std::sync::Arc;

use realfft::num_complex::Complex;
use realfft::{RealFftPlanner, RealToComplex};
use serde::Serialize;

use super::analysis::HISTOGRAM_BANDS;
use crate::config::AnalyzerConfig;

/// One analysis frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyzerSnapshot {
    /// Magnitudes 0..255, one per bin
    pub frequency: Vec<u8>,
    /// Samples in [-1, 1], oldest first
    pub time_domain: Vec<f32>,
}

impl AnalyzerSnapshot {
    /// All-zero snapshot with the configured sizes
    pub fn silent(config: &AnalyzerConfig) -> Self {
        Self {
            frequency: vec![0; config.bin_count()],
            time_domain: vec![0.0; config.history_size],
        }
    }

    /// Largest absolute time-domain sample
    pub fn peak(&self) -> f32 {
        self.time_domain.iter().fold(0.0, |acc, s| acc.max(s.abs()))
    }

    /// Index of the strongest frequency bin (lowest on ties)
    pub fn dominant_bin(&self) -> usize {
        let mut best = 0;
        for (i, m) in self.frequency.iter().enumerate() {
            if *m > self.frequency[best] {
                best = i;
            }
        }
        best
    }

    /// Bin counts per equal-width level band over 0..255
    pub fn level_histogram(&self) -> [usize; HISTOGRAM_BANDS] {
        let mut counts = [0; HISTOGRAM_BANDS];
        for magnitude in &self.frequency {
            counts[*magnitude as usize * HISTOGRAM_BANDS / 256] += 1;
        }
        counts
    }
}

/// Blackman window coefficients
fn blackman_window(n: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.16;
    let a0 = (1.0 - ALPHA) / 2.0;
    let a1 = 0.5;
    let a2 = ALPHA / 2.0;
    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (std::f32::consts::TAU * x).cos() + a2 * (2.0 * std::f32::consts::TAU * x).cos()
        })
        .collect()
}

pub struct Analyzer {
    config: AnalyzerConfig,
    tap: Option<rtrb::Consumer<f32>>,
    history: VecDeque<f32>,
    fft: Arc<dyn RealToComplex<f32>>,
    window: Vec<f32>,
    input: Vec<f32>,
    spectrum: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    snapshot: AnalyzerSnapshot,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(config.fft_size);

        Self {
            window: blackman_window(config.fft_size),
            input: fft.make_input_vec(),
            spectrum: fft.make_output_vec(),
            scratch: fft.make_scratch_vec(),
            smoothed: vec![0.0; config.bin_count()],
            history: std::iter::repeat(0.0).take(config.history_size).collect(),
            snapshot: AnalyzerSnapshot::silent(&config),
            tap: None,
            fft,
            config,
        }
    }

    /// Connect the consumer end of the master bus tap
    pub fn attach(&mut self, tap: rtrb::Consumer<f32>) {
        self.tap = Some(tap);
    }

    /// Disconnect the tap and clear all state
    pub fn detach(&mut self) {
        self.tap = None;
        self.history.iter_mut().for_each(|s| *s = 0.0);
        self.smoothed.fill(0.0);
        self.snapshot = AnalyzerSnapshot::silent(&self.config);
    }

    pub fn is_attached(&self) -> bool {
        self.tap.is_some()
    }

    /// Most recent snapshot without pulling new audio
    pub fn snapshot(&self) -> &AnalyzerSnapshot {
        &self.snapshot
    }

    /// Drain the tap and recompute the snapshot
    pub fn poll(&mut self) -> &AnalyzerSnapshot {
        let Some(tap) = self.tap.as_mut() else {
            return &self.snapshot;
        };

        let available = tap.slots();
        if available == 0 {
            return &self.snapshot;
        }
        for _ in 0..available {
            let Ok(sample) = tap.pop() else { break };
            self.history.pop_front();
            self.history.push_back(sample);
        }

        self.update_time_domain();
        self.update_frequency();
        &self.snapshot
    }

    fn update_time_domain(&mut self) {
        for (dst, src) in self.snapshot.time_domain.iter_mut().zip(self.history.iter()) {
            *dst = src.clamp(-1.0, 1.0);
        }
    }

    fn update_frequency(&mut self) {
        let n = self.config.fft_size;
        let start = self.history.len() - n;
        for (i, (dst, sample)) in self.input.iter_mut().zip(self.history.range(start..)).enumerate() {
            *dst = sample * self.window[i];
        }

        if let Err(e) = self
            .fft
            .process_with_scratch(&mut self.input, &mut self.spectrum, &mut self.scratch)
        {
            log::warn!("Analyzer FFT failed: {:?}", e);
            return;
        }

        let smoothing = self.config.smoothing;
        let (min_db, max_db) = (self.config.min_db, self.config.max_db);
        let range = max_db - min_db;
        let scale = 1.0 / n as f32;

        for (i, bin) in self.spectrum.iter().take(self.smoothed.len()).enumerate() {
            let magnitude = bin.norm() * scale;
            let value = smoothing * self.smoothed[i] + (1.0 - smoothing) * magnitude;
            self.smoothed[i] = value;

            let db = if value > 0.0 { 20.0 * value.log10() } else { f32::NEG_INFINITY };
            let byte = 255.0 * (db - min_db) / range;
            self.snapshot.frequency[i] = byte.clamp(0.0, 255.0) as u8;
        }
    }
}
