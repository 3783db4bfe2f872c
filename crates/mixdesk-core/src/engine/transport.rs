//! Transport state machine
//!
//! ```text
//! Stopped ──play──▶ Playing ──pause──▶ Paused ──play──▶ Playing
//!    ▲                 │                  │
//!    └──────stop───────┴──────stop────────┘
//! ```
//!
//! Elapsed time is derived from the audio clock, never from accumulated
//! wall-clock deltas. The end of the configured duration is armed on the
//! audio thread through the look-ahead scheduler; the next tick after that
//! frame completes the auto-stop and rewinds to zero.

use serde::Serialize;

use crate::config::TransportConfig;
use crate::graph::GraphCommand;

use super::error::EngineResult;
use super::manager::AudioGraphManager;
use super::scheduler::LookaheadScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransportStatus {
    pub state: TransportState,
    pub elapsed_secs: f64,
    pub duration_secs: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum TransportEvent {
    End,
}

pub struct TransportController {
    state: TransportState,
    duration_secs: f64,
    /// Elapsed time banked before the current play run
    banked_secs: f64,
    /// Clock frame at which the current play run started
    anchor_frame: u64,
    /// End frame already armed on the audio thread
    armed_end: Option<u64>,
    tick_ms: u32,
    lookahead_ms: u32,
    scheduler: LookaheadScheduler<TransportEvent>,
}

impl TransportController {
    pub fn new(config: &TransportConfig, sample_rate: u32) -> Self {
        Self {
            state: TransportState::Stopped,
            duration_secs: config.duration_secs.max(0.0),
            banked_secs: 0.0,
            anchor_frame: 0,
            armed_end: None,
            tick_ms: config.tick_ms,
            lookahead_ms: config.lookahead_ms,
            scheduler: LookaheadScheduler::from_ms(config.tick_ms, config.lookahead_ms, sample_rate),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Elapsed play time in seconds
    pub fn elapsed_secs(&self, graph: &AudioGraphManager) -> f64 {
        let elapsed = match self.state {
            TransportState::Playing => {
                let clock = graph.clock();
                let run = clock.frames().saturating_sub(self.anchor_frame);
                self.banked_secs + run as f64 / clock.sample_rate() as f64
            }
            _ => self.banked_secs,
        };
        elapsed.min(self.duration_secs)
    }

    pub fn status(&self, graph: &AudioGraphManager) -> TransportStatus {
        TransportStatus {
            state: self.state,
            elapsed_secs: self.elapsed_secs(graph),
            duration_secs: self.duration_secs,
        }
    }

    /// Resume a suspended output, then enter `Playing`
    ///
    /// Brings the output up first if it was never initialized.
    pub fn play(&mut self, graph: &mut AudioGraphManager) -> EngineResult<()> {
        if graph.is_disposed() {
            return Ok(());
        }
        graph.initialize()?;
        graph.resume_output()?;

        if self.state == TransportState::Playing {
            return Ok(());
        }

        // Device rate is only known once the output is up
        self.scheduler =
            LookaheadScheduler::from_ms(self.tick_ms, self.lookahead_ms, graph.sample_rate());

        let clock = graph.clock();
        self.anchor_frame = clock.frames();
        let remaining = (self.duration_secs - self.banked_secs).max(0.0);
        let end_frame = self
            .anchor_frame
            .saturating_add(clock.secs_to_frames(remaining));
        self.scheduler.schedule(end_frame, TransportEvent::End);

        graph.send(GraphCommand::SetRunning(true));
        log::info!(
            "Transport playing from {:.2}s ({:.2}s remaining)",
            self.banked_secs,
            remaining
        );
        self.state = TransportState::Playing;
        Ok(())
    }

    /// Hold position; no-op unless playing
    pub fn pause(&mut self, graph: &mut AudioGraphManager) {
        if self.state != TransportState::Playing {
            return;
        }
        self.banked_secs = self.elapsed_secs(graph);
        self.disarm(graph);
        graph.send(GraphCommand::SetRunning(false));
        self.state = TransportState::Paused;
        log::info!("Transport paused at {:.2}s", self.banked_secs);
    }

    /// Return to `Stopped` at zero from any state
    pub fn stop(&mut self, graph: &mut AudioGraphManager) {
        self.disarm(graph);
        graph.send(GraphCommand::SetRunning(false));
        graph.send(GraphCommand::ResetSources);
        self.banked_secs = 0.0;
        if self.state != TransportState::Stopped {
            log::info!("Transport stopped");
        }
        self.state = TransportState::Stopped;
    }

    /// Periodic tick: arm events entering the look-ahead window and
    /// complete an auto-stop whose frame has passed
    pub fn tick(&mut self, graph: &mut AudioGraphManager) {
        if self.state != TransportState::Playing {
            return;
        }
        let now = graph.clock().frames();

        for due in self.scheduler.poll(now) {
            match due.event {
                TransportEvent::End => {
                    graph.send(GraphCommand::ScheduleStop { at_frame: Some(due.at_frame) });
                    self.armed_end = Some(due.at_frame);
                    log::debug!("End of transport armed at frame {}", due.at_frame);
                }
            }
        }

        if self.armed_end.is_some_and(|end| now >= end) {
            log::info!("Transport reached {:.2}s, stopping", self.duration_secs);
            self.stop(graph);
        }
    }

    fn disarm(&mut self, graph: &mut AudioGraphManager) {
        self.scheduler.clear();
        if self.armed_end.take().is_some() {
            graph.send(GraphCommand::ScheduleStop { at_frame: None });
        }
    }
}
