//! Musical clock: tick derivation, MIDI clock handling and tree dispatch.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{ClockConfig, MIDI_CLOCK_PPQN};
use crate::program::Program;
use crate::{BeatVizError, Result};

/// The four counters delivered with every clock pulse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Tick {
    /// Unbounded pulse counter, the master time unit.
    pub uppqn: u64,
    /// Pulse counter wrapped to the group cycle; used for beat-boundary tests.
    pub gppqn: u64,
    /// Position within the current quarter note, in `[0, resolution)`.
    pub ppqn: u32,
    /// Quarter notes elapsed.
    pub qn: u64,
}

impl Tick {
    /// Derives all counters from `uppqn`.
    pub fn at(uppqn: u64, resolution: u32, cycle_beats: u32) -> Self {
        Self::synced(uppqn, 0, resolution, cycle_beats)
    }

    /// Like [`Tick::at`], but the phase counters count from `origin`, the
    /// pulse of the last sync point. `uppqn` stays absolute.
    pub fn synced(uppqn: u64, origin: u64, resolution: u32, cycle_beats: u32) -> Self {
        let resolution = u64::from(resolution.max(1));
        let cycle = resolution * u64::from(cycle_beats.max(1));
        let phase = uppqn.saturating_sub(origin);
        Self {
            uppqn,
            gppqn: phase % cycle,
            ppqn: (phase % resolution) as u32,
            qn: phase / resolution,
        }
    }

    /// True on the first pulse of each quarter note.
    pub fn is_quarter_note(&self) -> bool {
        self.ppqn == 0
    }
}

/// Decoded MIDI realtime messages relevant to clock sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockMessage {
    Start,
    Stop,
    Continue,
    Clock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Playing,
    Paused,
}

/// Turns clock pulses into [`Tick`]s and fans them out to programs.
///
/// Ticks leave the dispatcher strictly increasing and `uppqn` never goes
/// back. `Start` only moves the sync origin, so the beat phase restarts while
/// items already in flight keep their timing.
#[derive(Debug)]
pub struct ClockDispatch {
    resolution: u32,
    cycle_beats: u32,
    state: ClockState,
    next_uppqn: u64,
    sync_origin: u64,
    last_dispatched: Option<u64>,
}

impl ClockDispatch {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            resolution: config.resolution,
            cycle_beats: config.cycle_beats,
            state: ClockState::Stopped,
            next_uppqn: 0,
            sync_origin: 0,
            last_dispatched: None,
        }
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Counter value the next tick will carry.
    pub fn position(&self) -> u64 {
        self.next_uppqn
    }

    /// Pulse at which the current beat phase started.
    pub fn sync_origin(&self) -> u64 {
        self.sync_origin
    }

    /// Produces the next tick and advances the counter.
    pub fn next_tick(&mut self) -> Tick {
        let tick = Tick::synced(self.next_uppqn, self.sync_origin, self.resolution, self.cycle_beats);
        self.next_uppqn += 1;
        tick
    }

    /// Handles a realtime message and returns the ticks it makes due.
    pub fn process_message(&mut self, message: ClockMessage) -> Vec<Tick> {
        match message {
            ClockMessage::Start => {
                info!(position = self.next_uppqn, "clock: start");
                self.state = ClockState::Playing;
                self.sync_origin = self.next_uppqn;
                Vec::new()
            }
            ClockMessage::Stop => {
                info!(position = self.next_uppqn, "clock: stop");
                self.state = ClockState::Stopped;
                Vec::new()
            }
            ClockMessage::Continue => {
                info!(position = self.next_uppqn, "clock: continue");
                self.state = ClockState::Playing;
                Vec::new()
            }
            ClockMessage::Clock if self.state == ClockState::Playing => {
                let per_pulse = self.resolution / MIDI_CLOCK_PPQN;
                (0..per_pulse.max(1)).map(|_| self.next_tick()).collect()
            }
            ClockMessage::Clock => Vec::new(),
        }
    }

    /// Pauses without losing position; `Continue` resumes.
    pub fn pause(&mut self) {
        if self.state == ClockState::Playing {
            self.state = ClockState::Paused;
        }
    }

    /// Delivers `tick` depth-first to every program, each into its own scene.
    ///
    /// Refuses ticks that do not strictly follow the last dispatched one.
    pub fn dispatch(&mut self, tick: Tick, programs: &mut [Program]) -> Result<()> {
        if let Some(last) = self.last_dispatched {
            if tick.uppqn <= last {
                warn!(tick = tick.uppqn, last, "dropping out-of-order tick");
                return Err(BeatVizError::OutOfOrderTick {
                    tick: tick.uppqn,
                    last,
                });
            }
        }
        self.last_dispatched = Some(tick.uppqn);
        self.next_uppqn = self.next_uppqn.max(tick.uppqn + 1);
        for program in programs.iter_mut() {
            program.animate(&tick);
        }
        Ok(())
    }
}

/// Free-running clock used when no external MIDI clock is connected.
#[derive(Debug, Clone)]
pub struct InternalClock {
    bpm: f64,
    resolution: u32,
    carry: f64,
}

impl InternalClock {
    pub fn new(config: &ClockConfig) -> Self {
        Self {
            bpm: config.bpm,
            resolution: config.resolution,
            carry: 0.0,
        }
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn set_bpm(&mut self, bpm: f64) {
        if bpm.is_finite() && bpm > 0.0 {
            self.bpm = bpm;
        }
    }

    /// Wall time between two pulses.
    pub fn pulse_interval(&self) -> Duration {
        Duration::from_secs_f64(60.0 / (self.bpm * f64::from(self.resolution)))
    }

    /// Number of pulses due after `elapsed`; fractions carry over.
    pub fn advance(&mut self, elapsed: Duration) -> u64 {
        let pulses = self.carry + elapsed.as_secs_f64() * self.bpm / 60.0 * f64::from(self.resolution);
        let whole = pulses.floor();
        self.carry = pulses - whole;
        whole as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClockConfig {
        ClockConfig::default()
    }

    #[test]
    fn derives_counters_from_uppqn() {
        let tick = Tick::at(24 * 17 + 5, 24, 16);
        assert_eq!(tick.qn, 17);
        assert_eq!(tick.ppqn, 5);
        assert_eq!(tick.gppqn, 24 + 5);
        assert!(!tick.is_quarter_note());
    }

    #[test]
    fn midi_clock_only_ticks_while_playing() {
        let mut clock = ClockDispatch::new(&config());
        assert!(clock.process_message(ClockMessage::Clock).is_empty());

        clock.process_message(ClockMessage::Start);
        let ticks = clock.process_message(ClockMessage::Clock);
        assert_eq!(ticks.len(), 1);
        assert_eq!(ticks[0].uppqn, 0);

        clock.process_message(ClockMessage::Stop);
        assert!(clock.process_message(ClockMessage::Clock).is_empty());

        clock.process_message(ClockMessage::Continue);
        let ticks = clock.process_message(ClockMessage::Clock);
        assert_eq!(ticks[0].uppqn, 1);
    }

    #[test]
    fn start_rephases_without_rewinding() {
        let mut clock = ClockDispatch::new(&config());
        clock.process_message(ClockMessage::Start);
        for _ in 0..30 {
            clock.process_message(ClockMessage::Clock);
        }
        assert_eq!(clock.position(), 30);

        clock.process_message(ClockMessage::Start);
        assert_eq!(clock.sync_origin(), 30);
        let tick = clock.process_message(ClockMessage::Clock)[0];
        assert_eq!(tick.uppqn, 30);
        assert_eq!(tick.gppqn, 0);
        assert_eq!(tick.qn, 0);
        assert!(tick.is_quarter_note());

        let tick = clock.process_message(ClockMessage::Clock)[0];
        assert_eq!((tick.uppqn, tick.ppqn), (31, 1));
    }

    #[test]
    fn start_keeps_the_out_of_order_guard() {
        let mut clock = ClockDispatch::new(&config());
        let mut programs: Vec<Program> = Vec::new();
        clock.dispatch(Tick::at(10, 24, 16), &mut programs).unwrap();

        clock.process_message(ClockMessage::Start);
        let tick = clock.process_message(ClockMessage::Clock)[0];
        assert_eq!(tick.uppqn, 11);
        assert!(clock.dispatch(tick, &mut programs).is_ok());
        assert!(clock.dispatch(Tick::at(3, 24, 16), &mut programs).is_err());
    }

    #[test]
    fn higher_resolution_expands_each_midi_pulse() {
        let mut clock = ClockDispatch::new(&ClockConfig {
            resolution: 96,
            ..ClockConfig::default()
        });
        clock.process_message(ClockMessage::Start);
        let ticks = clock.process_message(ClockMessage::Clock);
        let counters: Vec<u64> = ticks.iter().map(|t| t.uppqn).collect();
        assert_eq!(counters, vec![0, 1, 2, 3]);
    }

    #[test]
    fn refuses_out_of_order_ticks() {
        let mut clock = ClockDispatch::new(&config());
        let mut programs: Vec<Program> = Vec::new();

        clock.dispatch(Tick::at(5, 24, 16), &mut programs).unwrap();
        let err = clock.dispatch(Tick::at(5, 24, 16), &mut programs).unwrap_err();
        assert!(matches!(err, BeatVizError::OutOfOrderTick { tick: 5, last: 5 }));
        assert_eq!(clock.next_tick().uppqn, 6);
    }

    #[test]
    fn internal_clock_carries_fractional_pulses() {
        let mut clock = InternalClock::new(&config());
        // 120 bpm at 24 ppqn: 48 pulses per second.
        assert_eq!(clock.advance(Duration::from_millis(500)), 24);
        assert_eq!(clock.advance(Duration::from_millis(10)), 0);
        assert_eq!(clock.advance(Duration::from_millis(11)), 1);
    }
}
