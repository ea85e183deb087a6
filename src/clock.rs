// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cancel::CancelHandle;

/// The clock resolution: 24 ticks per beat.
pub const TICKS_PER_BEAT: u64 = 24;

pub const MIN_BPM: f64 = 20.0;
pub const MAX_BPM: f64 = 300.0;

/// Taps further apart than this reset the tap-tempo history.
const TAP_RESET: Duration = Duration::from_secs(2);

/// At most this many taps are averaged.
const MAX_TAPS: usize = 4;

/// How long a stopped clock sleeps between run checks.
const STOPPED_POLL: Duration = Duration::from_millis(5);

/// Beat divisions expressed as beats per effect cycle.
pub mod division {
    pub const THIRTY_SECOND: f64 = 0.125;
    pub const SIXTEENTH: f64 = 0.25;
    pub const TRIPLET: f64 = 1.0 / 3.0;
    pub const EIGHTH: f64 = 0.5;
    pub const QUARTER: f64 = 1.0;
    pub const HALF: f64 = 2.0;
    pub const WHOLE: f64 = 4.0;
    pub const ONE_BAR: f64 = 4.0;
    pub const TWO_BARS: f64 = 8.0;

    /// Looks up a division by its conventional name.
    pub fn from_name(name: &str) -> Option<f64> {
        match name.to_uppercase().as_str() {
            "THIRTY_SECOND" => Some(THIRTY_SECOND),
            "SIXTEENTH" => Some(SIXTEENTH),
            "TRIPLET" => Some(TRIPLET),
            "EIGHTH" => Some(EIGHTH),
            "QUARTER" => Some(QUARTER),
            "HALF" => Some(HALF),
            "WHOLE" | "ONE_BAR" => Some(WHOLE),
            "TWO_BARS" => Some(TWO_BARS),
            _ => None,
        }
    }
}

/// Typed error for clock parameter validation.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    #[error("bpm {0} out of range, must be {MIN_BPM}-{MAX_BPM}")]
    InvalidBpm(f64),
}

/// One clock event, broadcast to subscribers in index order.
#[derive(Debug, Clone, Copy)]
pub struct ClockTick {
    pub index: u64,
    pub at: Instant,
}

struct ClockState {
    bpm: f64,
    running: bool,
    /// The index of the next tick to emit.
    next_index: u64,
    taps: Vec<Instant>,
}

struct ClockShared {
    state: Mutex<ClockState>,
    tick_subscribers: Mutex<Vec<Sender<ClockTick>>>,
    bpm_subscribers: Mutex<Vec<Sender<f64>>>,
}

/// The master clock: produces ticks at 24 per beat against the current BPM on
/// a dedicated thread.
///
/// A BPM change takes effect at the next scheduled tick: the in-flight sleep
/// target is preserved, and subsequent ticks use the new interval. Effects
/// derive phase from tick indices, so this keeps phase continuous across
/// tempo changes.
pub struct MasterClock {
    shared: Arc<ClockShared>,
    cancel_handle: CancelHandle,
    handle: Mutex<Option<JoinHandle<()>>>,
}

fn tick_interval(bpm: f64) -> Duration {
    Duration::from_secs_f64(60.0 / bpm / TICKS_PER_BEAT as f64)
}

fn validate_bpm(bpm: f64) -> Result<f64, ClockError> {
    if !bpm.is_finite() || !(MIN_BPM..=MAX_BPM).contains(&bpm) {
        return Err(ClockError::InvalidBpm(bpm));
    }
    Ok(bpm)
}

/// Averages tap intervals into a BPM, clamped into the valid range. Returns
/// None until there are at least two taps.
fn bpm_from_taps(taps: &[Instant]) -> Option<f64> {
    if taps.len() < 2 {
        return None;
    }
    let total: Duration = taps
        .windows(2)
        .map(|pair| pair[1].duration_since(pair[0]))
        .sum();
    let average = total.as_secs_f64() / (taps.len() - 1) as f64;
    Some((60.0 / average).clamp(MIN_BPM, MAX_BPM))
}

impl MasterClock {
    /// Creates a running clock at the given BPM.
    pub fn new(bpm: f64, cancel_handle: CancelHandle) -> Result<MasterClock, ClockError> {
        let bpm = validate_bpm(bpm)?;
        let shared = Arc::new(ClockShared {
            state: Mutex::new(ClockState {
                bpm,
                running: true,
                next_index: 0,
                taps: Vec::new(),
            }),
            tick_subscribers: Mutex::new(Vec::new()),
            bpm_subscribers: Mutex::new(Vec::new()),
        });

        let handle = {
            let shared = shared.clone();
            let cancel_handle = cancel_handle.clone();
            thread::spawn(move || Self::run(shared, cancel_handle))
        };

        info!(bpm, "Master clock started");
        Ok(MasterClock {
            shared,
            cancel_handle,
            handle: Mutex::new(Some(handle)),
        })
    }

    pub fn bpm(&self) -> f64 {
        self.shared.state.lock().bpm
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Sets the BPM. Takes effect at the next scheduled tick.
    pub fn set_bpm(&self, bpm: f64) -> Result<(), ClockError> {
        let bpm = validate_bpm(bpm)?;
        self.shared.state.lock().bpm = bpm;
        debug!(bpm, "BPM changed");
        self.notify_bpm(bpm);
        Ok(())
    }

    /// Registers a tap. Returns the new BPM once two or more taps are in the
    /// averaging window.
    pub fn tap(&self) -> Option<f64> {
        let now = Instant::now();
        let bpm = {
            let mut state = self.shared.state.lock();
            if let Some(last) = state.taps.last() {
                if now.duration_since(*last) > TAP_RESET {
                    state.taps.clear();
                }
            }
            state.taps.push(now);
            let excess = state.taps.len().saturating_sub(MAX_TAPS);
            if excess > 0 {
                state.taps.drain(0..excess);
            }
            let bpm = bpm_from_taps(&state.taps)?;
            state.bpm = bpm;
            bpm
        };
        debug!(bpm, "Tap tempo");
        self.notify_bpm(bpm);
        Some(bpm)
    }

    pub fn start(&self) {
        self.shared.state.lock().running = true;
    }

    pub fn stop(&self) {
        self.shared.state.lock().running = false;
    }

    /// The index of the most recently emitted tick.
    pub fn current_tick(&self) -> u64 {
        self.shared.state.lock().next_index.saturating_sub(1)
    }

    /// The index of the next tick that lands on a beat boundary.
    pub fn next_beat_tick(&self) -> u64 {
        let upcoming = self.shared.state.lock().next_index;
        upcoming.div_ceil(TICKS_PER_BEAT) * TICKS_PER_BEAT
    }

    /// Subscribes to the tick stream. Slow subscribers lose ticks rather than
    /// stalling the clock.
    pub fn subscribe(&self) -> Receiver<ClockTick> {
        let (sender, receiver) = bounded(64);
        self.shared.tick_subscribers.lock().push(sender);
        receiver
    }

    /// Subscribes to BPM changes (explicit sets and tap tempo).
    pub fn subscribe_bpm(&self) -> Receiver<f64> {
        let (sender, receiver) = bounded(16);
        self.shared.bpm_subscribers.lock().push(sender);
        receiver
    }

    fn notify_bpm(&self, bpm: f64) {
        for subscriber in self.shared.bpm_subscribers.lock().iter() {
            let _ = subscriber.try_send(bpm);
        }
    }

    fn run(shared: Arc<ClockShared>, cancel_handle: CancelHandle) {
        let mut next_tick: Option<Instant> = None;

        loop {
            if cancel_handle.is_cancelled() {
                return;
            }

            let (running, bpm) = {
                let state = shared.state.lock();
                (state.running, state.bpm)
            };
            if !running {
                next_tick = None;
                thread::sleep(STOPPED_POLL);
                continue;
            }

            let interval = tick_interval(bpm);
            let target = next_tick.unwrap_or_else(Instant::now);
            let now = Instant::now();
            if target > now {
                spin_sleep::sleep(target - now);
            }
            if cancel_handle.is_cancelled() {
                return;
            }

            // Resynchronize after suspension: skip missed ticks without
            // retro-generating them.
            let mut target = target;
            let now = Instant::now();
            let tick = {
                let mut state = shared.state.lock();
                while now.duration_since(target) >= interval {
                    target += interval;
                    state.next_index += 1;
                }
                let tick = ClockTick {
                    index: state.next_index,
                    at: target,
                };
                state.next_index += 1;
                tick
            };

            for subscriber in shared.tick_subscribers.lock().iter() {
                let _ = subscriber.try_send(tick);
            }

            // The interval to the following tick picks up any BPM change made
            // while this one was pending.
            let bpm = shared.state.lock().bpm;
            next_tick = Some(target + tick_interval(bpm));
        }
    }

    /// Joins the clock thread. Callers must cancel the handle first.
    pub fn join(&self) {
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MasterClock {
    fn drop(&mut self) {
        self.cancel_handle.cancel();
        self.join();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_tick_interval() {
        // 120 BPM: a beat is 500ms, a tick is 500/24 ms.
        let interval = tick_interval(120.0);
        assert!((interval.as_secs_f64() - 0.5 / 24.0).abs() < 1e-9);
    }

    #[test]
    fn test_validate_bpm() {
        assert!(validate_bpm(120.0).is_ok());
        assert!(validate_bpm(20.0).is_ok());
        assert!(validate_bpm(300.0).is_ok());
        assert!(validate_bpm(19.9).is_err());
        assert!(validate_bpm(300.1).is_err());
        assert!(validate_bpm(f64::NAN).is_err());
    }

    #[test]
    fn test_bpm_from_taps() {
        let start = Instant::now();
        let taps: Vec<Instant> = (0..4)
            .map(|i| start + Duration::from_millis(500 * i))
            .collect();
        let bpm = bpm_from_taps(&taps).unwrap();
        assert!((bpm - 120.0).abs() < 0.01);

        assert!(bpm_from_taps(&taps[..1]).is_none());

        // Very fast taps clamp to the maximum.
        let fast: Vec<Instant> = (0..3).map(|i| start + Duration::from_millis(50 * i)).collect();
        assert_eq!(bpm_from_taps(&fast).unwrap(), MAX_BPM);
    }

    #[test]
    fn test_division_names() {
        assert_eq!(division::from_name("quarter"), Some(1.0));
        assert_eq!(division::from_name("TWO_BARS"), Some(8.0));
        assert_eq!(division::from_name("ONE_BAR"), Some(4.0));
        assert_eq!(division::from_name("nope"), None);
    }

    #[test]
    fn test_ticks_emitted_in_order() {
        let cancel_handle = CancelHandle::new();
        let clock = MasterClock::new(300.0, cancel_handle.clone()).unwrap();
        let ticks = clock.subscribe();

        let mut last: Option<u64> = None;
        for _ in 0..5 {
            let tick = ticks.recv_timeout(Duration::from_secs(1)).unwrap();
            if let Some(last) = last {
                assert!(tick.index > last, "tick indices must increase");
            }
            last = Some(tick.index);
        }

        cancel_handle.cancel();
    }

    #[test]
    fn test_stop_pauses_ticks() {
        let cancel_handle = CancelHandle::new();
        let clock = MasterClock::new(300.0, cancel_handle.clone()).unwrap();
        let ticks = clock.subscribe();

        ticks.recv_timeout(Duration::from_secs(1)).unwrap();
        clock.stop();
        // A tick already in flight may still land; let it, then drain.
        thread::sleep(Duration::from_millis(50));
        while ticks.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(50));
        assert!(ticks.try_recv().is_err());

        clock.start();
        assert!(ticks.recv_timeout(Duration::from_secs(1)).is_ok());

        cancel_handle.cancel();
    }

    #[test]
    fn test_next_beat_tick() {
        let cancel_handle = CancelHandle::new();
        let clock = MasterClock::new(120.0, cancel_handle.clone()).unwrap();
        clock.stop();

        let next_beat = clock.next_beat_tick();
        assert_eq!(next_beat % TICKS_PER_BEAT, 0);
        assert!(next_beat >= clock.current_tick());

        cancel_handle.cancel();
    }
}
