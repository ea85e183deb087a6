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

use std::time::{Duration, Instant};

use super::error::DmxError;
use super::universe::{channel_index, DmxFrame, UNIVERSE_SIZE};

/// Fades are interpolated at 10ms resolution.
pub const FADE_STEP: Duration = Duration::from_millis(10);

/// A requested change to a single channel. A fade of zero sets the value at the
/// next transmit boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelChange {
    pub target: u8,
    pub fade: Duration,
}

impl ChannelChange {
    /// An immediate set of the channel.
    pub fn set(target: u8) -> ChannelChange {
        ChannelChange {
            target,
            fade: Duration::ZERO,
        }
    }

    /// A timed fade towards the target.
    pub fn fade(target: u8, fade: Duration) -> ChannelChange {
        ChannelChange { target, fade }
    }
}

/// The interpolation state of one channel.
///
/// A fade advances by a fixed integer step each 10ms so that intermediate values
/// are monotonic, and the final step lands exactly on the target. The step is
/// `delta / steps` truncated towards zero, which floors ascending steps and
/// ceils descending ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FadeState {
    Idle(u8),
    Fading {
        current: i32,
        target: u8,
        step: i32,
        steps_remaining: u32,
    },
}

impl FadeState {
    /// The materialized byte for this state.
    fn value(&self) -> u8 {
        match self {
            FadeState::Idle(value) => *value,
            FadeState::Fading { current, .. } => *current as u8,
        }
    }
}

/// Tracks which channels changed since the last drain. Channels are 1-based.
#[derive(Debug, Clone)]
struct DirtySet {
    bits: [u64; UNIVERSE_SIZE / 64],
}

impl DirtySet {
    fn new() -> DirtySet {
        DirtySet {
            bits: [0; UNIVERSE_SIZE / 64],
        }
    }

    fn insert(&mut self, index: usize) {
        self.bits[index / 64] |= 1 << (index % 64);
    }

    fn is_empty(&self) -> bool {
        self.bits.iter().all(|word| *word == 0)
    }

    fn take(&mut self) -> Vec<usize> {
        let mut indices = Vec::new();
        for (word_index, word) in self.bits.iter_mut().enumerate() {
            let mut remaining = *word;
            while remaining != 0 {
                let bit = remaining.trailing_zeros() as usize;
                indices.push(word_index * 64 + bit);
                remaining &= remaining - 1;
            }
            *word = 0;
        }
        indices
    }
}

/// The per-universe fade engine: 512 channel interpolation states plus a dirty set.
pub struct FadeEngine {
    states: Vec<FadeState>,
    dirty: DirtySet,
    last_advance: Instant,
}

impl FadeEngine {
    /// Creates a new fade engine with all channels idle at zero.
    pub fn new(now: Instant) -> FadeEngine {
        FadeEngine {
            states: vec![FadeState::Idle(0); UNIVERSE_SIZE],
            dirty: DirtySet::new(),
            last_advance: now,
        }
    }

    /// Applies a channel change, replacing any fade in progress. The current
    /// interpolated value becomes the new fade origin.
    pub fn set(&mut self, channel: u16, change: ChannelChange) -> Result<(), DmxError> {
        let index = channel_index(channel)?;
        let current = self.states[index].value();

        if change.fade.is_zero() {
            self.states[index] = FadeState::Idle(change.target);
            if change.target != current {
                self.dirty.insert(index);
            }
            return Ok(());
        }

        let steps = (change.fade.as_millis() / FADE_STEP.as_millis()).max(1) as u32;
        let delta = i32::from(change.target) - i32::from(current);
        self.states[index] = FadeState::Fading {
            current: i32::from(current),
            target: change.target,
            step: delta / steps as i32,
            steps_remaining: steps,
        };
        Ok(())
    }

    /// Advances every fading channel by the number of whole 10ms steps elapsed
    /// since the last advance, marking channels dirty when their materialized
    /// byte changes.
    pub fn tick(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_advance);
        let steps = (elapsed.as_millis() / FADE_STEP.as_millis()) as u32;
        if steps == 0 {
            return;
        }
        self.last_advance += FADE_STEP * steps;

        for index in 0..UNIVERSE_SIZE {
            if let FadeState::Fading {
                current,
                target,
                step,
                steps_remaining,
            } = self.states[index]
            {
                let before = current as u8;
                let state = if steps >= steps_remaining {
                    FadeState::Idle(target)
                } else {
                    FadeState::Fading {
                        current: current + step * steps as i32,
                        target,
                        step,
                        steps_remaining: steps_remaining - steps,
                    }
                };
                if state.value() != before {
                    self.dirty.insert(index);
                }
                self.states[index] = state;
            }
        }
    }

    /// A read-only view of the current materialized bytes.
    pub fn snapshot(&self) -> DmxFrame {
        let mut frame = DmxFrame::new();
        for (index, state) in self.states.iter().enumerate() {
            frame.set(index as u16 + 1, state.value()).expect("valid channel");
        }
        frame
    }

    /// The materialized byte for a single 1-based channel.
    pub fn value(&self, channel: u16) -> Result<u8, DmxError> {
        Ok(self.states[channel_index(channel)?].value())
    }

    /// True while any channel is mid-fade.
    pub fn any_fading(&self) -> bool {
        self.states
            .iter()
            .any(|state| matches!(state, FadeState::Fading { .. }))
    }

    /// True if any channel changed since the last drain.
    pub fn has_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Returns and clears the (channel, byte) pairs changed since the last drain.
    pub fn drain_dirty(&mut self) -> Vec<(u16, u8)> {
        self.dirty
            .take()
            .into_iter()
            .map(|index| (index as u16 + 1, self.states[index].value()))
            .collect()
    }

    /// Re-marks channels dirty, used when a transmission attempt fails so the
    /// changes are re-delivered with the next frame.
    pub fn restore_dirty(&mut self, changes: &[(u16, u8)]) {
        for (channel, _) in changes {
            self.dirty.insert(usize::from(*channel) - 1);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn engine() -> (FadeEngine, Instant) {
        let now = Instant::now();
        (FadeEngine::new(now), now)
    }

    #[test]
    fn test_immediate_set() {
        let (mut engine, _) = engine();
        engine.set(1, ChannelChange::set(200)).unwrap();
        assert_eq!(engine.value(1).unwrap(), 200);
        assert_eq!(engine.drain_dirty(), vec![(1, 200)]);
        assert!(!engine.has_dirty());
    }

    #[test]
    fn test_set_same_value_not_dirty() {
        let (mut engine, _) = engine();
        engine.set(1, ChannelChange::set(0)).unwrap();
        assert!(!engine.has_dirty());
    }

    #[test]
    fn test_fade_reaches_target() {
        let (mut engine, now) = engine();
        engine
            .set(1, ChannelChange::fade(200, Duration::from_millis(100)))
            .unwrap();

        // 40ms in, the fade should be 4 steps of 20 along.
        engine.tick(now + Duration::from_millis(40));
        assert_eq!(engine.value(1).unwrap(), 80);

        // At 100ms the fade lands exactly on the target.
        engine.tick(now + Duration::from_millis(100));
        assert_eq!(engine.value(1).unwrap(), 200);
        assert!(!engine.any_fading());
    }

    #[test]
    fn test_fade_monotonic_and_no_overshoot() {
        let (mut engine, now) = engine();
        engine
            .set(1, ChannelChange::fade(201, Duration::from_millis(70)))
            .unwrap();

        let mut last = 0;
        for step in 1..=7u64 {
            engine.tick(now + Duration::from_millis(step * 10));
            let value = engine.value(1).unwrap();
            assert!(value >= last, "fade went backwards at step {}", step);
            assert!(value <= 201, "fade overshot at step {}", step);
            last = value;
        }
        assert_eq!(last, 201);
    }

    #[test]
    fn test_descending_fade() {
        let (mut engine, now) = engine();
        engine.set(1, ChannelChange::set(200)).unwrap();
        engine.drain_dirty();

        engine
            .set(1, ChannelChange::fade(0, Duration::from_millis(30)))
            .unwrap();
        engine.tick(now + Duration::from_millis(10));
        assert_eq!(engine.value(1).unwrap(), 134);
        engine.tick(now + Duration::from_millis(20));
        assert_eq!(engine.value(1).unwrap(), 68);
        engine.tick(now + Duration::from_millis(30));
        assert_eq!(engine.value(1).unwrap(), 0);
    }

    #[test]
    fn test_interrupted_fade_rebases() {
        let (mut engine, now) = engine();
        engine
            .set(1, ChannelChange::fade(200, Duration::from_millis(100)))
            .unwrap();
        engine.tick(now + Duration::from_millis(50));
        assert_eq!(engine.value(1).unwrap(), 100);

        // Interrupt with a new fade; it starts at the interpolated value.
        engine
            .set(1, ChannelChange::fade(0, Duration::from_millis(50)))
            .unwrap();
        engine.tick(now + Duration::from_millis(60));
        assert_eq!(engine.value(1).unwrap(), 80);
        engine.tick(now + Duration::from_millis(100));
        assert_eq!(engine.value(1).unwrap(), 0);
    }

    #[test]
    fn test_multiple_elapsed_steps_at_once() {
        let (mut engine, now) = engine();
        engine
            .set(1, ChannelChange::fade(100, Duration::from_millis(100)))
            .unwrap();

        // A single late tick advances by all elapsed steps without overshooting.
        engine.tick(now + Duration::from_millis(250));
        assert_eq!(engine.value(1).unwrap(), 100);
        assert!(!engine.any_fading());
    }

    #[test]
    fn test_small_delta_lands_on_final_step() {
        let (mut engine, now) = engine();
        engine
            .set(1, ChannelChange::fade(5, Duration::from_secs(1)))
            .unwrap();

        // delta/steps truncates to zero, so the value holds until the last step.
        engine.tick(now + Duration::from_millis(990));
        assert_eq!(engine.value(1).unwrap(), 0);
        engine.tick(now + Duration::from_millis(1000));
        assert_eq!(engine.value(1).unwrap(), 5);
    }

    #[test]
    fn test_restore_dirty() {
        let (mut engine, _) = engine();
        engine.set(10, ChannelChange::set(42)).unwrap();
        let drained = engine.drain_dirty();
        assert_eq!(drained, vec![(10, 42)]);
        engine.restore_dirty(&drained);
        assert_eq!(engine.drain_dirty(), vec![(10, 42)]);
    }

    #[test]
    fn test_invalid_channel() {
        let (mut engine, _) = engine();
        assert!(engine.set(0, ChannelChange::set(1)).is_err());
        assert!(engine.set(513, ChannelChange::set(1)).is_err());
    }
}
