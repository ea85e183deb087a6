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

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::cancel::CancelHandle;
use crate::clock::{ClockTick, MasterClock, TICKS_PER_BEAT};
use crate::dmx::{ChannelChange, Controller, Transaction, UniverseId};
use crate::fixture::{Fixture, Patch, PatchError, Property};

use super::distribution::DistributionStrategy;
use super::effect::{Effect, EffectContext, FxOutput, OutputKind, POSITION_CENTER};
use super::error::FxError;
use super::instance::{BlendMode, ElementMode, FxInstance, FxTarget, FxTargetRef, FxTiming};
use super::library::validate_beat_division;

/// How long the engine thread waits for a tick before re-checking for
/// cancellation.
const TICK_WAIT: Duration = Duration::from_millis(250);

/// Lifecycle notifications for surface layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FxEvent {
    Added(u64),
    Updated(u64),
    Removed(u64),
    Paused(u64),
    Resumed(u64),
    Cleared,
}

/// A request to add an effect, after parameter resolution.
#[derive(Debug, Clone)]
pub struct AddEffect {
    pub effect: Effect,
    pub target: FxTarget,
    pub beat_division: f64,
    pub start_on_beat: bool,
    pub blend_mode: BlendMode,
    /// None takes the effect's default.
    pub step_timing: Option<bool>,
    pub phase_offset: f64,
    pub distribution: DistributionStrategy,
    pub element_mode: ElementMode,
    pub preset_id: Option<String>,
}

impl AddEffect {
    pub fn new(effect: Effect, target: FxTarget) -> AddEffect {
        AddEffect {
            effect,
            target,
            beat_division: 1.0,
            start_on_beat: true,
            blend_mode: BlendMode::Override,
            step_timing: None,
            phase_offset: 0.0,
            distribution: DistributionStrategy::Unified,
            element_mode: ElementMode::PerFixture,
            preset_id: None,
        }
    }
}

/// A request to update an effect. Immutable fields (effect, beat division,
/// blend mode, step timing) are applied as an atomic swap preserving the
/// epoch; mutable fields are written in place.
#[derive(Debug, Clone, Default)]
pub struct UpdateEffect {
    pub effect: Option<Effect>,
    pub beat_division: Option<f64>,
    pub blend_mode: Option<BlendMode>,
    pub step_timing: Option<bool>,
    pub phase_offset: Option<f64>,
    pub distribution: Option<DistributionStrategy>,
    pub element_mode: Option<ElementMode>,
}

/// One resolved output target of an instance for the current tick.
struct TargetMember {
    /// The fixture (parent, for elements) this member belongs to.
    fixture_key: String,
    property: Property,
    /// Index within this member's distribution scope.
    index: usize,
    /// Size of this member's distribution scope.
    group_size: usize,
    normalized_position: f64,
    pan_offset: i16,
    tilt_offset: i16,
    invert_pan: bool,
}

struct EngineShared {
    instances: Mutex<BTreeMap<u64, FxInstance>>,
    next_id: AtomicU64,
    dropped_ticks: AtomicU64,
    patch: Arc<Patch>,
    controller: Arc<Controller>,
    listeners: Mutex<Vec<Sender<FxEvent>>>,
}

/// The effects engine: owns the instance table and converts clock ticks into
/// batched channel writes.
///
/// Tick consumption is conflated: if ticks arrive while one is being
/// processed, only the newest is kept and the rest are counted as dropped.
pub struct FxEngine {
    shared: Arc<EngineShared>,
    clock: Arc<MasterClock>,
    cancel_handle: CancelHandle,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl FxEngine {
    /// Creates the engine and starts its processing thread against the
    /// clock's tick stream.
    pub fn new(
        patch: Arc<Patch>,
        controller: Arc<Controller>,
        clock: Arc<MasterClock>,
        cancel_handle: CancelHandle,
    ) -> FxEngine {
        let shared = Arc::new(EngineShared {
            instances: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            dropped_ticks: AtomicU64::new(0),
            patch,
            controller,
            listeners: Mutex::new(Vec::new()),
        });

        let handle = {
            let shared = shared.clone();
            let ticks = clock.subscribe();
            let cancel_handle = cancel_handle.clone();
            thread::spawn(move || Self::run(shared, ticks, cancel_handle))
        };

        info!("FX engine started");
        FxEngine {
            shared,
            clock,
            cancel_handle,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Subscribes to lifecycle events.
    pub fn subscribe_events(&self) -> Receiver<FxEvent> {
        let (sender, receiver) = unbounded();
        self.shared.listeners.lock().push(sender);
        receiver
    }

    fn notify(&self, event: FxEvent) {
        for listener in self.shared.listeners.lock().iter() {
            let _ = listener.send(event);
        }
    }

    /// Adds an effect and returns its id. The target must resolve at add
    /// time; it may stop resolving later, which pauses output silently.
    pub fn add_effect(&self, add: AddEffect) -> Result<u64, FxError> {
        let beat_division = validate_beat_division(add.beat_division)?;
        resolve_targets(
            &self.shared.patch,
            &add.target,
            add.effect.output_kind(),
            add.element_mode,
        )?;

        let id = self.shared.next_id.fetch_add(1, Ordering::SeqCst);
        let start_epoch_tick = if add.start_on_beat {
            self.clock.next_beat_tick()
        } else {
            self.clock.current_tick()
        };
        let step_timing = add
            .step_timing
            .unwrap_or_else(|| add.effect.default_step_timing());

        let instance = FxInstance {
            id,
            effect: add.effect,
            target: add.target,
            timing: FxTiming {
                beat_division,
                start_on_beat: add.start_on_beat,
            },
            blend_mode: add.blend_mode,
            step_timing,
            start_epoch_tick,
            phase_offset: add.phase_offset,
            distribution: add.distribution,
            element_mode: add.element_mode,
            running: true,
            last_phase: 0.0,
            preset_id: add.preset_id,
        };

        debug!(
            id,
            effect = instance.effect.type_name(),
            target = instance.target.key(),
            start_epoch_tick,
            "Effect added"
        );
        self.shared.instances.lock().insert(id, instance);
        self.notify(FxEvent::Added(id));
        Ok(id)
    }

    /// Updates an effect. Returns the updated snapshot.
    pub fn update_effect(&self, id: u64, update: UpdateEffect) -> Result<FxInstance, FxError> {
        if let Some(division) = update.beat_division {
            validate_beat_division(division)?;
        }
        let updated = {
            let mut instances = self.shared.instances.lock();
            let instance = instances.get_mut(&id).ok_or(FxError::UnknownInstance(id))?;

            // Atomic swap of the immutable core: a new instance under the same
            // id, preserving the epoch and run state.
            if let Some(effect) = update.effect {
                instance.effect = effect;
            }
            if let Some(division) = update.beat_division {
                instance.timing.beat_division = division;
            }
            if let Some(blend_mode) = update.blend_mode {
                instance.blend_mode = blend_mode;
            }
            if let Some(step_timing) = update.step_timing {
                instance.step_timing = step_timing;
            }
            if let Some(phase_offset) = update.phase_offset {
                instance.phase_offset = phase_offset;
            }
            if let Some(distribution) = update.distribution {
                instance.distribution = distribution;
            }
            if let Some(element_mode) = update.element_mode {
                instance.element_mode = element_mode;
            }
            instance.clone()
        };
        self.notify(FxEvent::Updated(id));
        Ok(updated)
    }

    /// Removes an effect. Any in-flight computation for it completes
    /// harmlessly; its writes stand until the next tick's reset.
    pub fn remove_effect(&self, id: u64) -> Result<(), FxError> {
        self.shared
            .instances
            .lock()
            .remove(&id)
            .ok_or(FxError::UnknownInstance(id))?;
        debug!(id, "Effect removed");
        self.notify(FxEvent::Removed(id));
        Ok(())
    }

    /// Pauses an effect, preserving its id and epoch so resume continues in
    /// phase.
    pub fn pause_effect(&self, id: u64) -> Result<(), FxError> {
        {
            let mut instances = self.shared.instances.lock();
            let instance = instances.get_mut(&id).ok_or(FxError::UnknownInstance(id))?;
            instance.running = false;
        }
        self.notify(FxEvent::Paused(id));
        Ok(())
    }

    pub fn resume_effect(&self, id: u64) -> Result<(), FxError> {
        {
            let mut instances = self.shared.instances.lock();
            let instance = instances.get_mut(&id).ok_or(FxError::UnknownInstance(id))?;
            instance.running = true;
        }
        self.notify(FxEvent::Resumed(id));
        Ok(())
    }

    /// Removes every effect, returning how many were removed.
    pub fn clear_all_effects(&self) -> usize {
        let removed = {
            let mut instances = self.shared.instances.lock();
            let removed = instances.len();
            instances.clear();
            removed
        };
        if removed > 0 {
            info!(removed, "All effects cleared");
        }
        self.notify(FxEvent::Cleared);
        removed
    }

    /// Snapshot of one instance.
    pub fn effect(&self, id: u64) -> Result<FxInstance, FxError> {
        self.shared
            .instances
            .lock()
            .get(&id)
            .cloned()
            .ok_or(FxError::UnknownInstance(id))
    }

    /// Snapshots of all instances in id order.
    pub fn active_effects(&self) -> Vec<FxInstance> {
        self.shared.instances.lock().values().cloned().collect()
    }

    /// Instances targeting the fixture directly, and instances reaching it
    /// through group or element expansion.
    pub fn effects_for_fixture(&self, key: &str) -> (Vec<FxInstance>, Vec<FxInstance>) {
        let instances = self.active_effects();
        let mut direct = Vec::new();
        let mut indirect = Vec::new();
        for instance in instances {
            match &instance.target.reference {
                FxTargetRef::Fixture(target_key) if target_key == key => direct.push(instance),
                _ => {
                    if self.resolved_keys(&instance).contains(key) {
                        indirect.push(instance);
                    }
                }
            }
        }
        (direct, indirect)
    }

    /// Instances whose target is the named group.
    pub fn effects_for_group(&self, name: &str) -> Vec<FxInstance> {
        self.active_effects()
            .into_iter()
            .filter(
                |instance| matches!(&instance.target.reference, FxTargetRef::Group(group) if group == name),
            )
            .collect()
    }

    /// Removes every effect whose resolved target set includes the fixture.
    pub fn remove_effects_for_fixture(&self, key: &str) -> usize {
        let (direct, indirect) = self.effects_for_fixture(key);
        let mut removed = 0;
        for instance in direct.into_iter().chain(indirect) {
            if self.remove_effect(instance.id).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Removes group-targeted effects only; fixture-targeted instances that
    /// happen to touch members stay.
    pub fn remove_effects_for_group(&self, name: &str) -> usize {
        let mut removed = 0;
        for instance in self.effects_for_group(name) {
            if self.remove_effect(instance.id).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    /// Ticks dropped because the engine fell behind.
    pub fn dropped_ticks(&self) -> u64 {
        self.shared.dropped_ticks.load(Ordering::Relaxed)
    }

    /// The fixture keys an instance currently reaches.
    fn resolved_keys(&self, instance: &FxInstance) -> HashSet<String> {
        match resolve_targets(
            &self.shared.patch,
            &instance.target,
            instance.effect.output_kind(),
            instance.element_mode,
        ) {
            Ok(members) => members.into_iter().map(|member| member.fixture_key).collect(),
            Err(_) => HashSet::new(),
        }
    }

    fn run(shared: Arc<EngineShared>, ticks: Receiver<ClockTick>, cancel_handle: CancelHandle) {
        loop {
            if cancel_handle.is_cancelled() {
                return;
            }
            let mut tick = match ticks.recv_timeout(TICK_WAIT) {
                Ok(tick) => tick,
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
            };

            // Conflate: the newest pending tick supersedes older ones.
            let mut dropped = 0;
            while let Ok(newer) = ticks.try_recv() {
                tick = newer;
                dropped += 1;
            }
            if dropped > 0 {
                shared.dropped_ticks.fetch_add(dropped, Ordering::Relaxed);
                debug!(dropped, "Engine fell behind, conflated clock ticks");
            }

            process_tick(&shared, tick.index);
        }
    }

    /// Processes one tick to completion. Normally driven by the engine
    /// thread; exposed for simulation and tests.
    pub fn process_tick(&self, tick_index: u64) {
        process_tick(&self.shared, tick_index);
    }

    /// Joins the engine thread. Callers must cancel the handle first.
    pub fn join(&self) {
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for FxEngine {
    fn drop(&mut self) {
        self.cancel_handle.cancel();
        self.join();
    }
}

/// Runs steps 1-6 of the per-tick pipeline: reset neutrals into a fresh
/// accumulator, expand and blend every running instance in id order, then
/// flush through one transaction.
fn process_tick(shared: &EngineShared, tick_index: u64) {
    let instances: Vec<FxInstance> = shared
        .instances
        .lock()
        .values()
        .filter(|instance| instance.running)
        .cloned()
        .collect();
    if instances.is_empty() {
        return;
    }

    let mut accumulator: HashMap<(UniverseId, u16), u8> = HashMap::new();
    let mut last_phases: Vec<(u64, f64)> = Vec::new();

    for instance in &instances {
        if tick_index < instance.start_epoch_tick {
            continue;
        }
        let members = match resolve_targets(
            &shared.patch,
            &instance.target,
            instance.effect.output_kind(),
            instance.element_mode,
        ) {
            Ok(members) => members,
            Err(err) => {
                // Unresolved targets are a silent no-op for this tick; the
                // target may become valid after reconfiguration.
                debug!(id = instance.id, err = %err, "Skipping unresolved effect target");
                continue;
            }
        };

        if let Some(phase) = process_instance(instance, tick_index, &members, &mut accumulator) {
            last_phases.push((instance.id, phase));
        }
    }

    if !accumulator.is_empty() {
        let mut tx = shared.controller.begin();
        if let Err(err) = flush(&mut tx, &accumulator) {
            error!(err = %err, "Error staging effect output");
        } else if let Err(err) = tx.apply() {
            error!(err = %err, "Error applying effect output");
        }
    }

    let mut table = shared.instances.lock();
    for (id, phase) in last_phases {
        if let Some(instance) = table.get_mut(&id) {
            instance.last_phase = phase;
        }
    }
}

fn flush(
    tx: &mut Transaction,
    accumulator: &HashMap<(UniverseId, u16), u8>,
) -> Result<(), crate::dmx::DmxError> {
    for ((universe, channel), value) in accumulator {
        tx.set_value(*universe, *channel, ChannelChange::set(*value))?;
    }
    Ok(())
}

/// Computes and blends one instance's output for every resolved member.
/// Returns the member phase of the last processed member.
fn process_instance(
    instance: &FxInstance,
    tick_index: u64,
    members: &[TargetMember],
    accumulator: &mut HashMap<(UniverseId, u16), u8>,
) -> Option<f64> {
    let beats_since_start =
        (tick_index - instance.start_epoch_tick) as f64 / TICKS_PER_BEAT as f64;
    let mut last_phase = None;

    for member in members {
        let slots = instance.distribution.distinct_slots(member.group_size);
        let effective_division = instance.timing.beat_division
            * if instance.step_timing { slots as f64 } else { 1.0 };
        let base_clock =
            (beats_since_start / effective_division + instance.phase_offset).rem_euclid(1.0);

        let chosen_clock = if instance.distribution.uses_triangle_phase() {
            let triangle = if base_clock < 0.5 {
                base_clock * 2.0
            } else {
                2.0 * (1.0 - base_clock)
            };
            triangle * (slots.saturating_sub(1)) as f64 / slots as f64
        } else {
            base_clock
        };

        let distribution_offset = instance.distribution.offset_for(
            member.index,
            member.group_size,
            member.normalized_position,
        );
        // Subtraction so higher-offset members lag visually.
        let member_phase =
            (chosen_clock + instance.phase_offset - distribution_offset + 1.0).rem_euclid(1.0);

        let ctx = EffectContext {
            group_size: member.group_size,
            member_index: member.index,
            distribution_offset,
            has_spread: instance.distribution.has_spread(),
            distinct_slots: slots,
            triangle_phase: instance.distribution.uses_triangle_phase(),
            salt: instance.id,
        };
        let output = instance.effect.calculate(member_phase, &ctx);
        blend_output(instance.blend_mode, member, output, accumulator);
        last_phase = Some(member_phase);
    }

    last_phase
}

/// Blends one output into the accumulator. Untouched channels are seeded with
/// their neutral value first, so non-OVERRIDE blends cannot ratchet across
/// ticks.
fn blend_output(
    mode: BlendMode,
    member: &TargetMember,
    output: FxOutput,
    accumulator: &mut HashMap<(UniverseId, u16), u8>,
) {
    let mut blend = |universe: UniverseId, channel: u16, neutral: u8, value: u8| {
        let entry = accumulator.entry((universe, channel)).or_insert(neutral);
        *entry = mode.blend(*entry, value);
    };

    match (&member.property, output) {
        (Property::Slider(property), FxOutput::Slider(value)) => {
            let binding = property.binding;
            blend(binding.universe, binding.channel, 0, binding.clamp(value));
        }
        (Property::Setting(property), FxOutput::Slider(value)) => {
            let binding = property.binding;
            blend(binding.universe, binding.channel, 0, binding.clamp(value));
        }
        (Property::Colour(property), FxOutput::Colour(colour)) => {
            for (slider, value) in [
                (&property.red, colour.r),
                (&property.green, colour.g),
                (&property.blue, colour.b),
            ] {
                let binding = slider.binding;
                blend(binding.universe, binding.channel, 0, binding.clamp(value));
            }
        }
        (Property::Position(property), FxOutput::Position { pan, tilt }) => {
            let pan = if member.invert_pan { 255 - pan } else { pan };
            let pan = (i32::from(pan) + i32::from(member.pan_offset)).clamp(0, 255) as u8;
            let tilt = (i32::from(tilt) + i32::from(member.tilt_offset)).clamp(0, 255) as u8;
            let pan_binding = property.pan.binding;
            let tilt_binding = property.tilt.binding;
            blend(
                pan_binding.universe,
                pan_binding.channel,
                POSITION_CENTER,
                pan_binding.clamp(pan),
            );
            blend(
                tilt_binding.universe,
                tilt_binding.channel,
                POSITION_CENTER,
                tilt_binding.clamp(tilt),
            );
        }
        // Resolution guarantees kind agreement; anything else is inert.
        _ => {}
    }
}

/// True if a property can be driven by an effect of the given output kind.
fn property_accepts(kind: OutputKind, property: &Property) -> bool {
    matches!(
        (kind, property),
        (OutputKind::Slider, Property::Slider(_))
            | (OutputKind::Slider, Property::Setting(_))
            | (OutputKind::Colour, Property::Colour(_))
            | (OutputKind::Position, Property::Position(_))
    )
}

fn position_in(index: usize, count: usize) -> f64 {
    if count > 1 {
        index as f64 / (count - 1) as f64
    } else {
        0.5
    }
}

fn fixture_accepting_property<'a>(
    fixture: &'a Fixture,
    name: &str,
    kind: OutputKind,
) -> Option<&'a Property> {
    fixture
        .property(name)
        .filter(|property| property_accepts(kind, property))
}

/// Expands elements of one fixture into target members using per-parent
/// indexing.
fn element_members(
    fixture: &Fixture,
    name: &str,
    pan_offset: i16,
    tilt_offset: i16,
    invert_pan: bool,
) -> Vec<TargetMember> {
    let count = fixture.elements().len();
    fixture
        .elements()
        .iter()
        .map(|element| TargetMember {
            fixture_key: fixture.key.clone(),
            property: element
                .property(name)
                .expect("element property checked by caller")
                .clone(),
            index: element.index,
            group_size: count,
            normalized_position: position_in(element.index, count),
            pan_offset,
            tilt_offset,
            invert_pan,
        })
        .collect()
}

/// Resolves a target to the concrete members the engine will drive this tick.
///
/// A fixture's own property wins over element expansion. For group targets,
/// either every leaf exposes the property directly, or every leaf is a
/// multi-element fixture whose elements expose it; mixed groups do not
/// resolve.
fn resolve_targets(
    patch: &Patch,
    target: &FxTarget,
    kind: OutputKind,
    element_mode: ElementMode,
) -> Result<Vec<TargetMember>, FxError> {
    let property_name = &target.property;
    match &target.reference {
        FxTargetRef::Fixture(key) => {
            let fixture = patch.fixture(key)?;
            if let Some(property) = fixture_accepting_property(fixture, property_name, kind) {
                return Ok(vec![TargetMember {
                    fixture_key: fixture.key.clone(),
                    property: property.clone(),
                    index: 0,
                    group_size: 1,
                    normalized_position: 0.5,
                    pan_offset: 0,
                    tilt_offset: 0,
                    invert_pan: false,
                }]);
            }
            let elements_accept = fixture.is_multi_element()
                && fixture.elements().iter().all(|element| {
                    element
                        .property(property_name)
                        .map(|property| property_accepts(kind, property))
                        .unwrap_or(false)
                });
            if elements_accept {
                // elementMode is irrelevant with a single parent.
                return Ok(element_members(fixture, property_name, 0, 0, false));
            }
            if fixture.property(property_name).is_some() {
                return Err(FxError::IncompatibleTarget {
                    target: key.clone(),
                    property: property_name.clone(),
                    kind,
                });
            }
            Err(FxError::Patch(PatchError::UnknownProperty {
                target: key.clone(),
                property: property_name.clone(),
            }))
        }
        FxTargetRef::Group(name) => {
            let group = patch.group(name)?;
            let members = group.all_members();
            if members.is_empty() {
                return Err(FxError::Patch(PatchError::UnknownProperty {
                    target: name.clone(),
                    property: property_name.clone(),
                }));
            }

            let mut fixtures = Vec::with_capacity(members.len());
            for member in &members {
                fixtures.push(patch.fixture(&member.fixture_key)?);
            }

            let all_direct = fixtures
                .iter()
                .all(|fixture| fixture_accepting_property(fixture, property_name, kind).is_some());
            if all_direct {
                let count = members.len();
                return Ok(members
                    .iter()
                    .zip(&fixtures)
                    .map(|(member, fixture)| TargetMember {
                        fixture_key: fixture.key.clone(),
                        property: fixture_accepting_property(fixture, property_name, kind)
                            .expect("checked above")
                            .clone(),
                        index: member.index,
                        group_size: count,
                        normalized_position: member.normalized_position,
                        pan_offset: member.meta.pan_offset,
                        tilt_offset: member.meta.tilt_offset,
                        invert_pan: member.meta.symmetric_invert,
                    })
                    .collect());
            }

            let all_elements = fixtures.iter().all(|fixture| {
                fixture.is_multi_element()
                    && fixture.elements().iter().all(|element| {
                        element
                            .property(property_name)
                            .map(|property| property_accepts(kind, property))
                            .unwrap_or(false)
                    })
            });
            if !all_elements {
                return Err(FxError::Patch(PatchError::UnknownProperty {
                    target: name.clone(),
                    property: property_name.clone(),
                }));
            }

            match element_mode {
                ElementMode::PerFixture => {
                    let mut result = Vec::new();
                    for (member, fixture) in members.iter().zip(&fixtures) {
                        result.extend(element_members(
                            fixture,
                            property_name,
                            member.meta.pan_offset,
                            member.meta.tilt_offset,
                            member.meta.symmetric_invert,
                        ));
                    }
                    Ok(result)
                }
                ElementMode::Flat => {
                    let total: usize =
                        fixtures.iter().map(|fixture| fixture.elements().len()).sum();
                    let mut result = Vec::new();
                    let mut index = 0;
                    for (member, fixture) in members.iter().zip(&fixtures) {
                        for element in fixture.elements() {
                            result.push(TargetMember {
                                fixture_key: fixture.key.clone(),
                                property: element
                                    .property(property_name)
                                    .expect("checked above")
                                    .clone(),
                                index,
                                group_size: total,
                                normalized_position: position_in(index, total),
                                pan_offset: member.meta.pan_offset,
                                tilt_offset: member.meta.tilt_offset,
                                invert_pan: member.meta.symmetric_invert,
                            });
                            index += 1;
                        }
                    }
                    Ok(result)
                }
            }
        }
    }
}
