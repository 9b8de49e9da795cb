//! Animations: per-tick effect generators and their shared lifecycle.
//!
//! An [`Animation`] owns the state every effect needs (enable/alive flags,
//! parameters, the item ledger, an RNG) and delegates the artistic part to a
//! boxed [`Effect`]. Spawned items outlive the enabled flag: a disabled
//! animation stays alive until its ledger drains.

mod factory;
mod falling;
mod ledger;
mod text;

pub use factory::AnimationFactory;
pub use falling::{slot_offsets, spawn_count, Direction, FallingObjects};
pub use ledger::{AnimatedItem, ItemLedger};
pub use text::TextAnimation;

use std::fmt;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::events::TopologyEvent;
use crate::id::{AnimationId, GroupId};
use crate::parameter::{LoopSize, Parameter, ParameterSet};
use crate::scene::{Color, Scene};
use crate::timeline::Tick;
use crate::{BeatVizError, Result};

/// Parameter gating beat-driven spawns.
pub const LOOP_SIZE: &str = "loop-size";
pub const HUE: &str = "hue";
pub const LIGHTNESS: &str = "lightness";

/// Static metadata describing an animation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationDescription {
    pub name: &'static str,
    pub tooltip: &'static str,
    pub class_name: &'static str,
}

/// A note event as delivered by the MIDI transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub interface: i32,
    pub channel: u8,
    pub pitch: u8,
    pub on: bool,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn on(channel: u8, pitch: u8, velocity: u8) -> Self {
        Self {
            interface: 0,
            channel,
            pitch,
            on: true,
            velocity,
        }
    }

    /// Note-on with a zero velocity is a note-off by MIDI convention.
    pub fn is_note_on(&self) -> bool {
        self.on && self.velocity > 0
    }
}

/// Everything an effect may touch while spawning items.
pub struct EffectContext<'a> {
    pub scene: &'a mut Scene,
    pub ledger: &'a mut ItemLedger,
    pub parameters: &'a ParameterSet,
    pub rng: &'a mut StdRng,
    /// Ticks per quarter note.
    pub resolution: u32,
}

impl EffectContext<'_> {
    /// Color built from the common hue and lightness parameters.
    pub fn base_color(&self) -> Color {
        base_color(self.parameters)
    }
}

fn base_color(parameters: &ParameterSet) -> Color {
    Color::from_hsv(
        parameters.real(HUE) as f32,
        1.0,
        parameters.real(LIGHTNESS) as f32,
    )
}

/// Kind-specific behaviour plugged into an [`Animation`].
pub trait Effect: fmt::Debug + Send {
    fn description(&self) -> AnimationDescription;

    /// Adds the kind-specific parameters, in declaration order.
    fn declare_parameters(&self, parameters: &mut ParameterSet);

    /// Instrumented effects react to notes and manual item requests.
    fn is_instrumented(&self) -> bool {
        false
    }

    /// Spawns the items of one beat boundary.
    fn spawn(&mut self, ctx: &mut EffectContext<'_>, uppqn: u64);

    /// Spawns the single item triggered by `note`.
    fn spawn_note(&mut self, ctx: &mut EffectContext<'_>, uppqn: u64, note: &NoteEvent) {
        let _ = (ctx, uppqn, note);
    }

    /// Moves a live item to match `progress`.
    fn advance(&self, scene: &mut Scene, parameters: &ParameterSet, item: &AnimatedItem, progress: f64);
}

pub struct Animation {
    id: AnimationId,
    group: Option<GroupId>,
    enabled: bool,
    alive: bool,
    visible: bool,
    z_value: i32,
    resolution: u32,
    parameters: ParameterSet,
    ledger: ItemLedger,
    rng: StdRng,
    pending_notes: Vec<NoteEvent>,
    item_requested: bool,
    events: Vec<TopologyEvent>,
    effect: Box<dyn Effect>,
}

impl Animation {
    /// Wraps `effect` with the common parameters and an OS-seeded RNG.
    pub fn new(effect: Box<dyn Effect>, resolution: u32) -> Self {
        Self::with_rng(effect, resolution, StdRng::from_rng(&mut rand::rng()))
    }

    /// Same as [`Animation::new`] with a reproducible RNG.
    pub fn with_seed(effect: Box<dyn Effect>, resolution: u32, seed: u64) -> Self {
        Self::with_rng(effect, resolution, StdRng::seed_from_u64(seed))
    }

    fn with_rng(effect: Box<dyn Effect>, resolution: u32, rng: StdRng) -> Self {
        let mut parameters = ParameterSet::new();
        parameters.add(Parameter::real(HUE, "Hue", 0.0));
        parameters.add(Parameter::real(LIGHTNESS, "Lightness", 1.0));
        parameters.add(Parameter::beat(LOOP_SIZE, "Loop size", LoopSize::ONE));
        effect.declare_parameters(&mut parameters);

        Self {
            id: AnimationId::next(),
            group: None,
            enabled: false,
            alive: false,
            visible: false,
            z_value: 0,
            resolution: resolution.max(1),
            parameters,
            ledger: ItemLedger::new(),
            rng,
            pending_notes: Vec::new(),
            item_requested: false,
            events: Vec::new(),
            effect,
        }
    }

    pub fn id(&self) -> AnimationId {
        self.id
    }

    pub fn describe(&self) -> AnimationDescription {
        self.effect.description()
    }

    pub fn class_name(&self) -> &'static str {
        self.effect.description().class_name
    }

    pub fn is_instrumented(&self) -> bool {
        self.effect.is_instrumented()
    }

    /// Owning group, if attached.
    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub(crate) fn set_group(&mut self, group: Option<GroupId>) {
        self.group = group;
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// An enabled animation is alive; a disabled one stays alive while its
    /// items drain.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            self.set_alive(true);
        }
    }

    fn set_alive(&mut self, alive: bool) {
        self.alive = alive;
        self.visible = alive;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn z_value(&self) -> i32 {
        self.z_value
    }

    pub(crate) fn set_z_value(&mut self, z: i32) {
        self.z_value = z;
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    /// Restores one parameter from its property-list value.
    pub fn set_parameter_from_property(&mut self, name: &str, value: &str) -> Result<()> {
        self.parameters
            .get_mut(name)
            .ok_or_else(|| BeatVizError::UnknownParameter(name.to_string()))?
            .set_from_property(value)
    }

    pub fn set_parameter_from_midi(&mut self, name: &str, value: u8) -> Result<()> {
        self.parameters
            .get_mut(name)
            .ok_or_else(|| BeatVizError::UnknownParameter(name.to_string()))?
            .set_value_from_midi(value);
        Ok(())
    }

    /// Flags a parameter for knob binding; emits an attribute-changed event
    /// when the flag flips.
    pub fn set_preferred(&mut self, name: &str, preferred: bool) -> Result<()> {
        let parameter = self
            .parameters
            .get_mut(name)
            .ok_or_else(|| BeatVizError::UnknownParameter(name.to_string()))?;
        if parameter.set_preferred(preferred) {
            self.events.push(TopologyEvent::ParameterAttributesChanged {
                animation: self.id,
                parameter: name.to_string(),
            });
        }
        Ok(())
    }

    /// Sets hue and lightness from `color`; saturation is not a parameter.
    pub fn set_color(&mut self, color: Color) -> Result<()> {
        let (hue, _, value) = color.to_hsv();
        for (name, real) in [(HUE, hue), (LIGHTNESS, value)] {
            self.parameters
                .get_mut(name)
                .ok_or_else(|| BeatVizError::UnknownParameter(name.to_string()))?
                .set_real(f64::from(real))?;
        }
        Ok(())
    }

    pub fn color(&self) -> Color {
        base_color(&self.parameters)
    }

    pub fn loop_size(&self) -> LoopSize {
        self.parameters.beat(LOOP_SIZE)
    }

    /// Number of items currently in flight.
    pub fn live_items(&self) -> usize {
        self.ledger.len()
    }

    pub fn ledger(&self) -> &ItemLedger {
        &self.ledger
    }

    /// Queues a note for the next tick. Only enabled instrumented
    /// animations listen, and only to note-on.
    pub fn handle_note(&mut self, note: NoteEvent) {
        if self.enabled && self.is_instrumented() && note.is_note_on() {
            self.pending_notes.push(note);
        }
    }

    /// Asks for one beat batch on the next tick, bypassing the beat gate
    /// and the enabled flag.
    pub fn request_item(&mut self) {
        if self.is_instrumented() {
            self.item_requested = true;
            self.set_alive(true);
        }
    }

    /// Spawns the item for `note` right away at `uppqn`. Effects without
    /// note support leave the animation untouched.
    pub fn start_note(&mut self, scene: &mut Scene, uppqn: u64, note: &NoteEvent) {
        let before = self.ledger.len();
        let mut ctx = EffectContext {
            scene,
            ledger: &mut self.ledger,
            parameters: &self.parameters,
            rng: &mut self.rng,
            resolution: self.resolution,
        };
        self.effect.spawn_note(&mut ctx, uppqn, note);
        if self.ledger.len() > before {
            self.set_alive(true);
        }
    }

    /// Per-tick entry point: spawn, reap, advance, then update liveness.
    pub fn animate(&mut self, scene: &mut Scene, tick: &Tick) {
        {
            let mut ctx = EffectContext {
                scene: &mut *scene,
                ledger: &mut self.ledger,
                parameters: &self.parameters,
                rng: &mut self.rng,
                resolution: self.resolution,
            };
            for note in self.pending_notes.drain(..) {
                self.effect.spawn_note(&mut ctx, tick.uppqn, &note);
            }
            if std::mem::take(&mut self.item_requested) {
                self.effect.spawn(&mut ctx, tick.uppqn);
            }
            let loop_size = self.parameters.beat(LOOP_SIZE);
            if self.enabled && loop_size.is_beat(tick.gppqn, self.resolution) {
                self.effect.spawn(&mut ctx, tick.uppqn);
            }
        }

        for item in self.ledger.remove_completed(tick.uppqn) {
            scene.destroy(item.handle());
        }

        for item in self.ledger.iter() {
            let progress = item.progress_for_uppqn(tick.uppqn);
            self.effect.advance(scene, &self.parameters, item, progress);
        }

        if !self.enabled && self.ledger.is_empty() {
            self.set_alive(false);
        }
    }

    /// Destroys every in-flight item, e.g. before dropping the animation.
    pub fn release(&mut self, scene: &mut Scene) {
        for item in self.ledger.drain() {
            scene.destroy(item.handle());
        }
        self.pending_notes.clear();
        self.item_requested = false;
        if !self.enabled {
            self.set_alive(false);
        }
    }

    pub(crate) fn drain_events(&mut self, out: &mut Vec<TopologyEvent>) {
        out.append(&mut self.events);
    }

    pub(crate) fn discard_events(&mut self) {
        self.events.clear();
    }
}

impl fmt::Debug for Animation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animation")
            .field("id", &self.id)
            .field("class", &self.class_name())
            .field("enabled", &self.enabled)
            .field("alive", &self.alive)
            .field("items", &self.ledger.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn falling(seed: u64) -> Animation {
        Animation::with_seed(Box::new(FallingObjects::new()), 24, seed)
    }

    fn tick(uppqn: u64) -> Tick {
        Tick::at(uppqn, 24, 16)
    }

    #[test]
    fn common_parameters_come_first() {
        let animation = falling(1);
        let names: Vec<&str> = animation.parameters().iter().map(|p| p.name()).collect();
        assert_eq!(&names[..3], &[HUE, LIGHTNESS, LOOP_SIZE]);
        assert!(names.contains(&"density"));
    }

    #[test]
    fn enabled_animation_spawns_on_beat_only() {
        let mut scene = Scene::new(10, 10);
        let mut animation = falling(1);
        animation.set_enabled(true);

        animation.animate(&mut scene, &tick(0));
        assert_eq!(animation.live_items(), 1);
        for uppqn in 1..24 {
            animation.animate(&mut scene, &tick(uppqn));
        }
        // The first item completes on tick 24, the beat spawns a fresh one.
        animation.animate(&mut scene, &tick(24));
        assert_eq!(animation.live_items(), 1);
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn disabled_animation_drains_before_dying() {
        let mut scene = Scene::new(10, 10);
        let mut animation = falling(2);
        animation.set_enabled(true);
        animation.animate(&mut scene, &tick(0));
        animation.set_enabled(false);
        assert!(animation.is_alive());

        for uppqn in 1..24 {
            animation.animate(&mut scene, &tick(uppqn));
            assert!(animation.is_alive(), "alive while draining at {uppqn}");
        }
        animation.animate(&mut scene, &tick(24));
        assert!(!animation.is_alive());
        assert!(scene.is_empty());
    }

    #[test]
    fn preferred_changes_emit_attribute_events() {
        let mut animation = falling(3);
        animation.set_preferred(HUE, true).unwrap();
        animation.set_preferred(HUE, true).unwrap();
        let mut events = Vec::new();
        animation.drain_events(&mut events);
        assert_eq!(
            events,
            vec![TopologyEvent::ParameterAttributesChanged {
                animation: animation.id(),
                parameter: HUE.to_string(),
            }]
        );
        assert!(animation.set_preferred("nope", true).is_err());
    }

    #[test]
    fn notes_are_ignored_while_disabled() {
        let mut scene = Scene::new(10, 10);
        let mut animation = falling(4);
        animation.handle_note(NoteEvent::on(0, 60, 100));
        animation.animate(&mut scene, &tick(1));
        assert_eq!(animation.live_items(), 0);

        animation.set_enabled(true);
        animation.handle_note(NoteEvent::on(0, 60, 100));
        animation.handle_note(NoteEvent::on(0, 61, 0));
        animation.animate(&mut scene, &tick(2));
        assert_eq!(animation.live_items(), 1);
    }

    #[test]
    fn requested_item_spawns_without_beat_or_enable() {
        let mut scene = Scene::new(10, 10);
        let mut animation = falling(5);
        animation.request_item();
        assert!(animation.is_alive());
        animation.animate(&mut scene, &tick(5));
        assert_eq!(animation.live_items(), 1);
        assert!(animation.is_alive());
    }

    #[test]
    fn release_destroys_in_flight_items() {
        let mut scene = Scene::new(10, 10);
        let mut animation = falling(6);
        animation.set_enabled(true);
        animation.animate(&mut scene, &tick(0));
        animation.set_enabled(false);
        animation.release(&mut scene);
        assert!(scene.is_empty());
        assert!(!animation.is_alive());
    }
    #[test]
    fn set_color_writes_hue_and_lightness() {
        let mut animation = falling(7);
        animation.set_color(Color::from_hsv(0.5, 1.0, 0.75)).unwrap();
        assert!((animation.parameters().real(HUE) - 0.5).abs() < 1e-4);
        assert!((animation.parameters().real(LIGHTNESS) - 0.75).abs() < 1e-4);
        let (hue, _, value) = animation.color().to_hsv();
        assert!((hue - 0.5).abs() < 1e-4);
        assert!((value - 0.75).abs() < 1e-4);
    }

    #[test]
    fn start_note_only_wakes_animations_that_spawned() {
        let mut scene = Scene::new(10, 10);
        let mut text = Animation::with_seed(Box::new(TextAnimation::new()), 24, 8);
        text.start_note(&mut scene, 3, &NoteEvent::on(0, 60, 100));
        assert!(!text.is_alive());
        assert!(!text.is_visible());
        assert!(scene.is_empty());

        let mut animation = falling(9);
        animation.start_note(&mut scene, 3, &NoteEvent::on(0, 60, 100));
        assert!(animation.is_alive());
        assert_eq!(animation.live_items(), 1);
    }
}
