use rand::Rng;
use tracing::debug;

use super::{AnimatedItem, AnimationDescription, Effect, EffectContext, NoteEvent};
use crate::parameter::{EasingCurve, LoopSize, Parameter, ParameterSet};
use crate::scene::{Color, Gradient, Point, Rect, Scene};

const DURATION: &str = "duration";
const DENSITY: &str = "density";
const DIRECTION: &str = "direction";
const LENGTH: &str = "length";
const WIDTH: &str = "width";
const CURVE: &str = "curve";

const DIRECTION_ITEMS: [&str; 5] = ["Right", "Left", "Up", "Down", "Rand."];
const RANDOM_DIRECTION: usize = 4;

/// Sense of travel of a falling item. The discriminant is the item tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Left to right.
    Right = 0,
    /// Right to left.
    Left = 1,
    /// Bottom to top.
    Up = 2,
    /// Top to bottom.
    Down = 3,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Self::Right, Self::Left, Self::Up, Self::Down];

    pub fn from_tag(tag: i32) -> Option<Self> {
        usize::try_from(tag)
            .ok()
            .and_then(|index| Self::ALL.get(index).copied())
    }

    pub fn tag(self) -> i32 {
        self as i32
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Self::Right | Self::Left)
    }

    /// Extent of the axis items are spread along, i.e. perpendicular to travel.
    fn span(self, scene: &Scene) -> u32 {
        if self.is_horizontal() {
            scene.height()
        } else {
            scene.width()
        }
    }
}

/// Items spawned per beat: `1 + floor(density × (span − 1))`.
///
/// A zero span yields no items.
pub fn spawn_count(density: f64, span: u32) -> usize {
    if span == 0 || !density.is_finite() {
        return 0;
    }
    let density = density.clamp(0.0, 1.0);
    1 + (density * f64::from(span - 1)).floor() as usize
}

/// One jittered offset per slot: slot `i` of `count` lands in
/// `[i / count, (i + 1) / count) × span`.
pub fn slot_offsets<R: Rng + ?Sized>(count: usize, span: u32, rng: &mut R) -> Vec<f64> {
    let step = 1.0 / count as f64;
    (0..count)
        .map(|i| {
            let slot = i as f64 * step;
            (slot + rng.random::<f64>() * step) * f64::from(span)
        })
        .collect()
}

/// Beat-synced lines travelling across the scene.
#[derive(Debug, Default)]
pub struct FallingObjects;

impl FallingObjects {
    pub const CLASS_NAME: &'static str = "falling-objects";

    pub fn new() -> Self {
        Self
    }

    pub fn description_static() -> AnimationDescription {
        AnimationDescription {
            name: "Falling objects",
            tooltip: "Beat-sync moving lines",
            class_name: Self::CLASS_NAME,
        }
    }

    /// Resolves the configured direction, drawing a fresh one for "Rand.".
    fn direction<R: Rng + ?Sized>(parameters: &ParameterSet, rng: &mut R) -> Direction {
        match parameters.current_item(DIRECTION) {
            RANDOM_DIRECTION => Direction::ALL[rng.random_range(0..Direction::ALL.len())],
            index => Direction::ALL.get(index).copied().unwrap_or(Direction::Down),
        }
    }

    fn create_item(ctx: &mut EffectContext<'_>, uppqn: u64, color: Color, pos: f64, direction: Direction) {
        let duration = ctx.parameters.beat(DURATION).ticks(ctx.resolution);
        let length = item_length(ctx.parameters, ctx.scene);
        let width = item_width(ctx.parameters, ctx.scene);

        let (rect, fill) = match direction {
            Direction::Right => (
                Rect::new(0.0, pos - width / 2.0, length, width),
                gradient(false, Color::TRANSPARENT, color),
            ),
            Direction::Left => (
                Rect::new(0.0, pos - width / 2.0, length, width),
                gradient(false, color, Color::TRANSPARENT),
            ),
            Direction::Up => (
                Rect::new(pos - width / 2.0, 0.0, width, length),
                gradient(true, color, Color::TRANSPARENT),
            ),
            Direction::Down => (
                Rect::new(pos - width / 2.0, 0.0, width, length),
                gradient(true, Color::TRANSPARENT, color),
            ),
        };

        let handle = ctx.scene.create_rect(rect, fill, direction.tag());
        ctx.ledger.add(AnimatedItem::new(uppqn, duration, handle));
    }
}

fn gradient(vertical: bool, start: Color, end: Color) -> Gradient {
    Gradient {
        vertical,
        start,
        end,
    }
}

fn longest_side(scene: &Scene) -> f64 {
    f64::from(scene.width().max(scene.height()))
}

fn item_length(parameters: &ParameterSet, scene: &Scene) -> f64 {
    (parameters.real(LENGTH) * longest_side(scene)).floor().max(1.0)
}

fn item_width(parameters: &ParameterSet, scene: &Scene) -> f64 {
    (parameters.real(WIDTH) * longest_side(scene) * 2.0).floor().max(1.0)
}

impl Effect for FallingObjects {
    fn description(&self) -> AnimationDescription {
        Self::description_static()
    }

    fn declare_parameters(&self, parameters: &mut ParameterSet) {
        parameters.add(Parameter::beat(DURATION, "Duration", LoopSize::ONE));
        parameters.add(Parameter::real(DENSITY, "Density", 0.0));
        parameters.add(Parameter::items(DIRECTION, "Direction", &DIRECTION_ITEMS, 3));
        parameters.add(Parameter::real(LENGTH, "Length", 0.4));
        parameters.add(Parameter::real(WIDTH, "Width", 0.0));
        parameters.add(Parameter::easing(CURVE, "Curve", EasingCurve::Linear));
    }

    fn is_instrumented(&self) -> bool {
        true
    }

    fn spawn(&mut self, ctx: &mut EffectContext<'_>, uppqn: u64) {
        let direction = Self::direction(ctx.parameters, &mut *ctx.rng);
        let span = direction.span(ctx.scene);
        let count = spawn_count(ctx.parameters.real(DENSITY), span);
        let color = ctx.base_color();
        debug!(uppqn, count, ?direction, "spawning falling objects");

        for pos in slot_offsets(count, span, &mut *ctx.rng) {
            Self::create_item(ctx, uppqn, color, pos, direction);
        }
    }

    fn spawn_note(&mut self, ctx: &mut EffectContext<'_>, uppqn: u64, note: &NoteEvent) {
        let direction = Self::direction(ctx.parameters, &mut *ctx.rng);
        let pitch = f64::from(note.pitch.min(127)) / 128.0;
        let pos = if direction.is_horizontal() {
            (1.0 - pitch) * f64::from(ctx.scene.height())
        } else {
            pitch * f64::from(ctx.scene.width())
        };
        let color = note_color(ctx.base_color(), note);
        Self::create_item(ctx, uppqn, color, pos, direction);
    }

    fn advance(&self, scene: &mut Scene, parameters: &ParameterSet, item: &AnimatedItem, progress: f64) {
        let handle = item.handle();
        let (Some(direction), Some(current)) = (
            scene.tag(handle).and_then(Direction::from_tag),
            scene.pos(handle),
        ) else {
            return;
        };

        let eased = parameters.easing(CURVE).value_for_progress(progress);
        let length = item_length(parameters, scene);
        let travel_x = f64::from(scene.width()) + length;
        let travel_y = f64::from(scene.height()) + length;

        let pos = match direction {
            Direction::Right => Point::new(eased * travel_x - length, current.y),
            Direction::Left => Point::new((1.0 - eased) * travel_x - length, current.y),
            Direction::Up => Point::new(current.x, (1.0 - eased) * travel_y - length),
            Direction::Down => Point::new(current.x, eased * travel_y - length),
        };
        scene.set_pos(handle, pos);
    }
}

/// Base hue rotated by the channel, brightness scaled by the velocity.
fn note_color(base: Color, note: &NoteEvent) -> Color {
    let (hue, saturation, value) = base.to_hsv();
    let hue = hue + f32::from(note.channel % 16) / 16.0;
    let value = value * f32::from(note.velocity.min(127)) / 127.0;
    Color::from_hsv(hue, saturation, value)
}
