//! Arena of graphical handles standing in for the rendering backend.
//!
//! Animations never own drawable objects directly: they hold [`ItemHandle`]s
//! into the [`Scene`] and release them explicitly when an item is reaped.
//! Handles are generational, so a released handle never aliases a later item.

use serde::{Deserialize, Serialize};

/// RGBA color with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Builds an opaque color from hue, saturation and value, all in `[0, 1]`.
    /// Hue wraps around.
    pub fn from_hsv(hue: f32, saturation: f32, value: f32) -> Self {
        let h = hue.rem_euclid(1.0) * 6.0;
        let s = saturation.clamp(0.0, 1.0);
        let v = value.clamp(0.0, 1.0);
        let c = v * s;
        let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
        let m = v - c;
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        Self::rgba(r + m, g + m, b + m, 1.0)
    }

    /// Returns `(hue, saturation, value)`.
    pub fn to_hsv(&self) -> (f32, f32, f32) {
        let max = self.r.max(self.g).max(self.b);
        let min = self.r.min(self.g).min(self.b);
        let delta = max - min;
        let hue = if delta <= f32::EPSILON {
            0.0
        } else if max == self.r {
            ((self.g - self.b) / delta).rem_euclid(6.0) / 6.0
        } else if max == self.g {
            ((self.b - self.r) / delta + 2.0) / 6.0
        } else {
            ((self.r - self.g) / delta + 4.0) / 6.0
        };
        let saturation = if max <= f32::EPSILON { 0.0 } else { delta / max };
        (hue, saturation, max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Linear gradient running from `start` to `end` along one axis of the item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    pub vertical: bool,
    pub start: Color,
    pub end: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ItemShape {
    Rect { rect: Rect, fill: Gradient },
    Text { text: String, color: Color },
}

/// A drawable element as the backend sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneItem {
    pub shape: ItemShape,
    pub pos: Point,
    pub scale: f64,
    pub visible: bool,
    /// Opaque tag attached by the creating animation.
    pub tag: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItemHandle {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    item: Option<SceneItem>,
}

/// Handle arena sized to the rendered region.
#[derive(Debug)]
pub struct Scene {
    width: u32,
    height: u32,
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl Scene {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Changes the rendered region. Live items keep their positions.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Creates a gradient-filled rectangle positioned at the origin.
    pub fn create_rect(&mut self, rect: Rect, fill: Gradient, tag: i32) -> ItemHandle {
        self.insert(SceneItem {
            shape: ItemShape::Rect { rect, fill },
            pos: Point::default(),
            scale: 1.0,
            visible: true,
            tag,
        })
    }

    pub fn create_text(&mut self, text: &str, color: Color, pos: Point, tag: i32) -> ItemHandle {
        self.insert(SceneItem {
            shape: ItemShape::Text {
                text: text.to_string(),
                color,
            },
            pos,
            scale: 1.0,
            visible: true,
            tag,
        })
    }

    pub fn get(&self, handle: ItemHandle) -> Option<&SceneItem> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.item.as_ref())
    }

    fn get_mut(&mut self, handle: ItemHandle) -> Option<&mut SceneItem> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.item.as_mut())
    }

    pub fn pos(&self, handle: ItemHandle) -> Option<Point> {
        self.get(handle).map(|item| item.pos)
    }

    pub fn set_pos(&mut self, handle: ItemHandle, pos: Point) {
        if let Some(item) = self.get_mut(handle) {
            item.pos = pos;
        }
    }

    pub fn set_scale(&mut self, handle: ItemHandle, scale: f64) {
        if let Some(item) = self.get_mut(handle) {
            item.scale = scale;
        }
    }

    pub fn set_visible(&mut self, handle: ItemHandle, visible: bool) {
        if let Some(item) = self.get_mut(handle) {
            item.visible = visible;
        }
    }

    pub fn tag(&self, handle: ItemHandle) -> Option<i32> {
        self.get(handle).map(|item| item.tag)
    }

    /// Releases the item behind `handle`. Returns `false` for stale handles.
    pub fn destroy(&mut self, handle: ItemHandle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index as usize) else {
            return false;
        };
        if slot.generation != handle.generation || slot.item.is_none() {
            return false;
        }
        slot.item = None;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        self.live -= 1;
        true
    }

    fn insert(&mut self, item: SceneItem) -> ItemHandle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.item = Some(item);
            return ItemHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            item: Some(item),
        });
        ItemHandle {
            index,
            generation: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill() -> Gradient {
        Gradient {
            vertical: false,
            start: Color::TRANSPARENT,
            end: Color::WHITE,
        }
    }

    #[test]
    fn destroyed_handles_do_not_alias_new_items() {
        let mut scene = Scene::new(10, 10);
        let first = scene.create_rect(Rect::new(0.0, 0.0, 1.0, 1.0), fill(), 3);
        assert!(scene.destroy(first));
        let second = scene.create_rect(Rect::new(0.0, 0.0, 2.0, 2.0), fill(), 1);

        assert!(scene.get(first).is_none());
        assert!(!scene.destroy(first));
        assert_eq!(scene.tag(second), Some(1));
        assert_eq!(scene.len(), 1);
    }

    #[test]
    fn moves_items() {
        let mut scene = Scene::new(10, 10);
        let handle = scene.create_rect(Rect::new(0.0, 4.0, 3.0, 1.0), fill(), 0);
        scene.set_pos(handle, Point::new(2.5, 0.0));
        assert_eq!(scene.pos(handle), Some(Point::new(2.5, 0.0)));
    }

    #[test]
    fn hsv_round_trips_primary_hues() {
        let red = Color::from_hsv(0.0, 1.0, 1.0);
        assert_eq!(red, Color::rgba(1.0, 0.0, 0.0, 1.0));
        let (h, s, v) = Color::from_hsv(2.0 / 3.0, 1.0, 0.5).to_hsv();
        assert!((h - 2.0 / 3.0).abs() < 1e-5);
        assert!((s - 1.0).abs() < 1e-5);
        assert!((v - 0.5).abs() < 1e-5);
    }
}
