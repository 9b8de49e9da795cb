use tracing::debug;

use crate::animation::{Animation, AnimationFactory, NoteEvent, HUE, LOOP_SIZE};
use crate::events::TopologyEvent;
use crate::id::{AnimationId, GroupId, ProgramId};
use crate::scene::Scene;
use crate::timeline::Tick;
use crate::Result;

/// Ordered animations sharing one enable switch; a track on the control
/// surface.
///
/// Sequence position is the z-order. A group that loses its last animation
/// marks itself for removal and is swept by its program.
#[derive(Debug)]
pub struct AnimationGroup {
    id: GroupId,
    program: Option<ProgramId>,
    animations: Vec<Animation>,
    enabled: bool,
    alive: bool,
    visible: bool,
    pending_removal: bool,
    events_blocked: bool,
    events: Vec<TopologyEvent>,
}

impl Default for AnimationGroup {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationGroup {
    pub fn new() -> Self {
        Self {
            id: GroupId::next(),
            program: None,
            animations: Vec::new(),
            enabled: false,
            alive: false,
            visible: false,
            pending_removal: false,
            events_blocked: false,
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    pub(crate) fn set_program(&mut self, program: Option<ProgramId>) {
        self.program = program;
    }

    pub fn animations(&self) -> &[Animation] {
        &self.animations
    }

    pub fn len(&self) -> usize {
        self.animations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.animations.is_empty()
    }

    pub fn animation_at(&self, index: usize) -> Option<&Animation> {
        self.animations.get(index)
    }

    pub fn animation_at_mut(&mut self, index: usize) -> Option<&mut Animation> {
        self.animations.get_mut(index)
    }

    pub fn animation(&self, id: AnimationId) -> Option<&Animation> {
        self.animations.iter().find(|a| a.id() == id)
    }

    pub fn animation_mut(&mut self, id: AnimationId) -> Option<&mut Animation> {
        self.animations.iter_mut().find(|a| a.id() == id)
    }

    pub fn index_of(&self, id: AnimationId) -> Option<usize> {
        self.animations.iter().position(|a| a.id() == id)
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// True while enabled or while any child still drains items.
    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Set once the group became empty; the owning program drops it on its
    /// next sweep.
    pub fn is_pending_removal(&self) -> bool {
        self.pending_removal
    }

    pub fn add_animation(&mut self, animation: Animation) {
        self.insert_animation(animation, None);
    }

    /// Instantiates `class_name` with its hue and loop size preferred for
    /// knob binding, then inserts it at `index` (`None` appends).
    pub fn create_animation(
        &mut self,
        factory: &mut AnimationFactory,
        class_name: &str,
        index: Option<usize>,
    ) -> Result<AnimationId> {
        let mut animation = factory.create(class_name)?;
        animation.set_preferred(HUE, true)?;
        animation.set_preferred(LOOP_SIZE, true)?;
        animation.discard_events();
        let id = animation.id();
        self.insert_animation(animation, index);
        Ok(id)
    }

    /// Inserts at `index` (`None` appends), re-derives z-order, and applies
    /// the group's enabled state to the newcomer.
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_animation(&mut self, mut animation: Animation, index: Option<usize>) {
        let index = index.unwrap_or(self.animations.len());
        assert!(
            index <= self.animations.len(),
            "insert index {index} out of range for group {} with {} animations",
            self.id,
            self.animations.len()
        );

        animation.set_group(Some(self.id));
        animation.set_enabled(self.enabled);
        let id = animation.id();
        self.animations.insert(index, animation);
        self.pending_removal = false;
        self.reorder_animations();

        if !self.events_blocked {
            self.events.push(TopologyEvent::AnimationAdded {
                group: self.id,
                animation: id,
            });
        }
    }

    fn reorder_animations(&mut self) {
        for (z, animation) in self.animations.iter_mut().enumerate() {
            animation.set_z_value(z as i32);
        }
    }

    /// Moves the animation at `src_index` to `dest_index` of `dest`, or within
    /// this group when `dest` is `None`. A `None` index means the end.
    ///
    /// Moves are reported once, as [`TopologyEvent::AnimationMoved`] from this
    /// group; the destination does not report an addition.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn move_animation(
        &mut self,
        src_index: usize,
        dest_index: Option<usize>,
        dest: Option<&mut AnimationGroup>,
    ) {
        assert!(
            src_index < self.animations.len(),
            "source index {src_index} out of range for group {} with {} animations",
            self.id,
            self.animations.len()
        );

        match dest {
            None => {
                let dest_index = dest_index.unwrap_or(self.animations.len() - 1);
                assert!(
                    dest_index < self.animations.len(),
                    "destination index {dest_index} out of range for group {}",
                    self.id
                );
                if src_index == dest_index {
                    return;
                }
                let animation = self.animations.remove(src_index);
                self.animations.insert(dest_index, animation);
                self.reorder_animations();
                let animation = self.animations[dest_index].id();
                debug!(group = %self.id, %animation, src_index, dest_index, "animation reordered");
                self.events.push(TopologyEvent::AnimationMoved {
                    group: self.id,
                    animation,
                    destination: self.program,
                });
            }
            Some(dest) => {
                let animation = self.take_animation_at(src_index);
                let id = animation.id();
                dest.events_blocked = true;
                dest.insert_animation(animation, dest_index);
                dest.events_blocked = false;
                debug!(from = %self.id, to = %dest.id, animation = %id, "animation moved between groups");
                self.events.push(TopologyEvent::AnimationMoved {
                    group: self.id,
                    animation: id,
                    destination: dest.program,
                });
            }
        }
    }

    /// Detaches the animation at `index` without destroying it.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn take_animation_at(&mut self, index: usize) -> Animation {
        assert!(
            index < self.animations.len(),
            "take index {index} out of range for group {} with {} animations",
            self.id,
            self.animations.len()
        );
        let mut animation = self.animations.remove(index);
        animation.set_group(None);
        self.reorder_animations();
        if self.animations.is_empty() {
            self.pending_removal = true;
        }
        animation
    }

    /// Removes and destroys the animation at `index`, releasing its items.
    pub fn remove_animation_at(&mut self, index: usize, scene: &mut Scene) {
        let mut animation = self.take_animation_at(index);
        animation.release(scene);
    }

    /// Cascades to every animation. Turning on makes the group alive at once;
    /// turning off leaves it alive until the children drain.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;
        for animation in &mut self.animations {
            animation.set_enabled(enabled);
        }
        if enabled {
            self.set_alive(true);
        }
        self.events.push(TopologyEvent::GroupEnabledChanged {
            group: self.id,
            enabled,
        });
    }

    pub fn toggle(&mut self) {
        self.set_enabled(!self.enabled);
    }

    fn set_alive(&mut self, alive: bool) {
        self.alive = alive;
        self.visible = alive;
    }

    /// Ticks every alive child in z-order, then recomputes liveness.
    pub fn animate(&mut self, scene: &mut Scene, tick: &Tick) {
        let mut alive = false;
        for animation in &mut self.animations {
            if animation.is_alive() {
                animation.animate(scene, tick);
            }
            alive |= animation.is_alive();
        }
        self.set_alive(alive);
    }

    /// Asks every instrumented child for one item on the next tick.
    pub fn create_item(&mut self) {
        let mut alive = self.alive;
        for animation in &mut self.animations {
            if animation.is_instrumented() {
                animation.request_item();
                alive |= animation.is_alive();
            }
        }
        self.set_alive(alive);
    }

    pub fn handle_note(&mut self, note: NoteEvent) {
        for animation in &mut self.animations {
            animation.handle_note(note);
        }
    }

    /// Releases every in-flight item of every child.
    pub fn release(&mut self, scene: &mut Scene) {
        for animation in &mut self.animations {
            animation.release(scene);
        }
    }

    pub(crate) fn drain_events(&mut self, out: &mut Vec<TopologyEvent>) {
        out.append(&mut self.events);
        for animation in &mut self.animations {
            animation.drain_events(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn factory() -> AnimationFactory {
        AnimationFactory::with_seed(24, Some(42))
    }

    fn group_with(count: usize) -> (AnimationGroup, Vec<AnimationId>) {
        let mut factory = factory();
        let mut group = AnimationGroup::new();
        let ids = (0..count)
            .map(|_| group.create_animation(&mut factory, "falling-objects", None).unwrap())
            .collect();
        (group, ids)
    }

    fn drain(group: &mut AnimationGroup) -> Vec<TopologyEvent> {
        let mut events = Vec::new();
        group.drain_events(&mut events);
        events
    }

    fn order(group: &AnimationGroup) -> Vec<AnimationId> {
        group.animations().iter().map(Animation::id).collect()
    }

    #[test]
    fn insert_rederives_z_order_and_propagates_enable() {
        let (mut group, ids) = group_with(2);
        group.set_enabled(true);
        let mut factory = factory();
        let front = factory.create("text").unwrap();
        let front_id = front.id();
        group.insert_animation(front, Some(0));

        assert_eq!(order(&group), vec![front_id, ids[0], ids[1]]);
        for (z, animation) in group.animations().iter().enumerate() {
            assert_eq!(animation.z_value(), z as i32);
            assert_eq!(animation.group(), Some(group.id()));
        }
        assert!(group.animation(front_id).unwrap().enabled());
    }

    #[test]
    fn created_animations_prefer_hue_and_loop_size() {
        let (group, _) = group_with(1);
        let preferred: Vec<&str> = group.animations()[0]
            .parameters()
            .iter()
            .filter(|p| p.is_preferred())
            .map(|p| p.name())
            .collect();
        assert_eq!(preferred, vec![HUE, LOOP_SIZE]);
    }

    #[test]
    fn reorders_within_the_group() {
        let (mut group, ids) = group_with(3);
        drain(&mut group);
        group.move_animation(0, Some(2), None);
        assert_eq!(order(&group), vec![ids[1], ids[2], ids[0]]);
        assert_eq!(group.animations()[2].z_value(), 2);
        assert_eq!(
            drain(&mut group),
            vec![TopologyEvent::AnimationMoved {
                group: group.id(),
                animation: ids[0],
                destination: None,
            }]
        );

        group.move_animation(1, Some(1), None);
        assert!(drain(&mut group).is_empty());
    }

    #[test]
    fn moves_between_groups_report_once() {
        let (mut source, src_ids) = group_with(2);
        let (mut dest, dest_ids) = group_with(2);
        dest.set_enabled(true);
        drain(&mut source);
        drain(&mut dest);

        source.move_animation(1, None, Some(&mut dest));

        assert_eq!(source.len() + dest.len(), 4);
        assert_eq!(order(&dest), vec![dest_ids[0], dest_ids[1], src_ids[1]]);
        let moved = dest.animation(src_ids[1]).unwrap();
        assert_eq!(moved.group(), Some(dest.id()));
        assert!(moved.enabled());
        assert!(drain(&mut dest).is_empty());
        assert_eq!(
            drain(&mut source),
            vec![TopologyEvent::AnimationMoved {
                group: source.id(),
                animation: src_ids[1],
                destination: None,
            }]
        );
    }

    #[test]
    fn emptied_group_marks_itself_for_removal() {
        let (mut group, _) = group_with(1);
        let animation = group.take_animation_at(0);
        assert_eq!(animation.group(), None);
        assert!(group.is_pending_removal());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn take_out_of_range_panics() {
        let (mut group, _) = group_with(1);
        group.take_animation_at(3);
    }

    #[test]
    fn stays_alive_until_children_drain() {
        let mut scene = Scene::new(16, 16);
        let (mut group, _) = group_with(2);
        group.set_enabled(true);
        assert!(group.is_alive());

        group.animate(&mut scene, &Tick::at(0, 24, 16));
        assert!(scene.len() >= 2);
        group.set_enabled(false);
        assert!(group.is_alive());

        for uppqn in 1..24 {
            group.animate(&mut scene, &Tick::at(uppqn, 24, 16));
            assert!(group.is_alive(), "still draining at {uppqn}");
        }
        group.animate(&mut scene, &Tick::at(24, 24, 16));
        assert!(!group.is_alive());
        assert!(scene.is_empty());
    }

    #[test]
    fn enable_changes_are_reported() {
        let (mut group, _) = group_with(1);
        drain(&mut group);
        group.toggle();
        group.set_enabled(true);
        assert_eq!(
            drain(&mut group),
            vec![TopologyEvent::GroupEnabledChanged {
                group: group.id(),
                enabled: true,
            }]
        );
    }

    #[test]
    fn create_item_wakes_instrumented_children() {
        let mut scene = Scene::new(16, 16);
        let (mut group, _) = group_with(1);
        group.create_item();
        assert!(group.is_alive());
        group.animate(&mut scene, &Tick::at(3, 24, 16));
        assert_eq!(group.animations()[0].live_items(), 1);
    }
}
