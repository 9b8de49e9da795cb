//! Programs: ordered sets of animation groups, the root of the tick tree.

mod snapshot;

pub use snapshot::{AnimationSnapshot, GroupSnapshot, ProgramSnapshot};

use tracing::debug;

use crate::animation::{Animation, AnimationFactory, NoteEvent};
use crate::config::SceneConfig;
use crate::events::TopologyEvent;
use crate::group::AnimationGroup;
use crate::id::{AnimationId, GroupId, ProgramId};
use crate::scene::Scene;
use crate::timeline::Tick;
use crate::{BeatVizError, Result};

/// A program renders into a scene of its own; only the program on air is
/// shown.
#[derive(Debug)]
pub struct Program {
    id: ProgramId,
    name: String,
    scene: Scene,
    groups: Vec<AnimationGroup>,
    delayed: Vec<(GroupId, bool)>,
    events: Vec<TopologyEvent>,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        let size = SceneConfig::default();
        Self {
            id: ProgramId::next(),
            name: name.into(),
            scene: Scene::new(size.width, size.height),
            groups: Vec::new(),
            delayed: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn resize_scene(&mut self, width: u32, height: u32) {
        self.scene.resize(width, height);
    }

    /// Groups in z-order; this is also the track order of the control surface.
    pub fn groups(&self) -> &[AnimationGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn group_at(&self, index: usize) -> Option<&AnimationGroup> {
        self.groups.get(index)
    }

    pub fn group_at_mut(&mut self, index: usize) -> Option<&mut AnimationGroup> {
        self.groups.get_mut(index)
    }

    pub fn group(&self, id: GroupId) -> Option<&AnimationGroup> {
        self.groups.iter().find(|g| g.id() == id)
    }

    pub fn group_mut(&mut self, id: GroupId) -> Option<&mut AnimationGroup> {
        self.groups.iter_mut().find(|g| g.id() == id)
    }

    pub fn index_of(&self, id: GroupId) -> Option<usize> {
        self.groups.iter().position(|g| g.id() == id)
    }

    /// Looks up a group coming from outside the tree.
    pub fn require_group_mut(&mut self, id: GroupId) -> Result<&mut AnimationGroup> {
        self.group_mut(id)
            .ok_or_else(|| BeatVizError::TargetNotFound(id.to_string()))
    }

    pub fn animation(&self, id: AnimationId) -> Option<&Animation> {
        self.groups.iter().find_map(|g| g.animation(id))
    }

    pub fn animation_mut(&mut self, id: AnimationId) -> Option<&mut Animation> {
        self.groups.iter_mut().find_map(|g| g.animation_mut(id))
    }

    pub fn require_animation_mut(&mut self, id: AnimationId) -> Result<&mut Animation> {
        self.animation_mut(id)
            .ok_or_else(|| BeatVizError::TargetNotFound(id.to_string()))
    }

    /// True while any group is alive.
    pub fn is_alive(&self) -> bool {
        self.groups.iter().any(AnimationGroup::is_alive)
    }

    pub fn add_group(&mut self, group: AnimationGroup) -> GroupId {
        self.insert_group(group, None)
    }

    /// Appends a fresh, empty group. It is swept unless it receives an
    /// animation before the next tick.
    pub fn create_group(&mut self) -> GroupId {
        self.add_group(AnimationGroup::new())
    }

    /// Creates a one-animation group at the end of the program.
    pub fn create_group_with(&mut self, factory: &mut AnimationFactory, class_name: &str) -> Result<GroupId> {
        let mut group = AnimationGroup::new();
        group.create_animation(factory, class_name, None)?;
        Ok(self.add_group(group))
    }

    /// Inserts at `index` (`None` appends).
    ///
    /// # Panics
    ///
    /// Panics if `index > len`.
    pub fn insert_group(&mut self, mut group: AnimationGroup, index: Option<usize>) -> GroupId {
        let index = index.unwrap_or(self.groups.len());
        assert!(
            index <= self.groups.len(),
            "insert index {index} out of range for {} with {} groups",
            self.id,
            self.groups.len()
        );
        group.set_program(Some(self.id));
        let id = group.id();
        self.groups.insert(index, group);
        self.events.push(TopologyEvent::GroupAdded {
            program: self.id,
            group: id,
        });
        id
    }

    /// Detaches the group at `index` without destroying it.
    ///
    /// # Panics
    ///
    /// Panics if `index` is out of range.
    pub fn take_group_at(&mut self, index: usize) -> AnimationGroup {
        assert!(
            index < self.groups.len(),
            "take index {index} out of range for {} with {} groups",
            self.id,
            self.groups.len()
        );
        let mut group = self.groups.remove(index);
        group.set_program(None);
        self.delayed.retain(|(id, _)| *id != group.id());
        group
    }

    /// Reorders a group within this program. `None` means the end.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn move_group(&mut self, src_index: usize, dest_index: Option<usize>) {
        let len = self.groups.len();
        assert!(src_index < len, "source index {src_index} out of range for {}", self.id);
        let dest_index = dest_index.unwrap_or(len - 1);
        assert!(dest_index < len, "destination index {dest_index} out of range for {}", self.id);
        if src_index == dest_index {
            return;
        }
        let group = self.groups.remove(src_index);
        let id = group.id();
        self.groups.insert(dest_index, group);
        self.events.push(TopologyEvent::GroupMoved {
            program: self.id,
            group: id,
            destination: self.id,
        });
    }

    /// Transfers a group to `dest` at `dest_index` (`None` appends). The
    /// move is reported once, by this program. Items the group has in flight
    /// stay behind in this program's scene and are destroyed.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn move_group_to(&mut self, src_index: usize, dest: &mut Program, dest_index: Option<usize>) {
        let index = dest_index.unwrap_or(dest.groups.len());
        assert!(
            index <= dest.groups.len(),
            "destination index {index} out of range for {}",
            dest.id
        );
        let mut group = self.take_group_at(src_index);
        group.release(&mut self.scene);
        group.set_program(Some(dest.id));
        let id = group.id();
        dest.groups.insert(index, group);
        debug!(from = %self.id, to = %dest.id, group = %id, "group moved between programs");
        self.events.push(TopologyEvent::GroupMoved {
            program: self.id,
            group: id,
            destination: dest.id,
        });
    }

    /// Moves an animation between two groups of this program, or within one
    /// group when both indices match.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    pub fn move_animation(
        &mut self,
        src_group: usize,
        src_index: usize,
        dest_group: usize,
        dest_index: Option<usize>,
    ) {
        let len = self.groups.len();
        assert!(src_group < len, "source group {src_group} out of range for {}", self.id);
        assert!(dest_group < len, "destination group {dest_group} out of range for {}", self.id);

        if src_group == dest_group {
            self.groups[src_group].move_animation(src_index, dest_index, None);
            return;
        }
        let (source, dest) = if src_group < dest_group {
            let (head, tail) = self.groups.split_at_mut(dest_group);
            (&mut head[src_group], &mut tail[0])
        } else {
            let (head, tail) = self.groups.split_at_mut(src_group);
            (&mut tail[0], &mut head[dest_group])
        };
        source.move_animation(src_index, dest_index, Some(dest));
    }

    /// Moves an animation into a group of another program. Its in-flight
    /// items are destroyed with this program's scene.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    pub fn move_animation_to(
        &mut self,
        src_group: usize,
        src_index: usize,
        dest: &mut Program,
        dest_group: usize,
        dest_index: Option<usize>,
    ) {
        assert!(src_group < self.groups.len(), "source group {src_group} out of range for {}", self.id);
        assert!(dest_group < dest.groups.len(), "destination group {dest_group} out of range for {}", dest.id);
        let source = &mut self.groups[src_group];
        if let Some(animation) = source.animation_at_mut(src_index) {
            animation.release(&mut self.scene);
        }
        source.move_animation(src_index, dest_index, Some(&mut dest.groups[dest_group]));
    }

    /// Removes and destroys one animation, releasing its items.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn remove_animation(&mut self, group: usize, index: usize) {
        self.groups[group].remove_animation_at(index, &mut self.scene);
    }

    /// Schedules an enable change for the next quarter-note boundary.
    pub fn set_delayed_enabled(&mut self, group: GroupId, enabled: bool) -> Result<()> {
        if self.group(group).is_none() {
            return Err(BeatVizError::TargetNotFound(group.to_string()));
        }
        self.delayed.retain(|(id, _)| *id != group);
        self.delayed.push((group, enabled));
        Ok(())
    }

    pub fn has_delayed_changes(&self) -> bool {
        !self.delayed.is_empty()
    }

    /// Applies due enable changes, ticks every alive group, then sweeps
    /// emptied groups.
    pub fn animate(&mut self, tick: &Tick) {
        if tick.is_quarter_note() && !self.delayed.is_empty() {
            for (id, enabled) in std::mem::take(&mut self.delayed) {
                if let Some(group) = self.group_mut(id) {
                    group.set_enabled(enabled);
                }
            }
        }
        for group in &mut self.groups {
            if group.is_alive() {
                group.animate(&mut self.scene, tick);
            }
        }
        self.sweep();
    }

    /// Drops every group that became empty; returns how many were removed.
    pub fn sweep(&mut self) -> usize {
        let mut removed = 0;
        let mut index = 0;
        while index < self.groups.len() {
            let group = &self.groups[index];
            if group.is_pending_removal() && group.is_empty() {
                let mut group = self.groups.remove(index);
                group.release(&mut self.scene);
                let id = group.id();
                self.delayed.retain(|(delayed, _)| *delayed != id);
                // Events queued before the group emptied still matter upstream.
                group.drain_events(&mut self.events);
                self.events.push(TopologyEvent::GroupRemoved {
                    program: self.id,
                    group: id,
                });
                removed += 1;
            } else {
                index += 1;
            }
        }
        if removed > 0 {
            debug!(program = %self.id, removed, "swept empty groups");
        }
        removed
    }

    pub fn handle_note(&mut self, note: NoteEvent) {
        for group in &mut self.groups {
            group.handle_note(note);
        }
    }

    /// Collects the events of the program and everything below it.
    pub fn drain_events(&mut self) -> Vec<TopologyEvent> {
        let mut events = std::mem::take(&mut self.events);
        for group in &mut self.groups {
            group.drain_events(&mut events);
        }
        events
    }

    pub fn snapshot(&self) -> ProgramSnapshot {
        ProgramSnapshot {
            name: self.name.clone(),
            groups: self
                .groups
                .iter()
                .map(|group| GroupSnapshot {
                    enabled: group.enabled(),
                    animations: group
                        .animations()
                        .iter()
                        .map(|animation| AnimationSnapshot {
                            class_name: animation.class_name().to_string(),
                            properties: animation.parameters().to_properties(),
                            preferred: animation
                                .parameters()
                                .iter()
                                .filter(|p| p.is_preferred())
                                .map(|p| p.name().to_string())
                                .collect(),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    /// Rebuilds a program; groups without animations are skipped.
    pub fn from_snapshot(factory: &mut AnimationFactory, snapshot: &ProgramSnapshot) -> Result<Self> {
        let mut program = Program::new(snapshot.name.clone());
        for group_snapshot in &snapshot.groups {
            if group_snapshot.animations.is_empty() {
                continue;
            }
            let mut group = AnimationGroup::new();
            for animation_snapshot in &group_snapshot.animations {
                let mut animation = factory.create(&animation_snapshot.class_name)?;
                for (name, value) in &animation_snapshot.properties {
                    animation.set_parameter_from_property(name, value)?;
                }
                for name in &animation_snapshot.preferred {
                    animation.set_preferred(name, true)?;
                }
                animation.discard_events();
                group.add_animation(animation);
            }
            group.set_enabled(group_snapshot.enabled);
            program.add_group(group);
        }
        Ok(program)
    }
}
