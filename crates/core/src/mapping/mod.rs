//! Control-surface mapping: a fixed grid of physical roles laid over the
//! groups and preferred parameters of the current program.
//!
//! The map is rebuilt from scratch on every relevant change. Tracks are the
//! program's groups in z-order, paged `page_width` at a time; each visible
//! track gets an enable trigger, a shift (hold) trigger with feedback, an
//! item-creation trigger, and up to `knobs_per_track` continuous controls
//! bound to preferred parameters.

mod role;
mod table;

pub use role::{Role, RoleKind};
pub use table::{Binding, ControlTarget, RoleTable, TriggerTarget};

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::SurfaceConfig;
use crate::events::TopologyEvent;
use crate::group::AnimationGroup;
use crate::id::{AnimationId, GroupId, ProgramId};
use crate::program::Program;
use crate::Result;

/// Notifications produced by a remap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperEvent {
    /// Tracks `start..end` of the program are now on the surface.
    ViewportChanged { start: usize, end: usize },
    /// Emitted after every remap, even when nothing got bound.
    Updated,
}

#[derive(Debug)]
pub struct MasterMidiMapper {
    program: Option<ProgramId>,
    page_width: usize,
    knobs_per_track: usize,
    tracks_max: usize,
    knobs_max: usize,
    offset: usize,
    tracked_groups: HashSet<GroupId>,
    tracked_animations: HashSet<AnimationId>,
    events: Vec<MapperEvent>,
}

impl MasterMidiMapper {
    pub fn new(config: &SurfaceConfig) -> Self {
        Self {
            program: None,
            page_width: config.page_width.min(config.tracks_max),
            knobs_per_track: config.knobs_per_track.min(config.knobs_max),
            tracks_max: config.tracks_max,
            knobs_max: config.knobs_max,
            offset: 0,
            tracked_groups: HashSet::new(),
            tracked_animations: HashSet::new(),
            events: Vec::new(),
        }
    }

    pub fn program(&self) -> Option<ProgramId> {
        self.program
    }

    pub fn page_width(&self) -> usize {
        self.page_width
    }

    pub fn knobs_per_track(&self) -> usize {
        self.knobs_per_track
    }

    pub fn virtual_page_offset(&self) -> usize {
        self.offset
    }

    /// Attaches (or detaches, with `None`) a program and remaps from the
    /// first page.
    pub fn set_program(&mut self, program: Option<&Program>, table: &mut RoleTable) {
        self.program = program.map(Program::id);
        self.offset = 0;
        debug!(program = ?self.program, "control surface program changed");
        self.update_map(program, table);
    }

    /// Clamps `offset` to the program's track count and remaps when it moved.
    /// Returns whether a remap happened; without a program this is a no-op.
    pub fn set_virtual_page_offset(
        &mut self,
        offset: isize,
        program: Option<&Program>,
        table: &mut RoleTable,
    ) -> bool {
        let Some(program) = self.attached(program) else {
            return false;
        };
        let max = program.len().saturating_sub(self.page_width);
        let offset = offset.clamp(0, max as isize) as usize;
        if offset == self.offset {
            return false;
        }
        self.offset = offset;
        self.update_map(Some(program), table);
        true
    }

    pub fn virtual_page_increment(&mut self, program: Option<&Program>, table: &mut RoleTable) -> bool {
        let offset = self.offset as isize + 1;
        self.set_virtual_page_offset(offset, program, table)
    }

    pub fn virtual_page_decrement(&mut self, program: Option<&Program>, table: &mut RoleTable) -> bool {
        let offset = self.offset as isize - 1;
        self.set_virtual_page_offset(offset, program, table)
    }

    fn attached<'a>(&self, program: Option<&'a Program>) -> Option<&'a Program> {
        program.filter(|p| Some(p.id()) == self.program)
    }

    /// Clears every track role of the surface and rebuilds the map for the
    /// visible page of `program`.
    pub fn update_map(&mut self, program: Option<&Program>, table: &mut RoleTable) {
        for track in 0..self.tracks_max {
            table.clear(Role::Animation(track));
            table.clear(Role::AnimationShift(track));
            table.clear(Role::AnimationCreate(track));
            for knob in 0..self.knobs_max {
                table.clear(Role::Control { track, knob });
            }
        }
        self.tracked_groups.clear();
        self.tracked_animations.clear();

        if let Some(program) = self.attached(program) {
            self.map_program(program, table);
        }
        self.events.push(MapperEvent::Updated);
    }

    fn map_program(&mut self, program: &Program, table: &mut RoleTable) {
        for group in program.groups() {
            self.tracked_groups.insert(group.id());
            self.tracked_animations
                .extend(group.animations().iter().map(|a| a.id()));
        }

        let count = program.len();
        self.offset = self.offset.min(count.saturating_sub(self.page_width));
        let end = count.min(self.offset + self.page_width);
        for (track, group) in program.groups()[self.offset..end].iter().enumerate() {
            self.map_track(track, group, table);
        }

        debug!(
            program = %program.id(),
            start = self.offset,
            end,
            bound = table.bound_count(),
            "control surface remapped"
        );
        self.events.push(MapperEvent::ViewportChanged {
            start: self.offset,
            end,
        });
    }

    fn map_track(&self, track: usize, group: &AnimationGroup, table: &mut RoleTable) {
        let id = group.id();
        report(table.connect_trigger(Role::Animation(track), TriggerTarget::GroupEnable(id)));
        report(table.connect_trigger(Role::AnimationShift(track), TriggerTarget::GroupToggle(id)));
        report(table.connect_feedback(Role::AnimationShift(track), id, group.enabled()));
        report(table.connect_trigger(Role::AnimationCreate(track), TriggerTarget::GroupCreateItem(id)));

        let mut knob = 0;
        'animations: for animation in group.animations() {
            for parameter in animation.parameters().iter() {
                if !parameter.is_preferred() || !parameter.is_midi_controllable() {
                    continue;
                }
                if knob >= self.knobs_per_track {
                    break 'animations;
                }
                report(table.connect_control(
                    Role::Control { track, knob },
                    ControlTarget {
                        animation: animation.id(),
                        parameter: parameter.name().to_string(),
                    },
                ));
                knob += 1;
            }
        }
    }

    /// Feeds topology events; remaps once if any of them concerns the
    /// attached program. Returns whether a remap happened.
    pub fn handle_events(
        &mut self,
        events: &[TopologyEvent],
        program: Option<&Program>,
        table: &mut RoleTable,
    ) -> bool {
        let program = self.attached(program);
        let mut remap = false;
        for event in events {
            remap |= self.concerns_map(event, program, table);
        }
        if remap {
            self.update_map(program, table);
        }
        remap
    }

    fn concerns_map(&self, event: &TopologyEvent, program: Option<&Program>, table: &mut RoleTable) -> bool {
        let has_group = |group: &GroupId| {
            self.tracked_groups.contains(group) || program.is_some_and(|p| p.group(*group).is_some())
        };
        match event {
            TopologyEvent::GroupEnabledChanged { group, enabled } => {
                table.update_feedback(*group, *enabled);
                false
            }
            TopologyEvent::GroupAdded { program: owner, .. }
            | TopologyEvent::GroupRemoved { program: owner, .. } => Some(*owner) == self.program,
            TopologyEvent::GroupMoved {
                program: owner,
                destination,
                ..
            } => Some(*owner) == self.program || Some(*destination) == self.program,
            TopologyEvent::AnimationAdded { group, .. } => has_group(group),
            TopologyEvent::AnimationMoved {
                group, destination, ..
            } => has_group(group) || (destination.is_some() && *destination == self.program),
            TopologyEvent::ParameterAttributesChanged { animation, .. } => {
                self.tracked_animations.contains(animation)
                    || program.is_some_and(|p| p.animation(*animation).is_some())
            }
        }
    }

    pub fn drain_events(&mut self) -> Vec<MapperEvent> {
        std::mem::take(&mut self.events)
    }
}

fn report(result: Result<()>) {
    if let Err(err) = result {
        warn!(%err, "role binding skipped");
    }
}
