use std::collections::BTreeMap;

use serde::Serialize;

use super::{Role, RoleKind};
use crate::config::SurfaceConfig;
use crate::id::{AnimationId, GroupId};
use crate::{BeatVizError, Result};

/// Action bound to a trigger or hold role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerTarget {
    /// Flips the group's enabled flag.
    GroupEnable(GroupId),
    /// Flips the group's enabled flag on every edge of a hold role.
    GroupToggle(GroupId),
    GroupCreateItem(GroupId),
    PageIncrement,
    PageDecrement,
}

/// Parameter setter bound to a continuous-control role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ControlTarget {
    pub animation: AnimationId,
    pub parameter: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Binding {
    Trigger(TriggerTarget),
    Control(ControlTarget),
}

#[derive(Debug, Clone, Default)]
struct Slot {
    binding: Option<Binding>,
    feedback_source: Option<GroupId>,
    feedback: Option<bool>,
}

/// Registered roles and what they are currently bound to.
#[derive(Debug, Clone, Default)]
pub struct RoleTable {
    slots: BTreeMap<Role, Slot>,
}

impl RoleTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every role of a surface of `config`'s dimensions, with the
    /// page roles permanently bound.
    pub fn for_surface(config: &SurfaceConfig) -> Self {
        let mut table = Self::new();
        for track in 0..config.tracks_max {
            table.register(Role::Animation(track));
            table.register(Role::AnimationShift(track));
            table.register(Role::AnimationCreate(track));
        }
        for track in 0..config.tracks_max {
            for knob in 0..config.knobs_max {
                table.register(Role::Control { track, knob });
            }
        }
        table.register(Role::PageIncrement);
        table.register(Role::PageDecrement);
        table.slots.entry(Role::PageIncrement).or_default().binding =
            Some(Binding::Trigger(TriggerTarget::PageIncrement));
        table.slots.entry(Role::PageDecrement).or_default().binding =
            Some(Binding::Trigger(TriggerTarget::PageDecrement));
        table
    }

    pub fn register(&mut self, role: Role) {
        self.slots.entry(role).or_default();
    }

    pub fn is_registered(&self, role: Role) -> bool {
        self.slots.contains_key(&role)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot_mut(&mut self, role: Role) -> Result<&mut Slot> {
        self.slots
            .get_mut(&role)
            .ok_or_else(|| BeatVizError::UnknownRole(role.to_string()))
    }

    pub fn connect_trigger(&mut self, role: Role, target: TriggerTarget) -> Result<()> {
        if role.kind() == RoleKind::Control {
            return Err(BeatVizError::msg(format!("{role} is a continuous control")));
        }
        self.slot_mut(role)?.binding = Some(Binding::Trigger(target));
        Ok(())
    }

    pub fn connect_control(&mut self, role: Role, target: ControlTarget) -> Result<()> {
        if role.kind() != RoleKind::Control {
            return Err(BeatVizError::msg(format!("{role} is not a continuous control")));
        }
        self.slot_mut(role)?.binding = Some(Binding::Control(target));
        Ok(())
    }

    /// Wires the role's indicator to `group`'s enabled state and pushes the
    /// initial value.
    pub fn connect_feedback(&mut self, role: Role, group: GroupId, initial: bool) -> Result<()> {
        let slot = self.slot_mut(role)?;
        slot.feedback_source = Some(group);
        slot.feedback = Some(initial);
        Ok(())
    }

    /// Unbinds the role and drops its feedback wiring.
    pub fn clear(&mut self, role: Role) {
        if let Some(slot) = self.slots.get_mut(&role) {
            *slot = Slot::default();
        }
    }

    pub fn binding(&self, role: Role) -> Option<&Binding> {
        self.slots.get(&role).and_then(|slot| slot.binding.as_ref())
    }

    pub fn feedback(&self, role: Role) -> Option<bool> {
        self.slots.get(&role).and_then(|slot| slot.feedback)
    }

    /// Pushes a group's new enabled state to every role wired to it.
    pub fn update_feedback(&mut self, group: GroupId, enabled: bool) {
        for slot in self.slots.values_mut() {
            if slot.feedback_source == Some(group) {
                slot.feedback = Some(enabled);
            }
        }
    }

    /// Registered roles in address order with their bindings.
    pub fn iter(&self) -> impl Iterator<Item = (Role, Option<&Binding>)> {
        self.slots.iter().map(|(role, slot)| (*role, slot.binding.as_ref()))
    }

    pub fn bound_count(&self) -> usize {
        self.slots.values().filter(|slot| slot.binding.is_some()).count()
    }

    /// Resolves an activation edge to the action it fires, if any.
    pub fn trigger(&self, role: Role, pressed: bool) -> Result<Option<TriggerTarget>> {
        let slot = self
            .slots
            .get(&role)
            .ok_or_else(|| BeatVizError::UnknownRole(role.to_string()))?;
        let target = match &slot.binding {
            Some(Binding::Trigger(target)) => *target,
            _ => return Err(BeatVizError::UnboundRole(role.to_string())),
        };
        let fires = match role.kind() {
            RoleKind::Hold => true,
            RoleKind::Trigger => pressed,
            RoleKind::Control => false,
        };
        Ok(fires.then_some(target))
    }

    pub fn control(&self, role: Role) -> Result<&ControlTarget> {
        let slot = self
            .slots
            .get(&role)
            .ok_or_else(|| BeatVizError::UnknownRole(role.to_string()))?;
        match &slot.binding {
            Some(Binding::Control(target)) => Ok(target),
            _ => Err(BeatVizError::UnboundRole(role.to_string())),
        }
    }
}
