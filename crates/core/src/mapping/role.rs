use std::fmt;
use std::str::FromStr;

use crate::BeatVizError;

const ANIMATION: &str = "MASTER_ANIMATION_";
const ANIMATION_SHIFT: &str = "MASTER_ANIMATION_SHIFT_";
const ANIMATION_CREATE: &str = "MASTER_ANIMATION_CREATE_";
const CONTROLS: &str = "MASTER_CONTROLS_";
const PAGE_INC: &str = "MASTER_VIRTUAL_PAGE_INC";
const PAGE_DEC: &str = "MASTER_VIRTUAL_PAGE_DEC";

/// A fixed slot of the control surface's address space.
///
/// Track indices are local to the visible page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    /// Toggles the track's group.
    Animation(usize),
    /// Momentary toggle with enabled-state feedback.
    AnimationShift(usize),
    /// Manual item creation.
    AnimationCreate(usize),
    Control { track: usize, knob: usize },
    PageIncrement,
    PageDecrement,
}

/// How the transport activates a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleKind {
    /// Fires on press only.
    Trigger,
    /// Fires on press and on release.
    Hold,
    /// Continuous 0..=127 value.
    Control,
}

impl Role {
    pub fn kind(&self) -> RoleKind {
        match self {
            Role::AnimationShift(_) => RoleKind::Hold,
            Role::Control { .. } => RoleKind::Control,
            Role::Animation(_) | Role::AnimationCreate(_) | Role::PageIncrement | Role::PageDecrement => {
                RoleKind::Trigger
            }
        }
    }

    /// Local track index for per-track roles.
    pub fn track(&self) -> Option<usize> {
        match *self {
            Role::Animation(track)
            | Role::AnimationShift(track)
            | Role::AnimationCreate(track)
            | Role::Control { track, .. } => Some(track),
            Role::PageIncrement | Role::PageDecrement => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Animation(i) => write!(f, "{ANIMATION}{i}"),
            Role::AnimationShift(i) => write!(f, "{ANIMATION_SHIFT}{i}"),
            Role::AnimationCreate(i) => write!(f, "{ANIMATION_CREATE}{i}"),
            Role::Control { track, knob } => write!(f, "{CONTROLS}{track}_{knob}"),
            Role::PageIncrement => f.write_str(PAGE_INC),
            Role::PageDecrement => f.write_str(PAGE_DEC),
        }
    }
}

impl FromStr for Role {
    type Err = BeatVizError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || BeatVizError::UnknownRole(s.to_string());
        let index = |rest: &str| rest.parse::<usize>().map_err(|_| unknown());

        match s {
            PAGE_INC => return Ok(Role::PageIncrement),
            PAGE_DEC => return Ok(Role::PageDecrement),
            _ => {}
        }
        if let Some(rest) = s.strip_prefix(ANIMATION_SHIFT) {
            return index(rest).map(Role::AnimationShift);
        }
        if let Some(rest) = s.strip_prefix(ANIMATION_CREATE) {
            return index(rest).map(Role::AnimationCreate);
        }
        if let Some(rest) = s.strip_prefix(ANIMATION) {
            return index(rest).map(Role::Animation);
        }
        if let Some(rest) = s.strip_prefix(CONTROLS) {
            let (track, knob) = rest.split_once('_').ok_or_else(unknown)?;
            return Ok(Role::Control {
                track: index(track)?,
                knob: index(knob)?,
            });
        }
        Err(unknown())
    }
}
