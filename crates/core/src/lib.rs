//! Core library for the Beatviz VJ tool.
//!
//! A clock-driven tree of programs, animation groups and animations spawns
//! short-lived graphical items into a [`Scene`], while a control-surface
//! mapper keeps a fixed grid of MIDI roles bound to whatever part of the tree
//! is currently on screen. Ticks flow down the tree; topology changes flow
//! back up as [`TopologyEvent`]s and trigger full remaps.

pub mod animation;
pub mod config;
pub mod error;
pub mod events;
pub mod group;
pub mod id;
pub mod mapping;
pub mod master;
pub mod parameter;
pub mod program;
pub mod scene;
pub mod timeline;

pub use animation::{
    AnimatedItem, Animation, AnimationDescription, AnimationFactory, Effect, ItemLedger, NoteEvent,
};
pub use config::{AppConfig, ClockConfig, SceneConfig, SurfaceConfig};
pub use error::{BeatVizError, Result};
pub use events::TopologyEvent;
pub use group::AnimationGroup;
pub use id::{AnimationId, GroupId, ProgramId};
pub use mapping::{Binding, ControlTarget, MapperEvent, MasterMidiMapper, Role, RoleKind, RoleTable, TriggerTarget};
pub use master::Master;
pub use parameter::{EasingCurve, LoopSize, Parameter, ParameterSet, ParameterValue};
pub use program::{AnimationSnapshot, GroupSnapshot, Program, ProgramSnapshot};
pub use scene::{Color, ItemHandle, Scene};
pub use timeline::{ClockDispatch, ClockMessage, ClockState, InternalClock, Tick};
