use crate::id::{AnimationId, GroupId, ProgramId};

/// Notifications pushed upward through program → group → animation.
///
/// Each level queues events in its own outbox; [`crate::Program::drain_events`]
/// collects them for whoever consumes topology changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyEvent {
    GroupAdded {
        program: ProgramId,
        group: GroupId,
    },
    /// Emitted by the source program. `destination` is the program now
    /// holding the group.
    GroupMoved {
        program: ProgramId,
        group: GroupId,
        destination: ProgramId,
    },
    /// An empty group was swept out of its program.
    GroupRemoved {
        program: ProgramId,
        group: GroupId,
    },
    GroupEnabledChanged {
        group: GroupId,
        enabled: bool,
    },
    AnimationAdded {
        group: GroupId,
        animation: AnimationId,
    },
    /// Emitted once per move by the source group. `destination` is the
    /// program owning the destination group, if it is attached to one.
    AnimationMoved {
        group: GroupId,
        animation: AnimationId,
        destination: Option<ProgramId>,
    },
    ParameterAttributesChanged {
        animation: AnimationId,
        parameter: String,
    },
}
