use std::ops::Range;

use tracing::{debug, info};

use crate::animation::{AnimationFactory, NoteEvent};
use crate::config::{AppConfig, SceneConfig};
use crate::id::ProgramId;
use crate::mapping::{MapperEvent, MasterMidiMapper, Role, RoleTable, TriggerTarget};
use crate::program::{Program, ProgramSnapshot};
use crate::scene::Scene;
use crate::timeline::{ClockDispatch, ClockMessage, Tick};
use crate::{BeatVizError, Result};

/// Top-level owner wiring the clock, the program tree and the control
/// surface together.
///
/// Every input (clock message, note, trigger, control change) is handled to
/// completion, topology events included, before the call returns. Every
/// program animates into its own scene; the current program's scene is the
/// output.
#[derive(Debug)]
pub struct Master {
    scene_size: SceneConfig,
    programs: Vec<Program>,
    current: Option<ProgramId>,
    clock: ClockDispatch,
    roles: RoleTable,
    mapper: MasterMidiMapper,
    factory: AnimationFactory,
    viewport: Option<Range<usize>>,
    remaps: u64,
}

impl Master {
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            scene_size: config.scene.clone(),
            programs: Vec::new(),
            current: None,
            clock: ClockDispatch::new(&config.clock),
            roles: RoleTable::for_surface(&config.surface),
            mapper: MasterMidiMapper::new(&config.surface),
            factory: AnimationFactory::with_seed(config.clock.resolution, config.seed),
            viewport: None,
            remaps: 0,
        })
    }

    /// Scene of the program on air.
    pub fn scene(&self) -> Option<&Scene> {
        self.current_program().map(Program::scene)
    }

    pub fn clock(&self) -> &ClockDispatch {
        &self.clock
    }

    pub fn roles(&self) -> &RoleTable {
        &self.roles
    }

    pub fn mapper(&self) -> &MasterMidiMapper {
        &self.mapper
    }

    pub fn factory_mut(&mut self) -> &mut AnimationFactory {
        &mut self.factory
    }

    pub fn programs(&self) -> &[Program] {
        &self.programs
    }

    pub fn program(&self, id: ProgramId) -> Option<&Program> {
        self.programs.iter().find(|p| p.id() == id)
    }

    /// Edits a program; pending topology events are applied right after.
    pub fn with_program<T>(&mut self, id: ProgramId, edit: impl FnOnce(&mut Program, &mut AnimationFactory) -> T) -> Result<T> {
        let program = self
            .programs
            .iter_mut()
            .find(|p| p.id() == id)
            .ok_or_else(|| BeatVizError::TargetNotFound(id.to_string()))?;
        let value = edit(program, &mut self.factory);
        self.process_events();
        Ok(value)
    }

    pub fn current_program(&self) -> Option<&Program> {
        current(&self.programs, self.current)
    }

    /// Tracks visible on the surface, as last reported by the mapper.
    pub fn viewport(&self) -> Option<Range<usize>> {
        self.viewport.clone()
    }

    /// Number of remaps performed so far.
    pub fn remaps(&self) -> u64 {
        self.remaps
    }

    pub fn add_program(&mut self, mut program: Program) -> ProgramId {
        program.resize_scene(self.scene_size.width, self.scene_size.height);
        let id = program.id();
        self.programs.push(program);
        id
    }

    pub fn load_snapshot(&mut self, snapshot: &ProgramSnapshot) -> Result<ProgramId> {
        let program = Program::from_snapshot(&mut self.factory, snapshot)?;
        Ok(self.add_program(program))
    }

    /// Makes `id` the program shown and mapped on the surface.
    pub fn set_program(&mut self, id: Option<ProgramId>) -> Result<()> {
        if let Some(id) = id {
            if self.program(id).is_none() {
                return Err(BeatVizError::TargetNotFound(id.to_string()));
            }
        }
        info!(program = ?id, "current program changed");
        self.current = id;
        self.process_events();
        self.mapper
            .set_program(current(&self.programs, self.current), &mut self.roles);
        self.collect_mapper_events();
        Ok(())
    }

    /// Moves a group to another program, or within one when both ids match.
    /// Items the group has in flight are dropped with the source scene.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn move_group(
        &mut self,
        src_program: ProgramId,
        src_index: usize,
        dest_program: ProgramId,
        dest_index: Option<usize>,
    ) -> Result<()> {
        let (source, dest) = self.program_pair(src_program, dest_program)?;
        match dest {
            Some(dest) => source.move_group_to(src_index, dest, dest_index),
            None => source.move_group(src_index, dest_index),
        }
        self.process_events();
        Ok(())
    }

    /// Moves an animation between groups, across programs if needed.
    ///
    /// # Panics
    ///
    /// Panics if any index is out of range.
    pub fn move_animation(
        &mut self,
        src_program: ProgramId,
        src_group: usize,
        src_index: usize,
        dest_program: ProgramId,
        dest_group: usize,
        dest_index: Option<usize>,
    ) -> Result<()> {
        let (source, dest) = self.program_pair(src_program, dest_program)?;
        match dest {
            Some(dest) => source.move_animation_to(src_group, src_index, dest, dest_group, dest_index),
            None => source.move_animation(src_group, src_index, dest_group, dest_index),
        }
        self.process_events();
        Ok(())
    }

    /// Borrows the source program and, when it differs, the destination.
    fn program_pair(&mut self, src: ProgramId, dest: ProgramId) -> Result<(&mut Program, Option<&mut Program>)> {
        let src_index = position(&self.programs, src)?;
        let dest_index = position(&self.programs, dest)?;
        if src_index == dest_index {
            return Ok((&mut self.programs[src_index], None));
        }
        let pair = if src_index < dest_index {
            let (head, tail) = self.programs.split_at_mut(dest_index);
            (&mut head[src_index], &mut tail[0])
        } else {
            let (head, tail) = self.programs.split_at_mut(src_index);
            (&mut tail[0], &mut head[dest_index])
        };
        debug!(from = %src, to = %dest, "cross-program move");
        Ok((pair.0, Some(pair.1)))
    }

    /// Handles a realtime clock message; returns the number of ticks it
    /// dispatched.
    pub fn process_clock(&mut self, message: ClockMessage) -> Result<usize> {
        let ticks = self.clock.process_message(message);
        for tick in &ticks {
            self.dispatch_tick(*tick)?;
        }
        Ok(ticks.len())
    }

    /// Dispatches the clock's next tick regardless of transport state.
    pub fn step(&mut self) -> Result<Tick> {
        let tick = self.clock.next_tick();
        self.dispatch_tick(tick)?;
        Ok(tick)
    }

    pub fn dispatch_tick(&mut self, tick: Tick) -> Result<()> {
        self.clock.dispatch(tick, &mut self.programs)?;
        self.process_events();
        Ok(())
    }

    /// Routes a note to the current program.
    pub fn handle_note(&mut self, note: NoteEvent) {
        if let Some(program) = current_mut(&mut self.programs, self.current) {
            program.handle_note(note);
        }
    }

    pub fn trigger_named(&mut self, role: &str, pressed: bool) -> Result<()> {
        self.trigger(role.parse()?, pressed)
    }

    /// Activates a trigger or hold role.
    pub fn trigger(&mut self, role: Role, pressed: bool) -> Result<()> {
        let Some(target) = self.roles.trigger(role, pressed)? else {
            return Ok(());
        };
        debug!(%role, pressed, ?target, "trigger");
        match target {
            TriggerTarget::GroupEnable(group) | TriggerTarget::GroupToggle(group) => {
                self.require_current()?.require_group_mut(group)?.toggle();
            }
            TriggerTarget::GroupCreateItem(group) => {
                self.require_current()?.require_group_mut(group)?.create_item();
            }
            TriggerTarget::PageIncrement => {
                self.mapper
                    .virtual_page_increment(current(&self.programs, self.current), &mut self.roles);
            }
            TriggerTarget::PageDecrement => {
                self.mapper
                    .virtual_page_decrement(current(&self.programs, self.current), &mut self.roles);
            }
        }
        self.process_events();
        Ok(())
    }

    pub fn control_named(&mut self, role: &str, value: u8) -> Result<()> {
        self.control(role.parse()?, value)
    }

    /// Forwards a 0..=127 value to the parameter bound to `role`.
    pub fn control(&mut self, role: Role, value: u8) -> Result<()> {
        let target = self.roles.control(role)?.clone();
        self.require_current()?
            .require_animation_mut(target.animation)?
            .set_parameter_from_midi(&target.parameter, value)
    }

    fn require_current(&mut self) -> Result<&mut Program> {
        current_mut(&mut self.programs, self.current)
            .ok_or_else(|| BeatVizError::msg("no program attached"))
    }

    /// Collects topology events from every program and lets the mapper
    /// react. Returns whether the map was rebuilt.
    pub fn process_events(&mut self) -> bool {
        let events: Vec<_> = self
            .programs
            .iter_mut()
            .flat_map(Program::drain_events)
            .collect();
        let remapped = !events.is_empty()
            && self.mapper.handle_events(
                &events,
                current(&self.programs, self.current),
                &mut self.roles,
            );
        self.collect_mapper_events();
        remapped
    }

    fn collect_mapper_events(&mut self) {
        for event in self.mapper.drain_events() {
            match event {
                MapperEvent::ViewportChanged { start, end } => self.viewport = Some(start..end),
                MapperEvent::Updated => {
                    self.remaps += 1;
                    if self.current.is_none() {
                        self.viewport = None;
                    }
                }
            }
        }
    }

    /// Live items in the on-air scene.
    pub fn live_items(&self) -> usize {
        self.scene().map_or(0, Scene::len)
    }
}

fn current(programs: &[Program], id: Option<ProgramId>) -> Option<&Program> {
    let id = id?;
    programs.iter().find(|p| p.id() == id)
}

fn position(programs: &[Program], id: ProgramId) -> Result<usize> {
    programs
        .iter()
        .position(|p| p.id() == id)
        .ok_or_else(|| BeatVizError::TargetNotFound(id.to_string()))
}

fn current_mut(programs: &mut [Program], id: Option<ProgramId>) -> Option<&mut Program> {
    let id = id?;
    programs.iter_mut().find(|p| p.id() == id)
}
