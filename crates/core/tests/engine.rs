use beatviz_core::{
    AppConfig, BeatVizError, Binding, ClockMessage, GroupId, LoopSize, Master, NoteEvent, Program, ProgramId,
    Role, Tick, TriggerTarget,
};

fn config() -> AppConfig {
    let mut config = AppConfig::live_defaults();
    config.seed = Some(2024);
    config
}

fn master_with(classes: &[&[&str]]) -> (Master, ProgramId) {
    let mut master = Master::new(&config()).unwrap();
    let id = master.add_program(Program::new("set"));
    master
        .with_program(id, |program, factory| {
            for group in classes {
                let gid = program.create_group_with(factory, group[0]).unwrap();
                for class in &group[1..] {
                    program
                        .group_mut(gid)
                        .unwrap()
                        .create_animation(factory, class, None)
                        .unwrap();
                }
            }
        })
        .unwrap();
    master.set_program(Some(id)).unwrap();
    (master, id)
}

fn add_off_air(master: &mut Master, classes: &[&str]) -> ProgramId {
    let id = master.add_program(Program::new("spare"));
    master
        .with_program(id, |program, factory| {
            for class in classes {
                program.create_group_with(factory, class).unwrap();
            }
        })
        .unwrap();
    id
}

fn group_ids(master: &Master, id: ProgramId) -> Vec<GroupId> {
    master.program(id).unwrap().groups().iter().map(|g| g.id()).collect()
}

fn track_group(master: &Master, track: usize) -> Option<GroupId> {
    match master.roles().binding(Role::Animation(track)) {
        Some(Binding::Trigger(TriggerTarget::GroupEnable(group))) => Some(*group),
        _ => None,
    }
}

#[test]
fn disabled_group_drains_until_the_last_item_completes() {
    let (mut master, id) = master_with(&[&["falling-objects"]]);
    master.trigger(Role::Animation(0), true).unwrap();

    let tick = master.step().unwrap();
    assert_eq!(tick.uppqn, 0);
    assert_eq!(master.live_items(), 1);

    master.trigger(Role::Animation(0), true).unwrap();
    let group = |master: &Master| master.program(id).unwrap().groups()[0].is_alive();
    assert!(group(&master));

    for _ in 1..24 {
        master.step().unwrap();
        assert!(group(&master));
        assert_eq!(master.live_items(), 1);
    }
    let tick = master.step().unwrap();
    assert_eq!(tick.uppqn, 24);
    assert!(!group(&master));
    assert_eq!(master.live_items(), 0);
}

#[test]
fn start_during_a_drain_does_not_extend_it() {
    let (mut master, id) = master_with(&[&["falling-objects"]]);
    for _ in 0..96 {
        master.step().unwrap();
    }
    master.trigger(Role::Animation(0), true).unwrap();
    assert_eq!(master.step().unwrap().uppqn, 96);
    assert_eq!(master.live_items(), 1);
    master.trigger(Role::Animation(0), true).unwrap();

    master.process_clock(ClockMessage::Start).unwrap();
    assert_eq!(master.clock().position(), 97);
    for _ in 0..48 {
        master.process_clock(ClockMessage::Clock).unwrap();
    }
    assert_eq!(master.clock().position(), 145);
    assert_eq!(master.live_items(), 0);
    assert!(!master.program(id).unwrap().groups()[0].is_alive());
}

#[test]
fn start_restarts_the_beat_phase() {
    let (mut master, _) = master_with(&[&["falling-objects"]]);
    for _ in 0..10 {
        master.step().unwrap();
    }
    master.process_clock(ClockMessage::Start).unwrap();
    master.trigger(Role::Animation(0), true).unwrap();
    master.process_clock(ClockMessage::Clock).unwrap();
    assert_eq!(master.live_items(), 1);
}

#[test]
fn moving_a_track_out_of_the_current_program_clears_it() {
    let (mut master, id) = master_with(&[&["falling-objects"], &["text"], &["falling-objects"]]);
    let spare = add_off_air(&mut master, &["text"]);
    let groups = group_ids(&master, id);
    assert_eq!(track_group(&master, 2), Some(groups[2]));
    let remaps = master.remaps();

    master.move_group(id, 2, spare, None).unwrap();
    assert_eq!(track_group(&master, 2), None);
    assert_eq!(master.viewport(), Some(0..2));
    assert_eq!(master.remaps(), remaps + 1);
    assert_eq!(group_ids(&master, spare)[1], groups[2]);
    assert_eq!(
        master.program(spare).unwrap().groups()[1].program(),
        Some(spare)
    );
}

#[test]
fn moving_a_track_into_the_current_program_binds_it() {
    let (mut master, id) = master_with(&[&["falling-objects"]]);
    let spare = add_off_air(&mut master, &["text", "falling-objects"]);
    let incoming = group_ids(&master, spare)[1];
    let remaps = master.remaps();

    master.move_group(spare, 1, id, Some(0)).unwrap();
    assert_eq!(track_group(&master, 0), Some(incoming));
    assert_eq!(master.viewport(), Some(0..2));
    assert_eq!(master.remaps(), remaps + 1);
    assert!(master.control_named("MASTER_CONTROLS_0_1", 64).is_ok());
}

#[test]
fn animations_moved_across_programs_remap_both_ways() {
    let (mut master, id) = master_with(&[&["falling-objects"], &["text"]]);
    let spare = add_off_air(&mut master, &["falling-objects"]);
    let groups = group_ids(&master, id);
    let remaps = master.remaps();

    master.move_animation(spare, 0, 0, id, 0, None).unwrap();
    assert_eq!(master.program(id).unwrap().groups()[0].len(), 2);
    assert_eq!(master.remaps(), remaps + 1);

    master.move_animation(id, 1, 0, spare, 0, None).unwrap();
    assert_eq!(master.remaps(), remaps + 2);
    master.step().unwrap();
    assert_eq!(group_ids(&master, id), vec![groups[0]]);
    assert_eq!(track_group(&master, 1), None);
    assert_eq!(master.program(spare).unwrap().groups()[0].len(), 1);
}

#[test]
fn moving_the_last_animation_out_drops_the_group_and_its_track() {
    let (mut master, id) = master_with(&[&["falling-objects", "text"], &["text"]]);
    let groups = group_ids(&master, id);
    assert_eq!(track_group(&master, 1), Some(groups[1]));
    let remaps = master.remaps();

    master
        .with_program(id, |program, _| program.move_animation(1, 0, 0, Some(0)))
        .unwrap();
    let program = master.program(id).unwrap();
    let total: usize = program.groups().iter().map(|g| g.len()).sum();
    assert_eq!(total, 3);
    assert_eq!(program.groups()[0].len(), 3);
    assert_eq!(master.remaps(), remaps + 1);

    master.step().unwrap();
    assert_eq!(group_ids(&master, id), vec![groups[0]]);
    assert_eq!(track_group(&master, 1), None);
    assert_eq!(master.viewport(), Some(0..1));
    assert_eq!(master.remaps(), remaps + 2);
}

#[test]
fn page_roles_slide_the_window_over_the_tracks() {
    let tracks: Vec<&[&str]> = vec![&["text"][..]; 12];
    let (mut master, id) = master_with(&tracks);
    let groups = group_ids(&master, id);
    assert_eq!(master.viewport(), Some(0..8));

    for _ in 0..5 {
        master.trigger_named("MASTER_VIRTUAL_PAGE_INC", true).unwrap();
    }
    assert_eq!(master.mapper().virtual_page_offset(), 4);
    assert_eq!(master.viewport(), Some(4..12));
    for track in 0..8 {
        assert_eq!(track_group(&master, track), Some(groups[4 + track]));
    }
    assert_eq!(track_group(&master, 8), None);

    master.trigger_named("MASTER_VIRTUAL_PAGE_DEC", true).unwrap();
    assert_eq!(track_group(&master, 0), Some(groups[3]));
}

#[test]
fn notes_spawn_off_beat_on_instrumented_animations() {
    let (mut master, _) = master_with(&[&["falling-objects"], &["text"]]);
    master.trigger(Role::Animation(0), true).unwrap();
    master.trigger(Role::Animation(1), true).unwrap();
    master.step().unwrap();
    let on_beat = master.live_items();
    assert_eq!(on_beat, 2);

    master.handle_note(NoteEvent::on(0, 64, 100));
    master.handle_note(NoteEvent::on(1, 30, 0));
    master.step().unwrap();
    assert_eq!(master.live_items(), on_beat + 1);
}

#[test]
fn create_trigger_spawns_on_the_next_tick() {
    let (mut master, _) = master_with(&[&["falling-objects"]]);
    master.step().unwrap();
    assert_eq!(master.live_items(), 0);
    master.trigger_named("MASTER_ANIMATION_CREATE_0", true).unwrap();
    master.step().unwrap();
    assert_eq!(master.live_items(), 1);
}

#[test]
fn midi_clock_pulses_expand_to_the_configured_resolution() {
    let mut config = config();
    config.clock.resolution = 48;
    let mut master = Master::new(&config).unwrap();

    master.process_clock(ClockMessage::Start).unwrap();
    let mut ticks = 0;
    for _ in 0..24 {
        ticks += master.process_clock(ClockMessage::Clock).unwrap();
    }
    assert_eq!(ticks, 48);
    assert_eq!(master.clock().position(), 48);

    let err = master.dispatch_tick(Tick::at(10, 48, 16)).unwrap_err();
    assert!(matches!(err, BeatVizError::OutOfOrderTick { tick: 10, last: 47 }));
}

#[test]
fn beat_boundaries_at_default_resolution() {
    let one = LoopSize::ONE;
    assert!(one.is_beat(Tick::at(0, 24, 16).gppqn, 24));
    assert!(!one.is_beat(Tick::at(23, 24, 16).gppqn, 24));
    assert!(one.is_beat(Tick::at(24, 24, 16).gppqn, 24));
}

#[test]
fn snapshots_reload_into_a_fresh_master() {
    let (master, id) = master_with(&[&["falling-objects", "text"], &["text"]]);
    let snapshot = master.program(id).unwrap().snapshot();
    let json = snapshot.to_json_string().unwrap();

    let mut fresh = Master::new(&config()).unwrap();
    let loaded = fresh
        .load_snapshot(&beatviz_core::ProgramSnapshot::from_json_str(&json).unwrap())
        .unwrap();
    fresh.set_program(Some(loaded)).unwrap();
    assert_eq!(fresh.program(loaded).unwrap().snapshot(), snapshot);
    assert_eq!(fresh.viewport(), Some(0..2));
    assert!(fresh.control_named("MASTER_CONTROLS_0_1", 64).is_ok());
}
