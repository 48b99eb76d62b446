use std::sync::Arc;

use anyhow::{Context, Result};
use cadence_expr_core::CompileError;
use cadence_state_machine_core::{
    compile_state_machine_json, BuildError, CompilerConfig, Config, Engine, EntityId, Inputs,
    MachineEvent, RuntimeError, SpriteLibrary, StateMachineResource, VariableIndex,
};
use cadence_test_fixtures::state_machines;

fn load(name: &str) -> Result<(Arc<StateMachineResource>, SpriteLibrary)> {
    let bytes = compile_state_machine_json(&state_machines::json(name)?, &CompilerConfig::default())?;
    let resource = Arc::new(StateMachineResource::from_bytes(bytes)?);
    let sprites = match state_machines::sprites_json(name)? {
        Some(json) => SpriteLibrary::from_json(&json)?,
        None => SpriteLibrary::new(),
    };
    Ok((resource, sprites))
}

fn failures(events: &[MachineEvent], entity: EntityId) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, MachineEvent::EvaluationFailed { entity: e, .. } if *e == entity))
        .count()
}

#[test]
fn terminal_state_clamps_on_its_last_frame() -> Result<()> {
    let (door, sprites) = load("door")?;
    let mut engine = Engine::default();
    let e = EntityId(3);
    engine.create(e, door);

    let mut frames = Vec::new();
    for _ in 0..5 {
        let out = engine.update(0.25, Inputs::default(), &sprites);
        assert!(out.events.is_empty());
        frames.push(out.frame_of(e));
    }
    assert_eq!(frames, vec![Some(2), Some(4), Some(4), Some(4), Some(4)]);
    assert_eq!(engine.elapsed(e), Some(0.5));
    Ok(())
}

#[test]
fn looping_state_wraps_instead_of_ending() -> Result<()> {
    let (hero, sprites) = load("hero")?;
    let mut engine = Engine::default();
    let e = EntityId(4);
    engine.create(e, hero);

    let mut frames = Vec::new();
    for _ in 0..6 {
        let out = engine.update(0.25, Inputs::default(), &sprites);
        assert!(out.events.is_empty());
        frames.push(out.frame_of(e).context("idle always has a frame")?);
    }
    assert_eq!(frames, vec![1, 2, 3, 0, 1, 2]);
    assert_eq!(engine.elapsed(e), Some(0.5));
    Ok(())
}

#[test]
fn variables_are_per_entity_and_bounds_checked() -> Result<()> {
    let (door, sprites) = load("door")?;
    let mut engine = Engine::default();
    let (a, b) = (EntityId(1), EntityId(2));
    engine.create(a, Arc::clone(&door));
    engine.create(b, Arc::clone(&door));
    assert_eq!(Arc::strong_count(&door), 3);

    let rate = engine.variable_index(a, "rate")?;
    assert_eq!(rate, VariableIndex(0));
    assert_eq!(engine.variable(a, rate), Ok(1.0));
    assert_eq!(
        engine.variable_index(a, "speed"),
        Err(RuntimeError::UnknownVariable("speed".into()))
    );
    assert_eq!(
        engine.set_variable(a, VariableIndex(5), 1.0),
        Err(RuntimeError::VariableOutOfRange { index: 5, count: 1 })
    );

    let out = engine.update(0.125, Inputs::default().set_variable(a, rate, 2.0), &sprites);
    assert_eq!(out.frame_of(a), Some(2));
    assert_eq!(out.frame_of(b), Some(1));
    assert_eq!(engine.variable(b, rate), Ok(1.0));
    Ok(())
}

#[test]
fn destroy_notices_remove_records() -> Result<()> {
    let (door, sprites) = load("door")?;
    let mut engine = Engine::default();
    for id in 0..3 {
        engine.create(EntityId(id), Arc::clone(&door));
    }

    let out = engine.update(0.1, Inputs::default().destroy(EntityId(0)), &sprites);
    assert_eq!(out.frames.len(), 2);
    assert_eq!(out.frame_of(EntityId(0)), None);
    assert_eq!(engine.len(), 2);
    assert!(!engine.contains(EntityId(0)));

    // the moved record stays addressable
    assert!(engine.destroy(EntityId(2)));
    assert!(!engine.destroy(EntityId(2)));
    assert_eq!(engine.variable(EntityId(1), VariableIndex(0)), Ok(1.0));
    assert_eq!(
        engine.trigger(EntityId(2), "go"),
        Err(RuntimeError::UnknownEntity(EntityId(2)))
    );
    assert_eq!(engine.current_state(EntityId(2)), None);
    Ok(())
}

#[test]
fn creating_twice_restarts_the_record() -> Result<()> {
    let (door, sprites) = load("door")?;
    let mut engine = Engine::default();
    let e = EntityId(9);
    engine.create(e, Arc::clone(&door));
    engine.update(0.25, Inputs::default(), &sprites);
    engine.create(e, door);
    assert_eq!(engine.len(), 1);
    assert_eq!(engine.elapsed(e), Some(0.0));
    Ok(())
}

#[test]
fn failed_weights_freeze_only_that_entity() -> Result<()> {
    let (hero, mut library) = load("hero")?;
    let (door, door_sprites) = load("door")?;
    library.merge(door_sprites);

    // match(speed, 0) needs two stack slots
    let mut engine = Engine::new(Config {
        stack_capacity: 1,
        ..Config::default()
    });
    let (h, d) = (EntityId(1), EntityId(2));
    engine.create(h, hero);
    engine.create(d, door);

    let out = engine.update(0.25, Inputs::default(), &library);
    assert_eq!(out.frame_of(h), None);
    assert_eq!(failures(&out.events, h), 3);
    assert_eq!(out.frame_of(d), Some(2));
    assert_eq!(failures(&out.events, d), 0);
    Ok(())
}

#[test]
fn failed_speed_freezes_time() -> Result<()> {
    let (hero, sprites) = load("hero")?;
    // weights fit in two slots, the speed expression needs three
    let mut engine = Engine::new(Config {
        stack_capacity: 2,
        ..Config::default()
    });
    let e = EntityId(1);
    engine.create(e, hero);
    for _ in 0..3 {
        let out = engine.update(0.25, Inputs::default(), &sprites);
        assert_eq!(out.frame_of(e), Some(0));
        assert_eq!(failures(&out.events, e), 1);
    }
    assert_eq!(engine.elapsed(e), Some(0.0));
    Ok(())
}

#[test]
fn missing_animation_is_reported() -> Result<()> {
    let (door, _) = load("door")?;
    let mut engine = Engine::default();
    let e = EntityId(5);
    engine.create(e, door);
    let out = engine.update(0.25, Inputs::default(), &SpriteLibrary::new());
    assert!(out.frames.is_empty());
    assert!(matches!(
        &out.events[..],
        [MachineEvent::EvaluationFailed { reason, .. }] if reason.contains("missing")
    ));
    Ok(())
}

#[test]
fn outputs_clear_each_tick_and_drain() -> Result<()> {
    let (door, sprites) = load("door")?;
    let mut engine = Engine::new(Config {
        max_events_per_tick: 1,
        ..Config::default()
    });
    engine.create(EntityId(1), Arc::clone(&door));
    engine.create(EntityId(2), door);

    let out = engine.update(0.1, Inputs::default(), &sprites);
    assert_eq!(out.frames.len(), 1);
    let drained: Vec<_> = engine.drain_frames().collect();
    assert_eq!(drained.len(), 1);
    assert!(engine.outputs().frames.is_empty());

    engine.update(0.1, Inputs::default().trigger(EntityId(1), "nothing"), &sprites);
    assert!(engine.outputs().events.is_empty());
    assert_eq!(engine.outputs().frames.len(), 1);
    Ok(())
}

#[test]
fn broken_fixture_reports_the_offending_expression() -> Result<()> {
    let json = state_machines::json("broken-weight")?;
    let err = compile_state_machine_json(&json, &CompilerConfig::default()).unwrap_err();
    match &err {
        BuildError::Expression { context, source, .. } => {
            assert_eq!(context, "state `idle` animation `hero/idle` weight");
            assert!(matches!(
                source,
                CompileError::ArityMismatch {
                    function: "match",
                    expected: 2,
                    found: 1,
                    ..
                }
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.render().contains("match(speed) * 2"));
    Ok(())
}
