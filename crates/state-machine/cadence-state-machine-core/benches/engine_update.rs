use std::sync::Arc;

use cadence_state_machine_core::{
    compile_state_machine_json, CompilerConfig, Engine, EntityId, Inputs, SpriteLibrary,
    StateMachineResource,
};
use cadence_test_fixtures::state_machines;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_engine(c: &mut Criterion) {
    let json = state_machines::json("hero").expect("hero fixture");
    let sprites_json = state_machines::sprites_json("hero")
        .expect("hero fixture")
        .expect("hero sprites");
    let sprites = SpriteLibrary::from_json(&sprites_json).expect("parse sprites");
    let bytes = compile_state_machine_json(&json, &CompilerConfig::default()).expect("compile hero");
    let resource = Arc::new(StateMachineResource::from_bytes(bytes.clone()).expect("load hero"));

    let mut engine = Engine::default();
    for id in 0..1000u32 {
        engine.create(EntityId(id), Arc::clone(&resource));
    }
    let speed = engine.variable_index(EntityId(0), "speed").expect("speed variable");

    c.bench_function("update_1000_entities", |b| {
        let mut tick = 0u32;
        b.iter(|| {
            tick = tick.wrapping_add(1);
            let value = (tick % 3) as f32;
            let inputs = Inputs::default().set_variable(EntityId(tick % 1000), speed, value);
            black_box(engine.update(black_box(1.0 / 60.0), inputs, &sprites).frames.len())
        })
    });
    c.bench_function("load_hero_resource", |b| {
        b.iter(|| StateMachineResource::from_bytes(black_box(bytes.clone())))
    });
    c.bench_function("compile_hero_resource", |b| {
        b.iter(|| compile_state_machine_json(black_box(&json), &CompilerConfig::default()))
    });
}

criterion_group!(benches, bench_engine);
criterion_main!(benches);
