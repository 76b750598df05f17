//! Capture followed by restore brings live records back to the captured
//! state, including field presence and enabled flags.

use std::collections::BTreeMap;

use keel_core::{ContainerId, FieldDef, FieldTypeId, GroupId, LocalIndex, RecordHandle};
use keel_engine::{EngineConfig, SchedulingStrategy, SnapshotEngine, StructuralSink};
use keel_test_utils::fixtures::{container_for, mixed_fields, populate};
use keel_test_utils::{MockWorld, RecordState};

const C: ContainerId = ContainerId(0);
const G: GroupId = GroupId(0);
const HEALTH: FieldTypeId = FieldTypeId(0x20);
const SHIELD: FieldTypeId = FieldTypeId(0x21);
const TAG: FieldTypeId = FieldTypeId(0x22);
const WAYPOINTS: FieldTypeId = FieldTypeId(0x23);

fn engine(strategy: SchedulingStrategy) -> SnapshotEngine {
    SnapshotEngine::new(EngineConfig {
        strategy,
        worker_count: Some(4),
    })
    .unwrap()
}

/// Every third record lacks health, every fourth lacks the shield.
fn carries(handle: RecordHandle, def: &FieldDef) -> bool {
    match def.type_id {
        HEALTH => handle.0 % 3 != 0,
        SHIELD => handle.0 % 4 != 0,
        _ => true,
    }
}

/// What capture can preserve: arrays clamped to their capacity.
fn storable(fields: &[FieldDef], states: BTreeMap<RecordHandle, RecordState>) -> BTreeMap<RecordHandle, RecordState> {
    states
        .into_iter()
        .map(|(h, mut state)| {
            for def in fields.iter().filter(|d| d.is_array()) {
                if let Some((value, _)) = state.fields.get_mut(&def.type_id) {
                    value.truncate(def.payload_size());
                }
            }
            (h, state)
        })
        .collect()
}

fn scramble(world: &mut MockWorld) {
    for (handle, state) in world.states() {
        if state.fields.contains_key(&HEALTH) {
            world.set_value(handle, HEALTH, &[0xEE; 4]);
        }
        if let Some((_, enabled)) = state.fields.get(&SHIELD) {
            world.set_field_enabled(handle, SHIELD, !enabled);
        }
        if state.fields.contains_key(&WAYPOINTS) {
            world.set_value(handle, WAYPOINTS, &[1, 2, 3]);
        }
    }
    // Structural changes the restore has to undo.
    world.remove_field(RecordHandle(1), HEALTH);
    world.remove_field(RecordHandle(2), SHIELD);
    world.remove_field(RecordHandle(5), TAG);
    world.add_field(RecordHandle(3), HEALTH, &[9, 9, 9, 9]);
    world.add_field(RecordHandle(8), SHIELD, &[7; 8]);
}

fn round_trip(strategy: SchedulingStrategy) {
    let fields = mixed_fields();
    let mut world = MockWorld::new(fields.clone());
    populate(&mut world, C, G, &fields, 0, 24, carries);
    let expected = storable(&fields, world.states());

    let engine = engine(strategy);
    let mut container = container_for(&fields, 24);
    engine.capture(&mut container, G, world.batches(C, G));

    scramble(&mut world);
    assert_ne!(world.states(), expected);

    let mutations = engine.restore(&container, G, world.batches_mut(C, G));
    assert!(!mutations.is_empty());
    mutations.apply(&mut world);

    assert_eq!(world.states(), expected);
}

#[test]
fn round_trip_per_field() {
    round_trip(SchedulingStrategy::PerField);
}

#[test]
fn round_trip_grouped() {
    round_trip(SchedulingStrategy::Grouped);
}

#[test]
fn restore_without_changes_emits_nothing() {
    let fields = mixed_fields();
    let mut world = MockWorld::new(fields.clone());
    populate(&mut world, C, G, &fields, 0, 10, carries);
    let before = world.states();

    let engine = engine(SchedulingStrategy::default());
    let mut container = container_for(&fields, 10);
    engine.capture(&mut container, G, world.batches(C, G));
    let mutations = engine.restore(&container, G, world.batches_mut(C, G));
    assert!(mutations.is_empty());
    assert_eq!(world.states(), storable(&fields, before));
}

#[test]
fn overlong_arrays_come_back_clamped() {
    let fields = vec![FieldDef::array("path", WAYPOINTS, 2, 3)];
    let mut world = MockWorld::new(fields.clone());
    world.spawn(C, G, RecordHandle(1), LocalIndex(0), &[(WAYPOINTS, &[1, 1, 2, 2, 3, 3, 4, 4], true)]);

    let engine = engine(SchedulingStrategy::Grouped);
    let mut container = container_for(&fields, 1);
    engine.capture(&mut container, G, world.batches(C, G));
    world.set_value(RecordHandle(1), WAYPOINTS, &[]);
    let _ = engine.restore(&container, G, world.batches_mut(C, G));

    let state = world.record(RecordHandle(1)).unwrap();
    assert_eq!(state.fields[&WAYPOINTS].0, vec![1, 1, 2, 2, 3, 3]);
}
