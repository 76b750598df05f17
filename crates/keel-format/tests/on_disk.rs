//! Snapshots written to bytes and read back into a fresh container restore
//! the same live state, and mismatched targets reject the load as a whole.

use keel_container::{GroupSpec, SnapshotContainer};
use keel_core::{
    ContainerId, FieldDef, FieldTypeId, FrameId, GroupId, RecordHandle, ValidationError,
};
use keel_engine::{EngineConfig, SchedulingStrategy, SnapshotEngine};
use keel_format::{read_snapshot_into, write_snapshot, FormatError, SnapshotWriter, HEADER_SIZE};
use keel_test_utils::fixtures::{carries_all, container_for, mixed_fields, populate, scenario_fields};
use keel_test_utils::MockWorld;

const C: ContainerId = ContainerId(0);
const G: GroupId = GroupId(0);
const HEALTH: FieldTypeId = FieldTypeId(0x20);

fn engine() -> SnapshotEngine {
    SnapshotEngine::new(EngineConfig::with_strategy(SchedulingStrategy::PerField)).unwrap()
}

fn captured_world(count: u32) -> (MockWorld, SnapshotContainer) {
    let fields = mixed_fields();
    let mut world = MockWorld::new(fields.clone());
    populate(&mut world, C, G, &fields, 0, count, carries_all);
    let mut container = container_for(&fields, count);
    engine().capture(&mut container, G, world.batches(C, G));
    (world, container)
}

#[test]
fn loaded_snapshot_restores_like_the_original() {
    let (mut world, container) = captured_world(6);
    let expected = world.states();

    let mut buf = Vec::new();
    write_snapshot(&mut buf, FrameId(120), &container).unwrap();
    assert_eq!(buf.len(), HEADER_SIZE + container.len());

    let mut loaded = container_for(&mixed_fields(), 6);
    assert_eq!(
        read_snapshot_into(&mut buf.as_slice(), &mut loaded).unwrap(),
        FrameId(120)
    );
    assert!(loaded.is_valid());
    assert_eq!(loaded.as_bytes(), container.as_bytes());

    for handle in 0..6 {
        world.set_value(RecordHandle(handle), HEALTH, &[0; 4]);
    }
    let mutations = engine().restore(&loaded, G, world.batches_mut(C, G));
    assert!(mutations.is_empty());

    let from_original = {
        let mut other = world.clone();
        let _ = engine().restore(&container, G, other.batches_mut(C, G));
        other.states()
    };
    assert_eq!(world.states(), from_original);
    for (handle, state) in &expected {
        assert_eq!(
            world.record(*handle).unwrap().fields[&HEALTH],
            state.fields[&HEALTH]
        );
    }
}

#[test]
fn wrong_record_count_keeps_previous_state() {
    let (_, container) = captured_world(6);
    let mut buf = Vec::new();
    write_snapshot(&mut buf, FrameId(1), &container).unwrap();

    let (_, mut target) = captured_world(5);
    let before = target.as_bytes().to_vec();
    let err = read_snapshot_into(&mut buf.as_slice(), &mut target).unwrap_err();
    assert!(matches!(
        err,
        FormatError::Validation(ValidationError::CapacityMismatch {
            expected: 5,
            found: 6
        })
    ));
    assert!(!target.is_valid());
    assert_eq!(target.as_bytes(), before.as_slice());
}

#[test]
fn different_composition_is_rejected() {
    let (_, container) = captured_world(5);
    let mut buf = Vec::new();
    write_snapshot(&mut buf, FrameId(1), &container).unwrap();

    let mut target = container_for(&scenario_fields(), 5);
    let err = read_snapshot_into(&mut buf.as_slice(), &mut target).unwrap_err();
    assert!(matches!(
        err,
        FormatError::Validation(ValidationError::LayoutHashMismatch { .. })
    ));
}

#[test]
fn same_groups_with_other_record_split_are_rejected() {
    let x = vec![FieldDef::scalar("x", FieldTypeId(0x70), 4)];
    let y = vec![FieldDef::scalar("y", FieldTypeId(0x71), 4)];
    let mut world = MockWorld::new(x.iter().chain(&y).cloned());
    populate(&mut world, C, GroupId(0), &x, 0, 3, carries_all);
    populate(&mut world, C, GroupId(1), &y, 100, 5, carries_all);

    let mut source =
        SnapshotContainer::new(&[GroupSpec::new(x.clone(), 3), GroupSpec::new(y.clone(), 5)])
            .unwrap();
    let inputs = keel_engine::LiveWorld::capture_batches(&world, C);
    engine().capture_groups(&mut source, &inputs);
    let mut buf = Vec::new();
    write_snapshot(&mut buf, FrameId(9), &source).unwrap();

    let mut target =
        SnapshotContainer::new(&[GroupSpec::new(x, 5), GroupSpec::new(y, 3)]).unwrap();
    assert_eq!(target.layout_hash(), source.layout_hash());
    assert_eq!(target.total_capacity(), source.total_capacity());
    assert_eq!(target.len(), source.len());
    assert!(!target.compatible_with(&source));

    let before = target.as_bytes().to_vec();
    let err = read_snapshot_into(&mut buf.as_slice(), &mut target).unwrap_err();
    assert!(matches!(
        err,
        FormatError::Validation(ValidationError::LayoutHashMismatch { .. })
    ));
    assert!(!target.is_valid());
    assert_eq!(target.as_bytes(), before.as_slice());
}

#[test]
fn multi_group_snapshots_stream_back_to_back() {
    let specs = [
        GroupSpec::new(mixed_fields(), 4),
        GroupSpec::new(scenario_fields(), 2),
    ];
    let mut world = MockWorld::new(mixed_fields().into_iter().chain(scenario_fields()));
    populate(&mut world, C, GroupId(0), &mixed_fields(), 0, 4, carries_all);
    populate(&mut world, C, GroupId(1), &scenario_fields(), 100, 2, carries_all);

    let engine = engine();
    let mut container = SnapshotContainer::new(&specs).unwrap();
    let mut writer = SnapshotWriter::new(Vec::new());
    for frame in 0..3 {
        world.set_value(RecordHandle(frame as u64), HEALTH, &[frame as u8; 4]);
        let inputs = keel_engine::LiveWorld::capture_batches(&world, C);
        engine.capture_groups(&mut container, &inputs);
        writer.write(FrameId(frame), &container).unwrap();
    }
    let buf = writer.into_inner();

    let mut stream = buf.as_slice();
    let mut target = SnapshotContainer::new(&specs).unwrap();
    for frame in 0..3 {
        assert_eq!(
            read_snapshot_into(&mut stream, &mut target).unwrap(),
            FrameId(frame)
        );
    }
    assert!(stream.is_empty());
    assert_eq!(target.as_bytes(), container.as_bytes());
}
