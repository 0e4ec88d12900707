//! Tests for SnapshotBuilder
//!
//! Every snapshot is decoded with the StateSnapshotSync view to check the
//! encoder and decoder agree.

use statesync_protocol::{Metaversion, StateSnapshotSync};

use crate::{BatchEntry, BuilderError, EncoderConfig, SnapshotBuilder};

fn ids(snapshot: &StateSnapshotSync<'_>, agents: bool) -> Vec<String> {
    let pool = if agents {
        snapshot.agent_pools()
    } else {
        snapshot.message_pools()
    };
    pool.unwrap()
        .map(|pool| {
            pool.iter()
                .map(|batch| batch.unwrap().batch_id().unwrap().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}

// =============================================================================
// Round trips
// =============================================================================

#[test]
fn test_two_agents_empty_messages_step_42() {
    let built = SnapshotBuilder::new()
        .agent_batch("batch-a")
        .agent_batch("batch-b")
        .empty_message_pool()
        .current_step(42)
        .build()
        .expect("should build snapshot");
    let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();

    assert_eq!(snapshot.agent_pool_len().unwrap(), 2);
    assert_eq!(ids(&snapshot, true), ["batch-a", "batch-b"]);
    assert!(!snapshot.message_pool_is_none().unwrap());
    assert_eq!(snapshot.message_pool_len().unwrap(), 0);
    assert_eq!(snapshot.current_step().unwrap(), 42);
}

#[test]
fn test_empty_builder() {
    let built = SnapshotBuilder::new().build().unwrap();
    let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();

    assert!(snapshot.agent_pool_is_none().unwrap());
    assert!(snapshot.message_pool_is_none().unwrap());
    assert_eq!(snapshot.current_step().unwrap(), 0);
    assert_eq!(snapshot.as_table().field_count(), 0);
}

#[test]
fn test_absent_and_empty_pools_differ() {
    let absent = SnapshotBuilder::new().current_step(1).build().unwrap();
    let empty = SnapshotBuilder::new()
        .empty_agent_pool()
        .current_step(1)
        .build()
        .unwrap();

    let absent = StateSnapshotSync::root(absent.as_bytes()).unwrap();
    let empty = StateSnapshotSync::root(empty.as_bytes()).unwrap();

    assert!(absent.agent_pool_is_none().unwrap());
    assert!(!empty.agent_pool_is_none().unwrap());
    assert_eq!(absent.agent_pool_len().unwrap(), 0);
    assert_eq!(empty.agent_pool_len().unwrap(), 0);
}

#[test]
fn test_empty_pool_then_batches() {
    let built = SnapshotBuilder::new()
        .empty_message_pool()
        .message_batch("m0")
        .build()
        .unwrap();
    let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();
    assert_eq!(ids(&snapshot, false), ["m0"]);
}

#[test]
fn test_pool_order_preserved() {
    let names: Vec<String> = (0..50).map(|i| format!("agents-{i:03}")).collect();
    let built = names
        .iter()
        .fold(SnapshotBuilder::new(), |b, name| b.agent_batch(name.as_str()))
        .message_batch("late")
        .message_batch("later")
        .build()
        .unwrap();
    let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();

    assert_eq!(ids(&snapshot, true), names);
    assert_eq!(ids(&snapshot, false), ["late", "later"]);
}

#[test]
fn test_metaversion_round_trip() {
    let built = SnapshotBuilder::new()
        .agent_batch(BatchEntry::new("a").with_metaversion(Metaversion::new(4, 17)))
        .agent_batch("b")
        .build()
        .unwrap();
    let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();

    let a = snapshot.agent_pool(0).unwrap().unwrap();
    let b = snapshot.agent_pool(1).unwrap().unwrap();
    assert_eq!(a.metaversion().unwrap(), Some(Metaversion::new(4, 17)));
    assert_eq!(b.metaversion().unwrap(), None);
}

#[test]
fn test_batch_without_id() {
    let entry = BatchEntry {
        batch_id: None,
        metaversion: Some(Metaversion::new(1, 1)),
    };
    let built = SnapshotBuilder::new().agent_batch(entry).build().unwrap();
    let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();

    let batch = snapshot.agent_pool(0).unwrap().unwrap();
    assert_eq!(batch.batch_id().unwrap(), None);
    assert_eq!(batch.metaversion().unwrap(), Some(Metaversion::new(1, 1)));
}

#[test]
fn test_extreme_steps() {
    for step in [i64::MIN, -1, 1, i64::MAX] {
        let built = SnapshotBuilder::new().current_step(step).build().unwrap();
        let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();
        assert_eq!(snapshot.current_step().unwrap(), step);
    }
}

#[test]
fn test_index_out_of_bounds() {
    let built = SnapshotBuilder::new().agent_batch("only").build().unwrap();
    let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();
    assert!(snapshot.agent_pool(1).is_err());
}

// =============================================================================
// Encoding switches
// =============================================================================

#[test]
fn test_default_step_not_written() {
    let built = SnapshotBuilder::new().agent_batch("a").build().unwrap();
    let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();

    let table = snapshot.as_table();
    assert!(!table.has_field(StateSnapshotSync::VT_CURRENT_STEP).unwrap());
    assert_eq!(snapshot.current_step().unwrap(), 0);
}

#[test]
fn test_force_defaults_writes_step() {
    let config = EncoderConfig {
        force_defaults: true,
        ..Default::default()
    };
    let built = SnapshotBuilder::new().config(config).build().unwrap();
    let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();

    let table = snapshot.as_table();
    assert!(table.has_field(StateSnapshotSync::VT_CURRENT_STEP).unwrap());
    assert_eq!(snapshot.current_step().unwrap(), 0);
}

#[test]
fn test_batches_share_vtable() {
    let built = SnapshotBuilder::new()
        .agent_batch("a")
        .agent_batch("b")
        .message_batch("c")
        .build()
        .unwrap();
    let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();

    let a = snapshot.agent_pool(0).unwrap().unwrap().as_table();
    let b = snapshot.agent_pool(1).unwrap().unwrap().as_table();
    let c = snapshot.message_pool(0).unwrap().unwrap().as_table();
    assert_eq!(a.vtable_position(), b.vtable_position());
    assert_eq!(a.vtable_position(), c.vtable_position());
}

#[test]
fn test_dedup_disabled() {
    let config = EncoderConfig {
        dedup_vtables: false,
        ..Default::default()
    };
    let built = SnapshotBuilder::new()
        .agent_batch("a")
        .agent_batch("b")
        .config(config)
        .build()
        .unwrap();
    let snapshot = StateSnapshotSync::root(built.as_bytes()).unwrap();

    let a = snapshot.agent_pool(0).unwrap().unwrap().as_table();
    let b = snapshot.agent_pool(1).unwrap().unwrap().as_table();
    assert_ne!(a.vtable_position(), b.vtable_position());
    assert_eq!(ids(&snapshot, true), ["a", "b"]);
}

#[test]
fn test_small_initial_capacity() {
    let config = EncoderConfig {
        initial_capacity: 8,
        ..Default::default()
    };
    let small = SnapshotBuilder::new()
        .agent_batch("grow-me")
        .current_step(3)
        .config(config)
        .build()
        .unwrap();
    let default = SnapshotBuilder::new()
        .agent_batch("grow-me")
        .current_step(3)
        .build()
        .unwrap();
    assert_eq!(small.as_bytes(), default.as_bytes());
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn test_invalid_config() {
    let config = EncoderConfig {
        initial_capacity: 64,
        max_buffer_size: 32,
        ..Default::default()
    };
    let err = SnapshotBuilder::new().config(config).build().unwrap_err();
    assert!(matches!(err, BuilderError::InvalidConfig(_)));
}

#[test]
fn test_snapshot_exceeds_max_size() {
    let config = EncoderConfig {
        initial_capacity: 64,
        max_buffer_size: 256,
        ..Default::default()
    };
    let err = SnapshotBuilder::new()
        .agent_batch("x".repeat(300))
        .config(config)
        .build()
        .unwrap_err();
    assert!(matches!(err, BuilderError::BufferTooLarge { max: 256, .. }));
}

// =============================================================================
// BuiltSnapshot
// =============================================================================

#[test]
fn test_built_snapshot_accessors() {
    let built = SnapshotBuilder::new().current_step(9).build().unwrap();
    assert!(!built.is_empty());
    assert_eq!(built.len(), built.as_bytes().len());
    assert_eq!(built.as_ref(), built.as_bytes());

    let bytes = built.clone().into_bytes();
    assert_eq!(&bytes[..], built.as_bytes());
}

#[test]
fn test_into_frame() {
    let built = SnapshotBuilder::new()
        .agent_batch("a")
        .current_step(5)
        .build()
        .unwrap();
    let ptr = built.as_bytes().as_ptr();
    let frame = built.into_frame().unwrap();

    assert_eq!(frame.as_bytes().as_ptr(), ptr);
    assert_eq!(frame.view().current_step().unwrap(), 5);
    assert_eq!(frame.view().agent_pool_len().unwrap(), 1);
}
