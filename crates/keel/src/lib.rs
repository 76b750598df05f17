//! Keel: capture and restore the state of large groups of records.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Keel sub-crates. For most users, adding `keel` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use keel::prelude::*;
//!
//! let fields = vec![
//!     FieldDef::scalar("health", FieldTypeId(1), 4),
//!     FieldDef::array("path", FieldTypeId(2), 2, 4).enableable(true),
//! ];
//!
//! // Two live records in one batch.
//! let mut batch = RecordBatch::new(fields.iter().map(|d| (d.type_id, FieldColumn::for_def(d))));
//! batch.push(RecordHandle(7), LocalIndex(0), &[
//!     (FieldTypeId(1), &[10, 0, 0, 0], true),
//!     (FieldTypeId(2), &[1, 2, 3, 4], true),
//! ]);
//! batch.push(RecordHandle(8), LocalIndex(1), &[
//!     (FieldTypeId(1), &[20, 0, 0, 0], true),
//!     (FieldTypeId(2), &[], false),
//! ]);
//! let mut batches = vec![batch];
//!
//! let engine = SnapshotEngine::new(EngineConfig::default()).unwrap();
//! let mut container = SnapshotContainer::new(&[GroupSpec::new(fields, 2)]).unwrap();
//! let stats = engine.capture(&mut container, GroupId(0), &batches);
//! assert_eq!(stats.slots_written, 4);
//!
//! // Scribble over live state, then bring it back.
//! batches[0].column_mut(FieldTypeId(1)).unwrap().set(0, &[0, 0, 0, 0]);
//! let mutations = engine.restore(&container, GroupId(0), &mut batches);
//! assert!(mutations.is_empty());
//! assert_eq!(batches[0].column(FieldTypeId(1)).unwrap().get(0), &[10, 0, 0, 0]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `keel-core` | IDs, slot metadata, field definitions, live batches |
//! | [`container`] | `keel-container` | Layouts, the snapshot container, resize |
//! | [`engine`] | `keel-engine` | Capture, restore, scheduling, request handling |
//! | [`format`] | `keel-format` | On-disk snapshot codec and file helpers |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Identifiers, slot metadata, field definitions and live batches
/// (`keel-core`).
pub use keel_core as types;

/// Layout builder, snapshot container and in-place resize
/// (`keel-container`).
///
/// [`container::SnapshotContainer`] owns the byte buffer; its layout is
/// described by one [`container::GroupLayout`] per group.
pub use keel_container as container;

/// Capture and restore engines (`keel-engine`).
///
/// [`engine::SnapshotEngine`] runs captures and restores with the
/// configured [`engine::SchedulingStrategy`].
pub use keel_engine as engine;

/// On-disk snapshot format (`keel-format`).
pub use keel_format as format;

/// Common imports for typical Keel usage.
///
/// ```rust
/// use keel::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use keel_core::{
        ContainerId, FieldColumn, FieldDef, FieldTypeId, FrameId, GroupId, LocalIndex,
        RecordBatch, RecordHandle, SlotMeta,
    };

    // Errors
    pub use keel_container::LayoutError;
    pub use keel_core::ValidationError;
    pub use keel_format::FormatError;

    // Container
    pub use keel_container::{GroupSpec, ResizeOutcome, SnapshotContainer};

    // Engine
    pub use keel_engine::{
        ContainerRegistry, DeferredMutation, EngineConfig, LiveWorld, MutationList,
        RequestQueue, SchedulingStrategy, SnapshotEngine, StructuralSink,
    };
}
