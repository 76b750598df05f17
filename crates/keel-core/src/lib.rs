//! Core types for the Keel snapshot engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental abstractions used throughout the Keel workspace:
//! identifiers, the packed per-slot metadata header, field definitions,
//! the live record batch model, and shared error types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod field;
pub mod id;
pub mod meta;
pub mod record;

pub use error::{FieldDefError, ValidationError};
pub use field::{FieldDef, FieldKind};
pub use id::{ContainerId, FieldTypeId, FrameId, GroupId, LocalIndex, RecordHandle};
pub use meta::{SlotMeta, MAX_FOUND_COUNT, META_SIZE};
pub use record::{BatchPartsMut, FieldColumn, RecordBatch, RemovedRow};
