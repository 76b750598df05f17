//! Group layouts and the packed snapshot container.
//!
//! One contiguous byte buffer holds every group's region back to back.
//! Inside a group region each field owns one sub-array of fixed-stride
//! slots, one slot per local index:
//!
//! ```text
//! SnapshotContainer
//! └── data: Vec<u8>
//!     ├── group 0 region (record_count * size_per_record bytes)
//!     │   ├── field 0 sub-array: [meta|payload] × record_count
//!     │   ├── field 1 sub-array: [meta|payload] × record_count
//!     │   └── ...
//!     ├── group 1 region
//!     └── ...
//! ```
//!
//! All `unsafe` implementation is confined to [`raw`]. Callers of
//! [`SlotWriter::slot_mut`] uphold its disjointness contract.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod container;
pub mod error;
pub mod hash;
pub mod layout;
pub mod raw;
pub mod resize;

pub use container::{GroupSpec, SlotView, SnapshotContainer};
pub use error::LayoutError;
pub use hash::{container_layout_hash, layout_hash, snapshot_hash};
pub use layout::{FieldDescriptor, GroupLayout};
pub use raw::SlotWriter;
pub use resize::ResizeOutcome;
