//! On-disk snapshot format for Keel containers.
//!
//! A snapshot is a fixed header followed by the container's raw bytes,
//! copied verbatim. Loading revalidates the header against the target
//! container and rejects the whole snapshot on any mismatch.
//!
//! # Format
//!
//! ```text
//! [frame i32] [layout hash u64] [capacity i32] [data length N i32] [N bytes]
//! ```
//!
//! All integers are little-endian. No serde; the codec is hand-written.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod error;
pub mod file;
pub mod reader;
pub mod writer;

pub use codec::{SnapshotHeader, HEADER_SIZE};
pub use error::FormatError;
pub use file::{load_from_path, load_from_path_optional, save_to_path};
pub use reader::{read_header, read_snapshot_into};
pub use writer::{write_snapshot, SnapshotWriter};
