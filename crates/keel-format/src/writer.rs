//! Snapshot writer.
//!
//! [`write_snapshot`] streams one container to any `Write` sink;
//! [`SnapshotWriter`] wraps a sink that receives several snapshots back
//! to back, for example one per frame.

use std::io::Write;

use keel_container::SnapshotContainer;
use keel_core::FrameId;

use crate::codec::{encode_header, SnapshotHeader};
use crate::error::FormatError;

/// Write `container` as captured at `frame`: header, then raw bytes.
///
/// The container's validity flag is not recorded; callers decide whether
/// an invalid container is worth saving.
///
/// # Examples
///
/// ```
/// use keel_container::{GroupSpec, SnapshotContainer};
/// use keel_core::{FieldDef, FieldTypeId, FrameId};
/// use keel_format::{read_snapshot_into, write_snapshot};
///
/// let spec = GroupSpec::new(vec![FieldDef::scalar("hp", FieldTypeId(1), 4)], 3);
/// let source = SnapshotContainer::new(&[spec.clone()]).unwrap();
///
/// let mut buf = Vec::new();
/// write_snapshot(&mut buf, FrameId(9), &source).unwrap();
///
/// let mut target = SnapshotContainer::new(&[spec]).unwrap();
/// let frame = read_snapshot_into(&mut buf.as_slice(), &mut target).unwrap();
/// assert_eq!(frame, FrameId(9));
/// assert!(target.is_valid());
/// ```
pub fn write_snapshot<W: Write>(
    w: &mut W,
    frame: FrameId,
    container: &SnapshotContainer,
) -> Result<(), FormatError> {
    let header = SnapshotHeader::for_container(frame, container)?;
    encode_header(w, &header)?;
    w.write_all(container.as_bytes())?;
    Ok(())
}

/// Writes a sequence of snapshots to a byte stream.
///
/// Generic over `W: Write` so tests can use `Vec<u8>` and production
/// code can use `BufWriter<File>`.
pub struct SnapshotWriter<W: Write> {
    writer: W,
    snapshots_written: u64,
}

impl<W: Write> SnapshotWriter<W> {
    /// Wrap a sink.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            snapshots_written: 0,
        }
    }

    /// Append one snapshot.
    pub fn write(&mut self, frame: FrameId, container: &SnapshotContainer) -> Result<(), FormatError> {
        write_snapshot(&mut self.writer, frame, container)?;
        self.snapshots_written += 1;
        Ok(())
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> Result<(), FormatError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of snapshots written so far.
    pub fn snapshots_written(&self) -> u64 {
        self.snapshots_written
    }

    /// Consume the writer and return the underlying sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
