//! Snapshot reader.
//!
//! Reading validates the header against the target container before any
//! byte is copied. A rejected snapshot leaves the container's bytes as
//! they were and marks it invalid.

use std::io::Read;

use keel_container::SnapshotContainer;
use keel_core::FrameId;
use log::warn;

use crate::codec::{decode_header, read_fully, SnapshotHeader};
use crate::error::FormatError;

/// Read one snapshot from `r` into `container`.
///
/// Returns the frame identifier stored in the header. On any error the
/// container is marked invalid; its bytes are only overwritten once the
/// whole payload has been read and validated.
pub fn read_snapshot_into<R: Read>(
    r: &mut R,
    container: &mut SnapshotContainer,
) -> Result<FrameId, FormatError> {
    match read_checked(r, container) {
        Ok(frame) => Ok(frame),
        Err(e) => {
            container.invalidate();
            warn!("snapshot load rejected: {e}");
            Err(e)
        }
    }
}

fn read_checked(r: &mut dyn Read, container: &mut SnapshotContainer) -> Result<FrameId, FormatError> {
    let header = decode_header(r)?;
    let capacity = header.record_capacity()?;
    let len = header.payload_len()?;
    container.validate_header(header.layout_hash, capacity, len as u64)?;

    let mut bytes = vec![0u8; len];
    read_fully(r, &mut bytes, "container data")?;
    container.load_raw(header.layout_hash, capacity, &bytes)?;
    Ok(header.frame)
}

/// Read only the header, leaving `r` positioned at the raw bytes.
pub fn read_header<R: Read>(r: &mut R) -> Result<SnapshotHeader, FormatError> {
    decode_header(r)
}
