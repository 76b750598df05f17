//! Binary encode/decode for the snapshot header.
//!
//! All integers are little-endian. The header is followed directly by the
//! raw container bytes; there is no magic, version byte or padding.

use std::io::{Read, Write};

use keel_container::SnapshotContainer;
use keel_core::FrameId;

use crate::error::FormatError;

/// Encoded size of [`SnapshotHeader`] in bytes.
pub const HEADER_SIZE: usize = 4 + 8 + 4 + 4;

// ── Primitive writers ───────────────────────────────────────────

/// Write a little-endian i32.
pub fn write_i32_le(w: &mut dyn Write, v: i32) -> Result<(), FormatError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), FormatError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a little-endian i32.
pub fn read_i32_le(r: &mut dyn Read) -> Result<i32, FormatError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, FormatError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

// ── Header ──────────────────────────────────────────────────────

/// Fixed-size header that precedes the raw container bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SnapshotHeader {
    /// Opaque frame identifier; never validated.
    pub frame: FrameId,
    /// Layout compatibility hash of the source container, with its
    /// per-group record counts folded in.
    pub layout_hash: u64,
    /// Total record capacity of the source container.
    pub capacity: i32,
    /// Number of raw bytes that follow the header.
    pub data_len: i32,
}

impl SnapshotHeader {
    /// Describe `container` as captured at `frame`.
    ///
    /// Fails if the capacity or byte length does not fit in an `i32`.
    pub fn for_container(
        frame: FrameId,
        container: &SnapshotContainer,
    ) -> Result<Self, FormatError> {
        Ok(Self {
            frame,
            layout_hash: container.snapshot_hash(),
            capacity: to_i32("capacity", container.total_capacity())?,
            data_len: to_i32("data length", container.len() as u64)?,
        })
    }

    /// Payload length as a byte count.
    ///
    /// Fails on a negative length.
    pub fn payload_len(&self) -> Result<usize, FormatError> {
        usize::try_from(self.data_len).map_err(|_| FormatError::Malformed {
            detail: format!("negative data length {}", self.data_len),
        })
    }

    /// Record capacity as an unsigned count.
    ///
    /// Fails on a negative capacity.
    pub fn record_capacity(&self) -> Result<u64, FormatError> {
        u64::try_from(self.capacity).map_err(|_| FormatError::Malformed {
            detail: format!("negative capacity {}", self.capacity),
        })
    }
}

fn to_i32(field: &'static str, value: u64) -> Result<i32, FormatError> {
    i32::try_from(value).map_err(|_| FormatError::TooLarge { field, value })
}

/// Encode a snapshot header.
pub fn encode_header(w: &mut dyn Write, header: &SnapshotHeader) -> Result<(), FormatError> {
    write_i32_le(w, header.frame.0)?;
    write_u64_le(w, header.layout_hash)?;
    write_i32_le(w, header.capacity)?;
    write_i32_le(w, header.data_len)?;
    Ok(())
}

/// Decode a snapshot header.
///
/// Does not check the values against any container; see
/// [`crate::reader::read_snapshot_into`].
pub fn decode_header(r: &mut dyn Read) -> Result<SnapshotHeader, FormatError> {
    let mut buf = [0u8; HEADER_SIZE];
    read_fully(r, &mut buf, "header")?;
    let mut cursor: &[u8] = &buf;
    Ok(SnapshotHeader {
        frame: FrameId(read_i32_le(&mut cursor)?),
        layout_hash: read_u64_le(&mut cursor)?,
        capacity: read_i32_le(&mut cursor)?,
        data_len: read_i32_le(&mut cursor)?,
    })
}

/// Fill `buf` completely, reporting how far a short read got.
pub(crate) fn read_fully(
    r: &mut dyn Read,
    buf: &mut [u8],
    what: &str,
) -> Result<(), FormatError> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(FormatError::Truncated {
                    detail: format!("got {filled} of {} bytes of {what}", buf.len()),
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
