//! Packed 16-bit per-slot metadata header.
//!
//! Every slot in a snapshot container starts with a little-endian `u16`:
//!
//! ```text
//!  15        14        13 ............................ 0
//! [changed] [enabled] [found count (0..=16383)          ]
//! ```
//!
//! The width and bit positions are part of the on-disk format.

/// Size of the metadata header in bytes.
pub const META_SIZE: usize = 2;

/// Largest found count the header can represent.
pub const MAX_FOUND_COUNT: u16 = 0x3FFF;

/// Decoded view of a slot's metadata header.
///
/// The default value (`found_count = 0`, not enabled, not changed) means
/// the record did not carry the field at capture time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SlotMeta(u16);

impl SlotMeta {
    const CHANGED_BIT: u16 = 1 << 15;
    const ENABLED_BIT: u16 = 1 << 14;
    const FOUND_MASK: u16 = MAX_FOUND_COUNT;

    /// Header of a slot whose record lacked the field.
    pub const ABSENT: SlotMeta = SlotMeta(0);

    /// Encode a header.
    ///
    /// # Panics
    ///
    /// Panics if `found_count > MAX_FOUND_COUNT`. An oversized count means
    /// the layout admitted more elements than the header can describe.
    pub fn new(found_count: usize, enabled: bool, changed: bool) -> Self {
        match Self::try_new(found_count, enabled, changed) {
            Some(meta) => meta,
            None => panic!(
                "found count {found_count} exceeds slot metadata ceiling {MAX_FOUND_COUNT}"
            ),
        }
    }

    /// Encode a header, returning `None` if `found_count` is too large.
    pub fn try_new(found_count: usize, enabled: bool, changed: bool) -> Option<Self> {
        if found_count > MAX_FOUND_COUNT as usize {
            return None;
        }
        let mut bits = found_count as u16;
        if enabled {
            bits |= Self::ENABLED_BIT;
        }
        if changed {
            bits |= Self::CHANGED_BIT;
        }
        Some(Self(bits))
    }

    /// Reinterpret raw header bits.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits)
    }

    /// Raw header bits.
    pub const fn to_bits(self) -> u16 {
        self.0
    }

    /// Number of values found at capture time (0 = absent, 1 for present
    /// scalars, element count for arrays).
    pub const fn found_count(self) -> u16 {
        self.0 & Self::FOUND_MASK
    }

    /// Enabled flag recorded at capture time.
    pub const fn is_enabled(self) -> bool {
        self.0 & Self::ENABLED_BIT != 0
    }

    /// Whether the capture that wrote this header saw a difference from
    /// the previously stored value.
    pub const fn is_changed(self) -> bool {
        self.0 & Self::CHANGED_BIT != 0
    }

    /// Decode the header at the start of `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is shorter than [`META_SIZE`].
    pub fn read(slot: &[u8]) -> Self {
        Self(u16::from_le_bytes([slot[0], slot[1]]))
    }

    /// Encode this header into the start of `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot` is shorter than [`META_SIZE`].
    pub fn write(self, slot: &mut [u8]) {
        slot[..META_SIZE].copy_from_slice(&self.0.to_le_bytes());
    }
}
