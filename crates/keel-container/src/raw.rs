//! Shared write access to disjoint slots of one container buffer.
//!
//! Grouped capture runs one task per record batch, and every task writes
//! the slots of its own records across all of the group's field
//! sub-arrays. Those slots are scattered, so they cannot be handed out by
//! splitting the buffer. [`SlotWriter`] hands out raw sub-slices instead;
//! the caller promises that no two live sub-slices overlap.
//!
//! In debug builds every claimed range is recorded and an overlapping
//! claim panics.

#![allow(unsafe_code)]

use std::marker::PhantomData;
use std::ops::Range;

#[cfg(debug_assertions)]
use std::collections::BTreeMap;
#[cfg(debug_assertions)]
use std::sync::Mutex;

/// Hands out non-overlapping mutable sub-slices of one byte buffer to
/// concurrently running tasks.
pub struct SlotWriter<'a> {
    ptr: *mut u8,
    len: usize,
    #[cfg(debug_assertions)]
    claims: Mutex<BTreeMap<usize, usize>>,
    _buffer: PhantomData<&'a mut [u8]>,
}

// SAFETY: the writer only hands out sub-slices under the caller's promise
// that they are disjoint, so sharing it between threads gives each thread
// exclusive access to its own bytes. The exclusive borrow of the buffer
// is held for 'a, so nothing else can touch it meanwhile.
unsafe impl Send for SlotWriter<'_> {}
// SAFETY: see `Send` above.
unsafe impl Sync for SlotWriter<'_> {}

impl<'a> SlotWriter<'a> {
    /// Take exclusive ownership of `buffer` for the writer's lifetime.
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            ptr: buffer.as_mut_ptr(),
            len: buffer.len(),
            #[cfg(debug_assertions)]
            claims: Mutex::new(BTreeMap::new()),
            _buffer: PhantomData,
        }
    }

    /// Length of the underlying buffer.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the underlying buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Mutable access to `range` of the buffer.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds, or (debug builds) if it overlaps
    /// a range claimed earlier from this writer.
    ///
    /// # Safety
    ///
    /// No other slice obtained from this writer that overlaps `range` may
    /// be alive while the returned slice is used.
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn slot_mut(&self, range: Range<usize>) -> &mut [u8] {
        assert!(
            range.start <= range.end && range.end <= self.len,
            "slot range {range:?} out of bounds for buffer of {} bytes",
            self.len
        );
        #[cfg(debug_assertions)]
        self.claim(&range);
        // SAFETY: the range is in bounds of the buffer borrowed for 'a,
        // and the caller guarantees no overlapping slice is alive.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.add(range.start), range.len()) }
    }

    #[cfg(debug_assertions)]
    fn claim(&self, range: &Range<usize>) {
        if range.is_empty() {
            return;
        }
        let mut claims = self
            .claims
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some((&start, &end)) = claims.range(..range.end).next_back() {
            assert!(
                end <= range.start,
                "slot range {range:?} overlaps earlier claim {start}..{end}"
            );
        }
        claims.insert(range.start, range.end);
    }
}
