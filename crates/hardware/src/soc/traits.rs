//! Collaborator traits the MMU depends on.
//!
//! The translation layer never owns memory or the emulator's translated-code cache.
//! It reaches both through the traits here:
//! 1. **`PhysicalMemory`:** 64-bit little-endian reads used by the page-walk assist.
//! 2. **`TranslationCacheFlush`:** notification that cached translations of a range are stale.

use crate::common::{BusError, PhysAddr, VirtAddr};

/// Physical memory as seen by the page-walk assist.
pub trait PhysicalMemory {
    /// Reads eight bytes (little-endian) at `paddr`.
    ///
    /// # Errors
    ///
    /// Returns a [`BusError`] if nothing backs the address.
    fn read_u64(&mut self, paddr: PhysAddr) -> Result<u64, BusError>;
}

/// Virtual range whose cached translations must be discarded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlushRange {
    /// Every cached translation.
    All,
    /// `len` bytes starting at the sign-extended `start`.
    Range {
        /// First address of the range.
        start: VirtAddr,
        /// Length in bytes (a page size).
        len: u64,
    },
}

/// Consumer of TLB invalidation notices (for example a translated-code cache).
pub trait TranslationCacheFlush {
    /// Drops cached translations covering `range`.
    fn flush_translation_cache(&mut self, range: FlushRange);
}

impl<F: FnMut(FlushRange)> TranslationCacheFlush for F {
    fn flush_translation_cache(&mut self, range: FlushRange) {
        self(range);
    }
}

/// Flush sink that discards every notice.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoFlush;

impl TranslationCacheFlush for NoFlush {
    fn flush_translation_cache(&mut self, _range: FlushRange) {}
}
