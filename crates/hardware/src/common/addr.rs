//! Physical and Virtual Address types.
//!
//! This module defines strong types for physical and virtual addresses to prevent
//! accidental mixing of address spaces. It provides the following:
//! 1. **Type Safety:** Distinguishes between virtual and physical address spaces at compile time.
//! 2. **Address Manipulation:** Helpers for page offsets, single-bit extraction and width checks.
//! 3. **MMU Integration:** Acts as the primary interface for memory translation operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A virtual address in the LoongArch64 address space.
///
/// Virtual addresses are produced by guest instructions and must be translated to
/// physical addresses through the MMU before accessing memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VirtAddr(pub u64);

/// A physical address in the LoongArch64 address space.
///
/// Physical addresses represent actual memory locations and are used after
/// virtual-to-physical address translation has completed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhysAddr(pub u64);

impl VirtAddr {
    /// Creates a new virtual address from a raw 64-bit value.
    ///
    /// # Arguments
    ///
    /// * `addr` - The raw 64-bit address value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Extracts the byte offset within a page of `1 << page_shift` bytes.
    ///
    /// # Arguments
    ///
    /// * `page_shift` - log2 of the page size.
    ///
    /// # Returns
    ///
    /// The low `page_shift` bits of the address.
    #[inline(always)]
    pub const fn page_offset(&self, page_shift: u8) -> u64 {
        self.0 & low_mask(page_shift as u32)
    }

    /// Returns bit `n` of the address.
    #[inline(always)]
    pub const fn bit(&self, n: u32) -> bool {
        (self.0 >> n) & 1 != 0
    }

    /// Checks that the bits above an implemented width sign-extend bit `width - 1`.
    ///
    /// # Arguments
    ///
    /// * `width` - Number of implemented virtual address bits.
    ///
    /// # Returns
    ///
    /// `true` if bits `[63:width-1]` are all zero or all one.
    pub const fn is_canonical(&self, width: u32) -> bool {
        if width >= 64 {
            return true;
        }
        let upper = self.0 >> (width - 1);
        upper == 0 || upper == u64::MAX >> (width - 1)
    }

    /// Truncates the address to `width` bits.
    #[inline(always)]
    pub const fn truncate(&self, width: u32) -> u64 {
        self.0 & low_mask(width)
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    ///
    /// # Arguments
    ///
    /// * `addr` - The raw 64-bit address value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for VirtAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Returns a mask with the low `bits` bits set; saturates at 64.
#[inline(always)]
pub const fn low_mask(bits: u32) -> u64 {
    if bits >= 64 { u64::MAX } else { (1u64 << bits) - 1 }
}

/// Sign-extends a `width`-bit value to 64 bits.
#[inline(always)]
pub const fn sign_extend(value: u64, width: u32) -> u64 {
    if width == 0 || width >= 64 {
        return value;
    }
    let shift = 64 - width;
    (((value << shift) as i64) >> shift) as u64
}
