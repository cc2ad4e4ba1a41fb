//! Global Translation Constants.
//!
//! This module defines architecture-wide constants shared by the MMU and the CSR
//! field helpers. It includes:
//! 1. **Page Geometry:** The base page size and the EntryHi/EntryLo field positions.
//! 2. **Walk Assist:** Bit positions used when synthesising huge-page leaves.
//! 3. **Limits:** Bounds on implemented address widths and page shifts.

/// Smallest supported page shift (4 KiB pages).
pub const MIN_PAGE_SHIFT: u8 = 12;

/// Shift of the physical page number inside an EntryLo value (4 KiB units).
pub const PPN_SHIFT: u32 = 12;

/// Width of the EntryLo PPN field in bits.
pub const PPN_WIDTH: u32 = 36;

/// Shift of the VPPN field inside EntryHi (each TLB line maps a page pair).
pub const VPPN_SHIFT: u32 = 13;

/// Bit in a directory entry marking a huge-page leaf.
pub const PAGE_HUGE_SHIFT: u32 = 6;

/// Position of the global bit inside a huge-page directory entry.
pub const HUGE_GLOBAL_SHIFT: u32 = 12;

/// Smallest implemented virtual or physical address width accepted by the config.
pub const MIN_ADDRESS_BITS: u32 = 14;

/// Largest implemented virtual or physical address width.
pub const MAX_ADDRESS_BITS: u32 = 64;

/// Number of direct-map windows (`DMW0`..`DMW3`).
pub const DMW_COUNT: usize = 4;
