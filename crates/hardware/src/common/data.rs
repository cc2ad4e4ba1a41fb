//! Memory Access Types.
//!
//! This module defines the classification of memory accesses used throughout the emulator.
//! These types are used for the following:
//! 1. **Permission Validation:** Checking the NR/NX/D bits of a matched TLB half-entry.
//! 2. **Fault Generation:** Picking the guest exception code for a failed translation.

use serde::{Deserialize, Serialize};

/// Type of memory access operation.
///
/// Used to distinguish between instruction fetches, data loads, and data stores
/// for permission enforcement and exception code selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    /// Instruction fetch access.
    ///
    /// Blocked by the NX (no-execute) bit of the matched half-entry.
    Fetch,

    /// Data load access.
    ///
    /// Blocked by the NR (no-read) bit of the matched half-entry.
    Read,

    /// Data store access.
    ///
    /// Requires the D (dirty) bit of the matched half-entry.
    Write,
}

impl AccessType {
    /// Returns a short lowercase name used in log lines.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fetch => "fetch",
            Self::Read => "load",
            Self::Write => "store",
        }
    }
}
