//! Common utilities and types used throughout the LoongArch64 translation layer.
//!
//! This module provides fundamental building blocks shared by every component. It includes:
//! 1. **Address Types:** Strong types for virtual and physical addresses.
//! 2. **Constants:** Page geometry and EntryHi/EntryLo field positions.
//! 3. **Memory Access:** Definitions for categorizing memory operations (Fetch/Read/Write).
//! 4. **Error Handling:** Guest-visible faults and internal error types.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Common constants used throughout the MMU.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Fault and error definitions.
pub mod error;

pub use addr::{PhysAddr, VirtAddr, low_mask, sign_extend};
pub use data::AccessType;
pub use error::{BusError, Fault, FaultKind, TlbError};
