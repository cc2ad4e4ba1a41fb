//! Core-side translation state.
//!
//! This module contains the architectural registers the translation layer reads
//! and the memory management unit that owns the per-core TLB.

/// Architecture-specific components (CSRs, privilege levels).
pub mod arch;

/// Functional units of the core.
pub mod units;

pub use self::units::mmu::Mmu;
