//! LoongArch64 address translation library.
//!
//! This crate implements the software-managed translation layer of a LoongArch64
//! system emulator with the following:
//! 1. **Store:** A set-associative STLB and a fully associative MTLB in one flat index space.
//! 2. **Translation:** Direct mode, direct-map windows and TLB lookup with permission checks.
//! 3. **Maintenance:** `tlbsrch`, `tlbrd`, `tlbwr`, `tlbfill`, `tlbclr`, `tlbflush` and `invtlb`.
//! 4. **Walk Assist:** `lddir`/`ldpte` for guest refill handlers.
//! 5. **Faults:** Classification into guest exception codes and CSR bookkeeping.

/// Common types and constants (addresses, access types, faults, errors).
pub mod common;
/// MMU configuration (geometry, address widths, JSON loading).
pub mod config;
/// Core-side state (CSRs, privilege levels, MMU).
pub mod core;
/// Collaborator traits and a flat physical RAM.
pub mod soc;

/// MMU configuration; use `MmuConfig::default()` or `MmuConfig::from_json`.
pub use crate::config::MmuConfig;
/// Translation-related CSR file.
pub use crate::core::arch::csr::Csrs;
/// Per-core MMU; construct with `Mmu::new`.
pub use crate::core::Mmu;
