//! Functional units of the core.

/// Memory Management Unit with TLB, maintenance instructions and page-walk assist.
pub mod mmu;
