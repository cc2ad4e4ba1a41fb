//! LoongArch architecture-specific components.
//!
//! This module contains the architectural state the translation layer consumes.
//! It includes the following modules:
//! 1. **CSRs:** Translation-related Control and Status Register layouts and storage.
//! 2. **Modes:** Privilege level definitions.

/// Control and Status Register (CSR) definitions and access logic.
pub mod csr;

/// Privilege level definitions.
pub mod mode;
