//! Fault and Error definitions.
//!
//! This module defines the two failure channels of the translation layer:
//! 1. **Guest-visible Faults:** Expected outcomes of a translation (`Fault`), later mapped to
//!    guest exception codes by the fault reporter.
//! 2. **Internal Errors:** Rejected maintenance requests and collaborator failures (`TlbError`).
//! 3. **Bus Errors:** Physical memory failures raised while reading page-table words.

use std::fmt;

use thiserror::Error;

use super::addr::{PhysAddr, VirtAddr};
use super::data::AccessType;

/// Classification of a failed translation.
///
/// Variants are listed in the order the translator checks them for a matched entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Address bits above the implemented width are not a sign extension.
    BadAddress,
    /// No enabled TLB entry matches the address and ASID.
    NoMatch,
    /// The matched half-entry has its valid bit clear.
    Invalid,
    /// A store hit a half-entry whose dirty bit is clear.
    Dirty,
    /// An instruction fetch hit a no-execute half-entry.
    ExecuteInhibited,
    /// A load hit a no-read half-entry.
    ReadInhibited,
    /// The current privilege level may not use the matched half-entry.
    PrivilegeViolation,
}

impl FaultKind {
    /// Returns the human-readable name of the fault.
    pub const fn name(self) -> &'static str {
        match self {
            Self::BadAddress => "BadAddress",
            Self::NoMatch => "NoMatch",
            Self::Invalid => "Invalid",
            Self::Dirty => "Dirty",
            Self::ExecuteInhibited => "ExecuteInhibited",
            Self::ReadInhibited => "ReadInhibited",
            Self::PrivilegeViolation => "PrivilegeViolation",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A guest-visible translation fault.
///
/// Carries everything the fault reporter needs to populate the shadow
/// fault-address registers and pick an exception code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("{kind} on {} of {vaddr}", .access.name())]
pub struct Fault {
    /// What went wrong.
    pub kind: FaultKind,
    /// The faulting virtual address.
    pub vaddr: VirtAddr,
    /// The access that triggered the translation.
    pub access: AccessType,
}

impl Fault {
    /// Creates a new fault.
    #[inline]
    pub const fn new(kind: FaultKind, vaddr: VirtAddr, access: AccessType) -> Self {
        Self {
            kind,
            vaddr,
            access,
        }
    }
}

/// A failed physical memory access.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("bus error reading {size} bytes at {paddr}")]
pub struct BusError {
    /// The physical address that could not be read.
    pub paddr: PhysAddr,
    /// Access size in bytes.
    pub size: u8,
}

/// Internal errors of the translation layer.
///
/// These are never guest-visible faults: they report guest requests that reference
/// state outside the store, invalid configuration, or collaborator failures.
#[derive(Debug, Error)]
pub enum TlbError {
    /// A selected index lies outside the combined capacity of both pools.
    #[error("TLB index {index} out of range (capacity {capacity})")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Combined capacity of both pools.
        capacity: usize,
    },

    /// `invtlb` was issued with an unknown operation code.
    #[error("unknown invtlb operation {0:#x}")]
    InvalidInvalidationOp(u64),

    /// `lddir` was issued with a level outside 1..=4.
    #[error("unknown page directory level {0}")]
    InvalidDirectoryLevel(u64),

    /// A slot write requested a page size the slot cannot hold.
    #[error("page shift {page_shift} not supported for TLB index {index}")]
    InvalidPageSize {
        /// Requested log2 page size.
        page_shift: u8,
        /// Slot that was about to be written.
        index: usize,
    },

    /// The MMU configuration is inconsistent.
    #[error("invalid MMU configuration: {0}")]
    InvalidConfig(String),

    /// A snapshot does not match the geometry it claims.
    #[error("snapshot holds {found} entries, expected {expected}")]
    SnapshotMismatch {
        /// Entry count implied by the snapshot's config.
        expected: usize,
        /// Entry count actually present.
        found: usize,
    },

    /// A physical memory read failed during a directory walk.
    #[error(transparent)]
    Bus(#[from] BusError),

    /// Configuration or snapshot JSON could not be parsed.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
