//! Fault reporting.
//!
//! Turns a translation [`Fault`] into the guest exception code and records the
//! faulting address where the guest handler expects it. A miss goes to the
//! refill shadow set and arms `TLBRERA.ISTLBR`; every other fault goes to the
//! normal set.

use std::fmt;

use crate::common::{AccessType, Fault, FaultKind};
use crate::config::MmuConfig;
use crate::core::arch::csr::Csrs;

/// LoongArch `ESTAT.Ecode` values raised by the translation layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum GuestExceptionCode {
    /// Page invalid for a load.
    Pil = 1,
    /// Page invalid for a store.
    Pis = 2,
    /// Page invalid for a fetch.
    Pif = 3,
    /// Page modification (store to a clean page).
    Pme = 4,
    /// Page not readable.
    Pnr = 5,
    /// Page not executable.
    Pnx = 6,
    /// Page privilege illegal.
    Ppi = 7,
    /// Address error.
    Ade = 8,
}

impl GuestExceptionCode {
    /// Code the guest sees for `kind` raised by `access`.
    pub const fn for_fault(kind: FaultKind, access: AccessType) -> Self {
        match kind {
            FaultKind::NoMatch | FaultKind::Invalid => match access {
                AccessType::Read => Self::Pil,
                AccessType::Write => Self::Pis,
                AccessType::Fetch => Self::Pif,
            },
            FaultKind::Dirty => Self::Pme,
            FaultKind::ReadInhibited => Self::Pnr,
            FaultKind::ExecuteInhibited => Self::Pnx,
            FaultKind::PrivilegeViolation => Self::Ppi,
            FaultKind::BadAddress => Self::Ade,
        }
    }

    /// Raw `Ecode` field value.
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Mnemonic as used in the architecture manual.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Pil => "PIL",
            Self::Pis => "PIS",
            Self::Pif => "PIF",
            Self::Pme => "PME",
            Self::Pnr => "PNR",
            Self::Pnx => "PNX",
            Self::Ppi => "PPI",
            Self::Ade => "ADE",
        }
    }
}

impl fmt::Display for GuestExceptionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Records `fault` in the CSR file and returns its exception code.
///
/// # Arguments
///
/// * `csrs` - CSR file to update.
/// * `config` - MMU configuration (for `VALEN`).
/// * `fault` - The fault returned by `translate`.
pub fn report(csrs: &mut Csrs, config: &MmuConfig, fault: &Fault) -> GuestExceptionCode {
    let va = fault.vaddr.val();
    if fault.kind == FaultKind::NoMatch {
        csrs.tlbrbadv = va;
        csrs.tlbrehi = Csrs::with_vppn(csrs.tlbrehi, va, config.va_bits);
        csrs.set_in_refill(true);
    } else {
        csrs.tlbehi = Csrs::with_vppn(csrs.tlbehi, va, config.va_bits);
        if !csrs.debug_single_step() {
            csrs.badv = va;
        }
    }

    let code = GuestExceptionCode::for_fault(fault.kind, fault.access);
    tracing::trace!(%fault, %code, "fault reported");
    code
}
