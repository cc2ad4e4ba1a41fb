//! Page-walk assist for software refill handlers.
//!
//! LoongArch leaves the page-table walk to the guest's refill handler but offers
//! two helper instructions for the common multi-level layout:
//! 1. **`lddir`:** Reads one directory level, indexed by the faulting address in `TLBRBADV`.
//! 2. **`ldpte`:** Loads the even or odd leaf into the refill-shadow EntryLo registers.
//!
//! Directory geometry comes from `PWCL`/`PWCH`. A directory entry with the huge bit
//! set is already a leaf: `lddir` hands it back and `ldpte` synthesises the EntryLo.

use crate::common::constants::{HUGE_GLOBAL_SHIFT, PAGE_HUGE_SHIFT};
use crate::common::{PhysAddr, TlbError, low_mask};
use crate::config::MmuConfig;
use crate::core::arch::csr::{self, Csrs, field};
use crate::soc::traits::PhysicalMemory;

use super::tlb::ENTRYLO_G;

/// Raw directory or leaf word as read from a page table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct DirEntry(u64);

impl DirEntry {
    fn is_huge(self) -> bool {
        self.0 & (1 << PAGE_HUGE_SHIFT) != 0
    }

    /// Rewrites a huge directory entry as an EntryLo value.
    ///
    /// The huge bit shares bit 6 with EntryLo's `G`, so the huge-global bit (12) is moved there.
    fn huge_to_entry_lo(self) -> u64 {
        let val = self.0 ^ (1 << PAGE_HUGE_SHIFT);
        let global = (val >> HUGE_GLOBAL_SHIFT) & 1;
        (val & !(1 << HUGE_GLOBAL_SHIFT)) | if global != 0 { ENTRYLO_G } else { 0 }
    }
}

/// Directory geometry decoded from `PWCL`/`PWCH`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct WalkGeometry {
    pt_base: u32,
    pt_width: u32,
    dir: [(u32, u32); 4],
    entry_shift: u32,
}

impl WalkGeometry {
    fn from_csrs(csrs: &Csrs) -> Self {
        let l = csrs.pwcl;
        let h = csrs.pwch;
        let lw = csr::PWCL_FIELD_WIDTH;
        let hw = csr::PWCH_FIELD_WIDTH;
        let f = |v, s, w| field(v, s, w) as u32;
        Self {
            pt_base: f(l, csr::PWCL_PTBASE_SHIFT, lw),
            pt_width: f(l, csr::PWCL_PTWIDTH_SHIFT, lw),
            dir: [
                (f(l, csr::PWCL_DIR1_BASE_SHIFT, lw), f(l, csr::PWCL_DIR1_WIDTH_SHIFT, lw)),
                (f(l, csr::PWCL_DIR2_BASE_SHIFT, lw), f(l, csr::PWCL_DIR2_WIDTH_SHIFT, lw)),
                (f(h, csr::PWCH_DIR3_BASE_SHIFT, hw), f(h, csr::PWCH_DIR3_WIDTH_SHIFT, hw)),
                (f(h, csr::PWCH_DIR4_BASE_SHIFT, hw), f(h, csr::PWCH_DIR4_WIDTH_SHIFT, hw)),
            ],
            entry_shift: (f(l, csr::PWCL_PTEWIDTH_SHIFT, 2) + 1) * 3,
        }
    }

    /// Index of `badv` inside a table at `base` bits of width `width`.
    fn index(badv: u64, base: u32, width: u32) -> u64 {
        if base >= 64 { 0 } else { (badv >> base) & low_mask(width) }
    }
}

/// Loads one page-directory entry.
///
/// # Arguments
///
/// * `csrs` - CSR file (`PWCL`, `PWCH`, `TLBRBADV`).
/// * `config` - MMU configuration (for `PALEN`).
/// * `mem` - Physical memory holding the tables.
/// * `base` - Physical base of the directory, or a huge leaf.
/// * `level` - Directory level, 1 to 4.
///
/// # Returns
///
/// The next-level base (masked to `PALEN`), or `base` itself for a huge leaf.
///
/// # Errors
///
/// Returns [`TlbError::InvalidDirectoryLevel`] for a level outside 1..=4 and
/// [`TlbError::Bus`] when the directory read fails.
pub fn lddir(
    csrs: &Csrs,
    config: &MmuConfig,
    mem: &mut dyn PhysicalMemory,
    base: u64,
    level: u64,
) -> Result<u64, TlbError> {
    let pa_mask = low_mask(config.pa_bits);
    if DirEntry(base).is_huge() {
        return Ok(base & pa_mask);
    }

    let geo = WalkGeometry::from_csrs(csrs);
    let (dir_base, dir_width) = match level {
        1..=4 => geo.dir[(level - 1) as usize],
        _ => {
            tracing::warn!(level, "lddir with unknown directory level");
            return Err(TlbError::InvalidDirectoryLevel(level));
        }
    };

    let index = WalkGeometry::index(csrs.tlbrbadv, dir_base, dir_width);
    let addr = PhysAddr::new((base & pa_mask) | (index << geo.entry_shift));
    let val = mem.read_u64(addr)?;
    tracing::debug!(level, %addr, val, "lddir");
    Ok(val & pa_mask)
}

/// Loads the even or odd leaf into `TLBRELO0`/`TLBRELO1` and sets `TLBREHI.PS`.
///
/// # Errors
///
/// Returns [`TlbError::Bus`] when the leaf read fails; the CSRs are then left untouched.
pub fn ldpte(
    csrs: &mut Csrs,
    config: &MmuConfig,
    mem: &mut dyn PhysicalMemory,
    base: u64,
    odd: bool,
) -> Result<(), TlbError> {
    let geo = WalkGeometry::from_csrs(csrs);
    let entry = DirEntry(base);

    let (lo, page_shift) = if entry.is_huge() {
        let ps = (geo.pt_base + geo.pt_width).saturating_sub(1);
        let mut lo = entry.huge_to_entry_lo();
        if odd {
            lo = lo.wrapping_add(1 << ps);
        }
        (lo, ps)
    } else {
        let pt_index = WalkGeometry::index(csrs.tlbrbadv, geo.pt_base, geo.pt_width) & !1;
        let offset = (pt_index + u64::from(odd)) << geo.entry_shift;
        let addr = PhysAddr::new((base & low_mask(config.pa_bits)) | offset);
        let lo = mem.read_u64(addr)?;
        (lo, geo.pt_base)
    };

    tracing::debug!(odd, lo, page_shift, huge = entry.is_huge(), "ldpte");
    if odd {
        csrs.tlbrelo1 = lo;
    } else {
        csrs.tlbrelo0 = lo;
    }
    csrs.set_tlbrehi_page_shift(page_shift as u8);
    Ok(())
}
