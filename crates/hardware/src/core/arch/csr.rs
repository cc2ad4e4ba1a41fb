//! Control and Status Register (CSR) definitions for address translation.
//!
//! This module implements the slice of the LoongArch CSR file the translation layer
//! reads and writes. It provides:
//! 1. **Address Definitions:** Constants for the mode, TLB, refill, walk and window CSRs.
//! 2. **Field Layouts:** Shifts and widths for every field the MMU touches.
//! 3. **Register Storage:** The `Csrs` struct holding architectural state.
//! 4. **Access Logic:** Read/write by address plus typed field accessors.

use crate::common::constants::VPPN_SHIFT;
use crate::common::low_mask;
use crate::core::arch::mode::PrivilegeLevel;

/// Current mode information CSR address.
pub const CRMD: u32 = 0x0;

/// Bad virtual address CSR address.
pub const BADV: u32 = 0x7;

/// TLB index CSR address.
pub const TLBIDX: u32 = 0x10;

/// TLB entry high CSR address.
pub const TLBEHI: u32 = 0x11;

/// TLB entry low 0 (even page) CSR address.
pub const TLBELO0: u32 = 0x12;

/// TLB entry low 1 (odd page) CSR address.
pub const TLBELO1: u32 = 0x13;

/// Address space identifier CSR address.
pub const ASID: u32 = 0x18;

/// Page walk controller (low half) CSR address.
pub const PWCL: u32 = 0x1c;

/// Page walk controller (high half) CSR address.
pub const PWCH: u32 = 0x1d;

/// TLB refill bad virtual address CSR address.
pub const TLBRBADV: u32 = 0x89;

/// TLB refill exception return address CSR address.
pub const TLBRERA: u32 = 0x8a;

/// TLB refill entry low 0 CSR address.
pub const TLBRELO0: u32 = 0x8c;

/// TLB refill entry low 1 CSR address.
pub const TLBRELO1: u32 = 0x8d;

/// TLB refill entry high CSR address.
pub const TLBREHI: u32 = 0x8e;

/// Direct-map window 0 CSR address; windows 1..3 follow consecutively.
pub const DMW0: u32 = 0x180;

/// Debug register CSR address.
pub const DBG: u32 = 0x500;

/// `CRMD.PLV` shift (2 bits).
pub const CRMD_PLV_SHIFT: u32 = 0;
/// `CRMD.DA` bit (direct address translation mode).
pub const CRMD_DA: u64 = 1 << 3;
/// `CRMD.PG` bit (mapped address translation mode).
pub const CRMD_PG: u64 = 1 << 4;

/// `TLBIDX.INDEX` shift.
pub const TLBIDX_INDEX_SHIFT: u32 = 0;
/// `TLBIDX.INDEX` width.
pub const TLBIDX_INDEX_WIDTH: u32 = 12;
/// `TLBIDX.PS` shift.
pub const TLBIDX_PS_SHIFT: u32 = 24;
/// `TLBIDX.PS` width.
pub const TLBIDX_PS_WIDTH: u32 = 6;
/// `TLBIDX.NE` bit (entry not present / search miss).
pub const TLBIDX_NE: u64 = 1 << 31;

/// `ASID.ASID` width.
pub const ASID_WIDTH: u32 = 10;
/// `ASID.ASIDBITS` shift.
pub const ASID_ASIDBITS_SHIFT: u32 = 16;

/// `TLBREHI.PS` width (shift 0).
pub const TLBREHI_PS_WIDTH: u32 = 6;

/// `TLBRERA.ISTLBR` bit: a TLB refill exception is being serviced.
pub const TLBRERA_ISTLBR: u64 = 1 << 0;

/// `DBG.DST` bit: debug single-step is active.
pub const DBG_DST: u64 = 1 << 0;

/// `PWCL.PTBASE` shift.
pub const PWCL_PTBASE_SHIFT: u32 = 0;
/// `PWCL.PTWIDTH` shift.
pub const PWCL_PTWIDTH_SHIFT: u32 = 5;
/// `PWCL.DIR1_BASE` shift.
pub const PWCL_DIR1_BASE_SHIFT: u32 = 10;
/// `PWCL.DIR1_WIDTH` shift.
pub const PWCL_DIR1_WIDTH_SHIFT: u32 = 15;
/// `PWCL.DIR2_BASE` shift.
pub const PWCL_DIR2_BASE_SHIFT: u32 = 20;
/// `PWCL.DIR2_WIDTH` shift.
pub const PWCL_DIR2_WIDTH_SHIFT: u32 = 25;
/// `PWCL.PTEWIDTH` shift (2 bits).
pub const PWCL_PTEWIDTH_SHIFT: u32 = 30;
/// Width of the PWCL base/width fields.
pub const PWCL_FIELD_WIDTH: u32 = 5;

/// `PWCH.DIR3_BASE` shift.
pub const PWCH_DIR3_BASE_SHIFT: u32 = 0;
/// `PWCH.DIR3_WIDTH` shift.
pub const PWCH_DIR3_WIDTH_SHIFT: u32 = 6;
/// `PWCH.DIR4_BASE` shift.
pub const PWCH_DIR4_BASE_SHIFT: u32 = 12;
/// `PWCH.DIR4_WIDTH` shift.
pub const PWCH_DIR4_WIDTH_SHIFT: u32 = 18;
/// Width of the PWCH base/width fields.
pub const PWCH_FIELD_WIDTH: u32 = 6;

/// `DMW.PLV0..PLV3` enable mask (bits 3:0).
pub const DMW_PLV_MASK: u64 = 0xF;
/// `DMW.MAT` shift (2 bits).
pub const DMW_MAT_SHIFT: u32 = 4;

/// Extracts `width` bits of `val` starting at `shift`.
#[inline(always)]
pub const fn field(val: u64, shift: u32, width: u32) -> u64 {
    (val >> shift) & low_mask(width)
}

/// Returns `val` with `width` bits at `shift` replaced by `field_val`.
#[inline(always)]
pub const fn deposit(val: u64, shift: u32, width: u32, field_val: u64) -> u64 {
    let mask = low_mask(width) << shift;
    (val & !mask) | ((field_val << shift) & mask)
}

/// Translation-related Control and Status Register file.
///
/// Holds both the normal shadow set (`TLBEHI`/`TLBELO0`/`TLBELO1`) and the refill
/// shadow set (`TLBREHI`/`TLBRELO0`/`TLBRELO1`) the maintenance instructions use.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Csrs {
    /// Current mode information (PLV, DA, PG).
    pub crmd: u64,
    /// Bad virtual address of the last non-refill fault.
    pub badv: u64,
    /// TLB index, page size and not-present flag.
    pub tlbidx: u64,
    /// Normal-set EntryHi.
    pub tlbehi: u64,
    /// Normal-set EntryLo for the even page.
    pub tlbelo0: u64,
    /// Normal-set EntryLo for the odd page.
    pub tlbelo1: u64,
    /// Current address space identifier.
    pub asid: u64,
    /// Page walk controller, low half.
    pub pwcl: u64,
    /// Page walk controller, high half.
    pub pwch: u64,
    /// Bad virtual address of the last refill fault.
    pub tlbrbadv: u64,
    /// Refill exception return address; bit 0 flags an active refill.
    pub tlbrera: u64,
    /// Refill-set EntryLo for the even page.
    pub tlbrelo0: u64,
    /// Refill-set EntryLo for the odd page.
    pub tlbrelo1: u64,
    /// Refill-set EntryHi (VPPN and requested page size).
    pub tlbrehi: u64,
    /// Direct-map window descriptors.
    pub dmw: [u64; 4],
    /// Debug control and status.
    pub dbg: u64,
}

impl Default for Csrs {
    /// Reset state: direct address mode at PLV0, `ASIDBITS` reporting 10.
    fn default() -> Self {
        Self {
            crmd: CRMD_DA,
            badv: 0,
            tlbidx: 0,
            tlbehi: 0,
            tlbelo0: 0,
            tlbelo1: 0,
            asid: u64::from(ASID_WIDTH) << ASID_ASIDBITS_SHIFT,
            pwcl: 0,
            pwch: 0,
            tlbrbadv: 0,
            tlbrera: 0,
            tlbrelo0: 0,
            tlbrelo1: 0,
            tlbrehi: 0,
            dmw: [0; 4],
            dbg: 0,
        }
    }
}

impl Csrs {
    /// Reads a CSR value by its address.
    ///
    /// # Arguments
    ///
    /// * `addr` - The 14-bit CSR number.
    ///
    /// # Returns
    ///
    /// The register value, or 0 for CSRs this file does not hold.
    pub const fn read(&self, addr: u32) -> u64 {
        match addr {
            CRMD => self.crmd,
            BADV => self.badv,
            TLBIDX => self.tlbidx,
            TLBEHI => self.tlbehi,
            TLBELO0 => self.tlbelo0,
            TLBELO1 => self.tlbelo1,
            ASID => self.asid,
            PWCL => self.pwcl,
            PWCH => self.pwch,
            TLBRBADV => self.tlbrbadv,
            TLBRERA => self.tlbrera,
            TLBRELO0 => self.tlbrelo0,
            TLBRELO1 => self.tlbrelo1,
            TLBREHI => self.tlbrehi,
            DBG => self.dbg,
            a if a >= DMW0 && a < DMW0 + 4 => self.dmw[(a - DMW0) as usize],
            _ => 0,
        }
    }

    /// Writes a CSR value by its address.
    ///
    /// Read-only fields (`ASID.ASIDBITS`) keep their value; unknown CSRs are ignored.
    ///
    /// # Arguments
    ///
    /// * `addr` - The 14-bit CSR number.
    /// * `val` - The value to write.
    pub fn write(&mut self, addr: u32, val: u64) {
        match addr {
            CRMD => self.crmd = val,
            BADV => self.badv = val,
            TLBIDX => self.tlbidx = val,
            TLBEHI => self.tlbehi = val,
            TLBELO0 => self.tlbelo0 = val,
            TLBELO1 => self.tlbelo1 = val,
            ASID => self.set_asid(val as u16),
            PWCL => self.pwcl = val,
            PWCH => self.pwch = val,
            TLBRBADV => self.tlbrbadv = val,
            TLBRERA => self.tlbrera = val,
            TLBRELO0 => self.tlbrelo0 = val,
            TLBRELO1 => self.tlbrelo1 = val,
            TLBREHI => self.tlbrehi = val,
            DBG => self.dbg = val,
            a if (DMW0..DMW0 + 4).contains(&a) => self.dmw[(a - DMW0) as usize] = val,
            _ => {}
        }
    }

    /// Current privilege level (`CRMD.PLV`).
    #[inline]
    pub const fn plv(&self) -> PrivilegeLevel {
        PrivilegeLevel::from_u8(field(self.crmd, CRMD_PLV_SHIFT, 2) as u8)
    }

    /// Sets `CRMD.PLV`.
    pub const fn set_plv(&mut self, plv: PrivilegeLevel) {
        self.crmd = deposit(self.crmd, CRMD_PLV_SHIFT, 2, plv.to_u8() as u64);
    }

    /// Returns `true` when mapped address translation is enabled (`CRMD.PG`).
    #[inline]
    pub const fn paging_enabled(&self) -> bool {
        self.crmd & CRMD_PG != 0
    }

    /// Switches between direct (`DA=1, PG=0`) and mapped (`DA=0, PG=1`) translation.
    pub const fn set_paging(&mut self, enabled: bool) {
        if enabled {
            self.crmd = (self.crmd & !CRMD_DA) | CRMD_PG;
        } else {
            self.crmd = (self.crmd & !CRMD_PG) | CRMD_DA;
        }
    }

    /// Current ASID (`ASID.ASID`).
    #[inline]
    pub const fn current_asid(&self) -> u16 {
        field(self.asid, 0, ASID_WIDTH) as u16
    }

    /// Sets `ASID.ASID`, leaving `ASIDBITS` untouched.
    pub const fn set_asid(&mut self, asid: u16) {
        self.asid = deposit(self.asid, 0, ASID_WIDTH, asid as u64);
    }

    /// Selected TLB index (`TLBIDX.INDEX`).
    #[inline]
    pub const fn tlb_index(&self) -> usize {
        field(self.tlbidx, TLBIDX_INDEX_SHIFT, TLBIDX_INDEX_WIDTH) as usize
    }

    /// Sets `TLBIDX.INDEX`.
    pub const fn set_tlb_index(&mut self, index: usize) {
        self.tlbidx = deposit(self.tlbidx, TLBIDX_INDEX_SHIFT, TLBIDX_INDEX_WIDTH, index as u64);
    }

    /// Page size recorded in `TLBIDX.PS`.
    #[inline]
    pub const fn tlbidx_page_shift(&self) -> u8 {
        field(self.tlbidx, TLBIDX_PS_SHIFT, TLBIDX_PS_WIDTH) as u8
    }

    /// Sets `TLBIDX.PS`.
    pub const fn set_tlbidx_page_shift(&mut self, page_shift: u8) {
        self.tlbidx = deposit(self.tlbidx, TLBIDX_PS_SHIFT, TLBIDX_PS_WIDTH, page_shift as u64);
    }

    /// Returns `TLBIDX.NE`.
    #[inline]
    pub const fn tlbidx_not_present(&self) -> bool {
        self.tlbidx & TLBIDX_NE != 0
    }

    /// Sets or clears `TLBIDX.NE`.
    pub const fn set_tlbidx_not_present(&mut self, ne: bool) {
        if ne {
            self.tlbidx |= TLBIDX_NE;
        } else {
            self.tlbidx &= !TLBIDX_NE;
        }
    }

    /// Page size recorded in `TLBREHI.PS`.
    #[inline]
    pub const fn tlbrehi_page_shift(&self) -> u8 {
        field(self.tlbrehi, 0, TLBREHI_PS_WIDTH) as u8
    }

    /// Sets `TLBREHI.PS`.
    pub const fn set_tlbrehi_page_shift(&mut self, page_shift: u8) {
        self.tlbrehi = deposit(self.tlbrehi, 0, TLBREHI_PS_WIDTH, page_shift as u64);
    }

    /// Replaces the VPPN field of an EntryHi value with the one taken from `vaddr`.
    ///
    /// # Arguments
    ///
    /// * `entry_hi` - Current EntryHi value (low bits such as `TLBREHI.PS` survive).
    /// * `vaddr` - The faulting address.
    /// * `va_bits` - Implemented virtual address width.
    pub const fn with_vppn(entry_hi: u64, vaddr: u64, va_bits: u32) -> u64 {
        let width = va_bits - VPPN_SHIFT;
        deposit(entry_hi, VPPN_SHIFT, width, vaddr >> VPPN_SHIFT)
    }

    /// Returns `true` while a TLB refill exception is being serviced.
    #[inline]
    pub const fn in_refill(&self) -> bool {
        self.tlbrera & TLBRERA_ISTLBR != 0
    }

    /// Sets or clears `TLBRERA.ISTLBR`.
    pub const fn set_in_refill(&mut self, active: bool) {
        if active {
            self.tlbrera |= TLBRERA_ISTLBR;
        } else {
            self.tlbrera &= !TLBRERA_ISTLBR;
        }
    }

    /// Returns `true` while debug single-step is active (`DBG.DST`).
    #[inline]
    pub const fn debug_single_step(&self) -> bool {
        self.dbg & DBG_DST != 0
    }
}
