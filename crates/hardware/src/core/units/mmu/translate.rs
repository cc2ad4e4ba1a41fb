//! Virtual-to-physical address translation.
//!
//! Translation runs in four steps, the first match winning:
//! 1. **Direct mode:** with `CRMD.PG` clear the address is used as-is (masked to `PALEN`).
//! 2. **Direct-map windows:** `DMW0..DMW3` map whole segments linearly for enabled PLVs.
//! 3. **Canonical check:** unmapped bits must sign-extend bit `VALEN-1`.
//! 4. **TLB lookup:** one STLB set, then every MTLB slot, then per-half permission checks.

use crate::common::constants::{DMW_COUNT, PPN_SHIFT};
use crate::common::{AccessType, Fault, FaultKind, PhysAddr, VirtAddr, low_mask};
use crate::config::MmuConfig;
use crate::core::arch::csr::{self, Csrs};
use crate::core::arch::mode::PrivilegeLevel;

use super::tlb::{TlbHalf, TlbPool, TlbStore};

/// Register set the maintenance instructions read and write.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShadowSet {
    /// `TLBEHI`, `TLBELO0`, `TLBELO1`, `TLBIDX.PS`.
    Normal,
    /// `TLBREHI`, `TLBRELO0`, `TLBRELO1`, `TLBREHI.PS`: used while servicing a refill.
    Refill,
}

impl ShadowSet {
    /// Picks the set selected by `TLBRERA.ISTLBR`.
    pub const fn from_csrs(csrs: &Csrs) -> Self {
        if csrs.in_refill() { Self::Refill } else { Self::Normal }
    }
}

/// Address translation mode of the core.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    /// Direct address mode: no windows, no TLB.
    Direct,
    /// Mapped address mode.
    Mapped,
}

/// A decoded direct-map window descriptor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct DirectMapWindow {
    /// Privilege levels the window is enabled for, one bit per PLV.
    pub plv_mask: u8,
    /// Memory access type applied to the window.
    pub mat: u8,
    /// Raw descriptor, whose bits above the base shift hold the compared segment.
    pub raw: u64,
}

impl DirectMapWindow {
    /// Decodes a `DMWn` register value.
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            plv_mask: (raw & csr::DMW_PLV_MASK) as u8,
            mat: ((raw >> csr::DMW_MAT_SHIFT) & 0x3) as u8,
            raw,
        }
    }

    /// Returns `true` if the window maps `vaddr` at privilege `plv`.
    #[inline]
    pub const fn matches(&self, vaddr: u64, plv: PrivilegeLevel, base_shift: u32) -> bool {
        self.plv_mask & plv.dmw_bit() != 0 && self.raw >> base_shift == vaddr >> base_shift
    }
}

/// Per-access translation inputs, derived from the CSR file by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranslationContext {
    /// Current privilege level.
    pub plv: PrivilegeLevel,
    /// Current address space identifier.
    pub asid: u16,
    /// Direct or mapped translation.
    pub mode: AddressingMode,
    /// Direct-map windows, checked in order.
    pub windows: [DirectMapWindow; DMW_COUNT],
    /// Register set maintenance instructions should use.
    pub shadow: ShadowSet,
}

impl TranslationContext {
    /// Builds a context from the current CSR values.
    pub fn from_csrs(csrs: &Csrs) -> Self {
        Self {
            plv: csrs.plv(),
            asid: csrs.current_asid(),
            mode: if csrs.paging_enabled() {
                AddressingMode::Mapped
            } else {
                AddressingMode::Direct
            },
            windows: csrs.dmw.map(DirectMapWindow::from_raw),
            shadow: ShadowSet::from_csrs(csrs),
        }
    }
}

/// Access rights granted by a translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Permissions {
    /// Loads allowed.
    pub read: bool,
    /// Stores allowed.
    pub write: bool,
    /// Fetches allowed.
    pub execute: bool,
}

impl Permissions {
    /// Read, write and execute.
    pub const ALL: Self = Self {
        read: true,
        write: true,
        execute: true,
    };
}

/// How a translation was produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TranslationSource {
    /// Direct address mode.
    Direct,
    /// Direct-map window `n`.
    Window(usize),
    /// TLB slot `index` with its page size.
    Tlb {
        /// Matching slot.
        index: usize,
        /// Effective log2 page size of the slot.
        page_shift: u8,
    },
}

/// A successful translation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Translation {
    /// The physical address.
    pub paddr: PhysAddr,
    /// Rights on the containing page.
    pub perms: Permissions,
    /// Where the mapping came from.
    pub source: TranslationSource,
}

/// A TLB search hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TlbHit {
    /// Matching slot.
    pub index: usize,
    /// Pool of the slot.
    pub pool: TlbPool,
    /// Effective log2 page size of the slot.
    pub page_shift: u8,
}

/// Searches both pools for the entry mapping `vaddr` under `asid`.
///
/// Only the one STLB set addressed by `vaddr` is examined; the MTLB is scanned
/// in full since its entries have differing page sizes. An STLB hit wins.
///
/// # Arguments
///
/// * `store` - The TLB.
/// * `config` - MMU configuration (for `VALEN`).
/// * `asid` - Requesting address space.
/// * `vaddr` - Address to look up; bits above `VALEN` are ignored.
pub fn search(store: &TlbStore, config: &MmuConfig, asid: u16, vaddr: VirtAddr) -> Option<TlbHit> {
    let va = vaddr.truncate(config.va_bits);

    let stlb_ps = store.stlb_page_shift();
    let set = store.set_index(va);
    for way in 0..store.ways() {
        let index = store.fixed_slot(way, set);
        let entry = store.get(index);
        if entry.enabled && entry.visible_to(asid) && entry.tag_matches(va, stlb_ps) {
            return Some(TlbHit {
                index,
                pool: TlbPool::Fixed,
                page_shift: stlb_ps,
            });
        }
    }

    store
        .iter_variable()
        .find(|(_, e)| e.enabled && e.visible_to(asid) && e.tag_matches(va, e.page_shift))
        .map(|(index, e)| TlbHit {
            index,
            pool: TlbPool::Variable,
            page_shift: e.page_shift,
        })
}

/// Translates a virtual address.
///
/// # Arguments
///
/// * `store` - The TLB.
/// * `config` - MMU configuration.
/// * `ctx` - Privilege level, ASID, mode and windows of the access.
/// * `vaddr` - Virtual address to translate.
/// * `access` - Type of access (Fetch, Read, Write).
///
/// # Returns
///
/// The physical address with its permissions, or the guest-visible `Fault`.
///
/// # Errors
///
/// Every `Err` is an expected, guest-visible fault to be handed to the fault reporter.
pub fn translate(
    store: &TlbStore,
    config: &MmuConfig,
    ctx: &TranslationContext,
    vaddr: VirtAddr,
    access: AccessType,
) -> Result<Translation, Fault> {
    let pa_mask = low_mask(config.pa_bits);
    let va = vaddr.val();

    if ctx.mode == AddressingMode::Direct {
        return Ok(Translation {
            paddr: PhysAddr::new(va & pa_mask),
            perms: Permissions::ALL,
            source: TranslationSource::Direct,
        });
    }

    let base_shift = config.dmw_base_shift;
    if let Some(n) = ctx
        .windows
        .iter()
        .position(|w| w.matches(va, ctx.plv, base_shift))
    {
        return Ok(Translation {
            paddr: PhysAddr::new(va & low_mask(base_shift) & pa_mask),
            perms: Permissions::ALL,
            source: TranslationSource::Window(n),
        });
    }

    if !vaddr.is_canonical(config.va_bits) {
        return Err(fault(FaultKind::BadAddress, vaddr, access));
    }

    let Some(hit) = search(store, config, ctx.asid, vaddr) else {
        return Err(fault(FaultKind::NoMatch, vaddr, access));
    };

    let odd = vaddr.bit(u32::from(hit.page_shift));
    let half = store.get(hit.index).half(odd);
    check_half(half, ctx.plv, access).map_err(|kind| fault(kind, vaddr, access))?;

    let ps = u32::from(hit.page_shift);
    let ppn = half.ppn & !low_mask(ps - PPN_SHIFT);
    let paddr = ((ppn << PPN_SHIFT) | vaddr.page_offset(hit.page_shift)) & pa_mask;

    Ok(Translation {
        paddr: PhysAddr::new(paddr),
        perms: Permissions {
            read: true,
            write: half.dirty,
            execute: !half.no_execute,
        },
        source: TranslationSource::Tlb {
            index: hit.index,
            page_shift: hit.page_shift,
        },
    })
}

/// Evaluates a matched half-entry in hardware priority order.
fn check_half(half: &TlbHalf, plv: PrivilegeLevel, access: AccessType) -> Result<(), FaultKind> {
    if !half.valid {
        return Err(FaultKind::Invalid);
    }
    if access == AccessType::Fetch && half.no_execute {
        return Err(FaultKind::ExecuteInhibited);
    }
    if access == AccessType::Read && half.no_read {
        return Err(FaultKind::ReadInhibited);
    }
    let level = plv.to_u8();
    let allowed = if half.restricted {
        level == half.plv
    } else {
        level <= half.plv
    };
    if !allowed {
        return Err(FaultKind::PrivilegeViolation);
    }
    if access == AccessType::Write && !half.dirty {
        return Err(FaultKind::Dirty);
    }
    Ok(())
}

fn fault(kind: FaultKind, vaddr: VirtAddr, access: AccessType) -> Fault {
    tracing::trace!(%vaddr, access = access.name(), %kind, "translation fault");
    Fault::new(kind, vaddr, access)
}
