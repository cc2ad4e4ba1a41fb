//! TLB maintenance instructions.
//!
//! Each function implements one privileged instruction over the store and the
//! CSR file. Instructions that take their operands from EntryHi/EntryLo read the
//! shadow set the caller selects; `tlbrd` always writes the normal set.

use crate::common::constants::VPPN_SHIFT;
use crate::common::{TlbError, VirtAddr, low_mask};
use crate::config::MmuConfig;
use crate::core::arch::csr::Csrs;
use crate::soc::traits::{FlushRange, TranslationCacheFlush};

use super::invalidate::{InvalidationScope, invalidate, invalidate_single};
use super::random::RandomSource;
use super::tlb::{TlbEntry, TlbHalf, TlbPool, TlbStore, ENTRYLO_G};
use super::translate::{ShadowSet, search};

/// EntryHi, EntryLo pair and page size as seen through one shadow set.
#[derive(Clone, Copy, Debug)]
struct ShadowRegs {
    page_shift: u8,
    entry_hi: u64,
    lo0: u64,
    lo1: u64,
}

impl ShadowRegs {
    const fn read(csrs: &Csrs, shadow: ShadowSet) -> Self {
        match shadow {
            ShadowSet::Normal => Self {
                page_shift: csrs.tlbidx_page_shift(),
                entry_hi: csrs.tlbehi,
                lo0: csrs.tlbelo0,
                lo1: csrs.tlbelo1,
            },
            ShadowSet::Refill => Self {
                page_shift: csrs.tlbrehi_page_shift(),
                entry_hi: csrs.tlbrehi,
                lo0: csrs.tlbrelo0,
                lo1: csrs.tlbrelo1,
            },
        }
    }
}

/// `TLBIDX.INDEX`, checked against the store.
fn selected_index(store: &TlbStore, csrs: &Csrs) -> Result<usize, TlbError> {
    let index = csrs.tlb_index();
    store.check_index(index).inspect_err(|_| {
        tracing::warn!(index, capacity = store.capacity(), "TLB index out of range");
    })?;
    Ok(index)
}

/// Builds the line a `tlbwr`/`tlbfill` would store in slot `index`.
fn build_entry(
    store: &TlbStore,
    config: &MmuConfig,
    index: usize,
    regs: &ShadowRegs,
    asid: u16,
) -> Result<TlbEntry, TlbError> {
    let page_shift = match store.pool_of(index) {
        TlbPool::Fixed => store.stlb_page_shift(),
        TlbPool::Variable => regs.page_shift,
    };
    if !config.page_shift_supported(page_shift) {
        tracing::warn!(index, page_shift, "TLB write with unsupported page size");
        return Err(TlbError::InvalidPageSize { page_shift, index });
    }
    Ok(TlbEntry {
        vppn: (regs.entry_hi >> VPPN_SHIFT) & low_mask(config.va_bits - VPPN_SHIFT),
        asid,
        global: regs.lo0 & regs.lo1 & ENTRYLO_G != 0,
        page_shift,
        enabled: true,
        halves: [TlbHalf::from_entry_lo(regs.lo0), TlbHalf::from_entry_lo(regs.lo1)],
    })
}

/// `tlbsrch`: looks up the shadow EntryHi under the current ASID.
///
/// On a hit `TLBIDX.INDEX` and `TLBIDX.PS` are set and `NE` cleared; on a miss
/// only `NE` is set.
pub fn tlbsrch(store: &TlbStore, config: &MmuConfig, csrs: &mut Csrs, shadow: ShadowSet) {
    let regs = ShadowRegs::read(csrs, shadow);
    let asid = csrs.current_asid();
    match search(store, config, asid, VirtAddr::new(regs.entry_hi)) {
        Some(hit) => {
            csrs.set_tlb_index(hit.index);
            csrs.set_tlbidx_page_shift(hit.page_shift);
            csrs.set_tlbidx_not_present(false);
            tracing::debug!(index = hit.index, asid, "tlbsrch hit");
        }
        None => {
            csrs.set_tlbidx_not_present(true);
            tracing::debug!(entry_hi = regs.entry_hi, asid, "tlbsrch miss");
        }
    }
}

/// `tlbrd`: copies the selected slot into `TLBEHI`, `TLBELO0/1`, `TLBIDX.PS` and `ASID`.
///
/// # Errors
///
/// Returns [`TlbError::IndexOutOfRange`] if `TLBIDX.INDEX` addresses no slot.
pub fn tlbrd(store: &TlbStore, csrs: &mut Csrs) -> Result<(), TlbError> {
    let index = selected_index(store, csrs)?;
    let entry = store.get(index);

    if entry.enabled {
        csrs.set_tlbidx_not_present(false);
        csrs.set_tlbidx_page_shift(store.page_shift_of(index));
        csrs.tlbehi = entry.vppn << VPPN_SHIFT;
        csrs.tlbelo0 = entry.halves[0].to_entry_lo(entry.global);
        csrs.tlbelo1 = entry.halves[1].to_entry_lo(entry.global);
        csrs.set_asid(entry.asid);
    } else {
        csrs.set_tlbidx_not_present(true);
        csrs.set_tlbidx_page_shift(0);
        csrs.tlbehi = 0;
        csrs.tlbelo0 = 0;
        csrs.tlbelo1 = 0;
        csrs.set_asid(0);
    }
    tracing::debug!(index, enabled = entry.enabled, "tlbrd");
    Ok(())
}

/// `tlbwr`: writes the shadow set into the selected slot, or disables it when `TLBIDX.NE` is set.
///
/// # Errors
///
/// Returns [`TlbError::IndexOutOfRange`] for a bad index and
/// [`TlbError::InvalidPageSize`] when the slot cannot hold the requested page size.
pub fn tlbwr(
    store: &mut TlbStore,
    config: &MmuConfig,
    csrs: &Csrs,
    shadow: ShadowSet,
    flush: &mut dyn TranslationCacheFlush,
) -> Result<(), TlbError> {
    let index = selected_index(store, csrs)?;
    let asid = csrs.current_asid();

    if csrs.tlbidx_not_present() {
        invalidate_single(store, config, index, asid, flush)?;
        store.get_mut(index).enabled = false;
        tracing::debug!(index, "tlbwr disabled slot");
        return Ok(());
    }

    let entry = build_entry(store, config, index, &ShadowRegs::read(csrs, shadow), asid)?;
    invalidate_single(store, config, index, asid, flush)?;
    *store.get_mut(index) = entry;
    tracing::debug!(index, vppn = entry.vppn, asid, page_shift = entry.page_shift, "tlbwr");
    Ok(())
}

/// `tlbfill`: writes the shadow set into a slot chosen by `random`.
///
/// An STLB-sized page goes to a random way of the set its EntryHi addresses;
/// any other size goes to a random MTLB slot. `TLBIDX.NE` is ignored.
///
/// # Returns
///
/// The index of the filled slot.
///
/// # Errors
///
/// Returns [`TlbError::InvalidPageSize`] for a page size no MTLB slot can hold.
pub fn tlbfill(
    store: &mut TlbStore,
    config: &MmuConfig,
    csrs: &Csrs,
    shadow: ShadowSet,
    random: &mut dyn RandomSource,
    flush: &mut dyn TranslationCacheFlush,
) -> Result<usize, TlbError> {
    let regs = ShadowRegs::read(csrs, shadow);
    let index = if regs.page_shift == store.stlb_page_shift() {
        let set = store.set_index(VirtAddr::new(regs.entry_hi).truncate(config.va_bits));
        store.fixed_slot(random.next_below(store.ways()), set)
    } else {
        store.capacity_fixed() + random.next_below(store.capacity_variable())
    };

    let asid = csrs.current_asid();
    let entry = build_entry(store, config, index, &regs, asid)?;
    invalidate_single(store, config, index, asid, flush)?;
    *store.get_mut(index) = entry;
    tracing::debug!(index, vppn = entry.vppn, asid, page_shift = entry.page_shift, "tlbfill");
    Ok(index)
}

/// Disables the slots `tlbclr`/`tlbflush` cover: the selected slot's STLB set
/// (all ways), or the whole MTLB.
fn clear_group(
    store: &mut TlbStore,
    csrs: &Csrs,
    keep: impl Fn(&TlbEntry) -> bool,
) -> Result<usize, TlbError> {
    let index = selected_index(store, csrs)?;
    let slots: Vec<usize> = match store.pool_of(index) {
        TlbPool::Fixed => {
            let set = index % store.sets();
            (0..store.ways()).map(|way| store.fixed_slot(way, set)).collect()
        }
        TlbPool::Variable => (store.capacity_fixed()..store.capacity()).collect(),
    };

    let mut cleared = 0;
    for slot in slots {
        let entry = store.get_mut(slot);
        if entry.enabled && !keep(entry) {
            entry.enabled = false;
            cleared += 1;
        }
    }
    Ok(cleared)
}

/// `tlbclr`: drops non-global entries of the current ASID in the selected group.
///
/// # Errors
///
/// Returns [`TlbError::IndexOutOfRange`] if `TLBIDX.INDEX` addresses no slot.
pub fn tlbclr(
    store: &mut TlbStore,
    csrs: &Csrs,
    flush: &mut dyn TranslationCacheFlush,
) -> Result<usize, TlbError> {
    let asid = csrs.current_asid();
    let cleared = clear_group(store, csrs, |e| e.global || e.asid != asid)?;
    tracing::debug!(index = csrs.tlb_index(), asid, cleared, "tlbclr");
    flush.flush_translation_cache(FlushRange::All);
    Ok(cleared)
}

/// `tlbflush`: drops every entry in the selected group.
///
/// # Errors
///
/// Returns [`TlbError::IndexOutOfRange`] if `TLBIDX.INDEX` addresses no slot.
pub fn tlbflush(
    store: &mut TlbStore,
    csrs: &Csrs,
    flush: &mut dyn TranslationCacheFlush,
) -> Result<usize, TlbError> {
    let cleared = clear_group(store, csrs, |_| false)?;
    tracing::debug!(index = csrs.tlb_index(), cleared, "tlbflush");
    flush.flush_translation_cache(FlushRange::All);
    Ok(cleared)
}

/// `invtlb op, asid, vaddr`.
///
/// # Returns
///
/// Number of slots disabled.
///
/// # Errors
///
/// Returns [`TlbError::InvalidInvalidationOp`] for an unknown `op`; the store is untouched.
pub fn invtlb(
    store: &mut TlbStore,
    config: &MmuConfig,
    op: u64,
    asid: u16,
    vaddr: VirtAddr,
    flush: &mut dyn TranslationCacheFlush,
) -> Result<usize, TlbError> {
    let scope = InvalidationScope::from_op(op, asid, vaddr).inspect_err(|_| {
        tracing::warn!(op, "invtlb with unknown operation");
    })?;
    Ok(invalidate(store, config, scope, flush))
}
