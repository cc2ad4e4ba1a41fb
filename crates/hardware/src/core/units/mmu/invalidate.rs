//! TLB invalidation.
//!
//! Scoped invalidation disables every slot a scope selects and notifies the
//! translation cache. Page-scoped invalidations report the exact ranges they
//! dropped; coarser scopes flush everything.

use crate::common::constants::VPPN_SHIFT;
use crate::common::{TlbError, VirtAddr, low_mask, sign_extend};
use crate::config::MmuConfig;
use crate::soc::traits::{FlushRange, TranslationCacheFlush};

use super::tlb::{TlbEntry, TlbStore};

/// Set of entries an invalidation disables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvalidationScope {
    /// Every entry in both pools.
    All,
    /// Every entry whose global flag equals the payload.
    AllWithGlobal(bool),
    /// Every non-global entry of an address space.
    ByAsid(u16),
    /// Non-global entries of `asid` mapping `vaddr`.
    ByPage {
        /// Owning address space.
        asid: u16,
        /// Any address inside the page pair.
        vaddr: VirtAddr,
    },
    /// Global entries mapping `vaddr` plus the `ByPage` matches.
    ByPageOrGlobal {
        /// Owning address space of the non-global matches.
        asid: u16,
        /// Any address inside the page pair.
        vaddr: VirtAddr,
    },
}

impl InvalidationScope {
    /// Decodes the `op` operand of `invtlb`.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::InvalidInvalidationOp`] for codes above 6.
    pub const fn from_op(op: u64, asid: u16, vaddr: VirtAddr) -> Result<Self, TlbError> {
        Ok(match op {
            0 | 1 => Self::All,
            2 => Self::AllWithGlobal(true),
            3 => Self::AllWithGlobal(false),
            4 => Self::ByAsid(asid),
            5 => Self::ByPage { asid, vaddr },
            6 => Self::ByPageOrGlobal { asid, vaddr },
            other => return Err(TlbError::InvalidInvalidationOp(other)),
        })
    }

    fn selects(&self, entry: &TlbEntry, page_shift: u8, va_bits: u32) -> bool {
        match *self {
            Self::All => true,
            Self::AllWithGlobal(g) => entry.global == g,
            Self::ByAsid(asid) => !entry.global && entry.asid == asid,
            Self::ByPage { asid, vaddr } => {
                !entry.global
                    && entry.asid == asid
                    && entry.tag_matches(vaddr.truncate(va_bits), page_shift)
            }
            Self::ByPageOrGlobal { asid, vaddr } => {
                (entry.global || entry.asid == asid)
                    && entry.tag_matches(vaddr.truncate(va_bits), page_shift)
            }
        }
    }

    const fn is_page_scoped(&self) -> bool {
        matches!(self, Self::ByPage { .. } | Self::ByPageOrGlobal { .. })
    }
}

/// Disables every slot `scope` selects.
///
/// # Arguments
///
/// * `store` - The TLB.
/// * `config` - MMU configuration (for `VALEN`).
/// * `scope` - Which entries to drop.
/// * `flush` - Translation-cache consumer to notify.
///
/// # Returns
///
/// Number of enabled slots that were disabled.
pub fn invalidate(
    store: &mut TlbStore,
    config: &MmuConfig,
    scope: InvalidationScope,
    flush: &mut dyn TranslationCacheFlush,
) -> usize {
    let fixed = store.capacity_fixed();
    let stlb_ps = store.stlb_page_shift();
    let mut ranges = Vec::new();
    let mut dropped = 0;

    for (index, entry) in store.iter_all_mut() {
        if !entry.enabled {
            continue;
        }
        let ps = if index < fixed { stlb_ps } else { entry.page_shift };
        if scope.selects(entry, ps, config.va_bits) {
            if scope.is_page_scoped() {
                ranges.extend(entry_ranges(entry, ps, config.va_bits));
            }
            entry.enabled = false;
            dropped += 1;
        }
    }

    tracing::debug!(?scope, dropped, "tlb invalidate");

    if scope.is_page_scoped() {
        for range in ranges {
            flush.flush_translation_cache(range);
        }
    } else {
        flush.flush_translation_cache(FlushRange::All);
    }
    dropped
}

/// Flushes the cached translations of slot `index` before it is overwritten.
///
/// The slot is left untouched; nothing happens when it belongs to another address space.
///
/// # Errors
///
/// Returns [`TlbError::IndexOutOfRange`] if `index` addresses no slot.
pub fn invalidate_single(
    store: &TlbStore,
    config: &MmuConfig,
    index: usize,
    current_asid: u16,
    flush: &mut dyn TranslationCacheFlush,
) -> Result<(), TlbError> {
    store.check_index(index)?;
    let entry = store.get(index);
    if !entry.visible_to(current_asid) || !entry.enabled {
        return Ok(());
    }
    let ps = store.page_shift_of(index);
    for range in entry_ranges(entry, ps, config.va_bits) {
        tracing::trace!(index, ?range, "flush overwritten slot");
        flush.flush_translation_cache(range);
    }
    Ok(())
}

/// Virtual ranges of the valid halves of `entry`.
fn entry_ranges(entry: &TlbEntry, page_shift: u8, va_bits: u32) -> impl Iterator<Item = FlushRange> {
    let ps = u32::from(page_shift);
    let base = (entry.vppn << VPPN_SHIFT) & !low_mask(ps + 1);
    let halves = entry.halves;
    [base, base | (1 << ps)]
        .into_iter()
        .zip(halves)
        .filter(|(_, half)| half.valid)
        .map(move |(start, _)| FlushRange::Range {
            start: VirtAddr::new(sign_extend(start, va_bits)),
            len: 1 << ps,
        })
}
