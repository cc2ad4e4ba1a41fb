//! Translation Lookaside Buffer (TLB) storage.
//!
//! The LoongArch TLB is software managed and split into two pools:
//! 1. **STLB:** set-associative, every entry shares the `STLBPS` page size.
//! 2. **MTLB:** fully associative, every entry carries its own page size.
//!
//! Each entry maps an even/odd page pair. Slots are addressed by one flat index:
//! `way * sets + set` inside the STLB, followed by the MTLB slots.

use serde::{Deserialize, Serialize};

use crate::common::TlbError;
use crate::common::constants::{PPN_SHIFT, PPN_WIDTH, VPPN_SHIFT};
use crate::common::low_mask;
use crate::config::MmuConfig;

/// EntryLo valid bit.
pub const ENTRYLO_V: u64 = 1 << 0;
/// EntryLo dirty bit.
pub const ENTRYLO_D: u64 = 1 << 1;
/// EntryLo privilege level shift (2 bits).
pub const ENTRYLO_PLV_SHIFT: u32 = 2;
/// EntryLo memory access type shift (2 bits).
pub const ENTRYLO_MAT_SHIFT: u32 = 4;
/// EntryLo global bit.
pub const ENTRYLO_G: u64 = 1 << 6;
/// EntryLo no-read bit.
pub const ENTRYLO_NR: u64 = 1 << 61;
/// EntryLo no-execute bit.
pub const ENTRYLO_NX: u64 = 1 << 62;
/// EntryLo restricted-privilege bit.
pub const ENTRYLO_RPLV: u64 = 1 << 63;

/// One half (even or odd page) of a TLB line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlbHalf {
    /// Mapping is valid.
    pub valid: bool,
    /// Page may be written.
    pub dirty: bool,
    /// Privilege ceiling (0-3).
    pub plv: u8,
    /// When set, `plv` must match exactly instead of acting as a ceiling.
    pub restricted: bool,
    /// Memory access type (cacheability class).
    pub mat: u8,
    /// Physical page number in 4 KiB units.
    pub ppn: u64,
    /// Loads are inhibited.
    pub no_read: bool,
    /// Instruction fetches are inhibited.
    pub no_execute: bool,
}

impl TlbHalf {
    /// Decodes an EntryLo register value.
    ///
    /// The global bit is handled at line level and ignored here.
    pub const fn from_entry_lo(lo: u64) -> Self {
        Self {
            valid: lo & ENTRYLO_V != 0,
            dirty: lo & ENTRYLO_D != 0,
            plv: ((lo >> ENTRYLO_PLV_SHIFT) & 0x3) as u8,
            restricted: lo & ENTRYLO_RPLV != 0,
            mat: ((lo >> ENTRYLO_MAT_SHIFT) & 0x3) as u8,
            ppn: (lo >> PPN_SHIFT) & low_mask(PPN_WIDTH),
            no_read: lo & ENTRYLO_NR != 0,
            no_execute: lo & ENTRYLO_NX != 0,
        }
    }

    /// Encodes this half as an EntryLo register value.
    ///
    /// # Arguments
    ///
    /// * `global` - Line-level global flag, reported in bit 6.
    pub const fn to_entry_lo(&self, global: bool) -> u64 {
        let mut lo = ((self.plv as u64 & 0x3) << ENTRYLO_PLV_SHIFT)
            | ((self.mat as u64 & 0x3) << ENTRYLO_MAT_SHIFT)
            | ((self.ppn & low_mask(PPN_WIDTH)) << PPN_SHIFT);
        if self.valid {
            lo |= ENTRYLO_V;
        }
        if self.dirty {
            lo |= ENTRYLO_D;
        }
        if global {
            lo |= ENTRYLO_G;
        }
        if self.no_read {
            lo |= ENTRYLO_NR;
        }
        if self.no_execute {
            lo |= ENTRYLO_NX;
        }
        if self.restricted {
            lo |= ENTRYLO_RPLV;
        }
        lo
    }
}

/// A single TLB line covering an even/odd page pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlbEntry {
    /// Virtual page-pair number: address bits `[VALEN-1:13]`, right aligned.
    pub vppn: u64,
    /// Owning address space (ignored when `global`).
    pub asid: u16,
    /// Entry matches every ASID.
    pub global: bool,
    /// log2 page size. Only MTLB slots use it; STLB slots follow the pool's size.
    pub page_shift: u8,
    /// Slot holds a live mapping.
    pub enabled: bool,
    /// Even (`[0]`) and odd (`[1]`) half-entries.
    pub halves: [TlbHalf; 2],
}

impl TlbEntry {
    /// Returns the half selected by the odd/even address bit.
    #[inline]
    pub const fn half(&self, odd: bool) -> &TlbHalf {
        &self.halves[odd as usize]
    }

    /// Returns `true` if the entry belongs to `asid` or is global.
    #[inline]
    pub const fn visible_to(&self, asid: u16) -> bool {
        self.global || self.asid == asid
    }

    /// Compares the stored tag against `vaddr` at page-pair granularity.
    ///
    /// # Arguments
    ///
    /// * `vaddr` - Virtual address already truncated to `VALEN`.
    /// * `page_shift` - Effective page shift of this entry.
    #[inline]
    pub const fn tag_matches(&self, vaddr: u64, page_shift: u8) -> bool {
        let pair_shift = page_shift as u32 + 1;
        self.vppn >> (pair_shift - VPPN_SHIFT) == vaddr >> pair_shift
    }
}

/// Which pool a slot belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TlbPool {
    /// Set-associative, fixed page size.
    Fixed,
    /// Fully associative, per-entry page size.
    Variable,
}

/// Serializable image of a TLB store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlbSnapshot {
    /// Geometry the entries were captured with.
    pub config: MmuConfig,
    /// Fixed page size of the STLB at capture time.
    pub stlb_page_shift: u8,
    /// Every slot, STLB first.
    pub entries: Vec<TlbEntry>,
}

/// The per-core TLB: both pools in one flat array.
#[derive(Clone, Debug)]
pub struct TlbStore {
    entries: Vec<TlbEntry>,
    sets: usize,
    ways: usize,
    stlb_page_shift: u8,
}

impl TlbStore {
    /// Creates an empty store with every slot disabled.
    ///
    /// # Arguments
    ///
    /// * `config` - A validated MMU configuration.
    pub fn new(config: &MmuConfig) -> Self {
        Self {
            entries: vec![TlbEntry::default(); config.total_entries()],
            sets: config.stlb_sets,
            ways: config.stlb_ways,
            stlb_page_shift: config.stlb_page_shift,
        }
    }

    /// Rebuilds a store from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::SnapshotMismatch`] if the entry count disagrees with the
    /// snapshot's geometry, or [`TlbError::InvalidConfig`] for a bad geometry or
    /// an enabled MTLB entry with an unsupported page size.
    pub fn from_snapshot(snapshot: TlbSnapshot) -> Result<Self, TlbError> {
        snapshot.config.validate()?;
        let expected = snapshot.config.total_entries();
        if snapshot.entries.len() != expected {
            return Err(TlbError::SnapshotMismatch {
                expected,
                found: snapshot.entries.len(),
            });
        }
        if !snapshot.config.page_shift_supported(snapshot.stlb_page_shift) {
            return Err(TlbError::InvalidConfig(format!(
                "snapshot STLB page shift {} unsupported",
                snapshot.stlb_page_shift
            )));
        }
        let fixed = snapshot.config.stlb_capacity();
        if let Some((index, entry)) = snapshot.entries[fixed..]
            .iter()
            .enumerate()
            .find(|(_, e)| e.enabled && !snapshot.config.page_shift_supported(e.page_shift))
        {
            return Err(TlbError::InvalidConfig(format!(
                "snapshot MTLB slot {} page shift {} unsupported",
                fixed + index,
                entry.page_shift
            )));
        }
        Ok(Self {
            entries: snapshot.entries,
            sets: snapshot.config.stlb_sets,
            ways: snapshot.config.stlb_ways,
            stlb_page_shift: snapshot.stlb_page_shift,
        })
    }

    /// Captures every slot together with the store geometry.
    pub fn snapshot(&self, config: &MmuConfig) -> TlbSnapshot {
        TlbSnapshot {
            config: *config,
            stlb_page_shift: self.stlb_page_shift,
            entries: self.entries.clone(),
        }
    }

    /// Returns the slot at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside both pools; callers validate guest indices first.
    #[inline]
    pub fn get(&self, index: usize) -> &TlbEntry {
        &self.entries[index]
    }

    /// Returns the slot at `index` mutably.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside both pools.
    #[inline]
    pub(crate) fn get_mut(&mut self, index: usize) -> &mut TlbEntry {
        &mut self.entries[index]
    }

    /// Checks a guest-supplied index against the combined capacity.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::IndexOutOfRange`] when `index` addresses no slot.
    pub fn check_index(&self, index: usize) -> Result<(), TlbError> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(TlbError::IndexOutOfRange {
                index,
                capacity: self.entries.len(),
            })
        }
    }

    /// Iterates `(index, entry)` over the STLB.
    pub fn iter_fixed(&self) -> impl Iterator<Item = (usize, &TlbEntry)> + '_ {
        self.entries[..self.capacity_fixed()].iter().enumerate()
    }

    /// Iterates `(index, entry)` over the MTLB.
    pub fn iter_variable(&self) -> impl Iterator<Item = (usize, &TlbEntry)> + '_ {
        let base = self.capacity_fixed();
        self.entries[base..]
            .iter()
            .enumerate()
            .map(move |(i, e)| (base + i, e))
    }

    /// Iterates mutably over every slot of both pools with its index.
    pub(crate) fn iter_all_mut(&mut self) -> impl Iterator<Item = (usize, &mut TlbEntry)> + '_ {
        self.entries.iter_mut().enumerate()
    }

    /// Number of STLB slots.
    #[inline]
    pub const fn capacity_fixed(&self) -> usize {
        self.sets * self.ways
    }

    /// Number of MTLB slots.
    #[inline]
    pub fn capacity_variable(&self) -> usize {
        self.entries.len() - self.capacity_fixed()
    }

    /// Combined capacity of both pools.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// Number of STLB sets.
    #[inline]
    pub const fn sets(&self) -> usize {
        self.sets
    }

    /// Number of STLB ways.
    #[inline]
    pub const fn ways(&self) -> usize {
        self.ways
    }

    /// Page shift shared by every STLB entry.
    #[inline]
    pub const fn stlb_page_shift(&self) -> u8 {
        self.stlb_page_shift
    }

    /// Changes the STLB page size (a `STLBPS` write). The caller validates `page_shift`.
    pub(crate) const fn set_stlb_page_shift(&mut self, page_shift: u8) {
        self.stlb_page_shift = page_shift;
    }

    /// Pool owning slot `index`.
    #[inline]
    pub const fn pool_of(&self, index: usize) -> TlbPool {
        if index < self.capacity_fixed() {
            TlbPool::Fixed
        } else {
            TlbPool::Variable
        }
    }

    /// Effective page shift of slot `index`.
    #[inline]
    pub fn page_shift_of(&self, index: usize) -> u8 {
        match self.pool_of(index) {
            TlbPool::Fixed => self.stlb_page_shift,
            TlbPool::Variable => self.entries[index].page_shift,
        }
    }

    /// STLB set addressed by a `VALEN`-truncated virtual address.
    #[inline]
    pub const fn set_index(&self, vaddr: u64) -> usize {
        ((vaddr >> (self.stlb_page_shift as u32 + 1)) as usize) & (self.sets - 1)
    }

    /// Flat index of `(way, set)` inside the STLB.
    #[inline]
    pub const fn fixed_slot(&self, way: usize, set: usize) -> usize {
        way * self.sets + set
    }
}
