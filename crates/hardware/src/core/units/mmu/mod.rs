//! Memory Management Unit (MMU).
//!
//! This module implements the software-managed LoongArch64 translation layer:
//! virtual-to-physical translation through direct-map windows and a two-pool TLB,
//! the privileged TLB maintenance instructions, the refill page-walk assist and
//! the mapping from translation faults to guest exception codes.

/// Fault classification and reporting into the CSR file.
pub mod fault;

/// Scoped and single-slot invalidation.
pub mod invalidate;

/// `tlbsrch`, `tlbrd`, `tlbwr`, `tlbfill`, `tlbclr`, `tlbflush` and `invtlb`.
pub mod maintenance;

/// `lddir`/`ldpte` page-walk assist.
pub mod ptw;

/// Replacement randomness for `tlbfill`.
pub mod random;

/// Translation Lookaside Buffer (TLB) storage.
pub mod tlb;

/// Address translation and TLB search.
pub mod translate;

use crate::common::{AccessType, Fault, TlbError, VirtAddr};
use crate::config::MmuConfig;
use crate::core::arch::csr::Csrs;
use crate::soc::traits::{PhysicalMemory, TranslationCacheFlush};

use self::fault::GuestExceptionCode;
use self::invalidate::InvalidationScope;
use self::random::{RandomSource, XorShiftRandom};
use self::tlb::{TlbSnapshot, TlbStore};
use self::translate::{ShadowSet, TlbHit, Translation, TranslationContext};

/// Memory Management Unit for one LoongArch core.
///
/// Owns the core's TLB and replacement generator. Everything architectural
/// (CSRs, physical memory, the translation cache) is passed in per call.
pub struct Mmu {
    config: MmuConfig,
    tlb: TlbStore,
    random: Box<dyn RandomSource>,
}

impl std::fmt::Debug for Mmu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mmu")
            .field("config", &self.config)
            .field("tlb", &self.tlb)
            .finish_non_exhaustive()
    }
}

impl Mmu {
    /// Creates an MMU with an empty TLB and the default replacement generator.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: MmuConfig) -> Result<Self, TlbError> {
        let random = Box::new(XorShiftRandom::new(config.random_seed));
        Self::with_random(config, random)
    }

    /// Creates an MMU drawing `tlbfill` victims from `random`.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::InvalidConfig`] if `config` fails validation.
    pub fn with_random(config: MmuConfig, random: Box<dyn RandomSource>) -> Result<Self, TlbError> {
        config.validate()?;
        tracing::debug!(
            stlb = config.stlb_capacity(),
            mtlb = config.mtlb_entries,
            stlb_page_shift = config.stlb_page_shift,
            "mmu reset"
        );
        Ok(Self {
            tlb: TlbStore::new(&config),
            config,
            random,
        })
    }

    /// Active configuration.
    pub const fn config(&self) -> &MmuConfig {
        &self.config
    }

    /// Both TLB pools, read-only. Writes go through the maintenance instructions.
    pub const fn tlb(&self) -> &TlbStore {
        &self.tlb
    }

    /// Translates a virtual address.
    ///
    /// # Errors
    ///
    /// Returns the guest-visible [`Fault`]; pass it to [`Mmu::report_fault`].
    pub fn translate(
        &self,
        ctx: &TranslationContext,
        vaddr: VirtAddr,
        access: AccessType,
    ) -> Result<Translation, Fault> {
        translate::translate(&self.tlb, &self.config, ctx, vaddr, access)
    }

    /// Searches the TLB without permission checks.
    pub fn search(&self, asid: u16, vaddr: VirtAddr) -> Option<TlbHit> {
        translate::search(&self.tlb, &self.config, asid, vaddr)
    }

    /// Records `fault` in the CSR file and returns the exception code to raise.
    pub fn report_fault(&self, csrs: &mut Csrs, fault: &Fault) -> GuestExceptionCode {
        fault::report(csrs, &self.config, fault)
    }

    /// Applies an invalidation scope.
    ///
    /// # Returns
    ///
    /// Number of slots disabled.
    pub fn invalidate(&mut self, scope: InvalidationScope, flush: &mut dyn TranslationCacheFlush) -> usize {
        invalidate::invalidate(&mut self.tlb, &self.config, scope, flush)
    }

    /// Flushes cached translations of slot `index` if it belongs to `asid` or is global.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::IndexOutOfRange`] for a bad index.
    pub fn invalidate_single(
        &self,
        index: usize,
        asid: u16,
        flush: &mut dyn TranslationCacheFlush,
    ) -> Result<(), TlbError> {
        invalidate::invalidate_single(&self.tlb, &self.config, index, asid, flush)
    }

    /// Executes `tlbsrch`.
    pub fn tlbsrch(&self, csrs: &mut Csrs, shadow: ShadowSet) {
        maintenance::tlbsrch(&self.tlb, &self.config, csrs, shadow);
    }

    /// Executes `tlbrd`.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::IndexOutOfRange`] for a bad `TLBIDX.INDEX`.
    pub fn tlbrd(&self, csrs: &mut Csrs) -> Result<(), TlbError> {
        maintenance::tlbrd(&self.tlb, csrs)
    }

    /// Executes `tlbwr`.
    ///
    /// # Errors
    ///
    /// See [`maintenance::tlbwr`].
    pub fn tlbwr(
        &mut self,
        csrs: &Csrs,
        shadow: ShadowSet,
        flush: &mut dyn TranslationCacheFlush,
    ) -> Result<(), TlbError> {
        maintenance::tlbwr(&mut self.tlb, &self.config, csrs, shadow, flush)
    }

    /// Executes `tlbfill`, returning the slot written.
    ///
    /// # Errors
    ///
    /// See [`maintenance::tlbfill`].
    pub fn tlbfill(
        &mut self,
        csrs: &Csrs,
        shadow: ShadowSet,
        flush: &mut dyn TranslationCacheFlush,
    ) -> Result<usize, TlbError> {
        maintenance::tlbfill(
            &mut self.tlb,
            &self.config,
            csrs,
            shadow,
            self.random.as_mut(),
            flush,
        )
    }

    /// Executes `tlbclr`.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::IndexOutOfRange`] for a bad `TLBIDX.INDEX`.
    pub fn tlbclr(&mut self, csrs: &Csrs, flush: &mut dyn TranslationCacheFlush) -> Result<usize, TlbError> {
        maintenance::tlbclr(&mut self.tlb, csrs, flush)
    }

    /// Executes `tlbflush`.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::IndexOutOfRange`] for a bad `TLBIDX.INDEX`.
    pub fn tlbflush(&mut self, csrs: &Csrs, flush: &mut dyn TranslationCacheFlush) -> Result<usize, TlbError> {
        maintenance::tlbflush(&mut self.tlb, csrs, flush)
    }

    /// Executes `invtlb op, asid, vaddr`.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::InvalidInvalidationOp`] for an unknown `op`.
    pub fn invtlb(
        &mut self,
        op: u64,
        asid: u16,
        vaddr: VirtAddr,
        flush: &mut dyn TranslationCacheFlush,
    ) -> Result<usize, TlbError> {
        maintenance::invtlb(&mut self.tlb, &self.config, op, asid, vaddr, flush)
    }

    /// Executes `lddir`.
    ///
    /// # Errors
    ///
    /// See [`ptw::lddir`].
    pub fn lddir(
        &self,
        csrs: &Csrs,
        mem: &mut dyn PhysicalMemory,
        base: u64,
        level: u64,
    ) -> Result<u64, TlbError> {
        ptw::lddir(csrs, &self.config, mem, base, level)
    }

    /// Executes `ldpte`.
    ///
    /// # Errors
    ///
    /// See [`ptw::ldpte`].
    pub fn ldpte(
        &self,
        csrs: &mut Csrs,
        mem: &mut dyn PhysicalMemory,
        base: u64,
        odd: bool,
    ) -> Result<(), TlbError> {
        ptw::ldpte(csrs, &self.config, mem, base, odd)
    }

    /// Changes the STLB page size.
    ///
    /// Existing STLB entries are reinterpreted at the new size, as on hardware;
    /// guests flush the STLB after writing `STLBPS`.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::InvalidConfig`] for a page size outside the supported range.
    pub fn set_stlb_page_shift(&mut self, page_shift: u8) -> Result<(), TlbError> {
        if !self.config.page_shift_supported(page_shift) {
            tracing::warn!(page_shift, "unsupported STLB page size");
            return Err(TlbError::InvalidConfig(format!(
                "STLB page shift {page_shift} unsupported"
            )));
        }
        self.tlb.set_stlb_page_shift(page_shift);
        Ok(())
    }

    /// Captures the TLB for save/restore.
    pub fn snapshot(&self) -> TlbSnapshot {
        self.tlb.snapshot(&self.config)
    }

    /// Replaces the TLB (and geometry) with a snapshot's.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::SnapshotMismatch`] or [`TlbError::InvalidConfig`] for a
    /// snapshot inconsistent with its own geometry; the MMU is then unchanged.
    pub fn restore(&mut self, snapshot: TlbSnapshot) -> Result<(), TlbError> {
        let config = snapshot.config;
        self.tlb = TlbStore::from_snapshot(snapshot)?;
        self.config = config;
        tracing::debug!(entries = self.tlb.capacity(), "tlb restored");
        Ok(())
    }
}
