//! Configuration for the LoongArch64 translation layer.
//!
//! This module defines the structure used to parameterize the MMU. It provides:
//! 1. **Defaults:** The 3A5000-class geometry (2048-slot STLB, 64-slot MTLB, 48-bit VA/PA).
//! 2. **Structure:** `MmuConfig`, deserialised from JSON with per-field defaults.
//! 3. **Validation:** Rejection of geometries the lookup algorithms cannot index.
//!
//! Configuration is supplied as JSON by the embedding machine model, or use `MmuConfig::default()`.

use serde::{Deserialize, Serialize};

use crate::common::TlbError;
use crate::common::constants::{MAX_ADDRESS_BITS, MIN_ADDRESS_BITS, MIN_PAGE_SHIFT};

/// Default configuration constants for the MMU.
mod defaults {
    /// Number of sets in the set-associative STLB.
    pub const STLB_SETS: usize = 256;

    /// Number of ways (lines per set) in the STLB.
    pub const STLB_WAYS: usize = 8;

    /// STLB page shift (16 KiB pages), the reset value of `STLBPS`.
    pub const STLB_PAGE_SHIFT: u8 = 14;

    /// Number of slots in the fully associative MTLB.
    pub const MTLB_ENTRIES: usize = 64;

    /// Implemented virtual address width (`VALEN`).
    pub const VA_BITS: u32 = 48;

    /// Implemented physical address width (`PALEN`).
    pub const PA_BITS: u32 = 48;

    /// Bit position above which a direct-map window compares its base field.
    pub const DMW_BASE_SHIFT: u32 = 48;

    /// Seed of the replacement generator used by `tlbfill`.
    pub const RANDOM_SEED: u64 = 0x2545_F491_4F6C_DD1D;
}

/// MMU geometry and address-width configuration.
///
/// Sizing fields are persisted next to the entry array in snapshots, so a restored
/// store always has the geometry it was saved with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MmuConfig {
    /// Number of STLB sets; must be a power of two.
    pub stlb_sets: usize,
    /// Number of STLB ways.
    pub stlb_ways: usize,
    /// Page shift shared by every STLB entry.
    pub stlb_page_shift: u8,
    /// Number of MTLB slots.
    pub mtlb_entries: usize,
    /// Implemented virtual address width.
    pub va_bits: u32,
    /// Implemented physical address width.
    pub pa_bits: u32,
    /// Shift of the direct-map window base field.
    pub dmw_base_shift: u32,
    /// Seed for the default replacement generator.
    pub random_seed: u64,
}

impl Default for MmuConfig {
    fn default() -> Self {
        Self {
            stlb_sets: defaults::STLB_SETS,
            stlb_ways: defaults::STLB_WAYS,
            stlb_page_shift: defaults::STLB_PAGE_SHIFT,
            mtlb_entries: defaults::MTLB_ENTRIES,
            va_bits: defaults::VA_BITS,
            pa_bits: defaults::PA_BITS,
            dmw_base_shift: defaults::DMW_BASE_SHIFT,
            random_seed: defaults::RANDOM_SEED,
        }
    }
}

impl MmuConfig {
    /// Parses and validates a JSON configuration.
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::Serde`] for malformed JSON and [`TlbError::InvalidConfig`]
    /// when the resulting geometry fails [`MmuConfig::validate`].
    pub fn from_json(json: &str) -> Result<Self, TlbError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Number of STLB slots.
    #[inline]
    pub const fn stlb_capacity(&self) -> usize {
        self.stlb_sets * self.stlb_ways
    }

    /// Combined capacity of both pools.
    #[inline]
    pub const fn total_entries(&self) -> usize {
        self.stlb_capacity() + self.mtlb_entries
    }

    /// Largest page shift a TLB line can hold: the page pair must fit below `VALEN`.
    #[inline]
    pub const fn max_page_shift(&self) -> u8 {
        (self.va_bits - 2) as u8
    }

    /// Checks that a page shift is usable with this address width.
    #[inline]
    pub const fn page_shift_supported(&self, page_shift: u8) -> bool {
        page_shift >= MIN_PAGE_SHIFT && page_shift <= self.max_page_shift()
    }

    /// Checks the geometry for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`TlbError::InvalidConfig`] describing the first violated constraint.
    pub fn validate(&self) -> Result<(), TlbError> {
        if self.stlb_sets == 0 || !self.stlb_sets.is_power_of_two() {
            return Err(invalid(format!(
                "stlb_sets must be a non-zero power of two, got {}",
                self.stlb_sets
            )));
        }
        if self.stlb_ways == 0 {
            return Err(invalid("stlb_ways must be non-zero".to_owned()));
        }
        if self.mtlb_entries == 0 {
            return Err(invalid("mtlb_entries must be non-zero".to_owned()));
        }
        for (name, bits) in [("va_bits", self.va_bits), ("pa_bits", self.pa_bits)] {
            if !(MIN_ADDRESS_BITS..=MAX_ADDRESS_BITS).contains(&bits) {
                return Err(invalid(format!("{name} must lie in 14..=64, got {bits}")));
            }
        }
        if self.dmw_base_shift == 0 || self.dmw_base_shift > MAX_ADDRESS_BITS - 1 {
            return Err(invalid(format!(
                "dmw_base_shift must lie in 1..=63, got {}",
                self.dmw_base_shift
            )));
        }
        if !self.page_shift_supported(self.stlb_page_shift) {
            return Err(invalid(format!(
                "stlb_page_shift {} outside {}..={}",
                self.stlb_page_shift,
                MIN_PAGE_SHIFT,
                self.max_page_shift()
            )));
        }
        // Slot indices travel through the 12-bit TLBIDX.INDEX field.
        if self.total_entries() > 1 << 12 {
            return Err(invalid(format!(
                "{} entries exceed the TLBIDX index field",
                self.total_entries()
            )));
        }
        Ok(())
    }
}

fn invalid(msg: String) -> TlbError {
    TlbError::InvalidConfig(msg)
}
