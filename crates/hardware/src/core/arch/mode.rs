//! LoongArch Privilege Levels.
//!
//! This module defines the four privilege levels of the LoongArch architecture.
//! It implements the following:
//! 1. **Level Classification:** PLV0 (kernel) through PLV3 (user).
//! 2. **Serialization:** Conversion between the 2-bit `CRMD.PLV` field and enum variants.
//! 3. **Observability:** Human-readable naming and display formatting for privilege states.

use serde::{Deserialize, Serialize};

/// LoongArch privilege level.
///
/// Lower numbers are more privileged: PLV0 is the kernel, PLV3 is user mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrivilegeLevel {
    /// PLV0, the most privileged level.
    Plv0 = 0,

    /// PLV1.
    Plv1 = 1,

    /// PLV2.
    Plv2 = 2,

    /// PLV3, the least privileged level (user mode).
    Plv3 = 3,
}

impl PrivilegeLevel {
    /// Converts the low two bits of a value to a privilege level.
    ///
    /// # Arguments
    ///
    /// * `val` - A raw `PLV` field; bits above bit 1 are ignored.
    pub const fn from_u8(val: u8) -> Self {
        match val & 0x3 {
            0 => Self::Plv0,
            1 => Self::Plv1,
            2 => Self::Plv2,
            _ => Self::Plv3,
        }
    }

    /// Converts a privilege level to its 2-bit field value.
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Bit selecting this level in a direct-map window enable mask.
    pub const fn dmw_bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Returns the human-readable name of the privilege level.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Plv0 => "PLV0",
            Self::Plv1 => "PLV1",
            Self::Plv2 => "PLV2",
            Self::Plv3 => "PLV3",
        }
    }
}

impl std::fmt::Display for PrivilegeLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
