//! System-on-Chip (SoC) collaborators.
//!
//! The translation layer reaches physical memory and the emulator's translation
//! cache only through the traits defined here.

/// Physical memory and translation-cache traits.
pub mod traits;

pub use traits::{FlushRange, NoFlush, PhysicalMemory, TranslationCacheFlush};
