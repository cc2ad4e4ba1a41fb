//! Property-Based Translation Tests.
//!
//! Uses `proptest` to check lookup invariants over random mappings:
//! - Written mappings translate to the composed physical address
//! - `tlbrd` reproduces what `tlbwr` stored
//! - Non-global entries are invisible to other ASIDs, global ones to none
//! - `search` agrees with the slot `tlbwr` wrote, and `tlbsrch` with `translate`
//! - Invalidating everything leaves no translation behind

use la64sim_core::common::{AccessType, FaultKind, PhysAddr, VirtAddr};
use la64sim_core::core::units::mmu::invalidate::InvalidationScope;
use la64sim_core::core::units::mmu::translate::{ShadowSet, TranslationSource};
use la64sim_core::soc::NoFlush;
use proptest::prelude::*;

use crate::common::builder::Lo;
use crate::common::harness::TestContext;

/// Page pair number of a canonical low-half address with 16 KiB pages.
fn pair() -> impl Strategy<Value = u64> {
    0u64..(1 << 32)
}

/// 16 KiB frame number below a 48-bit physical address.
fn frame() -> impl Strategy<Value = u64> {
    0u64..(1 << 34)
}

fn asid() -> impl Strategy<Value = u16> {
    0u16..1024
}

/// EntryLo with every architectural field drawn at random.
fn entry_lo() -> impl Strategy<Value = Lo> {
    (frame(), any::<[bool; 6]>(), 0u64..4, 0u64..4).prop_map(|(frame, f, plv, mat)| {
        let mut lo = Lo::page(frame << 14).plv(plv).mat(mat);
        if !f[0] {
            lo = Lo(lo.bits() & !1);
        }
        if f[1] {
            lo = lo.dirty();
        }
        if f[2] {
            lo = lo.no_read();
        }
        if f[3] {
            lo = lo.no_exec();
        }
        if f[4] {
            lo = lo.restricted();
        }
        if f[5] {
            lo = lo.global();
        }
        lo
    })
}

proptest! {
    #[test]
    fn written_mapping_translates(
        pair in pair(),
        way in 0usize..8,
        even in frame(),
        odd in frame(),
        offset in 0u64..0x8000,
        asid in asid(),
    ) {
        let mut t = TestContext::new();
        t.set_asid(asid);
        let base = pair << 15;
        let _ = t.map_stlb(way, base, Lo::page(even << 14).dirty(), Lo::page(odd << 14).dirty());

        let tr = t.translate(base + offset, AccessType::Write).unwrap();
        let frame = if offset & 0x4000 == 0 { even } else { odd };
        prop_assert_eq!(tr.paddr, PhysAddr::new((frame << 14) | (offset & 0x3FFF)));
    }

    #[test]
    fn read_reproduces_write(
        pair in pair(),
        slot in 0usize..72,
        shift in 14u8..30,
        asid in asid(),
        lo0 in entry_lo(),
        lo1 in entry_lo(),
    ) {
        let mut t = TestContext::new();
        t.set_asid(asid);
        let base = (pair << 15) & !((1u64 << (shift + 1)) - 1);
        t.tlbwr(slot, base, shift, lo0, lo1).unwrap();
        let global = lo0.bits() & lo1.bits() & Lo::invalid().global().bits() != 0;
        let strip_g = |lo: Lo| if global { lo.global().bits() } else { lo.bits() & !Lo::invalid().global().bits() };

        t.set_asid(0);
        t.csrs.tlbehi = 0;
        t.mmu.tlbrd(&mut t.csrs).unwrap();

        prop_assert!(!t.csrs.tlbidx_not_present());
        prop_assert_eq!(t.csrs.tlbehi, base);
        prop_assert_eq!(t.csrs.current_asid(), asid);
        prop_assert_eq!(t.csrs.tlbelo0, strip_g(lo0));
        prop_assert_eq!(t.csrs.tlbelo1, strip_g(lo1));
        prop_assert_eq!(t.csrs.tlbidx_page_shift(), t.mmu.tlb().page_shift_of(slot));
    }

    #[test]
    fn tlbsrch_agrees_with_translate(
        pair in pair(),
        offset in 0u64..0x8000,
        way in 0usize..8,
        asid in asid(),
    ) {
        let mut t = TestContext::new();
        t.set_asid(asid);
        let base = pair << 15;
        let _ = t.map_stlb(way, base, Lo::page(0), Lo::page(0x4000));

        t.csrs.tlbehi = base + offset;
        t.mmu.tlbsrch(&mut t.csrs, ShadowSet::Normal);
        prop_assert!(!t.csrs.tlbidx_not_present());

        let tr = t.translate(base + offset, AccessType::Read).unwrap();
        prop_assert_eq!(
            tr.source,
            TranslationSource::Tlb {
                index: t.csrs.tlb_index(),
                page_shift: t.csrs.tlbidx_page_shift(),
            }
        );
    }

    #[test]
    fn non_global_entries_are_asid_private(
        pair in pair(),
        owner in asid(),
        other in asid(),
    ) {
        prop_assume!(owner != other);
        let mut t = TestContext::new();
        t.set_asid(owner);
        let base = pair << 15;
        let _ = t.map_stlb(0, base, Lo::page(0), Lo::page(0));

        t.set_asid(other);
        let fault = t.translate(base, AccessType::Read).unwrap_err();
        prop_assert_eq!(fault.kind, FaultKind::NoMatch);
        prop_assert!(t.mmu.search(other, VirtAddr::new(base)).is_none());
    }

    #[test]
    fn global_entries_match_every_asid(
        pair in pair(),
        owner in asid(),
        other in asid(),
    ) {
        let mut t = TestContext::new();
        t.set_asid(owner);
        let base = pair << 15;
        let _ = t.map_stlb(0, base, Lo::page(0).global(), Lo::page(0).global());

        t.set_asid(other);
        prop_assert!(t.translate(base + 0x4000, AccessType::Read).is_ok());
    }

    #[test]
    fn search_finds_written_slot(
        pair in pair(),
        way in 0usize..8,
        slot in 0usize..8,
        shift in 15u8..30,
        use_mtlb in any::<bool>(),
    ) {
        let mut t = TestContext::new();
        let (index, vaddr) = if use_mtlb {
            let base = (pair << 15) & !((1u64 << (shift + 1)) - 1);
            (t.map_mtlb(slot, base, shift, Lo::page(0), Lo::invalid()), base)
        } else {
            let base = pair << 15;
            (t.map_stlb(way, base, Lo::page(0), Lo::invalid()), base)
        };

        let hit = t.mmu.search(0, VirtAddr::new(vaddr)).unwrap();
        prop_assert_eq!(hit.index, index);
        prop_assert_eq!(hit.page_shift, t.mmu.tlb().page_shift_of(index));
    }

    #[test]
    fn invalidate_all_leaves_nothing(
        pairs in prop::collection::vec(pair(), 1..16),
    ) {
        let mut t = TestContext::new();
        for (i, &p) in pairs.iter().enumerate() {
            let _ = t.map_stlb(i % 8, p << 15, Lo::page(0), Lo::page(0));
        }
        let _ = t.mmu.invalidate(InvalidationScope::All, &mut NoFlush);
        for &p in &pairs {
            prop_assert!(t.mmu.search(0, VirtAddr::new(p << 15)).is_none());
        }
    }
}
