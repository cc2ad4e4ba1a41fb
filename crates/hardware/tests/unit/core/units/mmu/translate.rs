//! Address Translation Tests.
//!
//! Verifies the translation pipeline in order:
//! - Direct mode and direct-map windows
//! - Canonical-address checks
//! - STLB/MTLB lookup, odd/even selection and physical address composition
//! - Half-entry checks and their priority

use la64sim_core::common::{AccessType, FaultKind, PhysAddr};
use la64sim_core::core::arch::mode::PrivilegeLevel;
use la64sim_core::core::units::mmu::translate::{
    AddressingMode, DirectMapWindow, Permissions, ShadowSet, TranslationContext, TranslationSource,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

use crate::common::builder::Lo;
use crate::common::harness::TestContext;

const VA: u64 = 0x4000_0000;
const PA: u64 = 0x1_0000_0000;

// ══════════════════════════════════════════════════════════
// 1. Bypass paths
// ══════════════════════════════════════════════════════════

#[test]
fn direct_mode_masks_to_palen() {
    let mut t = TestContext::new();
    t.csrs.set_paging(false);
    let tr = t.translate(0xFFFF_8000_1234_5678, AccessType::Write).unwrap();
    assert_eq!(tr.paddr, PhysAddr::new(0x8000_1234_5678));
    assert_eq!(tr.perms, Permissions::ALL);
    assert_eq!(tr.source, TranslationSource::Direct);
}

#[test]
fn direct_mode_ignores_tlb_and_windows() {
    let mut t = TestContext::new();
    t.csrs.dmw[0] = 0x9000_0000_0000_0001;
    t.csrs.set_paging(false);
    let tr = t.translate(0x9000_0000_0000_1000, AccessType::Fetch).unwrap();
    assert_eq!(tr.source, TranslationSource::Direct);
    assert_eq!(tr.paddr, PhysAddr::new(0x1000));
}

#[test]
fn window_maps_segment_linearly() {
    let mut t = TestContext::new();
    t.csrs.dmw[0] = 0x9000_0000_0000_0000 | 0b0001;
    let tr = t.translate(0x9000_0000_0123_4567, AccessType::Read).unwrap();
    assert_eq!(tr.paddr, PhysAddr::new(0x0123_4567));
    assert_eq!(tr.perms, Permissions::ALL);
    assert_eq!(tr.source, TranslationSource::Window(0));
}

#[test]
fn window_requires_plv_enable() {
    let mut t = TestContext::new();
    t.csrs.dmw[0] = 0x9000_0000_0000_0000 | 0b0001;
    t.set_plv(PrivilegeLevel::Plv3);
    // Not canonical once the window does not apply.
    let fault = t.translate(0x9000_0000_0123_4567, AccessType::Read).unwrap_err();
    assert_eq!(fault.kind, FaultKind::BadAddress);

    t.csrs.dmw[0] |= 0b1000;
    assert!(t.translate(0x9000_0000_0123_4567, AccessType::Read).is_ok());
}

#[test]
fn first_matching_window_wins() {
    let mut t = TestContext::new();
    t.csrs.dmw[1] = 0x8000_0000_0000_0000 | 0b1111;
    t.csrs.dmw[2] = 0x8000_0000_0000_0000 | 0b1111 | 1 << 4;
    let tr = t.translate(0x8000_0000_0000_2000, AccessType::Fetch).unwrap();
    assert_eq!(tr.source, TranslationSource::Window(1));
}

#[test]
fn window_base_shift_is_configurable() {
    let config = la64sim_core::MmuConfig {
        dmw_base_shift: 60,
        ..crate::common::harness::small_config()
    };
    let mut t = TestContext::with_config(config);
    t.csrs.dmw[3] = 0x9000_0000_0000_0000 | 0b0001;
    let tr = t.translate(0x9000_0012_3456_7000, AccessType::Read).unwrap();
    assert_eq!(tr.source, TranslationSource::Window(3));
    assert_eq!(tr.paddr, PhysAddr::new(0x0012_3456_7000));
}

#[test]
fn context_decodes_csrs() {
    let mut t = TestContext::new();
    t.set_asid(0x2A);
    t.set_plv(PrivilegeLevel::Plv2);
    t.csrs.dmw[1] = 0xA000_0000_0000_0000 | 1 << 4 | 0b0110;
    t.csrs.set_in_refill(true);
    let ctx = t.ctx();
    assert_eq!(ctx.asid, 0x2A);
    assert_eq!(ctx.plv, PrivilegeLevel::Plv2);
    assert_eq!(ctx.mode, AddressingMode::Mapped);
    assert_eq!(ctx.shadow, ShadowSet::Refill);
    assert_eq!(
        ctx.windows[1],
        DirectMapWindow {
            plv_mask: 0b0110,
            mat: 1,
            raw: 0xA000_0000_0000_0016,
        }
    );
}

// ══════════════════════════════════════════════════════════
// 2. Address checks and lookup
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(0x0000_8000_0000_0000)]
#[case(0x0001_0000_0000_0000)]
#[case(0x8000_0000_0000_0000)]
fn non_canonical_is_bad_address(#[case] va: u64) {
    let t = TestContext::new();
    let fault = t.translate(va, AccessType::Read).unwrap_err();
    assert_eq!(fault.kind, FaultKind::BadAddress);
    assert_eq!(fault.vaddr.val(), va);
    assert_eq!(fault.access, AccessType::Read);
}

#[test]
fn empty_store_is_no_match() {
    let t = TestContext::new();
    let fault = t.translate(0xFFFF_8000_0000_0000, AccessType::Fetch).unwrap_err();
    assert_eq!(fault.kind, FaultKind::NoMatch);
}

#[test]
fn stlb_hit_even_and_odd_halves() {
    let mut t = TestContext::new();
    let index = t.map_stlb(2, VA, Lo::page(PA), Lo::page(0x2000_0000).dirty());

    let even = t.translate(VA + 0x123, AccessType::Read).unwrap();
    assert_eq!(even.paddr, PhysAddr::new(PA + 0x123));
    assert_eq!(
        even.source,
        TranslationSource::Tlb {
            index,
            page_shift: 14
        }
    );

    let odd = t.translate(VA + 0x4123, AccessType::Write).unwrap();
    assert_eq!(odd.paddr, PhysAddr::new(0x2000_0123));
}

#[test]
fn high_half_addresses_translate() {
    let mut t = TestContext::new();
    let va = 0xFFFF_8000_0000_0000;
    let _ = t.map_stlb(0, va, Lo::page(PA), Lo::invalid());
    let tr = t.translate(va | 0x10, AccessType::Read).unwrap();
    assert_eq!(tr.paddr, PhysAddr::new(PA | 0x10));
}

#[test]
fn mtlb_large_page_masks_ppn() {
    let mut t = TestContext::new();
    // PPN bits below the page size are ignored.
    let index = t.map_mtlb(0, VA, 21, Lo::page(0x8000_5000), Lo::invalid());
    let tr = t.translate(0x4001_2345, AccessType::Read).unwrap();
    assert_eq!(tr.paddr, PhysAddr::new(0x8001_2345));
    assert_eq!(
        tr.source,
        TranslationSource::Tlb {
            index,
            page_shift: 21
        }
    );
    // The odd 2 MiB page is invalid.
    let fault = t.translate(0x4020_0000, AccessType::Read).unwrap_err();
    assert_eq!(fault.kind, FaultKind::Invalid);
}

#[test]
fn physical_address_masked_to_palen() {
    let config = la64sim_core::MmuConfig {
        pa_bits: 32,
        ..crate::common::harness::small_config()
    };
    let mut t = TestContext::with_config(config);
    let _ = t.map_stlb(0, VA, Lo::page(0x3_4000_0000), Lo::invalid());
    let tr = t.translate(VA + 8, AccessType::Read).unwrap();
    assert_eq!(tr.paddr, PhysAddr::new(0x4000_0008));
}

#[test]
fn stlb_wins_over_mtlb() {
    let mut t = TestContext::new();
    let mtlb = t.map_mtlb(0, VA, 14, Lo::page(0x7000_0000), Lo::invalid());
    let stlb = t.map_stlb(5, VA, Lo::page(PA), Lo::invalid());
    let tr = t.translate(VA, AccessType::Read).unwrap();
    assert_eq!(tr.paddr, PhysAddr::new(PA));
    assert_eq!(
        tr.source,
        TranslationSource::Tlb {
            index: stlb,
            page_shift: 14
        }
    );

    // With the STLB line gone the MTLB line is found.
    t.stage(stlb, VA, 14, Lo::invalid(), Lo::invalid());
    t.csrs.set_tlbidx_not_present(true);
    t.mmu
        .tlbwr(&t.csrs, ShadowSet::Normal, &mut la64sim_core::soc::NoFlush)
        .unwrap();
    let tr = t.translate(VA, AccessType::Read).unwrap();
    assert_eq!(
        tr.source,
        TranslationSource::Tlb {
            index: mtlb,
            page_shift: 14
        }
    );
}

#[test]
fn stlb_entry_in_wrong_set_is_not_found() {
    let mut t = TestContext::new();
    // Set 1 holds 0x4000_8000; 0x4000_0000 lives in set 0.
    t.tlbwr(8 + 1, VA, 14, Lo::page(PA), Lo::page(PA)).unwrap();
    let fault = t.translate(VA, AccessType::Read).unwrap_err();
    assert_eq!(fault.kind, FaultKind::NoMatch);
}

#[test]
fn disabled_entry_never_matches() {
    let mut t = TestContext::new();
    let index = t.map_stlb(0, VA, Lo::page(PA), Lo::page(PA));
    let mut snapshot = t.mmu.snapshot();
    snapshot.entries[index].enabled = false;
    t.mmu.restore(snapshot).unwrap();
    assert_eq!(
        t.translate(VA, AccessType::Read).unwrap_err().kind,
        FaultKind::NoMatch
    );
}

// ══════════════════════════════════════════════════════════
// 3. Half-entry checks
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::invalid(Lo::invalid().no_exec(), PrivilegeLevel::Plv0, AccessType::Fetch, Some(FaultKind::Invalid))]
#[case::nx_fetch(Lo::page(PA).no_exec(), PrivilegeLevel::Plv0, AccessType::Fetch, Some(FaultKind::ExecuteInhibited))]
#[case::nx_load(Lo::page(PA).no_exec(), PrivilegeLevel::Plv0, AccessType::Read, None)]
#[case::nr_load(Lo::page(PA).no_read(), PrivilegeLevel::Plv0, AccessType::Read, Some(FaultKind::ReadInhibited))]
#[case::nr_fetch(Lo::page(PA).no_read(), PrivilegeLevel::Plv0, AccessType::Fetch, None)]
#[case::nr_store(Lo::page(PA).no_read().dirty(), PrivilegeLevel::Plv0, AccessType::Write, None)]
#[case::ceiling_exceeded(Lo::page(PA).plv(0), PrivilegeLevel::Plv3, AccessType::Read, Some(FaultKind::PrivilegeViolation))]
#[case::ceiling_ok(Lo::page(PA).plv(3), PrivilegeLevel::Plv0, AccessType::Read, None)]
#[case::ceiling_equal(Lo::page(PA).plv(2), PrivilegeLevel::Plv2, AccessType::Read, None)]
#[case::restricted_mismatch(Lo::page(PA).plv(3).restricted(), PrivilegeLevel::Plv0, AccessType::Read, Some(FaultKind::PrivilegeViolation))]
#[case::restricted_exact(Lo::page(PA).plv(3).restricted(), PrivilegeLevel::Plv3, AccessType::Read, None)]
#[case::clean_store(Lo::page(PA), PrivilegeLevel::Plv0, AccessType::Write, Some(FaultKind::Dirty))]
#[case::dirty_store(Lo::page(PA).dirty(), PrivilegeLevel::Plv0, AccessType::Write, None)]
#[case::privilege_before_dirty(Lo::page(PA).plv(0), PrivilegeLevel::Plv1, AccessType::Write, Some(FaultKind::PrivilegeViolation))]
#[case::nx_before_privilege(Lo::page(PA).plv(0).no_exec(), PrivilegeLevel::Plv3, AccessType::Fetch, Some(FaultKind::ExecuteInhibited))]
#[case::nr_before_privilege(Lo::page(PA).plv(0).no_read(), PrivilegeLevel::Plv3, AccessType::Read, Some(FaultKind::ReadInhibited))]
fn half_entry_checks(
    #[case] lo: Lo,
    #[case] plv: PrivilegeLevel,
    #[case] access: AccessType,
    #[case] expected: Option<FaultKind>,
) {
    let mut t = TestContext::new();
    let _ = t.map_stlb(0, VA, lo, Lo::invalid());
    t.set_plv(plv);
    let result = t.translate(VA, access);
    assert_eq!(result.err().map(|f| f.kind), expected);
}

#[test]
fn permissions_follow_dirty_and_nx() {
    let mut t = TestContext::new();
    let _ = t.map_stlb(0, VA, Lo::page(PA).dirty().no_exec(), Lo::page(PA).no_read());
    let even = t.translate(VA, AccessType::Read).unwrap();
    assert_eq!(
        even.perms,
        Permissions {
            read: true,
            write: true,
            execute: false
        }
    );
    let odd = t.translate(VA + 0x4000, AccessType::Fetch).unwrap();
    assert_eq!(
        odd.perms,
        Permissions {
            read: true,
            write: false,
            execute: true
        }
    );
}

#[test]
fn explicit_context_overrides_csrs() {
    let mut t = TestContext::new();
    let _ = t.map_stlb(0, VA, Lo::page(PA), Lo::invalid());
    t.set_asid(9);
    let ctx = TranslationContext {
        asid: 0,
        ..t.ctx()
    };
    assert!(
        t.mmu
            .translate(&ctx, la64sim_core::common::VirtAddr::new(VA), AccessType::Read)
            .is_ok()
    );
}
