use std::{vec, vec::Vec};

use super::*;
use crate::{
    node::{
        Ddn, DdnControl, DdnInfo, DividerControl, GateControl, LockStatus, Mix, MuxControl, Pll,
        PllControl, PllEntry, Regs,
    },
    regs::Bank,
    sim::SimRegisters,
    table::ClkFlags,
    test_util::{trace_init, MockFramework},
};

const MPMU: usize = 0xd405_0000;
const APMU: usize = 0xd428_2800;
const APBC: usize = 0xd401_5000;
const APBS: usize = 0xd409_0000;

const OSC: ClockId = ClockId(0);
const PLL1_VCO: ClockId = ClockId(1);
const PLL1_D4: ClockId = ClockId(2);
const PLL1_D8: ClockId = ClockId(3);
const PLL2: ClockId = ClockId(4);
const UART0: ClockId = ClockId(5);
const SDH0: ClockId = ClockId(6);
const TWSI0: ClockId = ClockId(7);
const SLOW_UART: ClockId = ClockId(8);
const PLL2_D2: ClockId = ClockId(9);

type TestRegistry = ClockRegistry<SimRegisters, crate::wait::SpinDelay, MockFramework>;

fn map() -> AddressMap {
    AddressMap::new()
        .with(Bank::Mpmu, MPMU)
        .with(Bank::Apmu, APMU)
        .with(Bank::Apbc, APBC)
        .with(Bank::Apbs, APBS)
}

fn table() -> Vec<ClockDesc> {
    vec![
        ClockDesc::fixed_rate(OSC, "osc_24m", 24_000_000),
        ClockDesc::fixed_rate(PLL1_VCO, "pll1_vco", 2_457_600_000),
        ClockDesc::factor(PLL1_D4, "pll1_d4", "pll1_vco", 1, 4),
        ClockDesc::factor(PLL1_D8, "pll1_d8", "pll1_vco", 1, 8),
        ClockDesc::pll(
            PLL2,
            "pll2",
            Pll::new(
                Regs::new(Bank::Apbs, 0x100).with_sel(0x104).with_xtc(0x108),
                PllControl::new([
                    PllEntry::new(2_457_600_000, 0x64, 0xdd, 0x3fe0_0000),
                    PllEntry::new(3_000_000_000, 0x66, 0xdd, 0x3fe0_0000),
                ])
                .with_masks([0xff, 0xff, 0x3fff_ffff]),
                LockStatus {
                    bank: Bank::Mpmu,
                    offset: 0x0,
                    bit: 1 << 28,
                },
            ),
        )
        .parent("osc_24m"),
        ClockDesc::mix(
            UART0,
            "uart0",
            Mix::new(Regs::new(Bank::Apbc, 0x0))
                .gate(GateControl::new(0x3))
                .mux(MuxControl::new(4, 3)),
        )
        .parents(&["pll1_d8", "osc_24m"]),
        ClockDesc::mix(
            SDH0,
            "sdh0",
            Mix::new(Regs::new(Bank::Apmu, 0x54).with_fc(1 << 11))
                .gate(GateControl::new(0x12))
                .div(DividerControl::register(8, 3))
                .mux(MuxControl::new(5, 3)),
        )
        .parents(&["pll1_d4", "pll1_d8"])
        .flags(ClkFlags::NONE.set_rate_gate().set_parent_gate()),
        ClockDesc::mix(
            TWSI0,
            "twsi0",
            Mix::new(Regs::new(Bank::Apbc, 0x2c)).gate(GateControl::new(0x3)),
        )
        .parent("osc_24m"),
        ClockDesc::ddn(
            SLOW_UART,
            "slow_uart",
            Ddn {
                regs: Regs::new(Bank::Mpmu, 0x44).with_sel(0x14),
                ddn: DdnControl {
                    info: DdnInfo {
                        factor: 2,
                        num_mask: 0x1fff,
                        num_shift: 16,
                        den_mask: 0x1fff,
                        den_shift: 0,
                    },
                    table: vec![(125, 24), (125, 48)],
                },
                gate: Some(GateControl::new(1 << 1)),
            },
        )
        .parent("pll1_d8")
        .flags(ClkFlags::NONE.ignore_unused()),
        ClockDesc::factor(PLL2_D2, "pll2_d2", "pll2", 1, 2).flags(ClkFlags::NONE.set_rate_parent()),
    ]
}

fn build_with(framework: MockFramework, table: Vec<ClockDesc>) -> Result<TestRegistry, Error> {
    trace_init();
    let sim = SimRegisters::for_table(&table, &map()).recording();
    ClockRegistry::build_with(Cru::new(sim), framework, &map(), table)
}

fn registered() -> TestRegistry {
    let mut registry = build_with(MockFramework::default(), table()).unwrap();
    registry.register_all().unwrap();
    registry
}

fn peek(registry: &TestRegistry, addr: usize) -> u32 {
    registry.cru().with_io(|io| io.peek(addr))
}

fn poke(registry: &TestRegistry, addr: usize, value: u32) {
    registry.cru().with_io(|io| io.poke(addr, value))
}

#[test]
fn build_touches_no_registers() {
    let mut registry = build_with(MockFramework::default(), table()).unwrap();
    registry.register_all().unwrap();
    assert!(registry.cru().with_io(|io| io.accesses().is_empty()));
    assert!(registry.descs().all(|desc| registry.state(desc.id) == Some(NodeState::Registered)));
}

#[test]
fn two_node_cycle_is_rejected() {
    let table = vec![
        ClockDesc::factor(ClockId(0), "a", "b", 1, 1),
        ClockDesc::factor(ClockId(1), "b", "a", 1, 1),
    ];
    let err = build_with(MockFramework::default(), table).err().unwrap();
    assert_eq!(
        err,
        Error::CyclicGraph {
            path: vec!["a".into(), "b".into(), "a".into()]
        }
    );
}

#[test]
fn self_parent_is_a_cycle() {
    let mut table = table();
    table.push(ClockDesc::factor(ClockId(10), "loop", "loop", 1, 1));
    let err = build_with(MockFramework::default(), table).err().unwrap();
    assert_eq!(
        err,
        Error::CyclicGraph {
            path: vec!["loop".into(), "loop".into()]
        }
    );
}

#[test]
fn longer_cycle_behind_a_valid_prefix() {
    let table = vec![
        ClockDesc::fixed_rate(ClockId(0), "osc", 24_000_000),
        ClockDesc::factor(ClockId(1), "leaf", "x", 1, 1),
        ClockDesc::new(
            ClockId(2),
            "x",
            crate::node::NodeKind::Factor(crate::node::Factor::new(1, 1)),
        )
        .parents(&["osc", "y"]),
        ClockDesc::factor(ClockId(3), "y", "z", 1, 1),
        ClockDesc::factor(ClockId(4), "z", "x", 1, 1),
    ];
    let err = build_with(MockFramework::default(), table).err().unwrap();
    assert_eq!(
        err,
        Error::CyclicGraph {
            path: vec!["x".into(), "y".into(), "z".into(), "x".into()]
        }
    );
}

#[test]
fn table_validation() {
    let mut dup_name = table();
    dup_name.push(ClockDesc::fixed_rate(ClockId(10), "osc_24m", 1));
    assert_eq!(
        build_with(MockFramework::default(), dup_name).err(),
        Some(Error::DuplicateName("osc_24m".into()))
    );

    let mut dup_id = table();
    dup_id.push(ClockDesc::fixed_rate(OSC, "osc_26m", 26_000_000));
    assert_eq!(
        build_with(MockFramework::default(), dup_id).err(),
        Some(Error::DuplicateId(OSC))
    );

    let mut unknown = table();
    unknown.push(ClockDesc::factor(ClockId(10), "orphan", "nowhere", 1, 1));
    assert_eq!(
        build_with(MockFramework::default(), unknown).err(),
        Some(Error::UnknownParent {
            name: "orphan".into(),
            parent: "nowhere".into()
        })
    );

    let mut unmapped = table();
    unmapped.push(ClockDesc::mix(
        ClockId(10),
        "audio",
        Mix::new(Regs::new(Bank::AudioCtrl, 0x0)).gate(GateControl::new(1)),
    ));
    assert_eq!(
        build_with(MockFramework::default(), unmapped).err(),
        Some(Error::MissingBank {
            name: "audio".into(),
            bank: Bank::AudioCtrl
        })
    );
}

#[test]
fn node_invariants_are_checked_at_build() {
    let invalid = |desc: ClockDesc| {
        let mut clocks = table();
        clocks.push(desc);
        build_with(MockFramework::default(), clocks).err()
    };
    let reason = |name: &str, reason: &'static str| {
        Some(Error::InvalidTable {
            name: name.into(),
            reason,
        })
    };

    let no_entries = Ddn {
        regs: Regs::new(Bank::Mpmu, 0x10b0),
        ddn: DdnControl {
            info: DdnInfo {
                factor: 2,
                num_mask: 0x1fff,
                num_shift: 16,
                den_mask: 0x1fff,
                den_shift: 0,
            },
            table: vec![],
        },
        gate: None,
    };
    assert_eq!(
        invalid(ClockDesc::ddn(ClockId(10), "uart_ddn", no_entries.clone()).parent("pll1_d8")),
        reason("uart_ddn", "fractional divider table is empty")
    );

    let mut zero_num = no_entries;
    zero_num.ddn.table = vec![(0, 24)];
    assert_eq!(
        invalid(ClockDesc::ddn(ClockId(10), "uart_ddn", zero_num).parent("pll1_d8")),
        reason("uart_ddn", "fractional divider divides by zero")
    );

    assert_eq!(
        invalid(ClockDesc::factor(ClockId(10), "pll1_d0", "pll1_vco", 1, 0)),
        reason("pll1_d0", "fixed divisor is zero")
    );
    assert_eq!(
        invalid(
            ClockDesc::mix(
                ClockId(10),
                "apb",
                Mix::new(Regs::new(Bank::Apbc, 0x50)).div(DividerControl::fixed(1, 0)),
            )
            .parent("osc_24m")
        ),
        reason("apb", "fixed divisor is zero")
    );

    let no_rates = Pll::new(
        Regs::new(Bank::Apbs, 0x124),
        PllControl::new(Vec::<PllEntry>::new()),
        LockStatus {
            bank: Bank::Mpmu,
            offset: 0x0,
            bit: 1 << 29,
        },
    );
    assert_eq!(
        invalid(ClockDesc::pll(ClockId(10), "pll3", no_rates).parent("osc_24m")),
        reason("pll3", "PLL rate table is empty")
    );

    // a 1-bit mux cannot select among three parents
    assert_eq!(
        invalid(
            ClockDesc::mix(
                ClockId(10),
                "narrow",
                Mix::new(Regs::new(Bank::Apbc, 0x50)).mux(MuxControl::new(0, 1)),
            )
            .parents(&["osc_24m", "pll1_d4", "pll1_d8"])
        ),
        reason("narrow", "more parents than the mux field can select")
    );
    assert_eq!(
        invalid(
            ClockDesc::mix(
                ClockId(10),
                "narrow",
                Mix::new(Regs::new(Bank::Apbc, 0x50)).mux(MuxControl::new(0, 1).with_table([0, 2])),
            )
            .parents(&["osc_24m", "pll1_d4"])
        ),
        reason("narrow", "mux value does not fit the mux field")
    );
}

#[test]
fn sparse_ids_are_rejected() {
    let mut sparse = table();
    sparse.push(ClockDesc::fixed_rate(ClockId(u32::MAX), "far_away", 32_768));
    assert_eq!(
        build_with(MockFramework::default(), sparse).err(),
        Some(Error::IdOutOfRange {
            name: "far_away".into(),
            id: ClockId(u32::MAX),
            clocks: 11,
        })
    );

    // the next free id is fine
    let mut dense = table();
    dense.push(ClockDesc::fixed_rate(ClockId(10), "clk_32k", 32_768));
    assert!(build_with(MockFramework::default(), dense).is_ok());
}

#[test]
fn registration_is_all_or_nothing() {
    let mut registry = build_with(MockFramework::failing_on("uart0"), table()).unwrap();
    assert_eq!(
        registry.register_all(),
        Err(Error::RegistrationFailed {
            name: "uart0".into()
        })
    );

    let framework = registry.framework();
    assert_eq!(
        framework.registers().collect::<Vec<_>>(),
        ["osc_24m", "pll1_vco", "pll1_d4", "pll1_d8", "pll2", "uart0"]
    );
    assert_eq!(
        framework.unregisters().collect::<Vec<_>>(),
        [PLL2, PLL1_D8, PLL1_D4, PLL1_VCO, OSC]
    );
    assert!(framework.tree.is_empty());
    assert!(registry
        .descs()
        .all(|desc| registry.state(desc.id) == Some(NodeState::Unregistered)));
    assert_eq!(registry.lookup("osc_24m"), None);
}

#[test]
fn bring_up_tolerates_unknown_ids() {
    let mut registry = registered();
    let report = registry.enable_bring_up_set([
        ("osc_24m", OSC),
        ("bogus", ClockId(42)),
        ("twsi0", TWSI0),
        ("uart0", UART0),
    ]);

    assert_eq!(report.enabled, [OSC, TWSI0, UART0]);
    assert_eq!(report.diagnostics, [Error::UnknownBringUpId(ClockId(42))]);
    assert!(report.failed.is_empty());
    assert!(!report.is_clean());

    assert_eq!(peek(&registry, APBC + 0x2c), 0x3);
    assert_eq!(peek(&registry, APBC), 0x3);
    assert_eq!(registry.enable_count(OSC), Some(2));
    // uart0 runs from pll1_d8 (mux index 0), which holds the VCO
    assert_eq!(registry.enable_count(PLL1_D8), Some(1));
    assert_eq!(registry.enable_count(PLL1_VCO), Some(1));
    assert_eq!(registry.state(UART0), Some(NodeState::Enabled));
}

#[test]
fn gate_enable_is_idempotent_through_refcounts() {
    let mut registry = registered();
    poke(&registry, APBC + 0x2c, 0x40);

    registry.prepare_enable(TWSI0).unwrap();
    let once = peek(&registry, APBC + 0x2c);
    registry.prepare_enable(TWSI0).unwrap();
    assert_eq!(peek(&registry, APBC + 0x2c), once);
    assert_eq!(once, 0x43);
    assert!(registry.is_enabled(TWSI0).unwrap());

    registry.disable_unprepare(TWSI0).unwrap();
    assert!(registry.is_enabled(TWSI0).unwrap());
    registry.disable_unprepare(TWSI0).unwrap();
    assert_eq!(peek(&registry, APBC + 0x2c), 0x40);
    assert_eq!(registry.state(TWSI0), Some(NodeState::Disabled));
    assert_eq!(registry.enable_count(OSC), Some(0));

    // unbalanced disables are ignored
    registry.disable_unprepare(TWSI0).unwrap();
    assert_eq!(registry.enable_count(TWSI0), Some(0));
}

#[test]
fn ungated_nodes_are_always_enabled() {
    let registry = registered();
    for id in [OSC, PLL1_VCO, PLL1_D4, PLL2_D2] {
        assert!(registry.is_enabled(id).unwrap(), "{id}");
    }
}

#[test]
fn pll_rejects_unlisted_rate_without_writes() {
    let mut registry = registered();
    registry.cru().with_io(|io| io.clear_log());
    assert_eq!(
        registry.set_rate(PLL2, 2_500_000_000),
        Err(Error::UnsupportedRate {
            name: "pll2".into(),
            rate: 2_500_000_000
        })
    );
    assert_eq!(registry.cru().with_io(|io| io.writes().count()), 0);
    assert_eq!(registry.state(PLL2), Some(NodeState::Registered));
}

#[test]
fn pll_set_rate_locks() {
    let mut registry = registered();
    assert_eq!(registry.rate(PLL2), Ok(0));
    registry.set_rate(PLL2, 3_000_000_000).unwrap();
    assert_eq!(registry.rate(PLL2), Ok(3_000_000_000));
    assert_eq!(registry.state(PLL2), Some(NodeState::Registered));
    assert_eq!(peek(&registry, APBS + 0x100), 0x66);
}

#[test]
fn rates_follow_the_tree() {
    let mut registry = registered();
    assert_eq!(registry.rate(PLL1_D4), Ok(614_400_000));
    assert_eq!(registry.rate(UART0), Ok(307_200_000));

    assert_eq!(registry.round_rate(SDH0, 200_000_000), Ok(204_800_000));
    registry.set_rate(SDH0, 200_000_000).unwrap();
    assert_eq!(registry.rate(SDH0), Ok(204_800_000));
    // divider 3 and the FC bit, which the simulated hardware clears
    assert_eq!(peek(&registry, APMU + 0x54), 3 << 8);

    // from 307.2 MHz: 29.49 MHz and 58.98 MHz. Round-rate advertises the
    // upper entry, set-rate programs the one below it.
    assert_eq!(registry.round_rate(SLOW_UART, 50_000_000), Ok(58_980_000));
    registry.set_rate(SLOW_UART, 50_000_000).unwrap();
    assert_eq!(registry.rate(SLOW_UART), Ok(29_490_000));
    registry.set_rate(SLOW_UART, 70_000_000).unwrap();
    assert_eq!(registry.rate(SLOW_UART), Ok(58_980_000));
}

#[test]
fn rate_requests_forwarded_to_parent() {
    let mut registry = registered();
    assert_eq!(registry.round_rate(PLL2_D2, 1_400_000_000), Ok(1_500_000_000));
    registry.set_rate(PLL2_D2, 1_228_800_000).unwrap();
    assert_eq!(registry.rate(PLL2), Ok(2_457_600_000));
    assert_eq!(registry.rate(PLL2_D2), Ok(1_228_800_000));
}

#[test]
fn gated_changes_are_refused_while_enabled() {
    let mut registry = registered();
    registry.prepare_enable(SDH0).unwrap();
    assert_eq!(
        registry.set_rate(SDH0, 100_000_000),
        Err(Error::Busy { name: "sdh0".into() })
    );
    assert_eq!(
        registry.set_parent(SDH0, "pll1_d8"),
        Err(Error::Busy { name: "sdh0".into() })
    );
    registry.disable_unprepare(SDH0).unwrap();
    registry.set_parent(SDH0, "pll1_d8").unwrap();
    assert_eq!(registry.parent(SDH0), Ok(Some(PLL1_D8)));
}

#[test]
fn reparenting_moves_the_enable_reference() {
    let mut registry = registered();
    registry.prepare_enable(UART0).unwrap();
    assert_eq!(registry.parent(UART0), Ok(Some(PLL1_D8)));

    registry.set_parent(UART0, "osc_24m").unwrap();
    assert_eq!(registry.parent(UART0), Ok(Some(OSC)));
    assert_eq!(registry.rate(UART0), Ok(24_000_000));
    assert_eq!(registry.enable_count(OSC), Some(1));
    assert_eq!(registry.enable_count(PLL1_D8), Some(0));
    assert_eq!(registry.state(PLL1_D8), Some(NodeState::Disabled));

    assert_eq!(
        registry.set_parent(UART0, "pll2"),
        Err(Error::UnknownParent {
            name: "uart0".into(),
            parent: "pll2".into()
        })
    );
}

#[test]
fn unused_clocks_are_gated_off() {
    let mut registry = registered();
    // left running by the boot loader
    poke(&registry, APBC + 0x2c, 0x3);
    poke(&registry, MPMU + 0x14, 1 << 1);
    registry.prepare_enable(UART0).unwrap();

    assert_eq!(registry.disable_unused(), [TWSI0]);
    assert_eq!(peek(&registry, APBC + 0x2c), 0);
    // ignore-unused
    assert_eq!(peek(&registry, MPMU + 0x14), 1 << 1);
    // referenced
    assert_eq!(peek(&registry, APBC), 0x3);
}

#[test]
fn unregister_all_in_reverse() {
    let mut registry = registered();
    registry.prepare_enable(TWSI0).unwrap();
    registry.unregister_all();

    let unregisters: Vec<ClockId> = registry.framework().unregisters().collect();
    let mut expected: Vec<ClockId> = registry.descs().map(|d| d.id).collect();
    expected.reverse();
    assert_eq!(unregisters, expected);
    assert_eq!(peek(&registry, APBC + 0x2c), 0);
    assert_eq!(registry.rate(OSC), Err(Error::NotRegistered(OSC)));
}

#[test]
fn summary_lists_the_tree() {
    let mut registry = registered();
    registry.prepare_enable(UART0).unwrap();
    let summary = registry.summary();

    assert_eq!(summary.rows.len(), 10);
    assert_eq!(summary.rows[0].name, "osc_24m");
    let row = |name: &str| summary.rows.iter().find(|r| r.name == name).unwrap();
    assert_eq!(row("pll1_d4").depth, 1);
    assert_eq!(row("sdh0").depth, 2);
    assert_eq!(row("uart0").rate, Some(307_200_000));
    assert_eq!(row("uart0").enable_count, 1);
    assert!(row("uart0").enabled);

    let text = summary.to_string();
    assert!(text.contains("pll1_d8"));
    assert!(text.lines().count() > 10);
}
