use alloc::{vec, vec::Vec};

use ccu::{
    node::{
        Ddn, DdnControl, DdnInfo, DividerControl, GateControl, LockStatus, Mix, MuxControl, Pll,
        PllControl, PllEntry, Regs,
    },
    regs::Field,
    Bank, ClkFlags, ClockDesc, ClockId,
};

use crate::{ids::*, regs::*};

/// Peripheral clocks in APBC: functional and bus clock enables in bits 0-1.
const APBC_GATE: GateControl = GateControl::new(0x3);
/// Standard SDH/QSPI-style APMU gate: AXI and functional clock enables.
const APMU_GATE: GateControl = GateControl::new(0x12);

const UART_PARENTS: &[&str] = &["pll1_m3d128_57p6", "slow_uart1_14p74", "slow_uart2_48"];
const TWSI_PARENTS: &[&str] = &["pll1_d48_51p2", "pll1_d96_25p6"];
const SDH_PARENTS: &[&str] = &["pll1_d6_409p6", "pll1_d4_614p4", "pll2_d3", "pll1_d3_819p2"];

const PLL2_RATES: [PllEntry; 4] = [
    PllEntry::new(2_400_000_000, 0x0050_dd64, 0x3f, 0x0000_0000),
    PllEntry::new(2_800_000_000, 0x0050_dd66, 0x4b, 0x1555_5500),
    PllEntry::new(3_000_000_000, 0x0050_dd66, 0x51, 0x0000_0000),
    PllEntry::new(3_200_000_000, 0x0067_dd68, 0x56, 0x2aaa_aa00),
];

const PLL3_RATES: [PllEntry; 5] = [
    PllEntry::new(1_600_000_000, 0x0050_cd61, 0x43, 0x0000_0000),
    PllEntry::new(1_800_000_000, 0x0050_cd61, 0x4b, 0x0000_0000),
    PllEntry::new(2_000_000_000, 0x0050_dd62, 0x53, 0x2aaa_aa00),
    PllEntry::new(2_200_000_000, 0x0050_dd62, 0x5b, 0x1555_5500),
    PllEntry::new(2_400_000_000, 0x0050_dd64, 0x64, 0x0000_0000),
];

const PLL_MASKS: [u32; 3] = [0x00ff_ffff, 0x0000_00ff, 0x3fff_ffff];

/// `num` in bits 16-28, `den` in bits 0-12.
const UART_DDN: DdnInfo = DdnInfo {
    factor: 2,
    num_mask: 0x1fff,
    num_shift: 16,
    den_mask: 0x1fff,
    den_shift: 0,
};

const I2S_DDN: DdnInfo = DdnInfo {
    factor: 2,
    num_mask: 0xfff,
    num_shift: 15,
    den_mask: 0x7fff,
    den_shift: 0,
};

/// A PLL1 output divided down from the VCO and gated in the APBS spare
/// register.
fn pll1_output(id: ClockId, name: &str, div: u32, gate_bit: u32) -> ClockDesc {
    ClockDesc::mix(
        id,
        name,
        Mix::new(Regs::new(Bank::Apbs, apbs::PLL1_SWCR2))
            .gate(GateControl::new(1 << gate_bit))
            .div(DividerControl::fixed(1, div)),
    )
    .parent("pll1_2457p6_vco")
}

fn pll(id: ClockId, name: &str, swcr: [u32; 3], table: &[PllEntry], lock_bit: u32) -> ClockDesc {
    ClockDesc::pll(
        id,
        name,
        Pll::new(
            Regs::new(Bank::Apbs, swcr[0]).with_sel(swcr[1]).with_xtc(swcr[2]),
            PllControl::new(table).with_masks(PLL_MASKS),
            LockStatus {
                bank: Bank::Mpmu,
                offset: mpmu::POSR,
                bit: lock_bit,
            },
        ),
    )
    .parent("vctcxo_24m")
}

fn slow_uart(id: ClockId, name: &str, ctrl: u32, gate_bit: u32, entry: (u32, u32)) -> ClockDesc {
    ClockDesc::ddn(
        id,
        name,
        Ddn {
            regs: Regs::new(Bank::Mpmu, ctrl).with_sel(mpmu::ACGR),
            ddn: DdnControl {
                info: UART_DDN,
                table: vec![entry],
            },
            gate: Some(GateControl::new(1 << gate_bit)),
        },
    )
    .parent("pll1_d16_153p6")
}

fn apbc_gate(id: ClockId, name: &str, offset: u32, parent: &str) -> ClockDesc {
    ClockDesc::mix(id, name, Mix::new(Regs::new(Bank::Apbc, offset)).gate(APBC_GATE)).parent(parent)
}

fn apbc_mux_gate(id: ClockId, name: &str, bank: Bank, offset: u32, parents: &[&str]) -> ClockDesc {
    ClockDesc::mix(
        id,
        name,
        Mix::new(Regs::new(bank, offset))
            .gate(APBC_GATE)
            .mux(MuxControl::new(4, 3)),
    )
    .parents(parents)
}

fn sdh(id: ClockId, name: &str, offset: u32) -> ClockDesc {
    ClockDesc::mix(
        id,
        name,
        Mix::new(Regs::new(Bank::Apmu, offset).with_fc(1 << 11))
            .gate(APMU_GATE)
            .div(DividerControl::register(8, 3))
            .mux(MuxControl::new(5, 3)),
    )
    .parents(SDH_PARENTS)
}

fn apmu_gate(id: ClockId, name: &str, offset: u32, mask: u32, parent: &str) -> ClockDesc {
    ClockDesc::mix(
        id,
        name,
        Mix::new(Regs::new(Bank::Apmu, offset)).gate(GateControl::new(mask)),
    )
    .parent(parent)
}

/// The K1x clock table, in id order.
pub fn table() -> Vec<ClockDesc> {
    vec![
        ClockDesc::fixed_rate(VCTCXO_24M, "vctcxo_24m", 24_000_000),
        ClockDesc::fixed_rate(VCTCXO_3M, "vctcxo_3m", 3_000_000),
        ClockDesc::fixed_rate(VCTCXO_1M, "vctcxo_1m", 1_000_000),
        ClockDesc::fixed_rate(CLK_32K, "clk_32k", 32_768),
        ClockDesc::fixed_rate(PLL1_2457P6_VCO, "pll1_2457p6_vco", 2_457_600_000),
        pll1_output(PLL1_D2_1228P8, "pll1_d2_1228p8", 2, 1),
        pll1_output(PLL1_D3_819P2, "pll1_d3_819p2", 3, 2),
        pll1_output(PLL1_D4_614P4, "pll1_d4_614p4", 4, 3),
        pll1_output(PLL1_D5_491P52, "pll1_d5_491p52", 5, 4),
        pll1_output(PLL1_D6_409P6, "pll1_d6_409p6", 6, 5),
        pll1_output(PLL1_D7_351P08, "pll1_d7_351p08", 7, 6),
        pll1_output(PLL1_D8_307P2, "pll1_d8_307p2", 8, 7),
        pll1_output(PLL1_D10_245P76, "pll1_d10_245p76", 10, 9),
        ClockDesc::factor(PLL1_D16_153P6, "pll1_d16_153p6", "pll1_2457p6_vco", 1, 16),
        ClockDesc::factor(PLL1_D48_51P2, "pll1_d48_51p2", "pll1_2457p6_vco", 1, 48),
        ClockDesc::factor(PLL1_D96_25P6, "pll1_d96_25p6", "pll1_2457p6_vco", 1, 96),
        ClockDesc::factor(PLL1_D192_12P8, "pll1_d192_12p8", "pll1_2457p6_vco", 1, 192),
        ClockDesc::factor(PLL1_M3D128_57P6, "pll1_m3d128_57p6", "pll1_2457p6_vco", 3, 128),
        // PLL2/PLL3
        pll(
            PLL2,
            "pll2",
            [apbs::PLL2_SWCR1, apbs::PLL2_SWCR2, apbs::PLL2_SWCR3],
            &PLL2_RATES,
            mpmu::POSR_PLL2_LOCK,
        ),
        pll(
            PLL3,
            "pll3",
            [apbs::PLL3_SWCR1, apbs::PLL3_SWCR2, apbs::PLL3_SWCR3],
            &PLL3_RATES,
            mpmu::POSR_PLL3_LOCK,
        ),
        ClockDesc::factor(PLL2_D2, "pll2_d2", "pll2", 1, 2).flags(ClkFlags::NONE.set_rate_parent()),
        ClockDesc::factor(PLL2_D3, "pll2_d3", "pll2", 1, 3),
        ClockDesc::factor(PLL3_D2, "pll3_d2", "pll3", 1, 2).flags(ClkFlags::NONE.set_rate_parent()),
        ClockDesc::factor(PLL3_D3, "pll3_d3", "pll3", 1, 3),
        // MPMU
        slow_uart(SLOW_UART1_14P74, "slow_uart1_14p74", mpmu::SUCCR, 1, (125, 24)),
        slow_uart(SLOW_UART2_48, "slow_uart2_48", mpmu::SUCCR_1, 0, (125, 78)),
        ClockDesc::ddn(
            I2S_SYSCLK,
            "i2s_sysclk",
            Ddn {
                regs: Regs::new(Bank::Mpmu, mpmu::ISCCR).with_sel(mpmu::ISCCR),
                ddn: DdnControl {
                    info: I2S_DDN,
                    table: vec![(1500, 40), (1500, 80), (1500, 120), (1500, 240)],
                },
                gate: Some(GateControl::new(1 << 31)),
            },
        )
        .parent("pll1_d16_153p6"),
        ClockDesc::mix(
            WDT_CLK,
            "wdt_clk",
            Mix::new(Regs::new(Bank::Mpmu, mpmu::WDTPCR))
                .gate(GateControl::new(0x3))
                .mux(MuxControl::new(4, 2)),
        )
        .parents(&["pll1_d96_25p6", "clk_32k", "vctcxo_1m"]),
        ClockDesc::mix(
            RIPC_CLK,
            "ripc_clk",
            Mix::new(Regs::new(Bank::Mpmu, mpmu::RIPCCR)).gate(GateControl::new(0x3)),
        )
        .parent("vctcxo_24m"),
        ClockDesc::mix(
            APB_CLK,
            "apb_clk",
            Mix::new(Regs::new(Bank::Mpmu, mpmu::APBCSCR)).mux(MuxControl::new(0, 2)),
        )
        .parents(&["pll1_d96_25p6", "pll1_d48_51p2"])
        .flags(ClkFlags::NONE.ignore_unused()),
        // APBC
        apbc_mux_gate(UART0_CLK, "uart0_clk", Bank::Apbc, apbc::UART0, UART_PARENTS),
        apbc_mux_gate(UART2_CLK, "uart2_clk", Bank::Apbc, apbc::UART2, UART_PARENTS),
        apbc_mux_gate(UART3_CLK, "uart3_clk", Bank::Apbc, apbc::UART3, UART_PARENTS),
        apbc_gate(GPIO_CLK, "gpio_clk", apbc::GPIO, "vctcxo_24m"),
        apbc_mux_gate(PWM0_CLK, "pwm0_clk", Bank::Apbc, apbc::PWM0, &["pll1_d192_12p8", "clk_32k"]),
        apbc_mux_gate(TWSI0_CLK, "twsi0_clk", Bank::Apbc, apbc::TWSI0, TWSI_PARENTS),
        apbc_mux_gate(TWSI1_CLK, "twsi1_clk", Bank::Apbc, apbc::TWSI1, TWSI_PARENTS),
        apbc_mux_gate(
            TIMERS1_CLK,
            "timers1_clk",
            Bank::Apbc,
            apbc::TIMERS1,
            &["pll1_d192_12p8", "vctcxo_24m", "vctcxo_3m", "clk_32k"],
        ),
        ClockDesc::mix(
            RTC_CLK,
            "rtc_clk",
            Mix::new(Regs::new(Bank::Apbc, apbc::RTC)).gate(GateControl::new(0x83)),
        )
        .parent("clk_32k"),
        // APBC2
        apbc_mux_gate(TWSI8_CLK, "twsi8_clk", Bank::Apbc2, apbc2::TWSI8, TWSI_PARENTS),
        // APMU
        ClockDesc::mix(
            CCI550_CLK,
            "cci550_clk",
            Mix::new(Regs::new(Bank::Apmu, apmu::CCI550).with_fc(1 << 21))
                .div(DividerControl::register(8, 3))
                .mux(MuxControl::new(0, 2)),
        )
        .parents(&["pll1_d5_491p52", "pll1_d4_614p4", "pll1_d3_819p2", "pll2_d3"])
        .flags(ClkFlags::NONE.ignore_unused()),
        ClockDesc::mix(
            CPU_C0_CORE_CLK,
            "cpu_c0_core_clk",
            Mix::new(Regs::new(Bank::Apmu, apmu::CPU_C0).with_fc(1 << 12))
                .div(DividerControl::register(6, 3).zero_based())
                .mux(MuxControl::new(0, 3)),
        )
        .parents(&[
            "pll1_d4_614p4",
            "pll1_d3_819p2",
            "pll1_d6_409p6",
            "pll1_d5_491p52",
            "pll1_d2_1228p8",
            "pll3",
            "pll2_d3",
            "pll3_d2",
        ])
        .flags(ClkFlags::NONE.ignore_unused()),
        ClockDesc::mix(
            PMUA_ACLK,
            "pmua_aclk",
            Mix::new(Regs::new(Bank::Apmu, apmu::ACLK).with_fc(1 << 4))
                .div(DividerControl::register(1, 2))
                .mux(MuxControl::new(0, 1)),
        )
        .parents(&["pll1_d10_245p76", "pll1_d8_307p2"])
        .flags(ClkFlags::NONE.ignore_unused()),
        sdh(SDH0_CLK, "sdh0_clk", apmu::SDH0),
        sdh(SDH1_CLK, "sdh1_clk", apmu::SDH1),
        sdh(SDH2_CLK, "sdh2_clk", apmu::SDH2),
        apmu_gate(USB_AXI_CLK, "usb_axi_clk", apmu::USB, 1 << 1, "pmua_aclk"),
        ClockDesc::mix(
            QSPI_CLK,
            "qspi_clk",
            Mix::new(Regs::new(Bank::Apmu, apmu::QSPI).with_fc(1 << 9))
                .gate(GateControl::new(0x18))
                .div(DividerControl::register(12, 3))
                .mux(MuxControl::new(6, 3)),
        )
        .parents(&["pll1_d6_409p6", "pll2_d3", "pll1_d8_307p2", "pll1_d10_245p76"])
        .flags(ClkFlags::NONE.set_rate_gate().set_parent_gate()),
        apmu_gate(EMAC0_BUS_CLK, "emac0_bus_clk", apmu::EMAC0, 1 << 0, "pmua_aclk"),
        apmu_gate(EMAC0_PTP_CLK, "emac0_ptp_clk", apmu::EMAC0, 1 << 15, "pll1_d10_245p76"),
        ClockDesc::mix(
            DPU_PXCLK,
            "dpu_pxclk",
            Mix::new(
                Regs::new(Bank::Apmu, apmu::LCD_CLK_RES_CTRL1)
                    .with_sel(apmu::LCD_CLK_RES_CTRL2)
                    .with_fc(1 << 16),
            )
            .gate(APMU_GATE)
            .div(DividerControl::two_register(Field::new(17, 4), Field::new(0, 2)))
            .mux(MuxControl::new(21, 3)),
        )
        .parents(&[
            "pll1_d6_409p6",
            "pll1_d5_491p52",
            "pll1_d4_614p4",
            "pll1_d8_307p2",
            "pll2_d3",
        ]),
        ClockDesc::mix(
            GPU_CLK,
            "gpu_clk",
            Mix::new(Regs::new(Bank::Apmu, apmu::GPU).with_fc(1 << 15))
                .gate(GateControl::new(0xa))
                .div(DividerControl::register(12, 3))
                .mux(MuxControl::new(4, 3)),
        )
        .parents(&[
            "pll1_d4_614p4",
            "pll1_d5_491p52",
            "pll1_d3_819p2",
            "pll1_d6_409p6",
            "pll3_d2",
        ]),
        // audio controller
        ClockDesc::mix(
            AUDIO_SYSCLK,
            "audio_sysclk",
            Mix::new(Regs::new(Bank::AudioCtrl, audio::SYSCLK))
                .gate(GateControl::new(1 << 0))
                .div(DividerControl::register(8, 4).zero_based()),
        )
        .parent("i2s_sysclk"),
        // RCPU
        ClockDesc::mix(
            R_UART0_CLK,
            "r_uart0_clk",
            Mix::new(Regs::new(Bank::Rcpu, rcpu::UART0)).gate(APBC_GATE),
        )
        .parent("vctcxo_24m"),
    ]
}
