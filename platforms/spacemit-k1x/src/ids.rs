//! Public clock ids.
//!
//! Consumers (device descriptions, other drivers) refer to clocks by these
//! numbers, so they are a stable contract: ids are dense and are only ever
//! appended, never renumbered or reused.

use ccu::ClockId;

// oscillators
pub const VCTCXO_24M: ClockId = ClockId(0);
pub const VCTCXO_3M: ClockId = ClockId(1);
pub const VCTCXO_1M: ClockId = ClockId(2);
pub const CLK_32K: ClockId = ClockId(3);

// PLL1 fixed outputs
pub const PLL1_2457P6_VCO: ClockId = ClockId(4);
pub const PLL1_D2_1228P8: ClockId = ClockId(5);
pub const PLL1_D3_819P2: ClockId = ClockId(6);
pub const PLL1_D4_614P4: ClockId = ClockId(7);
pub const PLL1_D5_491P52: ClockId = ClockId(8);
pub const PLL1_D6_409P6: ClockId = ClockId(9);
pub const PLL1_D7_351P08: ClockId = ClockId(10);
pub const PLL1_D8_307P2: ClockId = ClockId(11);
pub const PLL1_D10_245P76: ClockId = ClockId(12);
pub const PLL1_D16_153P6: ClockId = ClockId(13);
pub const PLL1_D48_51P2: ClockId = ClockId(14);
pub const PLL1_D96_25P6: ClockId = ClockId(15);
pub const PLL1_D192_12P8: ClockId = ClockId(16);
pub const PLL1_M3D128_57P6: ClockId = ClockId(17);

// PLL2/PLL3
pub const PLL2: ClockId = ClockId(18);
pub const PLL3: ClockId = ClockId(19);
pub const PLL2_D2: ClockId = ClockId(20);
pub const PLL2_D3: ClockId = ClockId(21);
pub const PLL3_D2: ClockId = ClockId(22);
pub const PLL3_D3: ClockId = ClockId(23);

// MPMU
pub const SLOW_UART1_14P74: ClockId = ClockId(24);
pub const SLOW_UART2_48: ClockId = ClockId(25);
pub const I2S_SYSCLK: ClockId = ClockId(26);
pub const WDT_CLK: ClockId = ClockId(27);
pub const RIPC_CLK: ClockId = ClockId(28);
pub const APB_CLK: ClockId = ClockId(29);

// APBC
pub const UART0_CLK: ClockId = ClockId(30);
pub const UART2_CLK: ClockId = ClockId(31);
pub const UART3_CLK: ClockId = ClockId(32);
pub const GPIO_CLK: ClockId = ClockId(33);
pub const PWM0_CLK: ClockId = ClockId(34);
pub const TWSI0_CLK: ClockId = ClockId(35);
pub const TWSI1_CLK: ClockId = ClockId(36);
pub const TIMERS1_CLK: ClockId = ClockId(37);
pub const RTC_CLK: ClockId = ClockId(38);

// APBC2
pub const TWSI8_CLK: ClockId = ClockId(39);

// APMU
pub const CCI550_CLK: ClockId = ClockId(40);
pub const CPU_C0_CORE_CLK: ClockId = ClockId(41);
pub const PMUA_ACLK: ClockId = ClockId(42);
pub const SDH0_CLK: ClockId = ClockId(43);
pub const SDH1_CLK: ClockId = ClockId(44);
pub const SDH2_CLK: ClockId = ClockId(45);
pub const USB_AXI_CLK: ClockId = ClockId(46);
pub const QSPI_CLK: ClockId = ClockId(47);
pub const EMAC0_BUS_CLK: ClockId = ClockId(48);
pub const EMAC0_PTP_CLK: ClockId = ClockId(49);
pub const DPU_PXCLK: ClockId = ClockId(50);
pub const GPU_CLK: ClockId = ClockId(51);

// audio controller
pub const AUDIO_SYSCLK: ClockId = ClockId(52);

// RCPU
pub const R_UART0_CLK: ClockId = ClockId(53);

/// Number of ids allocated so far.
pub const CLK_MAX: u32 = 54;
