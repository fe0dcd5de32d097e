//! Register offsets within each bank.

pub mod mpmu {
    /// PLL lock status.
    pub const POSR: u32 = 0x0010;
    pub const POSR_PLL2_LOCK: u32 = 1 << 28;
    pub const POSR_PLL3_LOCK: u32 = 1 << 29;

    /// Slow UART1 fractional divider.
    pub const SUCCR: u32 = 0x0014;
    /// I2S system clock fractional divider and gate.
    pub const ISCCR: u32 = 0x0044;
    pub const WDTPCR: u32 = 0x0200;
    pub const RIPCCR: u32 = 0x0210;
    /// Gates for the fractional dividers.
    pub const ACGR: u32 = 0x1024;
    pub const APBCSCR: u32 = 0x1050;
    /// Slow UART2 fractional divider.
    pub const SUCCR_1: u32 = 0x10b0;
}

pub mod apbs {
    /// PLL1 output gates.
    pub const PLL1_SWCR2: u32 = 0x0104;
    pub const PLL2_SWCR1: u32 = 0x0118;
    pub const PLL2_SWCR2: u32 = 0x011c;
    pub const PLL2_SWCR3: u32 = 0x0120;
    pub const PLL3_SWCR1: u32 = 0x0124;
    pub const PLL3_SWCR2: u32 = 0x0128;
    pub const PLL3_SWCR3: u32 = 0x012c;
}

pub mod apbc {
    pub const UART0: u32 = 0x00;
    pub const UART2: u32 = 0x04;
    pub const GPIO: u32 = 0x08;
    pub const PWM0: u32 = 0x0c;
    pub const RTC: u32 = 0x28;
    pub const TWSI0: u32 = 0x2c;
    pub const TWSI1: u32 = 0x30;
    pub const TIMERS1: u32 = 0x34;
    pub const UART3: u32 = 0x70;
}

pub mod apbc2 {
    pub const TWSI8: u32 = 0x20;
}

pub mod apmu {
    pub const LCD_CLK_RES_CTRL1: u32 = 0x044;
    pub const LCD_CLK_RES_CTRL2: u32 = 0x04c;
    pub const SDH0: u32 = 0x054;
    pub const SDH1: u32 = 0x058;
    pub const USB: u32 = 0x05c;
    pub const QSPI: u32 = 0x060;
    pub const GPU: u32 = 0x0cc;
    pub const SDH2: u32 = 0x0e0;
    pub const CCI550: u32 = 0x0fc;
    pub const ACLK: u32 = 0x388;
    pub const CPU_C0: u32 = 0x38c;
    pub const EMAC0: u32 = 0x3e4;
}

pub mod audio {
    pub const SYSCLK: u32 = 0x00;
}

pub mod rcpu {
    pub const UART0: u32 = 0xd8;
}
