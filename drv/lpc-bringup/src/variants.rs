// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Register tables for the supported parts.
//!
//! Addresses are from the respective NXP user manuals: UM10398 (111x),
//! UM10462 (11Uxx), UM10736 (15xx), UM10360 (17xx) and UM10211 (23xx).
//!
//! Every UART here ends up on a 12 MHz clock. The parts that start on the
//! 12 MHz IRC just need their dividers set to 1; the 17xx and 23xx start on
//! a 4 MHz IRC and need PLL0 to get there. The 17xx runs its CCO at
//! 2 * 69 * 4 MHz / 2 = 276 MHz and divides by 23. The 23xx can't divide by
//! an odd number, so it runs at 2 * 36 * 4 MHz / 1 = 288 MHz and divides by
//! 24.

use static_assertions::const_assert;

use crate::{Fractional, PclkSel, Pll, Remap, Uart, UartClock, Variant};

pub const LPC111X: Variant = Variant {
    name: "lpc111x",
    remap: Remap {
        register: 0x4004_8000, // SYSMEMREMAP
        boot: 0,
        normal: 2,
    },
    clock: UartClock::Divided {
        source_hz: 12_000_000,
        ahb_div: 0x4004_8078,
        uart_div: 0x4004_8098,
    },
    uart: Uart::Ns16550 {
        base: 0x4000_8000,
        fractional: Fractional::Disabled,
    },
    // 12 MHz / 16 / 1
    baud: 750_000,
};

/// Same SYSCON and UART layout as the 111x, but this part's stub runs the
/// UART through a fixed 13/(13 + 3) fractional ratio with a divisor of 3.
/// That's a deliberate choice for this part and not something to fold into
/// the integer-divisor path.
pub const LPC11UXX: Variant = Variant {
    name: "lpc11uxx",
    remap: Remap {
        register: 0x4004_8000, // SYSMEMREMAP
        boot: 0,
        normal: 2,
    },
    clock: UartClock::Divided {
        source_hz: 12_000_000,
        ahb_div: 0x4004_8078,
        uart_div: 0x4004_8098,
    },
    uart: Uart::Ns16550 {
        base: 0x4000_8000,
        fractional: Fractional::Fixed {
            mulval: 13,
            divaddval: 3,
            divisor: 3,
        },
    },
    // 12 MHz / (16 * 3 * (1 + 3/13))
    baud: 203_125,
};

pub const LPC15XX: Variant = Variant {
    name: "lpc15xx",
    remap: Remap {
        register: 0x4007_4000, // SYSMEMREMAP
        boot: 0,
        normal: 2,
    },
    clock: UartClock::Divided {
        source_hz: 12_000_000,
        ahb_div: 0x4007_40C0,
        uart_div: 0x4007_40D0,
    },
    uart: Uart::Usart {
        base: 0x4004_0000,
        frg_control: 0x4007_4128,
    },
    baud: 750_000,
};

// TODO: the 17xx PLL0 settings below have only been exercised against the
// register model; confirm lock time and the resulting 750 kbaud on a board.
pub const LPC17XX: Variant = Variant {
    name: "lpc17xx",
    remap: Remap {
        register: 0x400F_C040, // MEMMAP
        boot: 0,
        normal: 1,
    },
    clock: UartClock::Pll {
        pll: Pll {
            control: 0x400F_C080,
            config: 0x400F_C084,
            status: 0x400F_C088,
            // PLL0FEED is the word after PLL0STAT, not PLL0STAT itself.
            feed: 0x400F_C08C,
            core_div: Some(0x400F_C104), // CCLKCFG
            enable: 1 << 0,
            connect: 1 << 1,
            lock: 1 << 26,
            nsel_shift: 16,
            source_hz: 4_000_000,
            multiplier: 69,
            divider: 2,
            core_divider: 23,
            even_core_divider: false,
        },
        pclksel: PclkSel {
            register: 0x400F_C1A8, // PCLKSEL0
            shift: 6,
        },
    },
    uart: Uart::Ns16550 {
        base: 0x4000_C000,
        fractional: Fractional::Disabled,
    },
    baud: 750_000,
};

/// The ARM7 ancestor of the 17xx: same PLL0 and UART0, moved to the
/// 0xE000_0000 peripheral space, with a stricter CCLKCFG.
pub const LPC23XX: Variant = Variant {
    name: "lpc23xx",
    remap: Remap {
        register: 0xE01F_C040, // MEMMAP
        boot: 0,
        normal: 1,
    },
    clock: UartClock::Pll {
        pll: Pll {
            control: 0xE01F_C080,
            config: 0xE01F_C084,
            status: 0xE01F_C088,
            feed: 0xE01F_C08C,
            core_div: Some(0xE01F_C104), // CCLKCFG
            enable: 1 << 0,
            connect: 1 << 1,
            lock: 1 << 26,
            nsel_shift: 16,
            source_hz: 4_000_000,
            multiplier: 36,
            divider: 1,
            // CCLKCFG = 23; UM10211 only allows 0 and odd values.
            core_divider: 24,
            even_core_divider: true,
        },
        pclksel: PclkSel {
            register: 0xE01F_C1A8, // PCLKSEL0
            shift: 6,
        },
    },
    uart: Uart::Ns16550 {
        base: 0xE000_C000,
        fractional: Fractional::Disabled,
    },
    baud: 750_000,
};

pub const ALL: [&Variant; 5] =
    [&LPC111X, &LPC11UXX, &LPC15XX, &LPC17XX, &LPC23XX];

const_assert!(LPC111X.check().is_ok());
const_assert!(LPC11UXX.check().is_ok());
const_assert!(LPC15XX.check().is_ok());
const_assert!(LPC17XX.check().is_ok());
const_assert!(LPC23XX.check().is_ok());
