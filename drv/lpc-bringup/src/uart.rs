// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! UART0 reconfiguration.
//!
//! Two register layouts show up across the supported parts:
//!
//! - The 16550-alike on the 111x, 11Uxx, 17xx and 23xx, with the baud
//!   divisor hidden behind LCR.DLAB and a fractional divider in FDR.
//! - The LPC15xx USART, which has a plain BRG register, a separate CFG
//!   register for framing, and a fractional generator that lives in SYSCON
//!   rather than in the UART.
//!
//! Both get the same treatment: wait for the transmitter to go idle, give
//! the UART the fastest clock we can, take the fractional generator out of
//! the picture, and program the integer divisor for `clock / 16 / baud`.

use bitflags::bitflags;
use regbus::RegisterBus;
use ringbuf::ringbuf_entry_root;

use crate::pll::{self, PclkSel, Pll};
use crate::{Bringup, Trace};

// Offsets into the 16550-alike block.
const RBR_THR_DLL: u32 = 0x00;
const DLM: u32 = 0x04;
const FCR: u32 = 0x08;
const LCR: u32 = 0x0C;
const LSR: u32 = 0x14;
const FDR: u32 = 0x28;

// Offsets into the LPC15xx USART block.
const CFG: u32 = 0x00;
const STAT: u32 = 0x08;
const BRG: u32 = 0x20;

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Lcr: u32 {
        /// Divisor latch access. While set, offsets 0 and 4 are DLL and DLM
        /// rather than RBR/THR and IER.
        const DLAB = 1 << 7;
        const _ = !0;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Lsr: u32 {
        /// Transmitter empty: THR and the shift register are both idle.
        const TEMT = 1 << 6;
        const _ = !0;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct Fcr: u32 {
        const FIFO_ENABLE = 1 << 0;
        const RX_RESET = 1 << 1;
        const TX_RESET = 1 << 2;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct UsartCfg: u32 {
        const ENABLE = 1 << 0;
        /// DATALEN = 1, i.e. 8 data bits. Parity and stop bits are zero,
        /// giving 8N1.
        const DATALEN_8 = 1 << 2;
    }
}

bitflags! {
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct UsartStat: u32 {
        const TXIDLE = 1 << 3;
        const _ = !0;
    }
}

/// FDR with MULVAL = 1, DIVADDVAL = 0: the fractional divider passes the
/// clock straight through.
pub const FDR_IDENTITY: u32 = 1 << 4;

/// FRGCTRL with DIV = 0xFF and MULT = 0: the 15xx fractional generator's
/// bypass setting.
pub const FRGCTRL_IDENTITY: u32 = 0xFF;

/// FCR value that enables both FIFOs and flushes them.
pub const FCR_RESET_FIFOS: Fcr = Fcr::FIFO_ENABLE
    .union(Fcr::RX_RESET)
    .union(Fcr::TX_RESET);

/// What the fractional baud-rate generator does on a 16550-alike.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Fractional {
    /// Identity ratio; the divisor is computed from the clock and the
    /// target baud rate.
    Disabled,
    /// A fixed `1 + divaddval / mulval` ratio paired with a fixed divisor.
    /// Used where the target rate was tuned by hand and can't be reached
    /// with an integer divisor alone.
    Fixed {
        mulval: u8,
        divaddval: u8,
        divisor: u16,
    },
}

impl Fractional {
    pub const fn fdr(&self) -> u32 {
        match *self {
            Fractional::Disabled => FDR_IDENTITY,
            Fractional::Fixed {
                mulval, divaddval, ..
            } => ((mulval as u32) << 4) | divaddval as u32,
        }
    }
}

/// Register layout of the UART being brought up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Uart {
    Ns16550 { base: u32, fractional: Fractional },
    Usart { base: u32, frg_control: u32 },
}

impl Uart {
    /// Status register, and the bits in it that mean "nothing in flight".
    pub const fn tx_idle(&self) -> (u32, u32) {
        match *self {
            Uart::Ns16550 { base, .. } => (base + LSR, Lsr::TEMT.bits()),
            Uart::Usart { base, .. } => {
                (base + STAT, UsartStat::TXIDLE.bits())
            }
        }
    }
}

/// Where the UART's clock comes from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UartClock {
    /// Main clock through SYSAHBCLKDIV and UARTCLKDIV, which we set to 1:1.
    Divided {
        source_hz: u32,
        ahb_div: u32,
        uart_div: u32,
    },
    /// Main clock from a PLL we have to bring up ourselves, then through a
    /// shared PCLKSEL field.
    Pll { pll: Pll, pclksel: PclkSel },
}

impl UartClock {
    /// UART input clock once bring-up is done.
    pub const fn uart_hz(&self) -> u32 {
        match self {
            UartClock::Divided { source_hz, .. } => *source_hz,
            UartClock::Pll { pll, .. } => pll.output_hz(),
        }
    }
}

impl<B: RegisterBus> Bringup<'_, B> {
    /// Brings UART0 up at the fastest rate the part's configuration allows.
    ///
    /// On PLL parts this also brings up the PLL, since the UART clock can't
    /// be known until it's locked. Spins, without a timeout, until the
    /// transmitter is idle before touching anything.
    pub fn max_baud(&mut self) {
        let variant = self.variant;

        let (status, idle) = variant.uart.tx_idle();
        let polls = self.bus.spin_until_set(status, idle);
        ringbuf_entry_root!(Trace::UartIdle { polls });

        let uart_hz = match &variant.clock {
            UartClock::Divided {
                source_hz,
                ahb_div,
                uart_div,
            } => {
                self.bus.write(*ahb_div, 1);
                self.bus.write(*uart_div, 1);
                *source_hz
            }
            UartClock::Pll { pll, pclksel } => {
                // The settings are the table's own, which `Bringup::new`
                // has already checked.
                let locked = pll::bring_up_checked(
                    &mut self.bus,
                    pll,
                    pll.multiplier,
                    pll.divider,
                );
                pclksel.select_full_speed(&mut self.bus);
                locked.core_hz
            }
        };

        let divisor = variant.divisor_at(uart_hz);
        ringbuf_entry_root!(Trace::Divisor(divisor));

        match variant.uart {
            Uart::Ns16550 { base, fractional } => {
                self.bus.write(base + FDR, fractional.fdr());

                self.bus.modify(base + LCR, |v| v | Lcr::DLAB.bits());
                self.bus.write(base + DLM, divisor >> 8);
                self.bus.write(base + RBR_THR_DLL, divisor & 0xFF);
                self.bus.modify(base + LCR, |v| v & !Lcr::DLAB.bits());

                self.bus.write(base + FCR, FCR_RESET_FIFOS.bits());
            }
            Uart::Usart { base, frg_control } => {
                // CFG.ENABLE has to be clear while BRG changes.
                self.bus.write(base + CFG, 0);
                self.bus.write(frg_control, FRGCTRL_IDENTITY);
                self.bus.write(base + BRG, divisor - 1);
                let cfg = UsartCfg::ENABLE | UsartCfg::DATALEN_8;
                self.bus.write(base + CFG, cfg.bits());
            }
        }

        ringbuf_entry_root!(Trace::Done);
    }
}
