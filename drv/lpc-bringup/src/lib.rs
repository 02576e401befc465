// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Early hardware bring-up for the LPC debug stub.
//!
//! The stub calls in here exactly twice before it does anything else: once
//! to choose what's mapped at address zero, and once to get UART0 running as
//! fast as it will reliably go, so that the host can start talking to us
//! immediately after reset.
//!
//! The five supported parts differ in register addresses, in how the UART
//! gets its clock, and in whether a PLL has to be brought up first, but not
//! in the sequence itself. So the sequence is written once, in [`Bringup`],
//! and each part is a [`Variant`]: a table of addresses and constants. The
//! part an image is built for is picked with a cargo feature, and surfaces
//! as [`TARGET`].
//!
//! The only errors are configuration errors, reported before any register is
//! touched: a [`Variant`] that fails [`Variant::check`] is refused by
//! [`Bringup::new`], and PLL settings out of range are refused by
//! [`Bringup::bring_up_clock`]. Past that, every operation is either an
//! unconditional store or a spin on a status bit with no timeout; if the
//! hardware never becomes ready, we never return, which is preferable to
//! carrying on with a clock or a UART in an unknown state. A caller that
//! wants a watchdog can arm one first.

#![cfg_attr(not(test), no_std)]

mod pll;
mod remap;
mod uart;
pub mod variants;

#[cfg(any(
    feature = "lpc111x",
    feature = "lpc11uxx",
    feature = "lpc15xx",
    feature = "lpc17xx",
    feature = "lpc23xx",
))]
mod target;

#[cfg(test)]
mod testutil;

pub use pll::{bring_up_clock, Locked, PclkSel, Pll, FEED};
pub use remap::{MemoryMap, Remap};
pub use uart::{Fractional, Uart, UartClock};

#[cfg(any(
    feature = "lpc111x",
    feature = "lpc11uxx",
    feature = "lpc15xx",
    feature = "lpc17xx",
    feature = "lpc23xx",
))]
pub use target::{max_baud, select_memory_map, TARGET};

use regbus::RegisterBus;
use ringbuf::ringbuf;

#[derive(Copy, Clone, Debug, PartialEq)]
enum Trace {
    None,
    MemoryMap(MemoryMap),
    PllCommit { register: u32, value: u32 },
    PllLocked { polls: u32 },
    UartIdle { polls: u32 },
    Divisor(u32),
    Done,
}

#[cfg(not(test))]
const TRACE_DEPTH: usize = 16;
// Tests run in parallel and all record here; give them room so an entry
// survives until the test that made it looks for it.
#[cfg(test)]
const TRACE_DEPTH: usize = 1024;

ringbuf!(Trace, TRACE_DEPTH, Trace::None);

/// Reasons a variant table can't work. These are all caught at compile
/// time for the shipped variants; see [`variants`].
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// Boot and normal map encodings are the same value.
    RemapEncodingsEqual,
    /// The UART clock is too slow for the target baud rate.
    ZeroDivisor,
    /// The divisor doesn't fit in DLM:DLL (or BRG).
    DivisorOverflow,
    /// The divisor doesn't produce the target baud rate exactly.
    InexactBaud,
    /// The PLL feed register shares an address with another PLL register.
    FeedAliasesStatus,
    /// PLL multiplier, divider or CCO frequency is outside what the part
    /// supports.
    PllOutOfRange,
    /// The CPU clock divider is odd (and not 1) on a part whose CCLKCFG
    /// only takes odd values.
    OddCoreDivider,
}

/// Everything that distinguishes one part from another.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    pub name: &'static str,
    pub remap: Remap,
    pub clock: UartClock,
    pub uart: Uart,
    /// Target baud rate. For a [`Fractional::Fixed`] UART this is the rate
    /// the fixed settings produce, rather than an input to them.
    pub baud: u32,
}

impl Variant {
    /// UART input clock once bring-up is done.
    pub const fn uart_clock_hz(&self) -> u32 {
        self.clock.uart_hz()
    }

    /// Integer baud divisor for a UART clock of `uart_hz`.
    pub const fn divisor_at(&self, uart_hz: u32) -> u32 {
        match self.uart {
            Uart::Ns16550 {
                fractional: Fractional::Fixed { divisor, .. },
                ..
            } => divisor as u32,
            _ => uart_hz / 16 / self.baud,
        }
    }

    pub const fn divisor(&self) -> u32 {
        self.divisor_at(self.uart_clock_hz())
    }

    const fn baud_is_exact(&self) -> bool {
        let hz = self.uart_clock_hz() as u64;
        let divisor = self.divisor() as u64;
        let baud = self.baud as u64;
        match self.uart {
            Uart::Ns16550 {
                fractional:
                    Fractional::Fixed {
                        mulval, divaddval, ..
                    },
                ..
            } => {
                // baud = hz / (16 * divisor * (1 + divaddval / mulval))
                hz * mulval as u64
                    == baud * 16 * divisor * (mulval as u64 + divaddval as u64)
            }
            _ => hz == baud * 16 * divisor,
        }
    }

    pub const fn check(&self) -> Result<(), ConfigError> {
        if self.remap.boot == self.remap.normal {
            return Err(ConfigError::RemapEncodingsEqual);
        }
        if let UartClock::Pll { pll, .. } = &self.clock {
            if let Err(e) = pll.check() {
                return Err(e);
            }
        }
        if self.baud == 0 {
            return Err(ConfigError::ZeroDivisor);
        }
        let divisor = self.divisor();
        if divisor == 0 {
            return Err(ConfigError::ZeroDivisor);
        }
        if divisor > u16::MAX as u32 {
            return Err(ConfigError::DivisorOverflow);
        }
        if !self.baud_is_exact() {
            return Err(ConfigError::InexactBaud);
        }
        Ok(())
    }
}

/// The bring-up sequence for one part, over some register bus.
///
/// On hardware the bus is a [`regbus::Mmio`]; the top-level [`max_baud`] and
/// [`select_memory_map`] functions set that up for [`TARGET`].
pub struct Bringup<'a, B> {
    variant: &'a Variant,
    bus: B,
}

impl<'a, B: RegisterBus> Bringup<'a, B> {
    /// Pairs `variant` with `bus`, refusing a table that fails
    /// [`Variant::check`]. The bus is not touched either way.
    pub fn new(variant: &'a Variant, bus: B) -> Result<Self, ConfigError> {
        variant.check()?;
        Ok(Self { variant, bus })
    }

    pub fn variant(&self) -> &'a Variant {
        self.variant
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn into_bus(self) -> B {
        self.bus
    }

    /// Brings up this part's PLL at `multiplier`/`divider`, or returns
    /// `Ok(None)` without touching anything if the part doesn't need one.
    /// Settings the PLL can't run at are refused up front, also without
    /// touching anything.
    ///
    /// [`Bringup::max_baud`] already does this with the variant's own
    /// settings; this is for callers that want a different clock.
    pub fn bring_up_clock(
        &mut self,
        multiplier: u16,
        divider: u8,
    ) -> Result<Option<Locked>, ConfigError> {
        match &self.variant.clock {
            UartClock::Pll { pll, .. } => {
                pll::bring_up_clock(&mut self.bus, pll, multiplier, divider)
                    .map(Some)
            }
            UartClock::Divided { .. } => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{model_for, pll_hardware, uart_idle_after};
    use regbus::model::RegisterModel;

    #[test]
    fn divider_parts_have_no_clock_to_bring_up() {
        for v in [&variants::LPC111X, &variants::LPC11UXX, &variants::LPC15XX]
        {
            let mut b = Bringup::new(v, model_for(v)).unwrap();
            assert_eq!(b.bring_up_clock(69, 2), Ok(None), "{}", v.name);
            assert!(b.bus().log().is_empty(), "{}", v.name);
        }
    }

    #[test]
    fn pll_parts_report_the_clock_they_locked_at() {
        let v = &variants::LPC23XX;
        let mut b = Bringup::new(v, model_for(v)).unwrap();
        let locked = b.bring_up_clock(36, 1).unwrap().unwrap();
        assert_eq!(locked.core_hz, 12_000_000);
        assert_eq!(locked.polls, 3);
    }

    #[test]
    fn pll_parts_refuse_settings_they_cant_run_at() {
        for v in [&variants::LPC17XX, &variants::LPC23XX] {
            let mut b = Bringup::new(v, model_for(v)).unwrap();
            assert_eq!(
                b.bring_up_clock(69, 0),
                Err(ConfigError::PllOutOfRange),
                "{}",
                v.name
            );
            assert_eq!(
                b.bring_up_clock(0, 2),
                Err(ConfigError::PllOutOfRange),
                "{}",
                v.name
            );
            assert!(b.bus().log().is_empty(), "{}", v.name);
        }
    }

    #[test]
    fn boot_then_baud_end_to_end() {
        for v in variants::ALL {
            let mut m = model_for(v);

            Bringup::new(v, &mut m).unwrap().select_normal_map();
            assert_eq!(m.peek(v.remap.register), v.remap.normal, "{}", v.name);
            assert_eq!(m.writes_to(v.remap.register).len(), 1, "{}", v.name);

            // Bringing up the UART leaves the memory map alone.
            m.clear_log();
            Bringup::new(v, &mut m).unwrap().max_baud();
            assert!(m.writes_to(v.remap.register).is_empty(), "{}", v.name);
            assert_eq!(m.peek(v.remap.register), v.remap.normal, "{}", v.name);
        }
    }

    #[test]
    fn unchecked_tables_are_refused_before_any_access() {
        let mut m = RegisterModel::new();

        let mut v = variants::LPC15XX;
        v.baud = 1_000_000;
        assert_eq!(
            Bringup::new(&v, &mut m).err(),
            Some(ConfigError::ZeroDivisor)
        );

        let mut v = variants::LPC111X;
        v.baud = 0;
        assert_eq!(
            Bringup::new(&v, &mut m).err(),
            Some(ConfigError::ZeroDivisor)
        );

        let mut v = variants::LPC23XX;
        if let UartClock::Pll { pll, .. } = &mut v.clock {
            pll.divider = 0;
        }
        assert_eq!(
            Bringup::new(&v, &mut m).err(),
            Some(ConfigError::PllOutOfRange)
        );

        assert!(m.log().is_empty());
    }

    #[test]
    fn max_baud_leaves_a_trace() {
        // Poll counts nothing else in the crate uses, so these entries can
        // be told apart from other tests'.
        let v = &variants::LPC17XX;
        let UartClock::Pll { pll, .. } = v.clock else {
            panic!()
        };
        let m = uart_idle_after(RegisterModel::new(), v, 37);
        let (m, _) = pll_hardware(m, &pll, 100);
        Bringup::new(v, m).unwrap().max_baud();

        let payloads: Vec<Trace> =
            __RINGBUF.with(|rb| rb.iter().map(|e| e.payload).collect());
        let at = |t: Trace| payloads.iter().position(|&p| p == t);

        let idle = at(Trace::UartIdle { polls: 37 }).unwrap();
        let locked = at(Trace::PllLocked { polls: 100 }).unwrap();
        assert!(idle < locked);
        assert!(payloads[locked..].contains(&Trace::Divisor(1)));
        assert!(payloads[locked..].contains(&Trace::Done));
    }

    #[test]
    fn divisor_follows_clock_and_baud() {
        let mut v = variants::LPC111X;
        assert_eq!(v.divisor(), 1);
        v.baud = 115_200;
        assert_eq!(v.divisor(), 6);
        assert_eq!(v.check(), Err(ConfigError::InexactBaud));
        v.baud = 93_750;
        assert_eq!(v.divisor(), 8);
        assert_eq!(v.check(), Ok(()));
    }

    #[test]
    fn bad_tables_are_caught() {
        let mut v = variants::LPC15XX;
        v.remap.normal = v.remap.boot;
        assert_eq!(v.check(), Err(ConfigError::RemapEncodingsEqual));

        let mut v = variants::LPC111X;
        v.baud = 1_000_000;
        assert_eq!(v.check(), Err(ConfigError::ZeroDivisor));

        let mut v = variants::LPC111X;
        v.baud = 150;
        assert_eq!(v.divisor(), 5000);
        assert_eq!(v.check(), Ok(()));
        v.baud = 10;
        assert_eq!(v.check(), Err(ConfigError::DivisorOverflow));
    }
}
