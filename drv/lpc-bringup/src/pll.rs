// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Main PLL bring-up for the parts that come out of reset on a 4 MHz IRC.
//!
//! The 17xx and 23xx share the same PLL0 design: a control register with
//! enable and connect bits, a config register holding `M - 1` and `N - 1`,
//! a status register with a lock bit, and a feed register. Writes to control
//! and config are only *pending* until `0xAA` then `0x55` are written to the
//! feed register, with nothing else on the bus in between. Skip the feed and
//! the write silently does nothing.
//!
//! The CCO runs at `2 * M * Fin / N`, and the CPU clock is the CCO divided
//! by CCLKCFG + 1.

use regbus::RegisterBus;
use ringbuf::ringbuf_entry_root;

use crate::{ConfigError, Trace};

/// Feed sequence, in order.
pub const FEED: [u32; 2] = [0xAA, 0x55];

// PLL0 limits from the 17xx and 23xx user manuals; the two agree.
const M_MIN: u16 = 6;
const M_MAX: u16 = 512;
const N_MIN: u8 = 1;
const N_MAX: u8 = 32;
const CCO_MIN_HZ: u64 = 275_000_000;
const CCO_MAX_HZ: u64 = 550_000_000;

/// A feed-gated PLL and the values we program into it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Pll {
    pub control: u32,
    pub config: u32,
    pub status: u32,
    pub feed: u32,
    /// CPU clock divider register, if the part has one.
    pub core_div: Option<u32>,

    /// Control register bit that powers the PLL.
    pub enable: u32,
    /// Control register bit that puts the PLL on the system clock.
    pub connect: u32,
    /// Status register bit that reads as set once the PLL has locked.
    pub lock: u32,
    /// Position of the `N - 1` field in the config register; `M - 1` always
    /// sits at bit 0.
    pub nsel_shift: u8,

    /// Frequency of the PLL input after reset.
    pub source_hz: u32,
    pub multiplier: u16,
    pub divider: u8,
    pub core_divider: u8,
    /// CCLKCFG only accepts 0 or odd values, i.e. the CPU clock divider has
    /// to be 1 or even. True on the 23xx; the 17xx takes any value.
    pub even_core_divider: bool,
}

/// Proof that the PLL locked and is driving the system clock.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Locked {
    pub core_hz: u32,
    /// Status reads that came back unlocked before the one that didn't.
    pub polls: u32,
}

/// Selects the peripheral clock ratio for the UART on parts where PCLKSEL
/// is shared among peripherals.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PclkSel {
    pub register: u32,
    /// Low bit of the UART's two-bit field.
    pub shift: u8,
}

impl PclkSel {
    /// Field value for PCLK = CCLK / 1.
    pub const FULL_SPEED: u32 = 0b01;
    const FIELD: u32 = 0b11;

    pub(crate) fn select_full_speed<B: RegisterBus>(&self, bus: &mut B) {
        let shift = self.shift;
        bus.modify(self.register, |v| {
            (v & !(Self::FIELD << shift)) | (Self::FULL_SPEED << shift)
        });
    }
}

impl Pll {
    /// Config register contents for the given multiplier and pre-divider.
    pub const fn config_word(&self, multiplier: u16, divider: u8) -> u32 {
        (multiplier as u32 - 1) | ((divider as u32 - 1) << self.nsel_shift)
    }

    pub const fn cco_hz(&self, multiplier: u16, divider: u8) -> u64 {
        2 * multiplier as u64 * self.source_hz as u64 / divider as u64
    }

    pub const fn core_hz(&self, multiplier: u16, divider: u8) -> u32 {
        (self.cco_hz(multiplier, divider) / self.core_divider as u64) as u32
    }

    /// Frequency the CPU (and a full-speed PCLK) ends up at with the
    /// configured multiplier and divider.
    pub const fn output_hz(&self) -> u32 {
        self.core_hz(self.multiplier, self.divider)
    }

    /// Checks the table: register layout, the configured settings and the
    /// CPU clock divider.
    pub const fn check(&self) -> Result<(), ConfigError> {
        if self.feed == self.status
            || self.feed == self.control
            || self.feed == self.config
        {
            return Err(ConfigError::FeedAliasesStatus);
        }
        if self.core_divider == 0 {
            return Err(ConfigError::PllOutOfRange);
        }
        if self.even_core_divider
            && self.core_divider != 1
            && self.core_divider % 2 != 0
        {
            return Err(ConfigError::OddCoreDivider);
        }
        self.check_settings(self.multiplier, self.divider)
    }

    /// Checks that `multiplier`/`divider` are encodable and put the CCO in
    /// its operating range.
    pub const fn check_settings(
        &self,
        multiplier: u16,
        divider: u8,
    ) -> Result<(), ConfigError> {
        if multiplier < M_MIN
            || multiplier > M_MAX
            || divider < N_MIN
            || divider > N_MAX
        {
            return Err(ConfigError::PllOutOfRange);
        }
        let cco = self.cco_hz(multiplier, divider);
        if cco < CCO_MIN_HZ || cco > CCO_MAX_HZ {
            return Err(ConfigError::PllOutOfRange);
        }
        Ok(())
    }

    /// Writes `value` to one of the feed-gated registers and commits it.
    ///
    /// The write and both feed bytes have to be adjacent on the bus, so this
    /// is the only way anything in here touches control or config.
    fn commit<B: RegisterBus>(&self, bus: &mut B, register: u32, value: u32) {
        bus.write(register, value);
        bus.write(self.feed, FEED[0]);
        bus.write(self.feed, FEED[1]);
        bus.barrier();
        ringbuf_entry_root!(Trace::PllCommit { register, value });
    }
}

/// Takes the PLL from whatever state it's in to locked and connected at
/// `multiplier`/`divider`.
///
/// Settings that `Pll::check_settings` rejects are refused before anything
/// is written, so the PLL is left as it was.
///
/// Spins on the lock bit without a timeout. A PLL that never locks leaves
/// us here forever, which beats running on a clock we know nothing about.
pub fn bring_up_clock<B: RegisterBus>(
    bus: &mut B,
    pll: &Pll,
    multiplier: u16,
    divider: u8,
) -> Result<Locked, ConfigError> {
    pll.check_settings(multiplier, divider)?;
    Ok(bring_up_checked(bus, pll, multiplier, divider))
}

/// `bring_up_clock` for settings already known to pass `check_settings`.
pub(crate) fn bring_up_checked<B: RegisterBus>(
    bus: &mut B,
    pll: &Pll,
    multiplier: u16,
    divider: u8,
) -> Locked {
    let control = bus.read(pll.control);
    let rest = control & !(pll.enable | pll.connect);

    // The config can only change while the PLL is both disconnected and
    // off, and it has to be disconnected first.
    pll.commit(bus, pll.control, control & !pll.connect);
    pll.commit(bus, pll.control, rest);

    pll.commit(bus, pll.config, pll.config_word(multiplier, divider));

    if let Some(core_div) = pll.core_div {
        bus.write(core_div, pll.core_divider as u32 - 1);
    }

    pll.commit(bus, pll.control, rest | pll.enable);

    let polls = bus.spin_until_set(pll.status, pll.lock);
    ringbuf_entry_root!(Trace::PllLocked { polls });

    pll.commit(bus, pll.control, rest | pll.enable | pll.connect);

    Locked {
        core_hz: pll.core_hz(multiplier, divider),
        polls,
    }
}
