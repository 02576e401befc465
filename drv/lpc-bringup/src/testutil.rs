// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Hardware behavior layered onto `RegisterModel` for the tests.

use std::cell::RefCell;
use std::rc::Rc;

use regbus::model::{Access, RegisterModel};

use crate::pll::{Pll, FEED};
use crate::{UartClock, Variant};

/// What the PLL is actually doing, as opposed to what was last written to
/// its registers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PllState {
    pub control: u32,
    pub config: u32,
    pub enabled: bool,
    pub connected: bool,
    pub locked: bool,
}

/// Adds a PLL to `model` that behaves like PLL0 on the 17xx/23xx:
///
/// - control and config writes only take effect on a complete feed, and any
///   other write in between throws the pending value away;
/// - the lock bit comes up `lock_after` status reads after the PLL is
///   powered, and drops when it's powered down.
///
/// Panics if the PLL is connected before it has locked, or reconfigured
/// while powered.
pub fn pll_hardware(
    model: RegisterModel,
    pll: &Pll,
    lock_after: u32,
) -> (RegisterModel, Rc<RefCell<PllState>>) {
    let state = Rc::new(RefCell::new(PllState::default()));
    let shared = Rc::clone(&state);
    let pll = *pll;

    let mut pending: Option<(u32, u32)> = None;
    let mut fed = false;
    let mut reads = 0u32;

    let model = model.with_hook(move |access, regs| {
        let mut s = shared.borrow_mut();
        match *access {
            Access::Write { addr, value } if addr == pll.feed => {
                if value == FEED[0] {
                    fed = true;
                    return;
                }
                let complete = fed && value == FEED[1];
                fed = false;
                let Some((reg, v)) = pending.take().filter(|_| complete) else {
                    return;
                };

                if reg == pll.config {
                    assert!(
                        !s.enabled && !s.connected,
                        "PLL reconfigured while running"
                    );
                    s.config = v;
                    return;
                }

                let enabled = v & pll.enable != 0;
                let connected = v & pll.connect != 0;
                assert!(!connected || s.locked, "PLL connected before lock");
                if !enabled {
                    s.locked = false;
                    reads = 0;
                    regs.clear_bits(pll.status, pll.lock);
                } else if !s.enabled && lock_after == 0 {
                    s.locked = true;
                    regs.set_bits(pll.status, pll.lock);
                }
                s.enabled = enabled;
                s.connected = connected;
                s.control = v;
            }
            Access::Write { addr, value } => {
                fed = false;
                pending = (addr == pll.control || addr == pll.config)
                    .then_some((addr, value));
            }
            Access::Read { addr, .. } if addr == pll.status => {
                if s.enabled && !s.locked {
                    reads += 1;
                    if reads >= lock_after {
                        s.locked = true;
                        regs.set_bits(pll.status, pll.lock);
                    }
                }
            }
            _ => (),
        }
    });

    (model, state)
}

/// Holds the UART's idle bit clear for `polls` reads.
pub fn uart_idle_after(
    model: RegisterModel,
    v: &Variant,
    polls: u32,
) -> RegisterModel {
    let (status, idle) = v.uart.tx_idle();
    model.with_bits_set_after(status, idle, polls)
}

/// A model of `v` in its reset state with an idle UART, and a PLL (if it has
/// one) that locks after a few polls.
pub fn model_for(v: &Variant) -> RegisterModel {
    let (status, idle) = v.uart.tx_idle();
    let model = RegisterModel::new().with_value(status, idle);
    match v.clock {
        UartClock::Pll { pll, .. } => pll_hardware(model, &pll, 3).0,
        UartClock::Divided { .. } => model,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regbus::RegisterBus;

    #[test]
    fn unfed_writes_do_nothing() {
        let UartClock::Pll { pll, .. } = crate::variants::LPC17XX.clock else {
            panic!()
        };
        let (mut m, state) = pll_hardware(RegisterModel::new(), &pll, 0);

        // No feed at all.
        m.write(pll.config, 0x1234);
        // A feed with something else wedged into the middle of it.
        m.write(pll.control, pll.enable);
        m.write(pll.feed, 0xAA);
        m.write(0x4000_C000, 0);
        m.write(pll.feed, 0x55);

        assert_eq!(*state.borrow(), PllState::default());
    }

    #[test]
    fn powering_down_drops_the_lock() {
        let UartClock::Pll { pll, .. } = crate::variants::LPC23XX.clock else {
            panic!()
        };
        let (mut m, state) = pll_hardware(RegisterModel::new(), &pll, 0);
        for value in [pll.enable, 0] {
            m.write(pll.control, value);
            m.write(pll.feed, 0xAA);
            m.write(pll.feed, 0x55);
        }
        assert!(!state.borrow().locked);
        assert_eq!(m.peek(pll.status) & pll.lock, 0);
    }
}
