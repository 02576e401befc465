// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Host-side register file.
//!
//! `RegisterModel` stands in for the hardware when running bring-up code on
//! a development machine. It remembers the last value written to every
//! address, logs every access in order, and lets a test install hooks that
//! get to react to each access -- which is how status bits "become" set
//! while the code under test is spinning on them.

use std::collections::BTreeMap;

use crate::RegisterBus;

/// One access made through the model, in program order.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Access {
    Read { addr: u32, value: u32 },
    Write { addr: u32, value: u32 },
    Barrier,
}

impl Access {
    pub fn is_write(&self) -> bool {
        matches!(self, Access::Write { .. })
    }

    /// Returns the written value if this is a write to `addr`.
    pub fn write_to(&self, addr: u32) -> Option<u32> {
        match *self {
            Access::Write { addr: a, value } if a == addr => Some(value),
            _ => None,
        }
    }

    /// Returns the observed value if this is a read of `addr`.
    pub fn read_of(&self, addr: u32) -> Option<u32> {
        match *self {
            Access::Read { addr: a, value } if a == addr => Some(value),
            _ => None,
        }
    }
}

/// Register contents as seen by hooks.
#[derive(Debug, Default)]
pub struct Registers {
    values: BTreeMap<u32, u32>,
}

impl Registers {
    /// Current value at `addr`; registers nobody has touched read as zero.
    pub fn get(&self, addr: u32) -> u32 {
        self.values.get(&addr).copied().unwrap_or(0)
    }

    pub fn set(&mut self, addr: u32, value: u32) {
        self.values.insert(addr, value);
    }

    pub fn set_bits(&mut self, addr: u32, mask: u32) {
        let v = self.get(addr);
        self.set(addr, v | mask);
    }

    pub fn clear_bits(&mut self, addr: u32, mask: u32) {
        let v = self.get(addr);
        self.set(addr, v & !mask);
    }
}

type Hook = Box<dyn FnMut(&Access, &mut Registers)>;

/// A register file with an access log and side-effect hooks.
#[derive(Default)]
pub struct RegisterModel {
    regs: Registers,
    log: Vec<Access>,
    hooks: Vec<Hook>,
}

impl RegisterModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presets `addr` to `value`, as if by hardware reset. Not logged.
    pub fn with_value(mut self, addr: u32, value: u32) -> Self {
        self.regs.set(addr, value);
        self
    }

    /// Installs `hook`, which runs after every access has been applied (and
    /// logged), in installation order.
    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: FnMut(&Access, &mut Registers) + 'static,
    {
        self.hooks.push(Box::new(hook));
        self
    }

    /// Holds `mask` clear in `addr` for the first `polls` reads of `addr`,
    /// then sets it.
    ///
    /// The bits are forced clear up front, so code that doesn't wait at all
    /// will see them clear.
    pub fn with_bits_set_after(self, addr: u32, mask: u32, polls: u32) -> Self {
        let mut seen = 0u32;
        let mut model = self.with_hook(move |access, regs| {
            if access.read_of(addr).is_some() {
                seen += 1;
                if seen >= polls {
                    regs.set_bits(addr, mask);
                }
            }
        });
        if polls == 0 {
            model.regs.set_bits(addr, mask);
        } else {
            model.regs.clear_bits(addr, mask);
        }
        model
    }

    /// Current contents of `addr`, without logging a read.
    pub fn peek(&self, addr: u32) -> u32 {
        self.regs.get(addr)
    }

    /// Changes `addr` behind the code's back, without logging a write.
    pub fn poke(&mut self, addr: u32, value: u32) {
        self.regs.set(addr, value);
    }

    pub fn log(&self) -> &[Access] {
        &self.log
    }

    pub fn clear_log(&mut self) {
        self.log.clear();
    }

    /// Every value written to `addr`, oldest first.
    pub fn writes_to(&self, addr: u32) -> Vec<u32> {
        self.log.iter().filter_map(|a| a.write_to(addr)).collect()
    }

    /// Number of logged reads of `addr`.
    pub fn reads_of(&self, addr: u32) -> usize {
        self.log.iter().filter(|a| a.read_of(addr).is_some()).count()
    }

    /// Just the writes, as `(addr, value)`, oldest first.
    pub fn writes(&self) -> Vec<(u32, u32)> {
        self.log
            .iter()
            .filter_map(|a| match *a {
                Access::Write { addr, value } => Some((addr, value)),
                _ => None,
            })
            .collect()
    }

    fn record(&mut self, access: Access) {
        self.log.push(access);
        for hook in &mut self.hooks {
            hook(&access, &mut self.regs);
        }
    }
}

impl RegisterBus for RegisterModel {
    fn read(&mut self, addr: u32) -> u32 {
        let value = self.regs.get(addr);
        self.record(Access::Read { addr, value });
        value
    }

    fn write(&mut self, addr: u32, value: u32) {
        self.regs.set(addr, value);
        self.record(Access::Write { addr, value });
    }

    fn barrier(&mut self) {
        self.record(Access::Barrier);
    }
}
