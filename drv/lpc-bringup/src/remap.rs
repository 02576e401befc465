// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Memory remapping: what answers at address zero.

use regbus::RegisterBus;
use ringbuf::ringbuf_entry_root;

use crate::{Bringup, Trace};

/// Which device is visible at the reset vector.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MemoryMap {
    /// The boot ROM.
    Boot,
    /// User flash (or RAM, depending on the part) -- the normal map.
    Normal,
}

/// Location and encodings of a part's memory-map register.
///
/// Every family encodes boot as 0, but they disagree about "normal": the
/// SYSMEMREMAP parts use 2 (user flash), MEMMAP on the 17xx/23xx uses 1.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Remap {
    pub register: u32,
    pub boot: u32,
    pub normal: u32,
}

impl Remap {
    pub const fn encoding(&self, map: MemoryMap) -> u32 {
        match map {
            MemoryMap::Boot => self.boot,
            MemoryMap::Normal => self.normal,
        }
    }
}

impl<B: RegisterBus> Bringup<'_, B> {
    /// Makes `map` visible at address zero.
    ///
    /// This is a single store; there's nothing to read back and nothing to
    /// wait for.
    pub fn select_memory_map(&mut self, map: MemoryMap) {
        let remap = &self.variant.remap;
        self.bus.write(remap.register, remap.encoding(map));
        ringbuf_entry_root!(Trace::MemoryMap(map));
    }

    pub fn select_boot_map(&mut self) {
        self.select_memory_map(MemoryMap::Boot);
    }

    pub fn select_normal_map(&mut self) {
        self.select_memory_map(MemoryMap::Normal);
    }
}
