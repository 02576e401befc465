// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The part this image is built for, driven over real MMIO.

use regbus::Mmio;
use static_assertions::const_assert;

use crate::{Bringup, MemoryMap, Variant};

cfg_if::cfg_if! {
    if #[cfg(feature = "lpc111x")] {
        pub const TARGET: &Variant = &crate::variants::LPC111X;
    } else if #[cfg(feature = "lpc11uxx")] {
        pub const TARGET: &Variant = &crate::variants::LPC11UXX;
    } else if #[cfg(feature = "lpc15xx")] {
        pub const TARGET: &Variant = &crate::variants::LPC15XX;
    } else if #[cfg(feature = "lpc17xx")] {
        pub const TARGET: &Variant = &crate::variants::LPC17XX;
    } else {
        pub const TARGET: &Variant = &crate::variants::LPC23XX;
    }
}

const_assert!(TARGET.check().is_ok());

fn bringup() -> Bringup<'static, Mmio> {
    Bringup {
        // Checked above, so this skips `Bringup::new`.
        variant: TARGET,
        // Safety: TARGET's addresses are the SYSCON and UART blocks of the
        // part we're running on, and nothing else in the stub owns them this
        // early.
        bus: unsafe { Mmio::new() },
    }
}

/// Maps either the boot ROM or user flash at address zero.
pub fn select_memory_map(map: MemoryMap) {
    bringup().select_memory_map(map);
}

/// Brings UART0 up at the fastest rate this part supports. Does not return
/// until the transmitter has drained and, where there is one, the PLL has
/// locked.
pub fn max_baud() {
    bringup().max_baud();
}

#[cfg(feature = "c-abi")]
mod ffi {
    use super::*;

    #[no_mangle]
    pub extern "C" fn map_boot() {
        select_memory_map(MemoryMap::Boot);
    }

    #[no_mangle]
    pub extern "C" fn map_normal() {
        select_memory_map(MemoryMap::Normal);
    }

    #[no_mangle]
    pub extern "C" fn baud_max() {
        max_baud();
    }
}
