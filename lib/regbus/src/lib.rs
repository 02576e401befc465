// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Word-sized register access for early bring-up code.
//!
//! Bring-up sequences on the LPC parts are little more than ordered stores to
//! fixed addresses, with the occasional spin on a status bit. Some of those
//! stores are load-bearing in ways the compiler can't see: the PLL feed
//! sequence, for instance, only commits a pending change if `0xAA` and `0x55`
//! land in the feed register back-to-back. So everything here goes through
//! [`RegisterBus`], which is implemented by [`Mmio`] (real hardware, volatile
//! accesses only) and, on the host, by [`model::RegisterModel`].
//!
//! The trait is narrow: there is no notion of register width
//! other than 32 bits, since every register the bring-up layer touches is
//! word-aligned and word-accessible on all supported parts.

#![cfg_attr(not(any(test, feature = "model")), no_std)]

#[cfg(any(test, feature = "model"))]
pub mod model;

/// Ordered access to 32-bit registers at absolute addresses.
pub trait RegisterBus {
    /// Reads the register at `addr`.
    fn read(&mut self, addr: u32) -> u32;

    /// Writes `value` to the register at `addr`.
    fn write(&mut self, addr: u32, value: u32);

    /// Ensures every access issued so far has completed before any later
    /// access is issued.
    fn barrier(&mut self) {}

    /// Read-modify-write of the register at `addr`.
    fn modify<F>(&mut self, addr: u32, f: F)
    where
        F: FnOnce(u32) -> u32,
        Self: Sized,
    {
        let v = self.read(addr);
        self.write(addr, f(v));
    }

    /// Spins until every bit in `mask` reads as set in the register at
    /// `addr`. There is no timeout: if the hardware never gets there, neither
    /// do we.
    ///
    /// Returns the number of reads that observed the condition false.
    fn spin_until_set(&mut self, addr: u32, mask: u32) -> u32
    where
        Self: Sized,
    {
        let mut polls = 0u32;
        while self.read(addr) & mask != mask {
            // spin
            polls = polls.wrapping_add(1);
        }
        polls
    }
}

impl<B: RegisterBus> RegisterBus for &mut B {
    fn read(&mut self, addr: u32) -> u32 {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u32, value: u32) {
        (**self).write(addr, value)
    }

    fn barrier(&mut self) {
        (**self).barrier()
    }
}

/// Memory-mapped registers of the part we're running on.
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// Creates a handle to the physical register space.
    ///
    /// # Safety
    ///
    /// Every address later passed to this handle must be a valid, word
    /// aligned peripheral register on the running part, and the caller must
    /// be the only code touching those registers for the handle's lifetime.
    /// During bring-up that's trivially true: nothing else is running yet.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterBus for Mmio {
    #[inline(always)]
    fn read(&mut self, addr: u32) -> u32 {
        // Safety: validity of `addr` is the contract of `Mmio::new`.
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    #[inline(always)]
    fn write(&mut self, addr: u32, value: u32) {
        // Safety: validity of `addr` is the contract of `Mmio::new`.
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }

    #[inline(always)]
    fn barrier(&mut self) {
        #[cfg(feature = "cortex-m")]
        cortex_m::asm::dsb();

        #[cfg(not(feature = "cortex-m"))]
        {
            use core::sync::atomic::{compiler_fence, Ordering};
            compiler_fence(Ordering::SeqCst);
        }
    }
}
