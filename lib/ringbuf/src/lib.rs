// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ring buffer for tracing bring-up code
//!
//! Bring-up runs before there is anywhere to print to -- bringing up the
//! UART is, after all, the point of the exercise. What we can do is leave a
//! trail in RAM that a debugger can pick over after the fact. That's what
//! this is: a static ring buffer of small `Copy` payloads, each tagged with
//! the source line that recorded it.
//!
//! ## Constraints
//!
//! The type in the ring buffer must implement both `Copy` and `PartialEq`.
//! Consecutive entries with the same line and payload are collapsed into one
//! entry with a count, so spinning on a status bit and recording each pass
//! costs one slot rather than the whole buffer.
//!
//! The buffer lives behind a `critical_section::Mutex`, so the final image
//! needs a critical-section implementation. On Cortex-M that's
//! `cortex-m/critical-section-single-core`; host tests use
//! `critical-section/std`.
//!
//! ## Creating a ring buffer
//!
//! ```
//! ringbuf!(Trace, 16, Trace::None);
//! ```
//!
//! Entries are added with [`ringbuf_entry!`]:
//!
//! ```
//! ringbuf_entry!(Trace::PllLocked { polls });
//! ```
//!
//! A name can be given to either macro to have more than one per module:
//!
//! ```
//! ringbuf!(CLOCK_RINGBUF, Trace, 16, Trace::None);
//! ringbuf_entry!(CLOCK_RINGBUF, Trace::PllCommit);
//! ```
//!
//! ## Inspecting a ring buffer via GDB
//!
//! ```console
//! (gdb) set print pretty on
//! (gdb) print drv_lpc_bringup::__RINGBUF
//! ```
//!
//! The interesting field is `buffer`; `last` is the index of the most recent
//! entry.

#![cfg_attr(not(test), no_std)]

use core::cell::RefCell;

/// Re-export so that code generated by the macros can always find it.
pub use critical_section;

/// Declares a ringbuffer in the current module or context.
///
/// `ringbuf!(NAME, Type, N, expr)` makes a ringbuffer named `NAME`,
/// containing entries of type `Type`, with room for `N` such entries, all of
/// which are initialized to `expr`.
///
/// The resulting ringbuffer will be static, so `NAME` should be uppercase.
/// If you omit the name, it will default to `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[used]
        static $name: $crate::RingbufCell<$t, $n> =
            $crate::RingbufCell::new($init);
    };
    ($t:ty, $n:expr, $init:expr) => {
        $crate::ringbuf!(__RINGBUF, $t, $n, $init);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf {
    ($name:ident, $t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
    ($t:ty, $n:expr, $init:expr) => {
        #[allow(dead_code)]
        const _: $t = $init;
    };
}

/// Inserts data into a named ringbuffer (which should have been declared with
/// the [`ringbuf!`] macro).
///
/// `ringbuf_entry!(NAME, expr)` will insert `expr` into the ringbuffer called
/// `NAME`. If you declared your ringbuffer without a name, you can also use
/// this without a name, and it will default to `__RINGBUF`.
#[cfg(not(feature = "disabled"))]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        // Evaluate both buf and payload, without letting them access each
        // other, by evaluating them in a tuple where each cannot
        // accidentally use the other's binding.
        let (p, buf) = ($payload, &$buf);
        $crate::RingbufCell::record(buf, line!() as u16, p);
    }};
    ($payload:expr) => {
        $crate::ringbuf_entry!(__RINGBUF, $payload);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry {
    ($buf:expr, $payload:expr) => {{
        let _ = &$payload;
    }};
    ($payload:expr) => {{
        let _ = &$payload;
    }};
}

/// Like [`ringbuf_entry!`], but names a ringbuffer declared at the root of
/// the calling crate, for use from submodules.
#[cfg(not(feature = "disabled"))]
#[allow(clippy::crate_in_macro_def)]
#[macro_export]
macro_rules! ringbuf_entry_root {
    ($buf:ident, $payload:expr) => {
        $crate::ringbuf_entry!(crate::$buf, $payload);
    };
    ($payload:expr) => {
        $crate::ringbuf_entry!(crate::__RINGBUF, $payload);
    };
}

#[cfg(feature = "disabled")]
#[macro_export]
macro_rules! ringbuf_entry_root {
    ($buf:ident, $payload:expr) => {{
        let _ = &$payload;
    }};
    ($payload:expr) => {{
        let _ = &$payload;
    }};
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RingbufEntry<T: Copy + PartialEq> {
    pub line: u16,
    pub generation: u16,
    pub count: u32,
    pub payload: T,
}

#[derive(Debug)]
pub struct Ringbuf<T: Copy + PartialEq, const N: usize> {
    pub last: Option<usize>,
    pub buffer: [RingbufEntry<T>; N],
}

impl<T: Copy + PartialEq, const N: usize> Ringbuf<T, N> {
    pub const fn new(init: T) -> Self {
        Self {
            last: None,
            buffer: [RingbufEntry {
                line: 0,
                generation: 0,
                count: 0,
                payload: init,
            }; N],
        }
    }

    pub fn entry(&mut self, line: u16, payload: T) {
        // On the first insertion `last` is None; treating that as an
        // out-of-range index both skips the reuse check and lands the first
        // entry in slot 0 below.
        let last = self.last.unwrap_or(usize::MAX);

        if let Some(ent) = self.buffer.get_mut(last) {
            if ent.line == line && ent.payload == payload {
                // Only reuse this entry if we don't overflow the count.
                if let Some(new_count) = ent.count.checked_add(1) {
                    ent.count = new_count;
                    return;
                }
            }
        }

        // No hardware divide on the M0 parts, so wrap by comparison rather
        // than remainder. This also turns usize::MAX into 0.
        let ndx = {
            let last_plus_1 = last.wrapping_add(1);
            if last_plus_1 >= self.buffer.len() {
                0
            } else {
                last_plus_1
            }
        };

        let ent = &mut self.buffer[ndx];
        *ent = RingbufEntry {
            line,
            payload,
            count: 1,
            generation: ent.generation.wrapping_add(1),
        };

        self.last = Some(ndx);
    }

    /// Iterates over the recorded entries, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &RingbufEntry<T>> + '_ {
        let start = match self.last {
            Some(last) if last < N => last + 1,
            _ => 0,
        };
        let (older, newer) = self.buffer.split_at(start);
        newer.iter().chain(older).filter(|e| e.count != 0)
    }
}

/// Static home of a [`Ringbuf`]; this is what [`ringbuf!`] declares.
pub struct RingbufCell<T: Copy + PartialEq, const N: usize> {
    inner: critical_section::Mutex<RefCell<Ringbuf<T, N>>>,
}

impl<T: Copy + PartialEq, const N: usize> RingbufCell<T, N> {
    pub const fn new(init: T) -> Self {
        Self {
            inner: critical_section::Mutex::new(RefCell::new(Ringbuf::new(
                init,
            ))),
        }
    }

    pub fn record(&self, line: u16, payload: T) {
        critical_section::with(|cs| {
            self.inner.borrow_ref_mut(cs).entry(line, payload)
        });
    }

    /// Runs `f` with the buffer borrowed, e.g. to look at its contents.
    pub fn with<R>(&self, f: impl FnOnce(&Ringbuf<T, N>) -> R) -> R {
        critical_section::with(|cs| f(&*self.inner.borrow_ref(cs)))
    }
}
