// SPDX-License-Identifier: GPL-3.0-or-later

use core::cell::UnsafeCell;

/// State that is reached both from foreground code and from interrupt
/// handlers. Every access goes through `lock()`, which masks interrupts for
/// the duration of the closure. The handlers may run at different priorities
/// and preempt one another.
pub struct SharedWithInterrupt<T>(UnsafeCell<T>);

impl<T> SharedWithInterrupt<T> {
    pub const fn new(v: T) -> Self {
        Self(UnsafeCell::new(v))
    }

    /// `f` must not call `lock()` again on the same value.
    pub fn lock<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        critical_section::with(|_| {
            let mut_self = unsafe { &mut *self.0.get() };
            f(mut_self)
        })
    }
}

unsafe impl<T: Send> Sync for SharedWithInterrupt<T> {}
unsafe impl<T: Send> Send for SharedWithInterrupt<T> {}
