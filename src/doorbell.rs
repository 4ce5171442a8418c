//! Doorbell notifier.

use core::ptr;
use core::sync::atomic::{fence, Ordering};

use crate::descriptor::TxDescriptor;

/// The TX doorbell register for one queue: a 128-bit write combining the
/// masked producer index with a copy of the first newly pushed descriptor,
/// so the device can start on that descriptor without fetching it from the
/// ring.
pub(crate) struct Doorbell {
    reg: *mut [u32; 4],
}

impl Doorbell {
    /// # Safety
    ///
    /// `reg` must point to this queue's 128-bit TX descriptor update
    /// register, mapped and exclusively ours for the life of the queue.
    pub(crate) unsafe fn new(reg: *mut u32) -> Self {
        Doorbell {
            reg: reg as *mut [u32; 4],
        }
    }

    pub(crate) fn ring(&mut self, write_ptr: u32, pushed: TxDescriptor) {
        let (lo, hi) = pushed.into_words();

        // Store-store barrier: descriptor and event ring stores must be
        // visible to the device before the doorbell store.
        fence(Ordering::Release);

        unsafe { ptr::write_volatile(self.reg, [lo, hi, write_ptr, 0]) };
    }
}
