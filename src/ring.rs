//! Descriptor ring and shadow ring storage.
//!
//! The descriptor ring lives in device-shared memory: software writes it,
//! the device reads it, so every access is a volatile whole-descriptor
//! copy through a raw base pointer. The shadow ring is ordinary software
//! memory mapping each descriptor slot to the packet-buffer handle that
//! owns it, if any; the device never sees it.

use core::ptr;

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::descriptor::TxDescriptor;
use crate::queue::Error;

/// Software-written, device-read ring of hardware descriptors.
pub(crate) struct DescriptorRing {
    base: *mut TxDescriptor,
    ptr_mask: u32,
}

impl DescriptorRing {
    /// # Safety
    ///
    /// `base` must point to `ptr_mask + 1` descriptors of device-shared
    /// ring memory, valid and exclusively ours for the life of the ring.
    pub(crate) unsafe fn new(base: *mut TxDescriptor, ptr_mask: u32) -> Self {
        DescriptorRing { base, ptr_mask }
    }

    pub(crate) fn write(&mut self, index: u32, desc: TxDescriptor) {
        unsafe { ptr::write_volatile(self.base.add((index & self.ptr_mask) as usize), desc) };
    }

    pub(crate) fn read(&self, index: u32) -> TxDescriptor {
        unsafe { ptr::read_volatile(self.base.add((index & self.ptr_mask) as usize)) }
    }
}

/// One owned packet-buffer handle per descriptor slot.
///
/// A handle is attached to the slot of the last descriptor written for its
/// packet and taken out exactly once: by the completion reap, by
/// `reap_all`, or by dropping the ring.
pub(crate) struct ShadowRing<B> {
    slots: Box<[Option<B>]>,
    ptr_mask: u32,
}

impl<B> ShadowRing<B> {
    pub(crate) fn new(entries: u32) -> Result<Self, Error> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(entries as usize)
            .map_err(|_| Error::NoMemory)?;
        slots.resize_with(entries as usize, || None);

        Ok(ShadowRing {
            slots: slots.into_boxed_slice(),
            ptr_mask: entries - 1,
        })
    }

    pub(crate) fn attach(&mut self, index: u32, buffer: B) {
        let slot = &mut self.slots[(index & self.ptr_mask) as usize];
        debug_assert!(slot.is_none());
        *slot = Some(buffer);
    }

    /// Releases the handle at `index`, if the slot holds one.
    pub(crate) fn release(&mut self, index: u32) {
        self.slots[(index & self.ptr_mask) as usize] = None;
    }

    /// Releases every held handle, regardless of completion state.
    pub(crate) fn release_all(&mut self) {
        for slot in self.slots.iter_mut() {
            *slot = None;
        }
    }
}
