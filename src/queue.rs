//! The TX queue: pointer accounting, burst submission, completion reap
//! and lifecycle.
//!
//! One queue is driven by exactly one thread. Software writes descriptors
//! and reads events; the device reads descriptors and writes events. That
//! split needs no locking, only a store-store barrier before each doorbell
//! write, which the doorbell itself provides.

use alloc::collections::VecDeque;

use crate::descriptor::{TxDescriptor, DESC_LEN_MAX};
use crate::doorbell::Doorbell;
use crate::event::{EventRing, TxEvent, EVENTS_PER_CACHE_LINE};
use crate::packet::TxBuffer;
use crate::ring::{DescriptorRing, ShadowRing};

/// Slots a ring can never use: one so the producer and consumer pointers
/// cannot coincide when full, the unreset tail of an event cache line, and
/// one each for an error and a flush event.
const RESERVED_ENTRIES: u32 = 1 + (EVENTS_PER_CACHE_LINE - 1) + 1 + 1;

/// Usable descriptor capacity of a ring with `entries` slots.
///
/// Keeping occupancy at or below this guarantees the companion event ring
/// cannot overflow even if the device reports one event per descriptor.
/// `entries` must exceed the reserved slot count; creation enforces this.
pub const fn txq_limit(entries: u32) -> u32 {
    entries - RESERVED_ENTRIES
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Descriptor and event ring entry counts differ.
    RingSizeMismatch,
    /// Entry count is not a power of two, or leaves no usable capacity
    /// after the reserved slots.
    BadRingSize,
    /// Shadow ring allocation failed.
    NoMemory,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Created,
    Started,
    Stopped,
}

/// Creation-time queue parameters, supplied by the configuration layer.
pub struct TxQueueConfig {
    /// Descriptor ring entries; a power of two.
    pub txq_entries: u32,
    /// Event ring entries; must equal `txq_entries`.
    pub evq_entries: u32,
    /// Free-descriptor low-water mark that triggers a reap before
    /// submission.
    pub free_thresh: u32,
    /// Base of the descriptor ring (device-shared memory).
    pub txq_ring: *mut TxDescriptor,
    /// Base of the event ring (device-shared memory).
    pub evq_ring: *mut TxEvent,
    /// This queue's TX doorbell register (128 bits).
    pub doorbell: *mut u32,
}

/// One TX queue instance.
///
/// Dropping the queue releases any packet-buffer handles still held in
/// shadow slots; `reap_all` beforehand just leaves nothing for drop to do.
pub struct TxQueue<B> {
    state: State,
    exception: bool,
    ptr_mask: u32,
    added: u32,
    completed: u32,
    free_thresh: u32,
    evq_read_ptr: u32,
    desc_ring: DescriptorRing,
    sw_ring: ShadowRing<B>,
    evq: EventRing,
    doorbell: Doorbell,
}

// A queue owns its ring memory and doorbell register exclusively, so
// moving it to another thread moves the whole device surface with it.
// Queues over disjoint rings are independent.
unsafe impl<B: Send> Send for TxQueue<B> {}

fn descs_for_packet<B: TxBuffer>(pkt: &B) -> u32 {
    debug_assert!(pkt.segment_count() > 0);

    let mut descs = 0;
    for si in 0..pkt.segment_count() {
        let len = u32::from(pkt.segment(si).len);
        descs += if len == 0 {
            1
        } else {
            (len + DESC_LEN_MAX - 1) / DESC_LEN_MAX
        };
    }
    descs
}

impl<B: TxBuffer> TxQueue<B> {
    /// Creates a queue over the given ring memory and doorbell register.
    ///
    /// The queue starts out not running; call [`start`](Self::start) before
    /// submitting. On any error nothing is retained.
    ///
    /// # Safety
    ///
    /// The config pointers must be valid for the configured entry counts,
    /// mapped for the life of the queue, and used by nothing else on the
    /// host side. The device may write the event ring and read the
    /// descriptor ring at any time.
    pub unsafe fn new(config: &TxQueueConfig) -> Result<Self, Error> {
        if config.txq_entries != config.evq_entries {
            return Err(Error::RingSizeMismatch);
        }
        if !config.txq_entries.is_power_of_two() || config.txq_entries <= RESERVED_ENTRIES {
            return Err(Error::BadRingSize);
        }

        let ptr_mask = config.txq_entries - 1;
        let sw_ring = ShadowRing::new(config.txq_entries)?;

        Ok(TxQueue {
            state: State::Created,
            exception: false,
            ptr_mask,
            added: 0,
            completed: 0,
            free_thresh: config.free_thresh,
            evq_read_ptr: 0,
            desc_ring: DescriptorRing::new(config.txq_ring, ptr_mask),
            sw_ring,
            evq: EventRing::new(config.evq_ring, ptr_mask),
            doorbell: Doorbell::new(config.doorbell),
        })
    }

    /// Resets the datapath and accepts submissions again.
    ///
    /// `evq_read_ptr` is where event polling resumes (as returned by a
    /// previous [`stop`](Self::stop)); `desc_index` is the descriptor ring
    /// position agreed with the device.
    pub fn start(&mut self, evq_read_ptr: u32, desc_index: u32) {
        self.evq_read_ptr = evq_read_ptr;
        self.added = desc_index;
        self.completed = desc_index;
        self.state = State::Started;
        self.exception = false;
        net_trace!("TxQueue::start({}, {})", evq_read_ptr, desc_index);
    }

    /// Suspends submission, returning the event ring read pointer to pass
    /// to a future [`start`](Self::start).
    pub fn stop(&mut self) -> u32 {
        self.state = State::Stopped;
        net_trace!("TxQueue::stop() -> {}", self.evq_read_ptr);
        self.evq_read_ptr
    }

    /// Releases every outstanding packet-buffer handle, without consulting
    /// completion events. For teardown, when the device may no longer be
    /// making progress.
    pub fn reap_all(&mut self) {
        self.sw_ring.release_all();
        self.state = State::Created;
        net_trace!("TxQueue::reap_all()");
    }

    /// Hook for completions the control path observed through an alternate
    /// channel. Only legal while the queue is not running; outstanding
    /// buffers are released wholesale by [`reap_all`](Self::reap_all) on
    /// teardown, so the event carries nothing worth consuming. Always
    /// reports the event as unconsumed.
    pub fn on_completion_event(&mut self, _id: u32) -> bool {
        debug_assert!(self.state != State::Started);
        false
    }

    /// Usable descriptor capacity; see [`txq_limit`].
    pub fn capacity(&self) -> u32 {
        txq_limit(self.ptr_mask + 1)
    }

    /// Descriptors added but not yet reclaimed. Never exceeds
    /// [`capacity`](Self::capacity).
    pub fn in_flight(&self) -> u32 {
        self.added.wrapping_sub(self.completed)
    }

    pub fn is_running(&self) -> bool {
        self.state == State::Started
    }

    /// Whether an unrecognized event has latched the queue exception. A
    /// queue in exception accepts no submissions and processes no further
    /// events until restarted by the control path.
    pub fn has_exception(&self) -> bool {
        self.exception
    }

    /// Submits as many of `packets` as fit, in order, popping accepted
    /// handles from the front. Returns the number accepted.
    ///
    /// A packet is written whole or not at all. A short count is ring
    /// backpressure, not an error; completions free the space.
    pub fn transmit(&mut self, packets: &mut VecDeque<B>) -> usize {
        if self.state != State::Started || self.exception {
            return 0;
        }

        let ptr_mask = self.ptr_mask;
        let limit = txq_limit(ptr_mask + 1);
        let mut added = self.added;
        let mut dma_desc_space = limit - added.wrapping_sub(self.completed);

        let mut reap_done = dma_desc_space < self.free_thresh;
        if reap_done {
            self.reap();
            dma_desc_space = limit - added.wrapping_sub(self.completed);
        }

        let mut accepted = 0;
        while let Some(head) = packets.front() {
            let need = descs_for_packet(head);
            if need > dma_desc_space {
                if reap_done {
                    break;
                }

                // Push descriptors prepared so far before polling, so the
                // device can make progress and return event ring slots.
                if added != self.added {
                    self.push(added);
                }

                self.reap();
                reap_done = true;
                dma_desc_space = limit - added.wrapping_sub(self.completed);
                if need > dma_desc_space {
                    break;
                }
            }

            let pkt = match packets.pop_front() {
                Some(pkt) => pkt,
                None => break,
            };

            let pkt_start = added;
            let last_seg = pkt.segment_count() - 1;
            for si in 0..=last_seg {
                let seg = pkt.segment(si);
                let mut addr = seg.addr;
                let mut left = u32::from(seg.len);
                loop {
                    let len = left.min(DESC_LEN_MAX);
                    left -= len;
                    let eop = si == last_seg && left == 0;
                    self.desc_ring.write(
                        added,
                        TxDescriptor::write(|w| {
                            let w = w.set_address(addr).set_byte_count(len as u16);
                            if eop {
                                w
                            } else {
                                w.set_continuation()
                            }
                        }),
                    );
                    added = added.wrapping_add(1);
                    addr += u64::from(len);
                    if left == 0 {
                        break;
                    }
                }
            }

            dma_desc_space -= added.wrapping_sub(pkt_start);
            // The whole packet is released as a unit, so ownership rides
            // on the slot of its final descriptor.
            self.sw_ring.attach(added.wrapping_sub(1), pkt);
            accepted += 1;
        }

        if added != self.added {
            self.push(added);
        }

        // Amortize reclamation even on bursts that fit without one.
        if !reap_done {
            self.reap();
        }

        accepted
    }

    /// Rings the doorbell for descriptors `self.added..added` and records
    /// the new producer position.
    fn push(&mut self, added: u32) {
        let pushed = self.desc_ring.read(self.added);
        self.doorbell.ring(added & self.ptr_mask, pushed);
        self.added = added;
    }

    /// Reads the next event, if the device has written one.
    ///
    /// An event code the datapath does not understand latches the queue
    /// exception and leaves the read pointer on the offending event, for
    /// the control path to inspect.
    fn next_tx_event(&mut self) -> Option<TxEvent> {
        // An exception latched by an earlier reap suspends event
        // processing; transmit checks on entry and never reaps twice once
        // one has run.
        debug_assert!(!self.exception);

        let ev = self.evq.read(self.evq_read_ptr);
        if !ev.is_present() {
            return None;
        }
        if !ev.is_tx_completion() {
            self.exception = true;
            net_error!("TxQ exception at EvQ read ptr {:#x}", self.evq_read_ptr);
            return None;
        }

        self.evq_read_ptr = self.evq_read_ptr.wrapping_add(1);
        Some(ev)
    }

    /// Polls the event ring and releases buffer handles for every
    /// descriptor the device has completed. A no-op if nothing new has
    /// completed.
    fn reap(&mut self) {
        let old_read_ptr = self.evq_read_ptr;
        let ptr_mask = self.ptr_mask;
        let mut completed = self.completed;
        let curr_done = completed.wrapping_sub(1);
        let mut anew_done = curr_done;

        while let Some(ev) = self.next_tx_event() {
            // The device reports the latest completed descriptor index;
            // only the final observation matters.
            anew_done = ev.descriptor_index();
        }
        let pending = completed.wrapping_add(anew_done.wrapping_sub(curr_done) & ptr_mask);

        if pending != completed {
            while completed != pending {
                self.sw_ring.release(completed);
                completed = completed.wrapping_add(1);
            }
            self.completed = completed;
        }

        self.evq.reset_consumed(old_read_ptr, self.evq_read_ptr);
    }
}
