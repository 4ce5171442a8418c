//! Transmit datapath for EF10-family 10/40GbE network adapters
//!
//! This crate is the TX half of a poll-mode datapath: it turns outbound
//! packets into hardware DMA descriptors in a circular ring, rings the
//! device doorbell, and reclaims packet buffers once the device reports
//! completions through the companion event ring.
//!
//! Queue and ring memory come from a configuration layer (see
//! [`TxQueueConfig`]); packet buffers come from an external allocator and
//! are handed over as owned [`TxBuffer`] handles. Each queue is driven by
//! a single thread (typically a dedicated polling core) and no call
//! blocks: a full ring shows up as a short accepted count from
//! [`TxQueue::transmit`], never as a wait.
//!
//! # Logging
//!
//! Enable the `defmt` feature on targets with a defmt sink, or the `log`
//! feature on hosted platforms. With neither, the crate stays silent.

#![no_std]

extern crate alloc;

#[macro_use]
mod macros;

mod descriptor;
mod doorbell;
mod event;
mod packet;
mod queue;
mod ring;

pub use descriptor::{TxDescriptor, TxDescriptorReader, TxDescriptorWriter, DESC_LEN_MAX};
pub use event::{TxEvent, EVENTS_PER_CACHE_LINE};
pub use packet::{Segment, TxBuffer};
pub use queue::{txq_limit, Error, TxQueue, TxQueueConfig};
