//! Packet-buffer handles submitted for transmission.
//!
//! The queue never allocates packet memory. It takes ownership of handles
//! on submission, keeps each one alive in the shadow ring while the device
//! may still read its segments, and releases it (by drop) once the
//! device's completion covers it.

use embedded_dma::ReadBuffer;

/// One DMA-contiguous piece of a packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Segment {
    /// Bus address the device reads from. Pre-validated by the caller.
    pub addr: u64,
    /// Length in bytes.
    pub len: u16,
}

/// An owned, DMA-ready packet buffer.
///
/// Implementations must describe at least one segment, and the segment
/// memory must stay valid for device reads until the handle is dropped.
pub trait TxBuffer {
    /// Number of memory segments in this packet.
    fn segment_count(&self) -> usize;

    /// The `index`th segment; `index < segment_count()`.
    fn segment(&self, index: usize) -> Segment;
}

/// Any DMA-readable byte buffer is a single-segment packet, on platforms
/// where the device sees CPU addresses.
impl<B> TxBuffer for B
where
    B: ReadBuffer<Word = u8>,
{
    fn segment_count(&self) -> usize {
        1
    }

    fn segment(&self, index: usize) -> Segment {
        debug_assert_eq!(index, 0);
        let (ptr, len) = unsafe { self.read_buffer() };
        if len > u16::MAX as usize {
            panic!("DMA buffer is longer than a packet segment can be");
        }
        Segment {
            addr: ptr as u64,
            len: len as u16,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dma_buffer_is_a_single_segment() {
        static FRAME: [u8; 64] = [0u8; 64];
        let buf: &'static [u8] = &FRAME;

        assert_eq!(buf.segment_count(), 1);
        let seg = buf.segment(0);
        assert_eq!(seg.addr, FRAME.as_ptr() as u64);
        assert_eq!(seg.len, 64);
    }
}
