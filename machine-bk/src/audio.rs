//! One-bit PCM audio output (bit 6 of the system register).
//!
//! The CPU thread records the CPU time of every toggle of the output bit
//! into a fixed-capacity timestamp queue. A separate emission thread drains
//! the queue through [`Synth`], which reconstructs the square wave as
//! signed 16-bit mono samples at [`OUTPUT_SAMPLE_RATE`]. Overflow and
//! underflow are logged and non-fatal: overflow drops the new edge,
//! underflow just holds the current level.

use bk_core::{Cycles, MasterClock};
use std::sync::{Arc, Mutex};

use crate::device::Device;

/// The audio output bit in the system register.
pub const OUTPUT_BIT: u16 = 1 << 6;

/// Audio sample rate in Hz.
pub const OUTPUT_SAMPLE_RATE: u32 = 22050;

/// Samples per synthesis buffer.
pub const SAMPLES_PER_BUFFER: usize = 1024;

const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Fixed-capacity FIFO of edge timestamps in CPU cycles.
///
/// One mutex guards the ring indices; producer (CPU thread) and consumer
/// (emission thread) touch nothing else in common.
pub struct PcmTimestampQueue {
    inner: Mutex<Ring>,
}

struct Ring {
    buf: Vec<u64>,
    put: usize,
    get: usize,
    len: usize,
}

impl PcmTimestampQueue {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Ring {
                buf: vec![0; capacity.max(1)],
                put: 0,
                get: 0,
                len: 0,
            }),
        }
    }

    /// Capacity for one synthesis buffer, assuming edges come no faster
    /// than one base-instruction time apart.
    #[must_use]
    pub fn sized_for(clock: &MasterClock, buffer_samples: usize) -> Self {
        let capacity = buffer_samples as u64 * clock.frequency_hz
            / (u64::from(OUTPUT_SAMPLE_RATE) * u64::from(cpu_k1801::BASE_EXECUTION_TIME));
        Self::new(capacity as usize)
    }

    /// Append an edge timestamp. On overflow the new edge is dropped.
    pub fn push(&self, timestamp: u64) {
        let mut ring = self.inner.lock().expect("pcm queue poisoned");
        if ring.len == ring.buf.len() {
            log::warn!("PCM timestamp queue overflow, dropping edge at {timestamp}");
            return;
        }
        let put = ring.put;
        ring.buf[put] = timestamp;
        ring.put = (put + 1) % ring.buf.len();
        ring.len += 1;
    }

    /// The oldest queued timestamp, if any.
    #[must_use]
    pub fn peek(&self) -> Option<u64> {
        let ring = self.inner.lock().expect("pcm queue poisoned");
        (ring.len > 0).then(|| ring.buf[ring.get])
    }

    /// Remove and return the oldest timestamp.
    pub fn pop(&self) -> Option<u64> {
        let mut ring = self.inner.lock().expect("pcm queue poisoned");
        if ring.len == 0 {
            log::warn!("PCM timestamp queue underflow");
            return None;
        }
        let value = ring.buf[ring.get];
        ring.get = (ring.get + 1) % ring.buf.len();
        ring.len -= 1;
        Some(value)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().expect("pcm queue poisoned").len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The audio output device: claims the system register and turns toggles of
/// the output bit into queued edge timestamps.
pub struct AudioOutput {
    queue: Arc<PcmTimestampQueue>,
    last_output_state: u16,
}

impl AudioOutput {
    #[must_use]
    pub fn new(clock: &MasterClock) -> Self {
        Self {
            queue: Arc::new(PcmTimestampQueue::sized_for(clock, SAMPLES_PER_BUFFER)),
            last_output_state: 0,
        }
    }

    /// Handle to the edge queue for the emission side.
    #[must_use]
    pub fn queue(&self) -> Arc<PcmTimestampQueue> {
        Arc::clone(&self.queue)
    }
}

impl Device for AudioOutput {
    fn addresses(&self) -> &[u16] {
        &[crate::sel1::SEL1_ADDRESS]
    }

    fn init(&mut self, _cpu_time: Cycles) {
        self.last_output_state = 0;
    }

    fn read(&mut self, _cpu_time: Cycles, _address: u16) -> u16 {
        // Write-only: the system register bits are read back elsewhere.
        0
    }

    fn write(&mut self, cpu_time: Cycles, _byte_mode: bool, _address: u16, value: u16) {
        let output_state = value & OUTPUT_BIT;
        if output_state ^ self.last_output_state != 0 {
            self.queue.push(cpu_time.get());
        }
        self.last_output_state = output_state;
    }
}

/// Square-wave synthesizer: drains edge timestamps into sample buffers.
///
/// `last_ts` is the CPU time at the start of the next buffer; it advances
/// by exactly the buffer duration each fill, so drift against the CPU clock
/// never accumulates beyond the sink's own pacing error.
pub struct Synth {
    queue: Arc<PcmTimestampQueue>,
    clock: MasterClock,
    last_value: i16,
    last_ts: u64,
}

impl Synth {
    #[must_use]
    pub fn new(queue: Arc<PcmTimestampQueue>, clock: MasterClock) -> Self {
        Self {
            queue,
            clock,
            last_value: i16::MIN,
            last_ts: 0,
        }
    }

    /// Restart phase tracking from the given CPU time.
    pub fn rewind(&mut self, cpu_time: Cycles) {
        self.last_ts = cpu_time.get();
        self.last_value = i16::MIN;
    }

    /// Fill one buffer, consuming every edge that falls inside its window.
    ///
    /// Edge positions are computed from the buffer start, not from the
    /// previous edge, so truncation never accumulates: each edge lands
    /// within one sample of `t * rate`.
    pub fn fill(&mut self, buf: &mut [i16]) {
        let rate = u64::from(OUTPUT_SAMPLE_RATE);
        let buffer_nanos = buf.len() as u64 * NANOS_PER_SECOND / rate;
        let end_ts = self.last_ts + self.clock.nanos_to_cycles(buffer_nanos).get();

        let mut index = 0;
        while index < buf.len() {
            let value = self.last_value;
            let mut count = buf.len() - index;

            let edge = match self.queue.peek() {
                Some(ts) if ts <= end_ts => {
                    self.queue.pop();
                    Some(ts)
                }
                _ => None,
            };
            if let Some(ts) = edge {
                let elapsed = self
                    .clock
                    .cycles_to_nanos(Cycles::new(ts.saturating_sub(self.last_ts)));
                let position = (elapsed * rate / NANOS_PER_SECOND) as usize;
                count = count.min(position.saturating_sub(index));
                self.last_value = if value > 0 { i16::MIN } else { i16::MAX };
            }

            buf[index..index + count].fill(value);
            index += count;

            if edge.is_none() {
                break;
            }
        }
        // An edge may land exactly at the end of the window with no samples
        // left to emit; the flipped level carries into the next buffer.
        buf[index..].fill(self.last_value);

        self.last_ts = end_ts;
    }
}
