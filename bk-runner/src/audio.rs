//! Host audio output.
//!
//! The emission thread drains the machine's PCM edge queue through
//! [`Synth`] and feeds the synthesized buffers into a cpal stream via a
//! sample ring. The ring holds a bounded amount of audio latency; pushing
//! against a full ring blocks the synth, which paces it to the sink's
//! consumption rate.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use machine_bk::audio::SAMPLES_PER_BUFFER;
use machine_bk::{Synth, OUTPUT_SAMPLE_RATE};
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapRb,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Rest level on underrun, matching a held-low output bit.
const REST_LEVEL: f32 = -0.5;

/// Output amplitude scale (full-scale square waves are unpleasant).
const AMPLITUDE: f32 = 0.5;

/// Most audio allowed to sit between the synth and the device. Edge
/// timestamps already wait up to one synthesis buffer in the PCM queue, so
/// this bounds total output latency at roughly a quarter second.
const SINK_LATENCY_MS: u64 = 200;

/// Silence written before the stream starts so the first synthesized
/// buffer never races an underrun.
const PRIME_LATENCY_MS: u64 = 90;

/// Samples covering `ms` of output.
const fn latency_samples(ms: u64) -> usize {
    (OUTPUT_SAMPLE_RATE as u64 * ms / 1000) as usize
}

/// cpal stream plus the producer side of the sample ring.
struct AudioSink {
    _stream: Stream,
    producer: ringbuf::HeapProd<f32>,
    scratch: Vec<f32>,
}

impl AudioSink {
    /// Open the default output device. Returns None if no device is
    /// available; the emulator then runs silent.
    fn new() -> Option<Self> {
        let device = cpal::default_host().default_output_device()?;

        let config = StreamConfig {
            channels: 1,
            sample_rate: SampleRate(OUTPUT_SAMPLE_RATE),
            buffer_size: cpal::BufferSize::Default,
        };

        let ring = HeapRb::<f32>::new(latency_samples(SINK_LATENCY_MS));
        let (mut producer, mut consumer) = ring.split();

        let silence = vec![REST_LEVEL; latency_samples(PRIME_LATENCY_MS)];
        let _ = producer.push_slice(&silence);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Underrun: hold the rest level rather than clicking.
                    let got = consumer.pop_slice(data);
                    data[got..].fill(REST_LEVEL);
                },
                |err| log::error!("audio stream error: {err}"),
                None,
            )
            .ok()?;

        stream.play().ok()?;

        Some(Self {
            _stream: stream,
            producer,
            scratch: Vec::with_capacity(SAMPLES_PER_BUFFER),
        })
    }

    /// Push one synthesized buffer, sleeping while the ring is full. The
    /// wait is sized well under the latency budget the ring represents.
    fn push_samples(&mut self, samples: &[i16]) {
        self.scratch.clear();
        self.scratch.extend(
            samples
                .iter()
                .map(|&sample| f32::from(sample) / f32::from(i16::MAX) * AMPLITUDE),
        );

        let mut offset = 0;
        while offset < self.scratch.len() {
            offset += self.producer.push_slice(&self.scratch[offset..]);
            if offset < self.scratch.len() {
                std::thread::sleep(Duration::from_millis(SINK_LATENCY_MS / 20));
            }
        }
    }
}

/// The audio emission thread.
pub struct AudioThread {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl AudioThread {
    /// Spawn the emission thread. The cpal stream is created inside the
    /// thread (streams are not `Send` on every backend).
    pub fn start(mut synth: Synth) -> Self {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let join = std::thread::Builder::new()
            .name("audio-output".into())
            .spawn(move || {
                let Some(mut sink) = AudioSink::new() else {
                    log::warn!("no audio output device, running silent");
                    return;
                };
                log::debug!("audio output started");
                let mut buffer = [0i16; SAMPLES_PER_BUFFER];
                while flag.load(Ordering::Relaxed) {
                    synth.fill(&mut buffer);
                    sink.push_samples(&buffer);
                }
                log::debug!("audio output stopped");
            })
            .expect("failed to spawn audio thread");

        Self {
            running,
            join: Some(join),
        }
    }

    /// Signal the thread to exit after its current buffer and join it.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
