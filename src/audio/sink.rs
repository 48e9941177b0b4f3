//! Audio output sinks.
//!
//! The scheduler decides *when* a buffer plays; a sink is the seam that
//! actually plays it. This keeps scheduling arithmetic testable without an
//! audio device.

use crate::audio::chunk::PcmBuffer;
use crate::error::Result;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Pluggable playback output.
///
/// Implementations receive buffers with monotonically non-decreasing,
/// non-overlapping start times (the scheduler guarantees this).
pub trait AudioSink: Send {
    /// Accepts a decoded buffer to begin playing at `start`.
    fn schedule(&mut self, pcm: PcmBuffer, start: Instant) -> Result<()>;

    /// Name for logging/debugging.
    fn name(&self) -> &'static str {
        "sink"
    }
}

/// Record of one scheduled buffer, for inspection in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledPlayback {
    pub start: Instant,
    pub duration: Duration,
}

/// Sink that records scheduling decisions instead of playing audio.
#[derive(Clone, Default)]
pub struct CollectorSink {
    scheduled: Arc<Mutex<Vec<ScheduledPlayback>>>,
}

impl CollectorSink {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of everything scheduled so far.
    pub fn scheduled(&self) -> Vec<ScheduledPlayback> {
        self.scheduled
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl AudioSink for CollectorSink {
    fn schedule(&mut self, pcm: PcmBuffer, start: Instant) -> Result<()> {
        if let Ok(mut guard) = self.scheduled.lock() {
            guard.push(ScheduledPlayback {
                start,
                duration: pcm.duration(),
            });
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "collector"
    }
}

#[cfg(feature = "cpal-audio")]
pub mod cpal_sink {
    //! Real playback through the default output device.

    use super::AudioSink;
    use crate::audio::chunk::PcmBuffer;
    use crate::error::{AxonwatchError, Result};
    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, mpsc};
    use std::thread;
    use std::time::{Duration, Instant};

    struct Queued {
        start: Instant,
        samples: Vec<f32>,
        pos: usize,
    }

    /// Sink that plays scheduled buffers on the default cpal output device.
    ///
    /// The cpal stream is owned by a dedicated thread because streams are
    /// not `Send`; the sink itself only touches the shared queue.
    pub struct CpalAudioSink {
        queue: Arc<Mutex<VecDeque<Queued>>>,
        running: Arc<AtomicBool>,
    }

    impl CpalAudioSink {
        /// Opens the default output device with the given format.
        pub fn new(sample_rate: u32, channels: u16) -> Result<Self> {
            let queue: Arc<Mutex<VecDeque<Queued>>> = Arc::new(Mutex::new(VecDeque::new()));
            let running = Arc::new(AtomicBool::new(true));
            let (ready_tx, ready_rx) = mpsc::channel::<Result<()>>();

            let thread_queue = queue.clone();
            let thread_running = running.clone();
            thread::spawn(move || {
                let stream = match build_stream(sample_rate, channels, thread_queue) {
                    Ok(stream) => {
                        let _ = ready_tx.send(Ok(()));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                while thread_running.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(50));
                }
                drop(stream);
            });

            ready_rx
                .recv()
                .map_err(|_| AxonwatchError::AudioOutput {
                    message: "output thread exited before opening a stream".to_string(),
                })??;

            Ok(Self { queue, running })
        }
    }

    fn build_stream(
        sample_rate: u32,
        channels: u16,
        queue: Arc<Mutex<VecDeque<Queued>>>,
    ) -> Result<cpal::Stream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AxonwatchError::AudioOutput {
                message: "no default output device".to_string(),
            })?;

        let config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = device
            .build_output_stream(
                &config,
                move |out: &mut [f32], _| fill_output(out, &queue),
                |err| log::warn!("audio output stream error: {}", err),
                None,
            )
            .map_err(|e| AxonwatchError::AudioOutput {
                message: e.to_string(),
            })?;

        stream.play().map_err(|e| AxonwatchError::AudioOutput {
            message: e.to_string(),
        })?;

        Ok(stream)
    }

    fn fill_output(out: &mut [f32], queue: &Arc<Mutex<VecDeque<Queued>>>) {
        let Ok(mut queue) = queue.lock() else {
            out.fill(0.0);
            return;
        };

        let now = Instant::now();
        for slot in out.iter_mut() {
            *slot = match queue.front_mut() {
                Some(front) if front.start <= now => {
                    let sample = front.samples[front.pos];
                    front.pos += 1;
                    if front.pos == front.samples.len() {
                        queue.pop_front();
                    }
                    sample
                }
                // Not due yet, or nothing queued: silence.
                _ => 0.0,
            };
        }
    }

    impl AudioSink for CpalAudioSink {
        fn schedule(&mut self, pcm: PcmBuffer, start: Instant) -> Result<()> {
            if let Ok(mut queue) = self.queue.lock() {
                queue.push_back(Queued {
                    start,
                    samples: pcm.samples,
                    pos: 0,
                });
            }
            Ok(())
        }

        fn name(&self) -> &'static str {
            "cpal"
        }
    }

    impl Drop for CpalAudioSink {
        fn drop(&mut self) {
            self.running.store(false, Ordering::SeqCst);
        }
    }
}
