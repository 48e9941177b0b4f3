//! Monotonic playback scheduler.
//!
//! Keeps a single cursor marking when the next chunk may begin. Chunks that
//! arrive faster than real time queue up back-to-back; chunks that arrive
//! after the cursor has passed start immediately. The cursor never moves
//! backwards, so playback can neither gap nor overlap.

use crate::audio::chunk::AudioChunk;
use crate::audio::sink::AudioSink;
use crate::error::Result;
use std::time::Instant;

/// Trait for time operations, allowing mock time in tests.
pub trait Clock: Send {
    /// Returns the current instant.
    fn now(&self) -> Instant;
}

/// Real system clock using `std::time::Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Scheduler that assigns gapless start times to incoming audio chunks.
pub struct PlaybackScheduler<C: Clock = SystemClock> {
    sink: Box<dyn AudioSink>,
    clock: C,
    /// Earliest instant the next chunk may start. None until the first
    /// enqueue of a session.
    next_play_at: Option<Instant>,
}

impl<C: Clock> PlaybackScheduler<C> {
    /// Creates a scheduler with the given sink and clock.
    pub fn with_clock(sink: Box<dyn AudioSink>, clock: C) -> Self {
        Self {
            sink,
            clock,
            next_play_at: None,
        }
    }

    /// Decodes a chunk and schedules it for gapless playback.
    ///
    /// Returns the assigned start instant, or None when the chunk was
    /// dropped because it failed to decode. A dropped chunk leaves the
    /// cursor untouched so the stream resumes in sync.
    pub fn enqueue(&mut self, chunk: AudioChunk) -> Result<Option<Instant>> {
        let pcm = match chunk.decode() {
            Ok(pcm) => pcm,
            Err(e) => {
                log::warn!("dropping undecodable audio chunk: {}", e);
                return Ok(None);
            }
        };

        let now = self.clock.now();
        let start = self.next_play_at.map_or(now, |cursor| cursor.max(now));
        let duration = pcm.duration();

        self.sink.schedule(pcm, start)?;
        self.next_play_at = Some(start + duration);
        Ok(Some(start))
    }

    /// Re-initializes the cursor for a new session.
    pub fn reset(&mut self) {
        self.next_play_at = None;
    }

    /// The instant the next enqueued chunk would start, if any is pending.
    pub fn next_play_at(&self) -> Option<Instant> {
        self.next_play_at
    }
}

impl PlaybackScheduler<SystemClock> {
    /// Creates a scheduler driven by the system clock.
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        Self::with_clock(sink, SystemClock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sink::CollectorSink;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Mock clock for testing that allows manual time advancement.
    #[derive(Debug, Clone)]
    struct MockClock {
        current: Arc<Mutex<Instant>>,
    }

    impl MockClock {
        fn new() -> Self {
            Self {
                current: Arc::new(Mutex::new(Instant::now())),
            }
        }

        fn advance(&self, duration: Duration) {
            let mut current = self.current.lock().unwrap();
            *current += duration;
        }

        fn now(&self) -> Instant {
            *self.current.lock().unwrap()
        }
    }

    impl Clock for MockClock {
        fn now(&self) -> Instant {
            MockClock::now(self)
        }
    }

    /// 500 ms of silence at the stream's default 24 kHz mono format.
    fn half_second_chunk() -> AudioChunk {
        AudioChunk::new(vec![0u8; 24_000])
    }

    #[test]
    fn test_back_to_back_scheduling_without_gaps() {
        let collector = CollectorSink::new();
        let clock = MockClock::new();
        let t0 = clock.now();
        let mut scheduler = PlaybackScheduler::with_clock(Box::new(collector.clone()), clock.clone());

        // Chunks of 500 ms arriving at t=0, 100, 1200 ms must start at
        // 0, 500 and 1200 ms: no overlap, no avoidable gap.
        scheduler.enqueue(half_second_chunk()).unwrap();
        clock.advance(Duration::from_millis(100));
        scheduler.enqueue(half_second_chunk()).unwrap();
        clock.advance(Duration::from_millis(1100));
        scheduler.enqueue(half_second_chunk()).unwrap();

        let starts: Vec<Duration> = collector
            .scheduled()
            .iter()
            .map(|s| s.start.duration_since(t0))
            .collect();
        assert_eq!(
            starts,
            vec![
                Duration::from_millis(0),
                Duration::from_millis(500),
                Duration::from_millis(1200),
            ]
        );
    }

    #[test]
    fn test_enqueue_returns_assigned_start() {
        let clock = MockClock::new();
        let t0 = clock.now();
        let mut scheduler =
            PlaybackScheduler::with_clock(Box::new(CollectorSink::new()), clock.clone());

        let first = scheduler.enqueue(half_second_chunk()).unwrap();
        assert_eq!(first, Some(t0));

        let second = scheduler.enqueue(half_second_chunk()).unwrap();
        assert_eq!(second, Some(t0 + Duration::from_millis(500)));
    }

    #[test]
    fn test_decode_failure_preserves_cursor() {
        let collector = CollectorSink::new();
        let clock = MockClock::new();
        let t0 = clock.now();
        let mut scheduler = PlaybackScheduler::with_clock(Box::new(collector.clone()), clock);

        scheduler.enqueue(half_second_chunk()).unwrap();
        let cursor = scheduler.next_play_at();

        // Odd byte length cannot decode; the chunk is skipped silently.
        let dropped = scheduler.enqueue(AudioChunk::new(vec![1, 2, 3])).unwrap();
        assert_eq!(dropped, None);
        assert_eq!(scheduler.next_play_at(), cursor);

        // The next good chunk lands exactly where the bad one would have.
        let next = scheduler.enqueue(half_second_chunk()).unwrap();
        assert_eq!(next, Some(t0 + Duration::from_millis(500)));
        assert_eq!(collector.scheduled().len(), 2);
    }

    #[test]
    fn test_reset_reinitializes_cursor() {
        let clock = MockClock::new();
        let mut scheduler =
            PlaybackScheduler::with_clock(Box::new(CollectorSink::new()), clock.clone());

        scheduler.enqueue(half_second_chunk()).unwrap();
        assert!(scheduler.next_play_at().is_some());

        scheduler.reset();
        assert!(scheduler.next_play_at().is_none());

        // After reset the next chunk starts at the current time, not at the
        // old cursor.
        clock.advance(Duration::from_millis(50));
        let start = scheduler.enqueue(half_second_chunk()).unwrap();
        assert_eq!(start, Some(clock.now()));
    }

    #[test]
    fn test_starts_never_overlap() {
        let collector = CollectorSink::new();
        let clock = MockClock::new();
        let mut scheduler = PlaybackScheduler::with_clock(Box::new(collector.clone()), clock.clone());

        for _ in 0..5 {
            scheduler.enqueue(half_second_chunk()).unwrap();
            clock.advance(Duration::from_millis(120));
        }

        let scheduled = collector.scheduled();
        for pair in scheduled.windows(2) {
            assert!(pair[1].start >= pair[0].start + pair[0].duration);
        }
    }
}
