use core::sync::atomic::{AtomicI32, Ordering};

use crate::config;
use crate::estimator::{AngleSource, Fault};

/// Quadrature pulse counter shared with the encoder edge interrupt.
///
/// The count lives in a single atomic, so the interrupt publishes unguarded
/// writes while loop-side readers take one-shot snapshots that can never be
/// torn. This replaces the interrupt-disable bracketing the rig used before.
pub struct QuadratureCounter(AtomicI32);

impl QuadratureCounter {
    pub const fn new() -> Self {
        Self(AtomicI32::new(0))
    }

    /// Edge handler for channel A, both flanks: equal channel levels count up,
    /// unequal count down. Two-state decode, half the resolution of a full
    /// four-state table; kept to match the rig's established behavior.
    pub fn on_edge(&self, a: bool, b: bool) {
        if a == b {
            self.0.fetch_add(1, Ordering::Relaxed);
        } else {
            self.0.fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> i32 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Turns the shared pulse count into a calibrated angle, the rig's alternate
/// angle source next to the accelerometer estimator.
pub struct EncoderTracker<'a> {
    counter: &'a QuadratureCounter,
    offset: f32,
    factor: f32,
}

impl<'a> EncoderTracker<'a> {
    pub fn new(counter: &'a QuadratureCounter, config: &config::Encoder) -> Self {
        let pulses_per_turn = config.pulses_per_rev as f32 * config.quadrature_mode as f32;
        Self { counter, offset: 0.0, factor: 360.0 / pulses_per_turn }
    }

    /// Pins the current count to a known mechanical angle.
    pub fn calibrate(&mut self, known_angle: f32) {
        self.offset = known_angle - self.counter.snapshot() as f32 * self.factor;
    }

    pub fn read_angle(&self) -> f32 {
        -(self.counter.snapshot() as f32 * self.factor + self.offset)
    }
}

impl<'a> AngleSource for EncoderTracker<'a> {
    fn update(&mut self) -> Result<f32, Fault> {
        Ok(self.read_angle())
    }

    fn angle(&self) -> f32 {
        self.read_angle()
    }
}

mod test {
    #[test]
    fn test_two_state_decode() {
        use super::QuadratureCounter;

        let counter = QuadratureCounter::new();
        counter.on_edge(true, true);
        counter.on_edge(false, false);
        assert_eq!(counter.snapshot(), 2);
        counter.on_edge(true, false);
        assert_eq!(counter.snapshot(), 1);
    }

    #[test]
    fn test_angle_conversion_and_calibration() {
        use super::{EncoderTracker, QuadratureCounter};

        let counter = QuadratureCounter::new();
        let config = crate::config::Encoder::default();
        let mut tracker = EncoderTracker::new(&counter, &config);

        // 600 ppr x4 -> 0.15 degree per pulse
        for _ in 0..100 {
            counter.on_edge(true, true);
        }
        assert!((tracker.read_angle() + 15.0).abs() < 1e-3);

        tracker.calibrate(10.0);
        assert!((tracker.read_angle() + 10.0).abs() < 1e-3);
        for _ in 0..100 {
            counter.on_edge(true, false);
        }
        assert!((tracker.read_angle() - 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_snapshot_under_concurrent_edges() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::thread;

        use super::QuadratureCounter;

        static COUNTER: QuadratureCounter = QuadratureCounter::new();
        static DONE: AtomicBool = AtomicBool::new(false);

        let injector = thread::spawn(|| {
            for _ in 0..100_000 {
                COUNTER.on_edge(true, true);
            }
            DONE.store(true, Ordering::Release);
        });

        let mut last = 0;
        while !DONE.load(Ordering::Acquire) {
            let snapshot = COUNTER.snapshot();
            // monotonic under increment-only injection; a torn read would not be
            assert!(snapshot >= last);
            last = snapshot;
        }
        injector.join().unwrap();
        assert_eq!(COUNTER.snapshot(), 100_000);
    }
}
