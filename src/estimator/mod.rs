#[allow(unused_imports)] // false warning
use micromath::F32Ext;

use crate::algorithm::average::MovingAverage;
use crate::algorithm::kalman::Kalman;
use crate::algorithm::lpf::LPF;
use crate::config;
use crate::hal::sensors::Accelerometer;
use crate::types::SensorSample;

pub const AVERAGE_WINDOW: usize = 20;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Fault {
    /// A sample was rejected before filtering; the last valid angle is held.
    InvalidReading,
    /// Re-initialization after repeated faults did not bring the sensor back.
    SensorUnavailable,
}

/// Anything that turns ticks into a filtered angle, in degrees.
pub trait AngleSource {
    fn update(&mut self) -> Result<f32, Fault>;

    /// Last valid output, held across faults.
    fn angle(&self) -> f32;
}

pub trait Filter {
    fn filter(&mut self, angle: f32) -> f32;
}

pub struct KalmanLpf {
    kalman: Kalman,
    lpf: LPF<f32>,
}

impl Filter for KalmanLpf {
    fn filter(&mut self, angle: f32) -> f32 {
        self.lpf.filter(self.kalman.filter(angle))
    }
}

pub struct Lowpass(LPF<f32>);

impl Filter for Lowpass {
    fn filter(&mut self, angle: f32) -> f32 {
        self.0.filter(angle)
    }
}

pub struct Average(MovingAverage<AVERAGE_WINDOW>);

impl Filter for Average {
    fn filter(&mut self, angle: f32) -> f32 {
        self.0.filter(angle)
    }
}

/// Runtime-selectable filter strategy. All variants are drop-in replacements
/// behind the same estimator contract.
pub enum Strategy {
    KalmanLpf(KalmanLpf),
    Lowpass(Lowpass),
    Average(Average),
}

impl Strategy {
    pub fn kalman_lpf(config: &config::Estimator) -> Self {
        let kalman = Kalman::new(config.p0, config.q, config.r);
        let lpf = LPF::with_alpha(config.alpha);
        Self::KalmanLpf(KalmanLpf { kalman, lpf })
    }

    pub fn lowpass(config: &config::Estimator) -> Self {
        Self::Lowpass(Lowpass(LPF::with_alpha(config.alpha)))
    }

    pub fn average() -> Self {
        Self::Average(Average(MovingAverage::new()))
    }
}

impl Filter for Strategy {
    fn filter(&mut self, angle: f32) -> f32 {
        match self {
            Self::KalmanLpf(filter) => filter.filter(angle),
            Self::Lowpass(filter) => filter.filter(angle),
            Self::Average(filter) => filter.filter(angle),
        }
    }
}

pub struct AngleEstimator<A> {
    sensor: A,
    strategy: Strategy,
    offset: f32,
    angle: f32,
    faults: u8,
    fault_limit: u8,
    unavailable: bool,
}

impl<A: Accelerometer> AngleEstimator<A> {
    pub fn new(sensor: A, strategy: Strategy, config: &config::Estimator) -> Self {
        Self {
            sensor,
            strategy,
            offset: 0.0,
            angle: 0.0,
            faults: 0,
            fault_limit: config.fault_limit,
            unavailable: false,
        }
    }

    /// Permanently biases all future raw readings, zeroing the sensor against
    /// a known equilibrium angle.
    pub fn configure_offset(&mut self, offset: f32) {
        self.offset = offset;
    }

    fn raw_angle(&self, sample: &SensorSample) -> f32 {
        let gravity = (sample.y * sample.y + sample.z * sample.z).sqrt();
        (-sample.x).atan2(gravity).to_degrees() - self.offset
    }

    fn fault(&mut self) -> Fault {
        if self.unavailable {
            return Fault::SensorUnavailable;
        }
        self.faults += 1;
        if self.faults < self.fault_limit {
            return Fault::InvalidReading;
        }
        warn!("sensor fault limit reached, reinitializing");
        self.faults = 0;
        if self.sensor.init().is_err() || !self.sensor.probe() {
            warn!("sensor unavailable");
            self.unavailable = true;
            return Fault::SensorUnavailable;
        }
        Fault::InvalidReading
    }
}

impl<A: Accelerometer> AngleSource for AngleEstimator<A> {
    /// Rejects invalid samples before they ever reach the filter, so NaN can
    /// not corrupt the running estimate.
    fn update(&mut self) -> Result<f32, Fault> {
        if !self.sensor.probe() {
            return Err(self.fault());
        }
        let sample = match self.sensor.read() {
            Ok(sample) if sample.is_valid() => sample,
            _ => return Err(self.fault()),
        };
        self.faults = 0;
        self.unavailable = false;
        let raw = self.raw_angle(&sample);
        self.angle = self.strategy.filter(raw);
        Ok(self.angle)
    }

    fn angle(&self) -> f32 {
        self.angle
    }
}

mod test {
    #[cfg(test)]
    use crate::types::SensorSample;

    #[cfg(test)]
    struct FakeSensor {
        sample: SensorSample,
        alive: bool,
        init_ok: bool,
        inits: usize,
    }

    #[cfg(test)]
    impl crate::hal::sensors::Accelerometer for FakeSensor {
        type Error = ();

        fn init(&mut self) -> Result<(), ()> {
            self.inits += 1;
            if self.init_ok {
                self.alive = true;
                Ok(())
            } else {
                Err(())
            }
        }

        fn probe(&mut self) -> bool {
            self.alive
        }

        fn read(&mut self) -> Result<SensorSample, ()> {
            Ok(self.sample)
        }
    }

    #[cfg(test)]
    fn estimator(sensor: FakeSensor) -> super::AngleEstimator<FakeSensor> {
        let config = crate::config::Estimator::default();
        super::AngleEstimator::new(sensor, super::Strategy::average(), &config)
    }

    #[test]
    fn test_tilt_angle() {
        use super::AngleSource;

        let sample = SensorSample { x: -0.5, y: 0.0, z: 0.866 };
        let sensor = FakeSensor { sample, alive: true, init_ok: true, inits: 0 };
        let mut estimator = estimator(sensor);
        let angle = estimator.update().unwrap();
        assert!((angle - 30.0).abs() < 0.1);
    }

    #[test]
    fn test_offset_bias() {
        use super::AngleSource;

        let sample = SensorSample { x: 0.0, y: 0.0, z: 1.0 };
        let sensor = FakeSensor { sample, alive: true, init_ok: true, inits: 0 };
        let mut estimator = estimator(sensor);
        estimator.configure_offset(5.0);
        let angle = estimator.update().unwrap();
        assert!((angle + 5.0).abs() < 1e-3);
    }

    #[test]
    fn test_invalid_sample_holds_last_angle() {
        use super::{AngleSource, Fault};

        let sample = SensorSample { x: 0.0, y: 0.0, z: 1.0 };
        let sensor = FakeSensor { sample, alive: true, init_ok: true, inits: 0 };
        let mut estimator = estimator(sensor);
        estimator.update().unwrap();
        let held = estimator.angle();

        estimator.sensor.sample.x = f32::NAN;
        assert_eq!(estimator.update(), Err(Fault::InvalidReading));
        assert_eq!(estimator.angle(), held);
    }

    #[test]
    fn test_reinitialize_after_fault_limit() {
        use super::{AngleSource, Fault};

        let sample = SensorSample { x: 0.0, y: 0.0, z: 1.0 };
        let sensor = FakeSensor { sample, alive: false, init_ok: true, inits: 0 };
        let mut estimator = estimator(sensor);
        for _ in 0..9 {
            assert_eq!(estimator.update(), Err(Fault::InvalidReading));
        }
        assert_eq!(estimator.sensor.inits, 0);
        assert_eq!(estimator.update(), Err(Fault::InvalidReading));
        assert_eq!(estimator.sensor.inits, 1);
        assert!(estimator.update().is_ok());
    }

    #[test]
    fn test_sensor_unavailable_is_persistent() {
        use super::{AngleSource, Fault};

        let sample = SensorSample { x: 0.0, y: 0.0, z: 1.0 };
        let sensor = FakeSensor { sample, alive: false, init_ok: false, inits: 0 };
        let mut estimator = estimator(sensor);
        for _ in 0..9 {
            estimator.update().ok();
        }
        assert_eq!(estimator.update(), Err(Fault::SensorUnavailable));
        assert_eq!(estimator.update(), Err(Fault::SensorUnavailable));
        assert_eq!(estimator.sensor.inits, 1);
    }
}
