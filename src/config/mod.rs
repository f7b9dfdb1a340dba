pub mod runtime;

pub use runtime::Runtime;

use core::time::Duration;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Estimator {
    /// Initial error covariance of the Kalman filter.
    pub p0: f32,
    pub q: f32,
    pub r: f32,
    /// Smoothing coefficient of the low-pass stage after the Kalman step.
    pub alpha: f32,
    /// Consecutive faults tolerated before the sensor is re-initialized.
    pub fault_limit: u8,
}

impl Default for Estimator {
    fn default() -> Self {
        Self { p0: 0.5, q: 0.01, r: 1.5, alpha: 0.1, fault_limit: 10 }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Encoder {
    pub pulses_per_rev: u16,
    pub quadrature_mode: u8,
}

impl Default for Encoder {
    fn default() -> Self {
        Self { pulses_per_rev: 600, quadrature_mode: 4 }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Gains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Derivative filter break parameter.
    pub n: f32,
}

impl Default for Gains {
    fn default() -> Self {
        Self { kp: 0.0, ki: 0.0, kd: 0.0, n: 1.0 }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Esc {
    pub debounce: Duration,
    /// Window in which a second press starts the calibration sequence; once
    /// it elapses a single press accepts the current trim.
    pub second_press: Duration,
    /// Relay acknowledgement pulse after the first press.
    pub ack_pulse: Duration,
    pub max_pulse_hold: Duration,
    pub relay_on_hold: Duration,
    pub min_pulse_hold: Duration,
}

impl Default for Esc {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            second_press: Duration::from_secs(3),
            ack_pulse: Duration::from_secs(1),
            max_pulse_hold: Duration::from_secs(1),
            relay_on_hold: Duration::from_secs(4),
            min_pulse_hold: Duration::from_secs(1),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Fcs {
    /// Pulse width the controller output is centered on.
    pub base_us: f32,
    pub min_reference: f32,
    pub max_reference: f32,
}

impl Default for Fcs {
    fn default() -> Self {
        Self { base_us: 1000.0, min_reference: -50.0, max_reference: 15.0 }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Control {
    pub sample_period: Duration,
    /// Telemetry is emitted every this many control ticks.
    pub telemetry_divider: u32,
}

impl Default for Control {
    fn default() -> Self {
        Self { sample_period: Duration::from_millis(10), telemetry_divider: 5 }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub estimator: Estimator,
    pub encoder: Encoder,
    pub gains: Gains,
    pub esc: Esc,
    pub fcs: Fcs,
    pub control: Control,
}
