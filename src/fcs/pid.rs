use crate::config::{Control, Fcs, Gains};
use crate::types::{PulseWidth, PULSE_MAX, PULSE_MIN};

/// Filtered-derivative PID ("PIDf"). The derivative term is first-order
/// low-pass filtered with break parameter N so sensor noise is not amplified.
/// The integral is held on any tick whose pre-clamp output saturates the
/// pulse-width band.
pub struct PID {
    sample_period: f32,
    base_us: f32,
    integral: f32,
    derivative: f32,
    previous_error: f32,
}

impl PID {
    pub fn new(control: &Control, fcs: &Fcs) -> Self {
        Self {
            sample_period: control.sample_period.as_secs_f32(),
            base_us: fcs.base_us,
            integral: 0.0,
            derivative: 0.0,
            previous_error: 0.0,
        }
    }

    /// One control step, mapping angle error in degrees to a pulse width.
    /// Gains are read fresh every call so host updates apply mid-run; PID
    /// state is deliberately not reset on a gain change.
    pub fn next_pulse(&mut self, error: f32, gains: &Gains) -> PulseWidth {
        let ts = self.sample_period;
        self.derivative += gains.n * ts * ((error - self.previous_error) / ts - self.derivative);
        self.previous_error = error;

        let integral = self.integral + error * ts;
        let u = gains.kp * error + gains.ki * integral + gains.kd * self.derivative;
        let raw = self.base_us + u;
        if (PULSE_MIN as f32..=PULSE_MAX as f32).contains(&raw) {
            self.integral = integral;
        }
        PulseWidth::new(raw as u16)
    }
}

mod test {
    #[cfg(test)]
    use crate::config::{Control, Fcs, Gains};

    #[cfg(test)]
    fn pid(base_us: f32) -> super::PID {
        let fcs = Fcs { base_us, ..Fcs::default() };
        super::PID::new(&Control::default(), &fcs)
    }

    #[test]
    fn test_proportional_mapping() {
        let mut pid = pid(1500.0);
        let gains = Gains { kp: 2.0, ..Gains::default() };
        assert_eq!(pid.next_pulse(10.0, &gains).micros(), 1520);
        assert_eq!(pid.next_pulse(-10.0, &gains).micros(), 1480);
    }

    #[test]
    fn test_output_clamped() {
        let mut pid = pid(1500.0);
        let gains = Gains { kp: 100.0, ..Gains::default() };
        assert_eq!(pid.next_pulse(50.0, &gains).micros(), 2000);
        assert_eq!(pid.next_pulse(-50.0, &gains).micros(), 1000);
    }

    #[test]
    fn test_integral_frozen_while_saturated() {
        let mut pid = pid(1500.0);
        let gains = Gains { kp: 20.0, ki: 10.0, ..Gains::default() };
        for _ in 0..100 {
            assert_eq!(pid.next_pulse(100.0, &gains).micros(), 2000);
        }
        // a frozen integral lets the output leave the rail as soon as the
        // error collapses; a wound-up one would pin it there
        assert!(pid.next_pulse(0.1, &gains).micros() < 1600);
    }

    #[test]
    fn test_integral_accumulates_inside_band() {
        let mut pid = pid(1500.0);
        let gains = Gains { ki: 10.0, ..Gains::default() };
        let first = pid.next_pulse(10.0, &gains).micros();
        let second = pid.next_pulse(10.0, &gains).micros();
        assert!(second > first);
    }

    #[test]
    fn test_derivative_is_filtered() {
        let mut pid = pid(1500.0);
        let gains = Gains { kd: 1.0, n: 10.0, ..Gains::default() };
        // error step: the filtered derivative rises over a few samples instead
        // of spiking on the first one
        let first = pid.next_pulse(1.0, &gains).micros();
        let raw_spike = 1500 + (1.0 / 0.01) as u16;
        assert!(first > 1500 && first < raw_spike);
    }

    #[test]
    fn test_gain_change_keeps_state() {
        let mut pid = pid(1500.0);
        let soft = Gains { ki: 10.0, ..Gains::default() };
        for _ in 0..10 {
            pid.next_pulse(10.0, &soft);
        }
        let integral = pid.integral;
        let hot = Gains { kp: 1.0, ki: 10.0, ..Gains::default() };
        pid.next_pulse(0.0, &hot);
        assert_eq!(pid.integral, integral);
        assert!(integral > 0.0);
    }
}
