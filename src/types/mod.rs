pub const PULSE_MIN: u16 = 1000;
pub const PULSE_MAX: u16 = 2000;

/// One raw tri-axial accelerometer reading, normalized to g.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SensorSample {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl SensorSample {
    pub fn is_valid(&self) -> bool {
        !(self.x.is_nan() || self.y.is_nan() || self.z.is_nan())
    }
}

/// Commanded ESC pulse width in microseconds, always within the valid band.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct PulseWidth(u16);

impl PulseWidth {
    pub fn new(micros: u16) -> Self {
        Self(micros.clamp(PULSE_MIN, PULSE_MAX))
    }

    pub fn micros(self) -> u16 {
        self.0
    }
}

impl Default for PulseWidth {
    fn default() -> Self {
        Self(PULSE_MIN)
    }
}

mod test {
    #[test]
    fn test_pulse_width_clamp() {
        use super::PulseWidth;

        assert_eq!(PulseWidth::new(1500).micros(), 1500);
        assert_eq!(PulseWidth::new(200).micros(), 1000);
        assert_eq!(PulseWidth::new(3000).micros(), 2000);
    }
}
