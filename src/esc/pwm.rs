use embedded_hal::PwmPin;

/// Microsecond-command front end for an ESC driven by a PWM channel refreshed
/// at `rate` Hz.
pub struct PwmEsc<P> {
    pwm: P,
    rate: u16,
}

fn to_duty(max_duty: u16, rate: u16, micros: u16) -> u16 {
    let duty_per_ms = max_duty as u32 * rate as u32 / 1000;
    (duty_per_ms * micros as u32 / 1000) as u16
}

impl<P: PwmPin<Duty = u16>> PwmEsc<P> {
    pub fn new(mut pwm: P, rate: u16) -> Self {
        pwm.enable();
        Self { pwm, rate }
    }

    pub fn write_micros(&mut self, micros: u16) {
        let max_duty = self.pwm.get_max_duty();
        self.pwm.set_duty(to_duty(max_duty, self.rate, micros));
    }
}

mod test {
    #[test]
    fn test_to_duty() {
        use super::to_duty;

        let max_duty = 20000;
        assert_eq!(to_duty(max_duty, 50, 1000), 1000);
        assert_eq!(to_duty(max_duty, 50, 1500), 1500);
        assert_eq!(to_duty(max_duty, 50, 2000), 2000);
        assert_eq!(to_duty(40000, 400, 2000), 32000);
    }
}
