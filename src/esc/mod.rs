pub mod pwm;
pub mod switch;

pub use pwm::PwmEsc;
pub use switch::Debouncer;

use core::time::Duration;

use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::PwmPin;

use crate::config;
use crate::types::{PulseWidth, PULSE_MAX, PULSE_MIN};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Calibration {
    Idle,
    AwaitingSecondPress,
    Calibrating,
    Calibrated,
}

#[derive(Copy, Clone, PartialEq)]
enum Step {
    MaxPulse,
    RelayOn,
    MinPulse,
}

/// Gate in front of the ESC: owns the calibration state machine and the
/// ramped pulse writer. All actuation flows through `write_speed`, which is
/// refused until the sequence has completed.
///
/// The original rig blocked inside the calibration delays; here every hold is
/// a deadline polled from the control loop, so the starvation of other duties
/// during calibration is explicit in the supervisor instead of a side effect.
pub struct EscSafety<P, SW, RL> {
    config: config::Esc,
    esc: PwmEsc<P>,
    switch: SW,
    relay: RL,
    debouncer: Debouncer,
    state: Calibration,
    step: Step,
    deadline: Duration,
    first_press: Duration,
    relay_release: Option<Duration>,
    current: u16,
    last_ramp: Duration,
}

impl<P, SW, RL> EscSafety<P, SW, RL>
where
    P: PwmPin<Duty = u16>,
    SW: InputPin,
    RL: OutputPin,
{
    pub fn new(mut esc: PwmEsc<P>, switch: SW, relay: RL, config: &config::Esc) -> Self {
        esc.write_micros(PULSE_MIN);
        Self {
            config: *config,
            esc,
            switch,
            relay,
            debouncer: Debouncer::new(config.debounce),
            state: Calibration::Idle,
            step: Step::MaxPulse,
            deadline: Duration::ZERO,
            first_press: Duration::ZERO,
            relay_release: None,
            current: PULSE_MIN,
            last_ramp: Duration::ZERO,
        }
    }

    pub fn state(&self) -> Calibration {
        self.state
    }

    /// Live pulse width in microseconds.
    pub fn pulse(&self) -> u16 {
        self.current
    }

    /// Advance switch debouncing, the calibration sequence and relay timing.
    /// Call once per tick with a monotonic timestamp.
    pub fn poll(&mut self, now: Duration) {
        let level = self.switch.is_high().unwrap_or(false);
        let pressed = self.debouncer.poll(level, now);
        if let Some(release) = self.relay_release {
            if now >= release {
                self.relay.set_low().ok();
                self.relay_release = None;
            }
        }
        match self.state {
            Calibration::Idle => {
                if pressed {
                    self.esc.write_micros(PULSE_MIN);
                    self.current = PULSE_MIN;
                    self.relay.set_high().ok();
                    self.relay_release = Some(now + self.config.ack_pulse);
                    self.first_press = now;
                    self.state = Calibration::AwaitingSecondPress;
                    info!("first press, waiting for the second");
                }
            }
            Calibration::AwaitingSecondPress => {
                if pressed && now - self.first_press <= self.config.second_press {
                    self.relay.set_low().ok();
                    self.relay_release = None;
                    self.esc.write_micros(PULSE_MAX);
                    self.current = PULSE_MAX;
                    self.step = Step::MaxPulse;
                    self.deadline = now + self.config.max_pulse_hold;
                    self.state = Calibration::Calibrating;
                    info!("ESC calibration started");
                } else if now - self.first_press > self.config.second_press {
                    // single press accepts the current trim without running
                    // the relay sequence
                    self.state = Calibration::Calibrated;
                    self.last_ramp = now;
                    info!("no second press, current trim accepted");
                }
            }
            Calibration::Calibrating => {
                if now < self.deadline {
                    return;
                }
                match self.step {
                    Step::MaxPulse => {
                        self.relay.set_high().ok();
                        self.step = Step::RelayOn;
                        self.deadline = now + self.config.relay_on_hold;
                    }
                    Step::RelayOn => {
                        self.esc.write_micros(PULSE_MIN);
                        self.current = PULSE_MIN;
                        self.step = Step::MinPulse;
                        self.deadline = now + self.config.min_pulse_hold;
                    }
                    Step::MinPulse => {
                        self.state = Calibration::Calibrated;
                        self.last_ramp = now;
                        info!("ESC calibration completed");
                    }
                }
            }
            Calibration::Calibrated => {
                if pressed {
                    info!("already calibrated, restart to calibrate again");
                }
            }
        }
    }

    /// Ramp the live pulse toward `target` at no more than one microsecond
    /// per elapsed millisecond. Rejected until calibration has completed.
    pub fn write_speed(&mut self, target: PulseWidth, now: Duration) -> bool {
        if self.state != Calibration::Calibrated {
            return false;
        }
        let elapsed = now.saturating_sub(self.last_ramp).as_millis() as u32;
        if elapsed == 0 {
            return true;
        }
        self.last_ramp = now;
        let delta = target.micros() as i32 - self.current as i32;
        let step = delta.unsigned_abs().min(elapsed) as i32;
        self.current = (self.current as i32 + step * delta.signum()) as u16;
        self.esc.write_micros(self.current);
        true
    }
}

#[cfg(test)]
mod test {
    use core::cell::Cell;
    use core::convert::Infallible;
    use core::time::Duration;

    use crate::config;
    use crate::types::PulseWidth;

    use super::{Calibration, EscSafety, PwmEsc};

    #[derive(Default)]
    struct FakePwm {
        duty: u16,
    }

    impl embedded_hal::PwmPin for FakePwm {
        type Duty = u16;

        fn disable(&mut self) {}
        fn enable(&mut self) {}

        fn get_duty(&self) -> u16 {
            self.duty
        }

        fn get_max_duty(&self) -> u16 {
            20000
        }

        fn set_duty(&mut self, duty: u16) {
            self.duty = duty;
        }
    }

    struct FakeSwitch<'a>(&'a Cell<bool>);

    impl<'a> embedded_hal::digital::v2::InputPin for FakeSwitch<'a> {
        type Error = Infallible;

        fn is_high(&self) -> Result<bool, Infallible> {
            Ok(self.0.get())
        }

        fn is_low(&self) -> Result<bool, Infallible> {
            Ok(!self.0.get())
        }
    }

    struct FakeRelay<'a> {
        cycles: &'a Cell<usize>,
    }

    impl<'a> embedded_hal::digital::v2::OutputPin for FakeRelay<'a> {
        type Error = Infallible;

        fn set_low(&mut self) -> Result<(), Infallible> {
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Infallible> {
            self.cycles.set(self.cycles.get() + 1);
            Ok(())
        }
    }

    fn safety<'a>(
        level: &'a Cell<bool>,
        relay_cycles: &'a Cell<usize>,
    ) -> EscSafety<FakePwm, FakeSwitch<'a>, FakeRelay<'a>> {
        let config = config::Esc::default();
        let esc = PwmEsc::new(FakePwm::default(), 50);
        EscSafety::new(esc, FakeSwitch(level), FakeRelay { cycles: relay_cycles }, &config)
    }

    fn press(level: &Cell<bool>, esc: &mut EscSafety<FakePwm, FakeSwitch, FakeRelay>, at: u64) {
        let ms = Duration::from_millis;
        level.set(false);
        esc.poll(ms(at));
        level.set(true);
        esc.poll(ms(at + 1));
    }

    #[test]
    fn test_two_presses_run_the_sequence() {
        let ms = Duration::from_millis;
        let (level, cycles) = (Cell::new(false), Cell::new(0));
        let mut esc = safety(&level, &cycles);
        assert_eq!(esc.state(), Calibration::Idle);

        press(&level, &mut esc, 200);
        assert_eq!(esc.state(), Calibration::AwaitingSecondPress);
        assert!(!esc.write_speed(PulseWidth::new(1500), ms(300)));

        press(&level, &mut esc, 500);
        assert_eq!(esc.state(), Calibration::Calibrating);
        assert!(!esc.write_speed(PulseWidth::new(1500), ms(600)));

        // max pulse hold, relay-on hold, min pulse hold
        esc.poll(ms(1600));
        assert_eq!(esc.state(), Calibration::Calibrating);
        esc.poll(ms(5700));
        assert_eq!(esc.state(), Calibration::Calibrating);
        esc.poll(ms(6800));
        assert_eq!(esc.state(), Calibration::Calibrated);
        assert_eq!(esc.pulse(), 1000);
        assert!(esc.write_speed(PulseWidth::new(1001), ms(6900)));
    }

    #[test]
    fn test_single_press_falls_through_without_sequence() {
        let ms = Duration::from_millis;
        let (level, cycles) = (Cell::new(false), Cell::new(0));
        let mut esc = safety(&level, &cycles);

        press(&level, &mut esc, 200);
        let ack_cycles = cycles.get();
        esc.poll(ms(2000));
        assert_eq!(esc.state(), Calibration::AwaitingSecondPress);
        esc.poll(ms(3300));
        assert_eq!(esc.state(), Calibration::Calibrated);
        // the relay only saw the acknowledgement pulse, never the sequence
        assert_eq!(cycles.get(), ack_cycles);
        assert_eq!(esc.pulse(), 1000);
    }

    #[test]
    fn test_ramp_rate_and_convergence() {
        let ms = Duration::from_millis;
        let (level, cycles) = (Cell::new(false), Cell::new(0));
        let mut esc = safety(&level, &cycles);
        press(&level, &mut esc, 200);
        esc.poll(ms(3300));
        assert_eq!(esc.state(), Calibration::Calibrated);

        // 10ms elapsed moves at most 10us
        assert!(esc.write_speed(PulseWidth::new(1500), ms(3310)));
        assert_eq!(esc.pulse(), 1010);

        // converges within |target - start| milliseconds
        let mut now = 3310;
        while esc.pulse() != 1500 {
            now += 1;
            esc.write_speed(PulseWidth::new(1500), ms(now));
            assert!(now <= 3310 + 490);
        }

        // never overshoots past the target or the band
        esc.write_speed(PulseWidth::new(1500), ms(now + 100));
        assert_eq!(esc.pulse(), 1500);
        esc.write_speed(PulseWidth::new(3000), ms(now + 100_000));
        assert_eq!(esc.pulse(), 2000);
    }

    #[test]
    fn test_recalibration_refused() {
        let ms = Duration::from_millis;
        let (level, cycles) = (Cell::new(false), Cell::new(0));
        let mut esc = safety(&level, &cycles);
        press(&level, &mut esc, 200);
        esc.poll(ms(3300));
        assert_eq!(esc.state(), Calibration::Calibrated);

        press(&level, &mut esc, 4000);
        press(&level, &mut esc, 4500);
        assert_eq!(esc.state(), Calibration::Calibrated);
    }
}
