use core::time::Duration;

use embedded_hal::digital::v2::{InputPin, OutputPin};
use embedded_hal::serial;
use embedded_hal::PwmPin;

use crate::config::{Config, Runtime};
use crate::esc::{Calibration, EscSafety};
use crate::estimator::{AngleSource, Fault};
use crate::fcs::PID;
use crate::protocol::HostLink;
use crate::types::PulseWidth;

/// Sequences one sample tick: ESC safety poll, angle estimation, control law,
/// ramped actuation and host exchange. Owns the runtime configuration that
/// the host link and the on-device menu mutate.
pub struct Supervisor<SRC, P, SW, RL, S> {
    config: Config,
    runtime: Runtime,
    source: SRC,
    pid: PID,
    esc: EscSafety<P, SW, RL>,
    link: HostLink,
    serial: S,
    ticks: u32,
    fault: Option<Fault>,
}

impl<SRC, P, SW, RL, S> Supervisor<SRC, P, SW, RL, S>
where
    SRC: AngleSource,
    P: PwmPin<Duty = u16>,
    SW: InputPin,
    RL: OutputPin,
    S: serial::Read<u8> + serial::Write<u8>,
{
    pub fn new(config: Config, source: SRC, esc: EscSafety<P, SW, RL>, serial: S) -> Self {
        let mut runtime = Runtime::default();
        runtime.gains = config.gains;
        Self {
            pid: PID::new(&config.control, &config.fcs),
            config,
            runtime,
            source,
            esc,
            link: HostLink::new(),
            serial,
            ticks: 0,
            fault: None,
        }
    }

    /// One fixed-period tick with a monotonic timestamp.
    pub fn tick(&mut self, now: Duration) {
        self.esc.poll(now);
        if self.esc.state() == Calibration::Calibrating {
            // calibration owns the loop; control and host exchange starve
            return;
        }
        self.link.pump(&mut self.serial, &mut self.runtime);

        let angle = match self.source.update() {
            Ok(angle) => {
                self.fault = None;
                angle
            }
            Err(fault) => {
                if self.fault != Some(fault) {
                    warn!("angle source fault: {:?}", fault);
                }
                self.fault = Some(fault);
                self.source.angle()
            }
        };
        let error = self.runtime.reference - angle;
        let pulse = match self.runtime.pwm_override {
            Some(micros) => PulseWidth::new(micros),
            None if self.runtime.control_enabled => {
                self.pid.next_pulse(error, &self.runtime.gains)
            }
            // idle: keep the ESC at the minimum signal
            None => PulseWidth::default(),
        };
        self.esc.write_speed(pulse, now);

        self.ticks += 1;
        if self.ticks % self.config.control.telemetry_divider == 0 {
            self.link.emit(angle, error, self.esc.pulse());
        }
        self.link.flush(&mut self.serial);
    }

    pub fn calibration(&self) -> Calibration {
        self.esc.state()
    }

    /// Persistent angle source fault, if any, for display surfaces.
    pub fn fault(&self) -> Option<Fault> {
        self.fault
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }
}
