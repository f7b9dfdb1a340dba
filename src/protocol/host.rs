use core::fmt::Write as _;
use core::str;

use embedded_hal::serial;
use heapless::{String, Vec};

use crate::config::{Gains, Runtime};
use crate::types::{PULSE_MAX, PULSE_MIN};

const LINE_CAPACITY: usize = 80;
const MAX_FIELDS: usize = 8;
const TELEMETRY_CAPACITY: usize = 48;

/// Line-oriented host protocol. Inbound lines are comma-separated floats with
/// count-gated meaning; outbound telemetry is `#angle,error,pwm` with fixed
/// four-decimal fields. Both directions are incremental and never block.
pub struct HostLink {
    line: Vec<u8, LINE_CAPACITY>,
    overflow: bool,
    pending: Vec<u8, TELEMETRY_CAPACITY>,
    cursor: usize,
}

impl HostLink {
    pub fn new() -> Self {
        Self { line: Vec::new(), overflow: false, pending: Vec::new(), cursor: 0 }
    }

    /// Feed one inbound byte. Returns true when a completed line changed any
    /// runtime field.
    pub fn receive(&mut self, byte: u8, runtime: &mut Runtime) -> bool {
        match byte {
            b'\r' => false,
            b'\n' => {
                let mut accepted = false;
                if self.overflow {
                    warn!("line over {} bytes discarded", LINE_CAPACITY);
                } else {
                    accepted = self.apply(runtime);
                }
                self.line.clear();
                self.overflow = false;
                accepted
            }
            byte => {
                if self.line.push(byte).is_err() {
                    self.overflow = true;
                }
                false
            }
        }
    }

    /// Drain a non-blocking serial reader into the parser.
    pub fn pump<E, S: serial::Read<u8, Error = E>>(
        &mut self,
        serial: &mut S,
        runtime: &mut Runtime,
    ) -> bool {
        let mut accepted = false;
        while let Ok(byte) = serial.read() {
            accepted |= self.receive(byte, runtime);
        }
        accepted
    }

    fn apply(&self, runtime: &mut Runtime) -> bool {
        let line = match str::from_utf8(&self.line) {
            Ok(line) => line,
            Err(_) => return false,
        };
        // a malformed token rejects its own field only, never the whole frame
        let mut fields: Vec<Option<f32>, MAX_FIELDS> = Vec::new();
        for token in line.split(',') {
            let value = token.trim().parse::<f32>().ok().filter(|value| !value.is_nan());
            if fields.push(value).is_err() {
                break;
            }
        }

        let mut accepted = false;
        if fields.len() >= 2 {
            if let Some(tss) = fields[0].filter(|&tss| tss >= 0.0) {
                runtime.tss = tss;
                accepted = true;
            }
            if let Some(mp) = fields[1].filter(|&mp| mp >= 0.0) {
                runtime.mp = mp;
                accepted = true;
            }
        }
        if fields.len() >= 6 {
            if let (Some(kp), Some(ki), Some(kd), Some(n)) =
                (fields[2], fields[3], fields[4], fields[5])
            {
                runtime.gains = Gains { kp, ki, kd, n };
                accepted = true;
            } else {
                warn!("incomplete gain group ignored");
            }
        }
        if fields.len() >= 7 {
            let valid = |pwm: &f32| (PULSE_MIN as f32..=PULSE_MAX as f32).contains(pwm);
            match fields[6].filter(valid) {
                Some(pwm) => {
                    runtime.pwm_override = Some(pwm as u16);
                    accepted = true;
                }
                None => warn!("pwm override out of range ignored"),
            }
        }
        if fields.len() >= 8 {
            if let Some(toggle) = fields[7] {
                runtime.control_enabled = toggle > 0.5;
                accepted = true;
            }
        }
        accepted
    }

    /// Stage one telemetry line; formatting is bounded by the buffer size.
    pub fn emit(&mut self, angle: f32, error: f32, pwm: u16) {
        let mut line: String<TELEMETRY_CAPACITY> = String::new();
        write!(line, "#{:.4},{:.4},{:.4}\n", angle, error, pwm as f32).ok();
        self.pending.clear();
        self.pending.extend_from_slice(line.as_bytes()).ok();
        self.cursor = 0;
    }

    /// Push staged telemetry out; stops at the first `WouldBlock` so a slow
    /// host can never stall the control loop.
    pub fn flush<E, S: serial::Write<u8, Error = E>>(&mut self, serial: &mut S) {
        while self.cursor < self.pending.len() {
            match serial.write(self.pending[self.cursor]) {
                Ok(()) => self.cursor += 1,
                Err(nb::Error::WouldBlock) => return,
                Err(nb::Error::Other(_)) => {
                    self.cursor = self.pending.len();
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use std::collections::VecDeque;
    use std::string::String;
    use std::vec::Vec;

    use crate::config::Runtime;

    use super::HostLink;

    fn feed(link: &mut HostLink, runtime: &mut Runtime, line: &str) -> bool {
        let mut accepted = false;
        for &byte in line.as_bytes() {
            accepted |= link.receive(byte, runtime);
        }
        accepted
    }

    #[test]
    fn test_partial_frame_updates_setpoints_only() {
        let mut link = HostLink::new();
        let mut runtime = Runtime::default();
        assert!(feed(&mut link, &mut runtime, "2.5,0.1\n"));
        assert_eq!(runtime.tss, 2.5);
        assert_eq!(runtime.mp, 0.1);
        assert_eq!(runtime.gains, Default::default());
        assert_eq!(runtime.pwm_override, None);
    }

    #[test]
    fn test_gain_group_applies_atomically() {
        let mut link = HostLink::new();
        let mut runtime = Runtime::default();
        assert!(feed(&mut link, &mut runtime, "1.0,0.2,0.5,0.01,0.02,10\n"));
        assert_eq!(runtime.tss, 1.0);
        assert_eq!(runtime.gains.kp, 0.5);
        assert_eq!(runtime.gains.ki, 0.01);
        assert_eq!(runtime.gains.kd, 0.02);
        assert_eq!(runtime.gains.n, 10.0);
        assert_eq!(runtime.pwm_override, None);

        // one bad gain token drops the whole group, keeps the rest
        assert!(feed(&mut link, &mut runtime, "2.0,0.3,xyz,1.0,1.0,1.0\n"));
        assert_eq!(runtime.tss, 2.0);
        assert_eq!(runtime.gains.kp, 0.5);
    }

    #[test]
    fn test_pwm_override_range_checked() {
        let mut link = HostLink::new();
        let mut runtime = Runtime::default();
        assert!(feed(&mut link, &mut runtime, "1.0,0.2,0.5,0.01,0.02,10,1500\n"));
        assert_eq!(runtime.pwm_override, Some(1500));

        runtime.pwm_override = None;
        assert!(feed(&mut link, &mut runtime, "1.0,0.2,0.5,0.01,0.02,10,3000\n"));
        assert_eq!(runtime.pwm_override, None);
        assert_eq!(runtime.gains.kp, 0.5);
    }

    #[test]
    fn test_toggle_threshold() {
        let mut link = HostLink::new();
        let mut runtime = Runtime::default();
        feed(&mut link, &mut runtime, "1.0,0.2,0.5,0.01,0.02,10,1500,0.9\n");
        assert!(runtime.control_enabled);
        feed(&mut link, &mut runtime, "1.0,0.2,0.5,0.01,0.02,10,1500,0.2\n");
        assert!(!runtime.control_enabled);
    }

    #[test]
    fn test_malformed_token_rejected_not_zeroed() {
        let mut link = HostLink::new();
        let mut runtime = Runtime::default();
        runtime.tss = 9.0;
        assert!(feed(&mut link, &mut runtime, "abc,0.1\n"));
        assert_eq!(runtime.tss, 9.0);
        assert_eq!(runtime.mp, 0.1);

        assert!(!feed(&mut link, &mut runtime, "nan,-1.0\n"));
        assert_eq!(runtime.tss, 9.0);
    }

    #[test]
    fn test_carriage_return_ignored_and_overflow_discarded() {
        let mut link = HostLink::new();
        let mut runtime = Runtime::default();
        assert!(feed(&mut link, &mut runtime, "2.5,0.1\r\n"));
        assert_eq!(runtime.tss, 2.5);

        let long: String = "1".repeat(120);
        assert!(!feed(&mut link, &mut runtime, &long));
        assert!(!feed(&mut link, &mut runtime, "\n"));
        // parser state survives the discarded line
        assert!(feed(&mut link, &mut runtime, "3.5,0.2\n"));
        assert_eq!(runtime.tss, 3.5);
    }

    #[test]
    fn test_telemetry_format() {
        let mut link = HostLink::new();
        link.emit(-12.3456, 0.5, 1500);
        assert_eq!(
            core::str::from_utf8(&link.pending).unwrap(),
            "#-12.3456,0.5000,1500.0000\n"
        );
    }

    struct FakeSerial {
        input: VecDeque<u8>,
        output: Vec<u8>,
        ready: usize,
    }

    impl embedded_hal::serial::Read<u8> for FakeSerial {
        type Error = ();

        fn read(&mut self) -> nb::Result<u8, ()> {
            self.input.pop_front().ok_or(nb::Error::WouldBlock)
        }
    }

    impl embedded_hal::serial::Write<u8> for FakeSerial {
        type Error = ();

        fn write(&mut self, byte: u8) -> nb::Result<(), ()> {
            if self.ready == 0 {
                return Err(nb::Error::WouldBlock);
            }
            self.ready -= 1;
            self.output.push(byte);
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), ()> {
            Ok(())
        }
    }

    #[test]
    fn test_pump_and_backpressured_flush() {
        let mut link = HostLink::new();
        let mut runtime = Runtime::default();
        let mut serial = FakeSerial {
            input: VecDeque::from_iter(b"2.5,0.1\n".iter().copied()),
            output: Vec::new(),
            ready: 5,
        };
        assert!(link.pump(&mut serial, &mut runtime));
        assert_eq!(runtime.tss, 2.5);

        link.emit(1.0, 0.0, 1000);
        link.flush(&mut serial);
        assert_eq!(serial.output.len(), 5);
        serial.ready = 100;
        link.flush(&mut serial);
        assert_eq!(core::str::from_utf8(&serial.output).unwrap(), "#1.0000,0.0000,1000.0000\n");
    }
}
