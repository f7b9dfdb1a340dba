use core::time::Duration;

/// Rising-edge detector for the mechanical arming switch; level changes
/// inside the quiet window are ignored.
pub struct Debouncer {
    window: Duration,
    last_level: bool,
    last_press: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window, last_level: true, last_press: Duration::ZERO }
    }

    /// Returns true on an accepted rising edge.
    pub fn poll(&mut self, level: bool, now: Duration) -> bool {
        let mut pressed = false;
        if now.saturating_sub(self.last_press) > self.window && level && !self.last_level {
            self.last_press = now;
            pressed = true;
        }
        self.last_level = level;
        pressed
    }
}

mod test {
    #[test]
    fn test_debounce_window() {
        use core::time::Duration;

        use super::Debouncer;

        let ms = Duration::from_millis;
        let mut debouncer = Debouncer::new(ms(100));
        assert!(!debouncer.poll(true, ms(150))); // level was high at reset
        assert!(!debouncer.poll(false, ms(200)));
        assert!(debouncer.poll(true, ms(300)));
        // bounce right after the accepted press
        assert!(!debouncer.poll(false, ms(320)));
        assert!(!debouncer.poll(true, ms(340)));
        assert!(!debouncer.poll(false, ms(360)));
        assert!(debouncer.poll(true, ms(450)));
    }
}
