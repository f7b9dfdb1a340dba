use super::{Fcs, Gains};

/// Host-mutable runtime state: setpoints, gains and overrides. Owned by the
/// supervisor and threaded by reference, never kept in statics.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Runtime {
    /// Settle-time setpoint in seconds, consumed by the host-side designer.
    pub tss: f32,
    /// Overshoot setpoint, consumed by the host-side designer.
    pub mp: f32,
    pub gains: Gains,
    /// Reference angle in degrees.
    pub reference: f32,
    /// When set, replaces the controller output for the tick.
    pub pwm_override: Option<u16>,
    pub control_enabled: bool,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            tss: 0.0,
            mp: 0.0,
            gains: Gains::default(),
            reference: 0.0,
            pwm_override: None,
            control_enabled: false,
        }
    }
}

impl Runtime {
    /// Sets the reference angle if it lies within the rig's mechanical range.
    pub fn set_reference(&mut self, angle: f32, limits: &Fcs) -> bool {
        if !(limits.min_reference..=limits.max_reference).contains(&angle) {
            return false;
        }
        self.reference = angle;
        true
    }
}

mod test {
    #[test]
    fn test_set_reference_range() {
        use super::super::Fcs;
        use super::Runtime;

        let mut runtime = Runtime::default();
        let limits = Fcs::default();
        assert!(runtime.set_reference(-20.0, &limits));
        assert_eq!(runtime.reference, -20.0);
        assert!(!runtime.set_reference(30.0, &limits));
        assert_eq!(runtime.reference, -20.0);
    }
}
