/// Scalar angle-only Kalman filter. The state is the angle estimate itself;
/// q and r are fixed process/measurement noise tunings.
pub struct Kalman {
    estimate: f32,
    p: f32,
    q: f32,
    r: f32,
    k: f32,
}

impl Kalman {
    pub fn new(p: f32, q: f32, r: f32) -> Self {
        Self { estimate: 0.0, p, q, r, k: 0.0 }
    }

    pub fn filter(&mut self, measure: f32) -> f32 {
        self.p += self.q;
        self.k = self.p / (self.p + self.r);
        self.estimate += self.k * (measure - self.estimate);
        self.p = (1.0 - self.k) * self.p;
        self.estimate
    }

    pub fn gain(&self) -> f32 {
        self.k
    }

    pub fn covariance(&self) -> f32 {
        self.p
    }
}

mod test {
    #[test]
    fn test_kalman_invariants() {
        use super::Kalman;

        let mut kalman = Kalman::new(0.5, 0.01, 1.5);
        for i in 0..100 {
            kalman.filter(if i & 1 == 0 { 9.0 } else { 11.0 });
            assert!(kalman.covariance() >= 0.0);
            assert!(0.0 <= kalman.gain() && kalman.gain() <= 1.0);
        }
    }

    #[test]
    fn test_kalman_convergence() {
        use super::Kalman;

        let mut kalman = Kalman::new(0.5, 0.01, 1.5);
        let mut estimate = 0.0;
        for _ in 0..200 {
            estimate = kalman.filter(30.0);
        }
        assert!((estimate - 30.0).abs() < 0.1);
    }
}
