/// Fixed-window moving average. Until the window fills, only the samples seen
/// so far contribute.
pub struct MovingAverage<const N: usize> {
    window: [f32; N],
    index: usize,
    filled: usize,
}

impl<const N: usize> MovingAverage<N> {
    pub fn new() -> Self {
        Self { window: [0.0; N], index: 0, filled: 0 }
    }

    pub fn filter(&mut self, sample: f32) -> f32 {
        self.window[self.index] = sample;
        self.index = (self.index + 1) % N;
        if self.filled < N {
            self.filled += 1;
        }
        let sum: f32 = self.window[..self.filled].iter().sum();
        sum / self.filled as f32
    }
}

mod test {
    #[test]
    fn test_moving_average_warmup() {
        use super::MovingAverage;

        let mut average = MovingAverage::<4>::new();
        assert_eq!(average.filter(2.0), 2.0);
        assert_eq!(average.filter(4.0), 3.0);
        assert_eq!(average.filter(6.0), 4.0);
    }

    #[test]
    fn test_moving_average_window() {
        use super::MovingAverage;

        let mut average = MovingAverage::<2>::new();
        average.filter(1.0);
        average.filter(3.0);
        assert_eq!(average.filter(5.0), 4.0);
        assert_eq!(average.filter(5.0), 5.0);
    }
}
