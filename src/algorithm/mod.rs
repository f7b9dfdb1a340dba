pub mod average;
pub mod kalman;
pub mod lpf;
