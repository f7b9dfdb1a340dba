use crate::types::SensorSample;

/// Tri-axial accelerometer seam; board crates adapt their bus driver to this.
pub trait Accelerometer {
    type Error;

    /// (Re-)initialize the device. Called at startup and on fault recovery.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Device connectivity self test.
    fn probe(&mut self) -> bool;

    fn read(&mut self) -> Result<SensorSample, Self::Error>;
}
