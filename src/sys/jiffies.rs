use core::time;

#[cfg(not(test))]
extern "Rust" {
    fn get_jiffies() -> time::Duration;
}

#[cfg(test)]
unsafe fn get_jiffies() -> time::Duration {
    time::Duration::from_millis(42)
}

/// Monotonic time since boot, provided by the board crate.
pub fn get() -> time::Duration {
    unsafe { get_jiffies() }
}
