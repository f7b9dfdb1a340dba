use core::fmt::{self, Display, Formatter, Write};
use core::str::from_utf8_unchecked;
use core::sync::atomic::{AtomicUsize, Ordering};

use log::{Log, Metadata, Record};

use crate::sys::jiffies;

/// Wrapping in-memory log sink; a console or display surface drains it via
/// `Display`. Only the control loop context writes, so no writer locking.
#[derive(Default)]
pub struct LogBuffer {
    buffer: &'static mut [u8],
    index: AtomicUsize,
}

impl Write for LogBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let size = self.buffer.len();
        if size == 0 {
            return Ok(());
        }
        let mut bytes = s.as_bytes();
        if bytes.len() >= size {
            bytes = &bytes[..size];
        }
        let index = self.index.fetch_add(bytes.len(), Ordering::Relaxed) % size;

        if size - index > bytes.len() {
            self.buffer[index..index + bytes.len()].copy_from_slice(bytes);
        } else {
            let partial = size - index;
            self.buffer[index..].copy_from_slice(&bytes[..partial]);
            self.buffer[..bytes.len() - partial].copy_from_slice(&bytes[partial..]);
        }
        Ok(())
    }
}

impl Display for LogBuffer {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let index = self.index.load(Ordering::Relaxed);
        if index <= self.buffer.len() {
            return write!(f, "{}", unsafe { from_utf8_unchecked(&self.buffer[..index]) });
        }
        let index = index % self.buffer.len();
        write!(f, "{}", unsafe { from_utf8_unchecked(&self.buffer[index..]) })?;
        write!(f, "{}", unsafe { from_utf8_unchecked(&self.buffer[..index]) })
    }
}

static mut LOG_BUFFER: LogBuffer = LogBuffer { buffer: &mut [], index: AtomicUsize::new(0) };

pub struct Logger;

impl Log for Logger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let millis = jiffies::get().as_millis() as u32;
        let log_buffer = unsafe { &mut LOG_BUFFER };
        writeln!(log_buffer, "[{:5}.{:03}] {}", millis / 1000, millis % 1000, record.args()).ok();
    }

    fn flush(&self) {}
}

pub fn get() -> &'static LogBuffer {
    unsafe { &LOG_BUFFER }
}

pub fn init(buffer: &'static mut [u8]) {
    unsafe { LOG_BUFFER = LogBuffer { buffer, ..Default::default() } }
    log::set_max_level(log::LevelFilter::Trace);
    log::set_logger(&Logger).ok();
}

mod test {
    #[test]
    fn test_log_buffer_wrap_around() {
        use core::fmt::Write;
        use core::sync::atomic::AtomicUsize;

        use std::boxed::Box;
        use std::format;
        use std::string::ToString;

        use super::LogBuffer;

        let buffer = Box::leak(Box::new([0u8; 8]));
        let mut log = LogBuffer { buffer, index: AtomicUsize::new(0) };
        write!(log, "abcde").unwrap();
        assert_eq!(format!("{}", log), "abcde");
        write!(log, "fghij").unwrap();
        assert_eq!(format!("{}", log), "cdefghij".to_string());
    }
}
