pub mod host;

pub use host::HostLink;
