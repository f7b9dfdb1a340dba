#![no_std]

extern crate embedded_hal;
extern crate heapless;
#[macro_use]
extern crate log;
extern crate micromath;
extern crate nb;

pub mod algorithm;
pub mod config;
pub mod encoder;
pub mod esc;
pub mod estimator;
pub mod fcs;
pub mod hal;
pub mod logger;
pub mod protocol;
pub mod supervisor;
pub mod sys;
pub mod types;

#[cfg(test)]
extern crate std;

#[cfg(test)]
#[macro_use]
extern crate pretty_assertions;
