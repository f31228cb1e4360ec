//! Utility Module
//!
//! - [`logging`]: platform logger setup
//! - [`Timer`]: frame clock for the `elapsed` uniform
//! - [`FpsCounter`]: frame rate over one-second windows

pub mod fps_counter;
pub mod logging;
pub mod time;

pub use fps_counter::FpsCounter;
pub use time::Timer;
