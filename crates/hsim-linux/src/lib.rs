//! Host (Linux/macOS) implementations of the hsim HAL.

pub mod console;
pub mod flash;
pub mod setup;
pub mod timer;

pub use flash::{FileFlash, FlashConfig};
pub use setup::{start_hal, CliOptions, FlashOptions, HostHal, HostSystem, ModuleRegistry, Options, SimOta, SimWifi};
pub use timer::{us_to_ticks, HostTimer, TICKS_PER_SECOND};
