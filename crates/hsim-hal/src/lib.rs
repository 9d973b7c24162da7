#![no_std]
#![forbid(unsafe_code)]

use hsim_core::{PartitionId, SimResult};

/// Raw partitioned flash.
///
/// Erased cells read as `0xFF`; a write can only clear bits, so callers must
/// erase before they rewrite a range that needs bits set again.
pub trait FlashPartition: Send + Sync {
    /// Read up to `buf.len()` bytes at `*cursor`.
    /// Returns the number of bytes backed by the partition and advances the cursor by it.
    /// A missing cursor is `InvalidArgument`.
    fn read(&self, partition: PartitionId, cursor: Option<&mut u32>, buf: &mut [u8]) -> SimResult<usize>;

    /// AND `data` into the partition at `*cursor`. Advances the cursor by `data.len()` on success
    /// and leaves it untouched on failure.
    fn write(&mut self, partition: PartitionId, cursor: &mut u32, data: &[u8]) -> SimResult<()>;

    /// Reset `len` bytes at `offset` to the erased state.
    fn erase(&mut self, partition: PartitionId, offset: u32, len: u32) -> SimResult<()>;
}

/// Hardware timer. The period and callback are fixed at construction.
pub trait HalTimer {
    fn start(&mut self) -> SimResult<()>;
    fn stop(&mut self);
}

/// Wireless driver plugged into the HAL registry.
pub trait WirelessModule: Send + Sync {
    fn name(&self) -> &str;
    fn init(&mut self) -> SimResult<()>;
}

/// Firmware update driver plugged into the HAL registry.
pub trait FirmwareUpdateModule: Send + Sync {
    fn name(&self) -> &str;
    fn init(&mut self) -> SimResult<()>;
}

pub trait SystemControl {
    fn reboot(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataWidth {
    Bits5,
    Bits6,
    Bits7,
    Bits8,
    Bits9,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    Disabled,
    Cts,
    Rts,
    CtsRts,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartConfig {
    pub baud_rate: u32,
    pub data_width: DataWidth,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UartDev {
    pub port: u8,
    pub config: UartConfig,
}

impl UartDev {
    /// The debug console port: 921600 8N1, no flow control.
    pub const fn console() -> Self {
        Self {
            port: 0,
            config: UartConfig {
                baud_rate: 921_600,
                data_width: DataWidth::Bits8,
                parity: Parity::None,
                stop_bits: StopBits::One,
                flow_control: FlowControl::Disabled,
            },
        }
    }
}
