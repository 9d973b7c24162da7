use std::path::PathBuf;

use log::info;

use hsim_core::SimResult;
use hsim_hal::{FirmwareUpdateModule, SystemControl, UartDev, WirelessModule};

use crate::flash::{FileFlash, FlashConfig};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlashOptions {
    pub per_pid: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub enable: bool,
}

/// Startup options handed over by the launcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Options {
    pub flash: FlashOptions,
    pub cli: CliOptions,
}

/// Simulated Wi-Fi radio.
#[derive(Debug, Default)]
pub struct SimWifi;

impl WirelessModule for SimWifi {
    fn name(&self) -> &str {
        "sim-wifi-linux"
    }

    fn init(&mut self) -> SimResult<()> {
        Ok(())
    }
}

/// Simulated firmware update target.
#[derive(Debug, Default)]
pub struct SimOta;

impl FirmwareUpdateModule for SimOta {
    fn name(&self) -> &str {
        "linuxhost-ota"
    }

    fn init(&mut self) -> SimResult<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct ModuleRegistry {
    wifi: Vec<Box<dyn WirelessModule>>,
    ota: Vec<Box<dyn FirmwareUpdateModule>>,
}

impl ModuleRegistry {
    pub fn register_wifi(&mut self, mut module: Box<dyn WirelessModule>) -> SimResult<()> {
        module.init()?;
        info!("registered wifi module {}", module.name());
        self.wifi.push(module);
        Ok(())
    }

    pub fn register_ota(&mut self, mut module: Box<dyn FirmwareUpdateModule>) -> SimResult<()> {
        module.init()?;
        info!("registered ota module {}", module.name());
        self.ota.push(module);
        Ok(())
    }

    pub fn wifi_names(&self) -> Vec<&str> {
        self.wifi.iter().map(|m| m.name()).collect()
    }

    pub fn ota_names(&self) -> Vec<&str> {
        self.ota.iter().map(|m| m.name()).collect()
    }
}

#[derive(Debug, Default)]
pub struct HostSystem;

impl SystemControl for HostSystem {
    fn reboot(&self) {
        info!("reboot requested; ignored on host");
    }
}

/// Everything `start_hal` brings up.
pub struct HostHal {
    pub flash: FileFlash,
    /// Present only when the debug console was requested.
    pub uart: Option<UartDev>,
    pub registry: ModuleRegistry,
    pub system: HostSystem,
}

fn uart_init(uart: &UartDev) -> SimResult<()> {
    let c = &uart.config;
    info!(
        "uart{}: {} baud, {:?}, parity {:?}, stop {:?}, flow {:?}",
        uart.port, c.baud_rate, c.data_width, c.parity, c.stop_bits, c.flow_control
    );
    Ok(())
}

/// Brings up the host HAL: flash with the configured isolation mode, the
/// debug console UART when enabled, and the simulated Wi-Fi/OTA modules.
pub fn start_hal(options: &Options, root: impl Into<PathBuf>) -> SimResult<HostHal> {
    let flash = FileFlash::new(FlashConfig { root: root.into(), per_pid: options.flash.per_pid });
    info!(
        "flash regions under {} (per-pid: {})",
        flash.config().root.display(),
        flash.config().per_pid
    );

    let uart = if options.cli.enable {
        let uart = UartDev::console();
        uart_init(&uart)?;
        Some(uart)
    } else {
        None
    };

    let mut registry = ModuleRegistry::default();
    registry.register_wifi(Box::new(SimWifi))?;
    registry.register_ota(Box::new(SimOta))?;

    Ok(HostHal { flash, uart, registry, system: HostSystem })
}
