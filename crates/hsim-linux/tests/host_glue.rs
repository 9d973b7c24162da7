use std::io::{self, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hsim_core::{PartitionId, SimError};
use hsim_hal::{FlashPartition, HalTimer, SystemControl, UartDev};
use hsim_linux::console::write_flushed;
use hsim_linux::{start_hal, us_to_ticks, CliOptions, FlashOptions, HostTimer, Options};

#[test]
fn test_tick_rounding() {
    assert_eq!(us_to_ticks(0), 0);
    assert_eq!(us_to_ticks(1), 1);
    assert_eq!(us_to_ticks(1_000), 1);
    assert_eq!(us_to_ticks(1_001), 2);
    assert_eq!(us_to_ticks(1_000_000), 1_000);
}

#[test]
fn test_timer_period_rounds_up() {
    let t = HostTimer::new(1_500, false, || {});
    assert_eq!(t.period(), Duration::from_millis(2));
    let t = HostTimer::new(0, false, || {});
    assert_eq!(t.period(), Duration::from_millis(1));
}

#[test]
fn test_one_shot_timer() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let mut t = HostTimer::new(1_000, false, move || {
        h.fetch_add(1, Ordering::SeqCst);
    });

    t.start().unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(!t.is_running());

    // Fired one-shot can be armed again
    t.start().unwrap();
    thread::sleep(Duration::from_millis(100));
    assert_eq!(hits.load(Ordering::SeqCst), 2);
}

#[test]
fn test_auto_reload_timer() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let mut t = HostTimer::new(2_000, true, move || {
        h.fetch_add(1, Ordering::SeqCst);
    });

    t.start().unwrap();
    assert_eq!(t.start(), Err(SimError::InvalidState));
    thread::sleep(Duration::from_millis(100));
    t.stop();

    let fired = hits.load(Ordering::SeqCst);
    assert!(fired >= 2, "only fired {} times", fired);

    // Stopped: no more callbacks
    thread::sleep(Duration::from_millis(30));
    assert_eq!(hits.load(Ordering::SeqCst), fired);
    t.stop();
}

#[test]
fn test_stop_before_fire() {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    let mut t = HostTimer::new(5_000_000, false, move || {
        h.fetch_add(1, Ordering::SeqCst);
    });
    t.start().unwrap();
    t.stop();
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

struct FlushCounter {
    buf: Vec<u8>,
    flushes: usize,
}

impl Write for FlushCounter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

#[test]
fn test_console_flushes_each_call() {
    let mut out = FlushCounter { buf: Vec::new(), flushes: 0 };
    let n = write_flushed(&mut out, format_args!("part {} at {:#x}\n", 3, 16)).unwrap();

    assert_eq!(out.buf, b"part 3 at 0x10\n");
    assert_eq!(n, out.buf.len());
    assert_eq!(out.flushes, 1);

    assert!(hsim_linux::console_print!("").is_ok());
}

#[test]
fn test_start_hal_with_console() {
    let dir = tempfile::tempdir().unwrap();
    let options = Options { flash: FlashOptions { per_pid: true }, cli: CliOptions { enable: true } };

    let mut hal = start_hal(&options, dir.path()).unwrap();

    assert_eq!(hal.uart, Some(UartDev::console()));
    assert_eq!(hal.registry.wifi_names(), vec!["sim-wifi-linux"]);
    assert_eq!(hal.registry.ota_names(), vec!["linuxhost-ota"]);
    assert!(hal.flash.config().per_pid);
    assert_eq!(hal.flash.config().root, dir.path());

    let mut cursor = 0;
    hal.flash.write(PartitionId::PARAMETER_3, &mut cursor, &[0x00]).unwrap();
    assert!(hal.flash.region_path(PartitionId::PARAMETER_3).starts_with(dir.path()));

    hal.system.reboot();
}

#[test]
fn test_start_hal_without_console() {
    let dir = tempfile::tempdir().unwrap();
    let hal = start_hal(&Options::default(), dir.path()).unwrap();

    assert!(hal.uart.is_none());
    assert!(!hal.flash.config().per_pid);
    assert_eq!(hal.registry.wifi_names().len(), 1);
}
